//! ANS-style range coder. This is the crate's production wire coder (see
//! `SPEC_FULL.md` §9): simpler to keep allocation-light than the classical
//! range coder, and it is what the reference's smaller build targets ship.

use super::{SymbolReader, SymbolWriter};

const SPACE: usize = 1 << 11;
const MASK: usize = SPACE - 1;
const BITS: usize = 16;
const MIN: usize = 1 << BITS;
const MAX: usize = 2 * MIN;

struct Entry {
    value: u32,
    max: u32,
}

/// Buffers `(value, max)` entries; nothing is encoded until `finish()`,
/// which replays them in reverse so a forward-reading decoder recovers the
/// original order.
#[derive(Default)]
pub struct XRangeEncoder {
    entries: Vec<Entry>,
}

impl XRangeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode_number(state: usize, value: usize, max: usize, bits: &mut Vec<u8>) -> usize {
        let low = value * SPACE;
        let base = low / max;
        let freq = (low + SPACE) / max - base;
        let mut state = state;
        while state >= MAX * freq / SPACE {
            bits.push((state & 1) as u8);
            state >>= 1;
        }
        (state / freq) * SPACE + (state % freq) + base
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.entries.reverse();

        // Calculate how many leading entries determine the "head" of the
        // state search (those whose combined probability mass already
        // exceeds the ~2^32 budget the initial-state search can distinguish).
        let limit = {
            let mut cost = 4.3e9f64;
            let mut limit = self.entries.len();
            for (i, e) in self.entries.iter().enumerate() {
                cost /= e.max as f64;
                if cost < 1.0 {
                    limit = i + 1;
                    break;
                }
            }
            limit
        };

        let mut bits: Vec<u8> = Vec::with_capacity(1024);
        let mut max_leading_zeros = 0usize;
        let mut best_initial_state = MIN;
        let mut initial_state = MIN;
        while initial_state < MAX + 0x1C {
            bits.clear();
            let mut state = initial_state;
            for e in self.entries.iter().take(limit) {
                state = Self::encode_number(state, e.value as usize, e.max as usize, &mut bits);
            }
            let num_leading_zeros = bits.iter().position(|&b| b != 0).unwrap_or(bits.len());
            if num_leading_zeros > max_leading_zeros {
                max_leading_zeros = num_leading_zeros;
                best_initial_state = initial_state;
            }
            initial_state += 32;
        }

        bits.clear();
        let mut state = best_initial_state;
        for e in &self.entries {
            state = Self::encode_number(state, e.value as usize, e.max as usize, &mut bits);
        }
        for i in 0..BITS {
            bits.push(((state >> (BITS - 1 - i)) & 1) as u8);
        }

        bits.reverse();
        while matches!(bits.last(), Some(0)) {
            bits.pop();
        }
        while bits.len() % 8 != 0 {
            bits.push(0);
        }

        let mut out = Vec::with_capacity(bits.len() / 8);
        for chunk in bits.chunks(8) {
            let mut byte = 0u8;
            for (j, &bit) in chunk.iter().enumerate() {
                byte |= bit << j;
            }
            out.push(byte);
        }
        out
    }
}

impl SymbolWriter for XRangeEncoder {
    fn write_number(&mut self, max: u32, value: u32) {
        if max > 1 {
            self.entries.push(Entry { value, max });
        }
    }
}

/// Consumes a byte stream produced by `XRangeEncoder`.
pub struct XRangeDecoder {
    data: Vec<u8>,
    state: usize,
    pos: usize,
}

impl XRangeDecoder {
    pub fn new(data: Vec<u8>) -> Self {
        let mut dec = XRangeDecoder { data, state: 1, pos: 0 };
        for _ in 0..BITS {
            dec.state = (dec.state << 1) | dec.read_bit();
        }
        dec
    }

    fn read_bit(&mut self) -> usize {
        let offset = self.pos >> 3;
        if offset >= self.data.len() {
            return 0;
        }
        let bit = (self.data[offset] >> (self.pos & 7)) & 1;
        self.pos += 1;
        bit as usize
    }
}

impl SymbolReader for XRangeDecoder {
    fn read_number(&mut self, max: u32) -> u32 {
        if max == 1 {
            return 0;
        }
        let max = max as usize;
        let offset = self.state & MASK;
        let result = (offset * max + max - 1) / SPACE;
        let low = result * SPACE;
        let base = low / max;
        let freq = (low + SPACE) / max - base;
        let mut state = freq * (self.state / SPACE) + offset - base;
        while state < MIN {
            state = (state << 1) | self.read_bit();
        }
        self.state = state;
        result as u32
    }
}

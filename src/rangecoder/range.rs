//! Classical range coder: a fixed-width (48-bit) `(low, range)` arithmetic
//! coder operating on byte-sized renormalization nibbles. Fully implemented
//! and tested, but not the crate's production wire coder (see `xrange`).

use super::{SymbolReader, SymbolWriter};

const NUM_NIBBLES: u32 = 6;
const NIBBLE_BITS: u32 = 8;
const NIBBLE_MASK: u64 = (1u64 << NIBBLE_BITS) - 1;
const VALUE_BITS: u32 = NUM_NIBBLES * NIBBLE_BITS;
const VALUE_MASK: u64 = (1u64 << VALUE_BITS) - 1;
const HEAD_NIBBLE_SHIFT: u32 = VALUE_BITS - NIBBLE_BITS;
const HEAD_START: u64 = 1u64 << HEAD_NIBBLE_SHIFT;
const RANGE_LIMIT_BITS: u32 = HEAD_NIBBLE_SHIFT - NIBBLE_BITS;
const RANGE_LIMIT_MASK: u64 = (1u64 << RANGE_LIMIT_BITS) - 1;

#[derive(Clone, Copy)]
struct Triplet {
    bottom: u32,
    top: u32,
    total_range: u32,
}

/// Accumulates `(bottom, top, total_range)` triples; nothing is emitted
/// until `finish()`.
#[derive(Default)]
pub struct RangeEncoder {
    triplets: Vec<Triplet>,
}

impl RangeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Vec<u8> {
        let encoded = self.encode();
        Self::optimize(&self.triplets, encoded)
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut low: u64 = 0;
        let mut range: u64 = VALUE_MASK;
        for t in &self.triplets {
            range /= t.total_range as u64;
            low += t.bottom as u64 * range;
            range *= (t.top - t.bottom) as u64;
            loop {
                if (low ^ (low + range - 1)) >= HEAD_START {
                    if range > RANGE_LIMIT_MASK {
                        break;
                    }
                    range = (-(low as i64) as u64) & VALUE_MASK;
                }
                out.push((low >> HEAD_NIBBLE_SHIFT) as u8);
                range = ((range << NIBBLE_BITS) & VALUE_MASK) | NIBBLE_MASK;
                low = (low << NIBBLE_BITS) & VALUE_MASK;
            }
        }
        for _ in 0..NUM_NIBBLES {
            out.push((low >> HEAD_NIBBLE_SHIFT) as u8);
            low = (low << NIBBLE_BITS) & VALUE_MASK;
        }
        out
    }

    /// Shaves up to `NUM_NIBBLES` trailing bytes and perturbs the new last
    /// byte by +-1 while a shadow decoder still parses every triplet.
    fn optimize(triplets: &[Triplet], data: Vec<u8>) -> Vec<u8> {
        if data.len() <= 2 * NUM_NIBBLES as usize {
            return data;
        }
        let mut data = data;

        let mut current = ShadowDecoder::new(&data);
        for _ in 0..NUM_NIBBLES {
            current.code = (current.code << NIBBLE_BITS) | current.read_nibble();
        }
        current.range = VALUE_MASK;
        let mut good = current.clone();

        let triplets_size = triplets.len();
        let mut i = 0;
        while i < triplets_size {
            current.decode_range(triplets[i]);
            if current.offset + 2 * NUM_NIBBLES as usize > data.len() {
                break;
            }
            good = current.clone();
            i += 1;
        }

        let mut best_cut: usize = 0;
        let mut best_cut_delta: i32 = 0;
        for cut in 1..=NUM_NIBBLES as usize {
            good.data_length = data.len() - cut;
            let original_tail = data[good.data_length - 1];
            for delta in -1i32..=1 {
                current = good.clone();
                data[current.data_length - 1] = (original_tail as i32 + delta) as u8;
                let mut j = i;
                let mut ok = true;
                while ok && j < triplets_size {
                    ok = current.decode_range(triplets[j]);
                    j += 1;
                }
                if ok {
                    best_cut = cut;
                    best_cut_delta = delta;
                }
            }
            data[good.data_length - 1] = original_tail;
        }
        let new_len = data.len() - best_cut;
        data.truncate(new_len);
        let last = data.len() - 1;
        data[last] = (data[last] as i32 + best_cut_delta) as u8;
        data
    }
}

impl SymbolWriter for RangeEncoder {
    fn write_number(&mut self, max: u32, value: u32) {
        if max == 1 {
            return;
        }
        self.triplets.push(Triplet { bottom: value, top: value + 1, total_range: max });
    }
}

#[derive(Clone)]
struct ShadowDecoder<'a> {
    data: &'a [u8],
    data_length: usize,
    offset: usize,
    code: u64,
    low: u64,
    range: u64,
}

impl<'a> ShadowDecoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        ShadowDecoder { data, data_length: data.len(), offset: 0, code: 0, low: 0, range: VALUE_MASK }
    }

    fn read_nibble(&mut self) -> u64 {
        if self.offset < self.data_length {
            let v = self.data[self.offset] as u64;
            self.offset += 1;
            v
        } else {
            0
        }
    }

    fn decode_range(&mut self, t: Triplet) -> bool {
        self.range /= t.total_range as u64;
        if self.range == 0 {
            return false;
        }
        let count = ((self.code - self.low) / self.range) as u32;
        if count < t.bottom || count >= t.top {
            return false;
        }
        self.low += t.bottom as u64 * self.range;
        self.range *= (t.top - t.bottom) as u64;
        loop {
            if (self.low ^ (self.low + self.range - 1)) >= HEAD_START {
                if self.range > RANGE_LIMIT_MASK {
                    break;
                }
                self.range = (-(self.low as i64) as u64) & VALUE_MASK;
            }
            let nibble = self.read_nibble();
            self.code = ((self.code << NIBBLE_BITS) & VALUE_MASK) | nibble;
            self.range = ((self.range << NIBBLE_BITS) & VALUE_MASK) | NIBBLE_MASK;
            self.low = (self.low << NIBBLE_BITS) & VALUE_MASK;
        }
        true
    }
}

/// Consumes a byte stream produced by `RangeEncoder`.
pub struct RangeDecoder {
    data: Vec<u8>,
    low: u64,
    range: u64,
    code: u64,
    offset: usize,
    healthy: bool,
}

impl RangeDecoder {
    pub fn new(data: Vec<u8>) -> Self {
        let mut dec =
            RangeDecoder { data, low: 0, range: VALUE_MASK, code: 0, offset: 0, healthy: true };
        for _ in 0..NUM_NIBBLES {
            let nibble = dec.read_nibble();
            dec.code = (dec.code << NIBBLE_BITS) | nibble;
        }
        dec
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    fn read_nibble(&mut self) -> u64 {
        if self.offset < self.data.len() {
            let v = (self.data[self.offset] as u64) & NIBBLE_MASK;
            self.offset += 1;
            v
        } else {
            0
        }
    }

    fn remove_range(&mut self, bottom: u32, top: u32) {
        self.low += bottom as u64 * self.range;
        self.range *= (top - bottom) as u64;
        loop {
            if (self.low ^ (self.low + self.range - 1)) >= HEAD_START {
                if self.range > RANGE_LIMIT_MASK {
                    break;
                }
                // The production decoder rebaselines `range` against
                // `kRangeLimitMask`, not `kValueMask` (unlike the encoder's
                // internal shadow decoder used by `optimize`); this matches
                // the reference's `RangeDecoder::removeRange`.
                self.range = (-(self.low as i64) as u64) & RANGE_LIMIT_MASK;
            }
            let nibble = self.read_nibble();
            self.code = ((self.code << NIBBLE_BITS) & VALUE_MASK) | nibble;
            self.range = (self.range << NIBBLE_BITS) & VALUE_MASK;
            self.low = (self.low << NIBBLE_BITS) & VALUE_MASK;
        }
    }

    fn current_count(&mut self, total_range: u32) -> u32 {
        self.range /= total_range as u64;
        let result = ((self.code - self.low) / self.range) as i64;
        if result < 0 || result > total_range as i64 {
            self.healthy = false;
            return 0;
        }
        result as u32
    }
}

impl SymbolReader for RangeDecoder {
    fn read_number(&mut self, max: u32) -> u32 {
        if max < 2 {
            return 0;
        }
        let result = self.current_count(max);
        self.remove_range(result, result + 1);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rangecoder::{SymbolReader, SymbolWriter};

    fn xorshift32(state: &mut u32) -> u32 {
        let mut x = *state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        *state = x;
        x
    }

    fn roundtrip_numbers(len: usize, seed: u32) {
        let mut state = seed;
        let mut values = Vec::with_capacity(len);
        let mut enc = RangeEncoder::new();
        for _ in 0..len {
            let max = 1 + (xorshift32(&mut state) % 42);
            let value = xorshift32(&mut state) % max;
            values.push((value, max));
            enc.write_number(max, value);
        }
        let bytes = enc.finish();
        let mut dec = RangeDecoder::new(bytes);
        for (value, max) in values {
            assert_eq!(dec.read_number(max), value);
        }
        assert!(dec.is_healthy());
    }

    #[test]
    fn roundtrip_various_lengths() {
        for &len in &[10usize, 30, 50, 70, 90] {
            roundtrip_numbers(len, 0x1234_5678 ^ len as u32);
        }
    }

    #[test]
    fn roundtrip_large() {
        roundtrip_numbers(10_000_000, 0xDEAD_BEEF);
    }

    #[test]
    fn size_roundtrip() {
        for v in 8u32..=2048 {
            let mut enc = RangeEncoder::new();
            enc.write_size(v);
            let bytes = enc.finish();
            let mut dec = RangeDecoder::new(bytes);
            assert_eq!(dec.read_size(), v, "v = {v}");
        }
    }
}

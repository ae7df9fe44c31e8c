//! Image dimensions plus the small bag of tuning knobs that drive angle
//! resolution, the level schedule, the line limit and color quantization.
//! Self-describing on the wire (see `SPEC_FULL.md` §6).

use crate::rangecoder::{bit_cost, SymbolReader, SymbolWriter};
use crate::region::Region;
use crate::sincos;

/// Two node kinds only: a flat fill, or a half-plane split into two
/// children. Modeled as constants rather than an enum with payload so the
/// wire `(type, NodeType::COUNT)` pair reads the same way the reference
/// writes it.
pub mod node_type {
    pub const FILL: u32 = 0;
    pub const HALF_PLANE: u32 = 1;
    pub const COUNT: u32 = 2;
}

const MAX_LEVEL: usize = 7;
const MAX_F1: u32 = 4;
const MAX_F2: u32 = 5;
const MAX_F3: u32 = 5;
const MAX_F4: u32 = 5;
const SCALE_STEP_FACTOR: i32 = 40;
const BASE_SCALE_FACTOR: i32 = 36;

pub const MAX_LINE_LIMIT: u32 = 63;
pub const MAX_COLOR_CODE: u32 = 17;
pub const MAX_PARTITION_CODE: u32 = MAX_F1 * MAX_F2 * MAX_F3 * MAX_F4;

/// Color codes below this select a fixed per-channel grid; codes at or
/// above it select a palette, with the low-order bits giving its size.
///
/// The reference's surviving sources disagree on the exact boundary (an
/// older `codec_params.cc` never grew a palette branch at all); this value
/// is this implementation's resolution of that gap, recorded in
/// `DESIGN.md`.
pub const NUM_COLOR_QUANT_OPTIONS: u32 = 13;

#[derive(Clone, Debug)]
pub struct CodecParams {
    pub width: u32,
    pub height: u32,
    params: [u32; 4],
    level_scale: [i32; MAX_LEVEL],
    pub angle_bits: [u32; MAX_LEVEL],
    pub line_limit: u32,
    pub color_code: u32,
    pub color_quant: u32,
    pub palette_size: u32,
}

impl CodecParams {
    pub fn new(width: u32, height: u32) -> CodecParams {
        let mut cp = CodecParams {
            width,
            height,
            params: [0; 4],
            level_scale: [0; MAX_LEVEL],
            angle_bits: [0; MAX_LEVEL],
            line_limit: MAX_LINE_LIMIT,
            color_code: 0,
            color_quant: 0,
            palette_size: 0,
        };
        cp.set_partition_params([0, 0, 0, 0]);
        cp.set_color_code(0);
        cp
    }

    pub const fn line_quant(&self) -> i32 {
        sincos::ONE
    }

    pub fn make_color_quant(code: u32) -> u32 {
        1 + ((4 + (code & 3)) << (code >> 2))
    }

    pub fn dequantize_color(v: u32, q: u32) -> u32 {
        (255 * v + q - 2) / (q - 1)
    }

    pub fn set_color_code(&mut self, code: u32) {
        self.color_code = code;
        if code < NUM_COLOR_QUANT_OPTIONS {
            self.color_quant = Self::make_color_quant(code);
            self.palette_size = 0;
        } else {
            self.color_quant = 0;
            self.palette_size = 1 << (code - NUM_COLOR_QUANT_OPTIONS + 1);
        }
    }

    fn split_code(code: u32) -> [u32; 4] {
        let mut code = code;
        let mut result = [0u32; 4];
        result[0] = code % MAX_F1;
        code /= MAX_F1;
        result[1] = code % MAX_F2;
        code /= MAX_F2;
        result[2] = code % MAX_F3;
        code /= MAX_F3;
        result[3] = code % MAX_F4;
        result
    }

    pub fn set_partition_code(&mut self, code: u32) {
        self.set_partition_params(Self::split_code(code));
    }

    fn set_partition_params(&mut self, params: [u32; 4]) {
        self.params = params;
        let f1 = params[0] as i64;
        let f2 = params[1] as i32 + 2;
        let f3 = 10f64.powf(3.0 - params[2] as f64 / 5.0).round() as i32;
        let f4 = params[3] as i64;

        // Matches the reference's `int32_t scale` exactly, including its
        // silent 32-bit wraparound for larger images — the level schedule
        // (and therefore angle_bits and the bitstream) depends on it.
        let mut scale = (self.width as i32)
            .wrapping_mul(self.width as i32)
            .wrapping_add((self.height as i32).wrapping_mul(self.height as i32))
            .wrapping_mul(f2)
            .wrapping_mul(f2);
        for slot in self.level_scale.iter_mut() {
            *slot = scale.wrapping_div(BASE_SCALE_FACTOR);
            scale = scale.wrapping_mul(SCALE_STEP_FACTOR).wrapping_div(f3);
        }

        let bits = sincos::MAX_ANGLE_BITS as i64 - f1;
        for (i, slot) in self.angle_bits.iter_mut().enumerate() {
            let i = i as i64;
            *slot = (bits - i - (i * f4) / 2).max(0) as u32;
        }
    }

    /// Smallest `i` such that the region's bounding-box diagonal^2 is at
    /// least `level_scale[i]`, else `MAX_LEVEL - 1`.
    pub fn level(&self, region: &Region) -> Option<u32> {
        if region.is_empty() {
            return None;
        }
        let mut min_y = self.height as i64 + 1;
        let mut max_y = -1i64;
        let mut min_x = self.width as i64 + 1;
        let mut max_x = -1i64;
        for i in 0..region.len() {
            min_y = min_y.min(region.y[i] as i64);
            max_y = max_y.max(region.y[i] as i64);
            min_x = min_x.min(region.x0[i] as i64);
            max_x = max_x.max(region.x1[i] as i64);
        }
        let dx = max_x - min_x;
        let dy = max_y + 1 - min_y;
        let d = dx * dx + dy * dy;
        for (i, &scale) in self.level_scale.iter().enumerate() {
            if d >= scale as i64 {
                return Some(i as u32);
            }
        }
        Some((MAX_LEVEL - 1) as u32)
    }

    /// Approximate header-bits fudge factor used as a fixed subtrahend in
    /// the partition builder's bit budget (§4.4); not the literal bit cost
    /// of an actual `write()` (see `calculate_image_tax` for that).
    pub fn get_tax(&self) -> f32 {
        let k_tax = MAX_PARTITION_CODE as u64 * MAX_LINE_LIMIT as u64 * MAX_COLOR_CODE as u64;
        bit_cost(k_tax as u32)
    }

    pub fn write<W: SymbolWriter>(&self, dst: &mut W) {
        dst.write_size(self.width);
        dst.write_size(self.height);
        dst.write_number(MAX_F1, self.params[0]);
        dst.write_number(MAX_F2, self.params[1]);
        dst.write_number(MAX_F3, self.params[2]);
        dst.write_number(MAX_F4, self.params[3]);
        dst.write_number(MAX_LINE_LIMIT, self.line_limit - 1);
        dst.write_number(MAX_COLOR_CODE, self.color_code);
    }

    pub fn read<R: SymbolReader>(src: &mut R) -> CodecParams {
        let width = src.read_size();
        let height = src.read_size();
        let mut cp = CodecParams::new(width, height);
        let params = [
            src.read_number(MAX_F1),
            src.read_number(MAX_F2),
            src.read_number(MAX_F3),
            src.read_number(MAX_F4),
        ];
        cp.set_partition_params(params);
        cp.line_limit = src.read_number(MAX_LINE_LIMIT) + 1;
        cp.set_color_code(src.read_number(MAX_COLOR_CODE));
        cp
    }
}

/// The literal bit cost of the header a freshly constructed `CodecParams`
/// for a `width x height` image would write, summing `log2(max)` over every
/// `(value, max)` pair `write()` emits.
pub fn calculate_image_tax(width: u32, height: u32) -> f32 {
    write_size_cost(width) + write_size_cost(height)
        + bit_cost(MAX_F1)
        + bit_cost(MAX_F2)
        + bit_cost(MAX_F3)
        + bit_cost(MAX_F4)
        + bit_cost(MAX_LINE_LIMIT)
        + bit_cost(MAX_COLOR_CODE)
}

fn write_size_cost(value: u32) -> f32 {
    let mut value = value - 8;
    let mut chunks: u32 = 2;
    while value >= (1u32 << (chunks * 3)) {
        value -= 1u32 << (chunks * 3);
        chunks += 1;
    }
    let continuation_bits = chunks.saturating_sub(2);
    (chunks as f32) * bit_cost(8) + (continuation_bits as f32) * bit_cost(2) + bit_cost(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rangecoder::xrange::{XRangeDecoder, XRangeEncoder};

    #[test]
    fn header_roundtrip() {
        let mut cp = CodecParams::new(123, 45);
        cp.set_partition_code(77);
        cp.line_limit = 31;
        cp.set_color_code(9);
        let mut enc = XRangeEncoder::new();
        cp.write(&mut enc);
        let bytes = enc.finish();
        let mut dec = XRangeDecoder::new(bytes);
        let back = CodecParams::read(&mut dec);
        assert_eq!(back.width, 123);
        assert_eq!(back.height, 45);
        assert_eq!(back.line_limit, 31);
        assert_eq!(back.color_code, 9);
        assert_eq!(back.color_quant, cp.color_quant);
        assert_eq!(back.angle_bits, cp.angle_bits);
    }

    #[test]
    fn image_tax_matches_literal_header_cost() {
        let cp = CodecParams::new(8, 8);
        let mut enc = XRangeEncoder::new();
        // Mirror write() field-by-field so we can sum log2(max) for each
        // pair exactly as the spec's testable property describes, instead
        // of trusting XRangeEncoder's internal entry buffer.
        let mut total = 0.0f32;
        struct Counter(f32);
        impl SymbolWriter for Counter {
            fn write_number(&mut self, max: u32, _value: u32) {
                if max > 1 {
                    self.0 += bit_cost(max);
                }
            }
        }
        let mut counter = Counter(0.0);
        cp.write(&mut counter);
        total += counter.0;
        let _ = &mut enc;
        assert!((total - calculate_image_tax(8, 8)).abs() < 1e-3);
    }

    #[test]
    fn color_code_selects_grid_or_palette() {
        let mut cp = CodecParams::new(16, 16);
        cp.set_color_code(0);
        assert_eq!(cp.palette_size, 0);
        assert!(cp.color_quant >= 1);
        cp.set_color_code(NUM_COLOR_QUANT_OPTIONS);
        assert_eq!(cp.palette_size, 2);
        cp.set_color_code(MAX_COLOR_CODE - 1);
        assert_eq!(cp.palette_size, 16);
    }
}

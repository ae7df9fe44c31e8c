//! Fixed-point trigonometric tables used to turn an angle code into the
//! (nx, ny) direction of a half-plane cut.

use std::f64::consts::PI;
use std::sync::OnceLock;

/// Fixed-point unit: `kOne` in the reference. `sin`/`cos` tables are scaled
/// by this factor and stored as integers.
pub const ONE: i32 = 1 << 18;

pub const MAX_ANGLE_BITS: u32 = 9;
/// Number of distinct angle codes; angle code `i` maps to `pi * i / MAX_ANGLE`.
pub const MAX_ANGLE: usize = 1 << MAX_ANGLE_BITS;

pub struct SinCosTable {
    /// round(ONE * sin(pi * i / MAX_ANGLE)); always non-negative.
    pub sin: Vec<i32>,
    /// round(ONE * cos(pi * i / MAX_ANGLE)); positive for i < MAX_ANGLE/2.
    pub cos: Vec<i32>,
    /// 1.0 / sin[i], undefined (0.0) at i == 0.
    pub inv_sin: Vec<f64>,
    /// -cos[i] / sin[i].
    pub minus_cot: Vec<f32>,
    /// log2(i) for i in [0, 2048], with log2(0) defined as 0.0.
    pub log2: Vec<f32>,
    /// 2^(i/3) for i in [0, 34).
    pub pow2: Vec<u16>,
}

static TABLE: OnceLock<SinCosTable> = OnceLock::new();

pub fn table() -> &'static SinCosTable {
    TABLE.get_or_init(|| {
        let mut sin = vec![0i32; MAX_ANGLE];
        let mut cos = vec![0i32; MAX_ANGLE];
        for i in 0..MAX_ANGLE {
            let theta = PI * (i as f64) / (MAX_ANGLE as f64);
            sin[i] = (ONE as f64 * theta.sin()).round() as i32;
            cos[i] = (ONE as f64 * theta.cos()).round() as i32;
        }
        let mut inv_sin = vec![0.0f64; MAX_ANGLE];
        for i in 1..MAX_ANGLE {
            inv_sin[i] = 1.0 / (sin[i] as f64);
        }
        let mut minus_cot = vec![0.0f32; MAX_ANGLE];
        for i in 0..MAX_ANGLE {
            minus_cot[i] = (-cos[i] as f64 * inv_sin[i]) as f32;
        }
        let mut log2 = vec![0.0f32; 2049];
        for i in 1..log2.len() {
            log2[i] = (i as f32).log2();
        }
        let mut pow2 = vec![0u16; 34];
        for (i, slot) in pow2.iter_mut().enumerate() {
            *slot = 2f64.powf(i as f64 / 3.0).round() as u16;
        }
        SinCosTable { sin, cos, inv_sin, minus_cot, log2, pow2 }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn sin_table_crc() {
        let t = table();
        let mut crc = test_support::init();
        for &v in &t.sin {
            crc = test_support::update(crc, (v & 0xFF) as u8);
        }
        assert_eq!(test_support::finish(crc), "9486473C3841E28F");
    }

    #[test]
    fn cos_table_crc() {
        let t = table();
        let mut crc = test_support::init();
        for &v in &t.cos {
            crc = test_support::update(crc, (v & 0xFF) as u8);
        }
        assert_eq!(test_support::finish(crc), "A32700985A177AE9");
    }

    #[test]
    fn sin_is_nonnegative_and_cos_changes_sign_at_midpoint() {
        let t = table();
        assert!(t.sin.iter().all(|&v| v >= 0));
        assert!(t.cos[0] > 0);
        assert!(t.cos[MAX_ANGLE / 2] <= 0);
    }
}

//! Scanline-compact polygon representation and the half-plane split
//! primitive that drives the partition search.

use crate::sincos;

/// A region as a row-ordered set of `(y, x0, x1)` scanline slices.
///
/// The reference backs all three columns with one shared, SIMD-padded
/// buffer; a safe Rust port has no need to share storage across columns for
/// correctness, so this keeps three plain `Vec<i32>` instead (see
/// `SPEC_FULL.md`'s note on the "raw-float statistics bundle" for the same
/// tradeoff elsewhere).
#[derive(Clone, Debug, Default)]
pub struct Region {
    pub y: Vec<i32>,
    pub x0: Vec<i32>,
    pub x1: Vec<i32>,
}

impl Region {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Region {
            y: Vec::with_capacity(cap),
            x0: Vec::with_capacity(cap),
            x1: Vec::with_capacity(cap),
        }
    }

    /// The whole-image region: one full-width row per scanline.
    pub fn full(width: u32, height: u32) -> Self {
        let mut region = Region::with_capacity(height as usize);
        for y in 0..height as i32 {
            region.y.push(y);
            region.x0.push(0);
            region.x1.push(width as i32);
        }
        region
    }

    pub fn pixel_count(&self) -> u64 {
        self.y
            .iter()
            .zip(self.x0.iter())
            .zip(self.x1.iter())
            .map(|((_, &x0), &x1)| (x1 - x0) as u64)
            .sum()
    }

    /// Splits along the oriented half-plane `ny*y + nx*x >= d`.
    pub fn split_line(&self, angle: i32, d: i32) -> (Region, Region) {
        let table = sincos::table();
        let nx = table.sin[angle as usize];
        let ny = table.cos[angle as usize];

        let mut left = Region::with_capacity(self.len());
        let mut right = Region::with_capacity(self.len());

        if nx == 0 {
            for i in 0..self.len() {
                let y = self.y[i];
                let x0 = self.x0[i];
                let x1 = self.x1[i];
                if (y as i64) * (ny as i64) >= d as i64 {
                    left.y.push(y);
                    left.x0.push(x0);
                    left.x1.push(x1);
                } else {
                    right.y.push(y);
                    right.x0.push(x0);
                    right.x1.push(x1);
                }
            }
        } else {
            let d = 2 * (d as i64) + nx as i64;
            let ny = 2 * ny as i64;
            let nx = 2 * nx as i64;
            for i in 0..self.len() {
                let y = self.y[i];
                let x0 = self.x0[i];
                let x1 = self.x1[i];
                let x = ((d - y as i64 * ny) / nx) as i32;
                if x < x1 {
                    left.y.push(y);
                    left.x0.push(x.max(x0));
                    left.x1.push(x1);
                }
                if x > x0 {
                    right.y.push(y);
                    right.x0.push(x0);
                    right.x1.push(x.min(x1));
                }
            }
        }

        (left, right)
    }
}

//! Per-image integral image of RGB and pixel-count (`UberCache`), and the
//! per-region scratch buffers the subdivision search reuses across angles
//! and lines (`Cache`).

use crate::codec_params::MAX_LINE_LIMIT;
use crate::image::Image;
use crate::region::Region;

/// `(sum_r, sum_g, sum_b, pixel_count)`, grouped so componentwise arithmetic
/// reads as one unit — the natural target for a later SIMD pass, per
/// `SPEC_FULL.md`'s note on the raw-float statistics bundle.
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Stats {
    pub values: [f32; 4],
}

impl Stats {
    pub fn rgb(&self, c: usize) -> f32 {
        self.values[c]
    }

    pub fn count(&self) -> f32 {
        self.values[3]
    }

    pub fn diff(plus: &Stats, minus: &Stats) -> Stats {
        let mut out = Stats::default();
        for i in 0..4 {
            out.values[i] = plus.values[i] - minus.values[i];
        }
        out
    }
}

/// Row-by-row prefix sums of `(r, g, b, 1)` with a zero column prepended,
/// so the sum of any horizontal run `[x0, x1)` on row `y` is one
/// subtraction: `sum[y][x1] - sum[y][x0]`.
pub struct UberCache {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub sum: Vec<f32>,
    /// Sum of squared per-channel pixel values; rebaselines the variant
    /// driver's reported squared error (the constant `sum(orig^2)` term
    /// the quantization scorer omits).
    pub rgb2: [f32; 3],
}

impl UberCache {
    pub fn new(src: &Image) -> UberCache {
        let width = src.width as usize;
        let height = src.height as usize;
        let stride = 4 * (width + 1);
        let mut sum = vec![0.0f32; stride * height];
        let mut rgb2 = [0.0f32; 3];

        for y in 0..height {
            let mut row_rgb2 = [0.0f32; 3];
            let src_row = y * width;
            let dst_row = y * stride;
            for i in 0..4 {
                sum[dst_row + i] = 0.0;
            }
            for x in 0..width {
                let dst = dst_row + 4 * x;
                let r = src.r[src_row + x] as f32;
                let g = src.g[src_row + x] as f32;
                let b = src.b[src_row + x] as f32;
                sum[dst + 4] = sum[dst] + r;
                sum[dst + 5] = sum[dst + 1] + g;
                sum[dst + 6] = sum[dst + 2] + b;
                sum[dst + 7] = sum[dst + 3] + 1.0;
                row_rgb2[0] += r * r;
                row_rgb2[1] += g * g;
                row_rgb2[2] += b * b;
            }
            for c in 0..3 {
                rgb2[c] += row_rgb2[c];
            }
        }

        UberCache { width: src.width, height: src.height, stride, sum, rgb2 }
    }
}

/// Per-region scratch reused across every angle and line tried by
/// `Fragment::find_best_subdivision`.
pub struct Cache<'a> {
    pub uber: &'a UberCache,
    pub plus: Stats,
    pub minus: Stats,
    /// Scratch indexed by line index during the subdivision search; sized
    /// for the largest possible `num_lines` plus the two sentinel slots the
    /// search writes around it.
    pub stats: Vec<Stats>,

    pub(crate) count: usize,
    pub(crate) row_offset: Vec<i32>,
    pub(crate) y: Vec<f32>,
    pub(crate) x0: Vec<i32>,
    pub(crate) x1: Vec<i32>,
    pub(crate) x: Vec<i32>,
}

impl<'a> Cache<'a> {
    pub fn new(uber: &'a UberCache) -> Cache<'a> {
        let h = uber.height as usize;
        Cache {
            uber,
            plus: Stats::default(),
            minus: Stats::default(),
            stats: vec![Stats::default(); MAX_LINE_LIMIT as usize + 3],
            count: 0,
            row_offset: vec![0; h],
            y: vec![0.0; h],
            x0: vec![0; h],
            x1: vec![0; h],
            x: vec![0; h],
        }
    }

    pub fn prepare(&mut self, region: &Region) {
        let count = region.len();
        for i in 0..count {
            let row = region.y[i];
            self.y[i] = row as f32;
            self.x0[i] = region.x0[i];
            self.x1[i] = region.x1[i];
            self.row_offset[i] = row * self.uber.stride as i32;
        }
        self.count = count;
    }

    pub fn row_count(&self) -> usize {
        self.count
    }

    /// Sums `sum[row_offset[i] + 4*xs[i]]` across all rows: `xs` holds plain
    /// x coordinates (used for the region's own `x0`/`x1` columns).
    pub fn sum_relative(&self, xs: &[i32]) -> Stats {
        let mut acc = [0.0f32; 4];
        for i in 0..self.count {
            let offset = (self.row_offset[i] + 4 * xs[i]) as usize;
            for c in 0..4 {
                acc[c] += self.uber.sum[offset + c];
            }
        }
        Stats { values: acc }
    }

    /// Sums `sum[xs[i]]` directly: `xs` already holds the absolute
    /// `4*x + row_offset` position written by `update_ge`.
    pub fn sum_absolute(&self, xs: &[i32]) -> Stats {
        let mut acc = [0.0f32; 4];
        for i in 0..self.count {
            let offset = xs[i] as usize;
            for c in 0..4 {
                acc[c] += self.uber.sum[offset + c];
            }
        }
        Stats { values: acc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::region::Region;

    #[test]
    fn row_sums_match_a_hand_filled_image() {
        let mut image = Image::new(3, 2);
        // Row 0: 1,2,3 ; Row 1: 4,5,6
        image.r = vec![1, 2, 3, 4, 5, 6];
        let uber = UberCache::new(&image);
        let mut cache = Cache::new(&uber);
        let region = Region::full(3, 2);
        cache.prepare(&region);
        let whole = cache.sum_relative(&cache.x1.clone());
        assert_eq!(whole.rgb(0), 1.0 + 2.0 + 3.0 + 4.0 + 5.0 + 6.0);
        assert_eq!(whole.count(), 6.0);
    }

    #[test]
    fn rgb2_sums_squares_across_whole_image() {
        let mut image = Image::new(2, 1);
        image.r = vec![3, 4];
        let uber = UberCache::new(&image);
        assert_eq!(uber.rgb2[0], 9.0 + 16.0);
    }

    #[test]
    fn relative_and_absolute_sums_agree_on_full_width() {
        let mut image = Image::new(4, 3);
        image.g = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let uber = UberCache::new(&image);
        let mut cache = Cache::new(&uber);
        let region = Region::full(4, 3);
        cache.prepare(&region);
        let via_relative = cache.sum_relative(&cache.x1.clone());
        let absolute_x: Vec<i32> =
            (0..cache.row_count()).map(|i| 4 * cache.x1[i] + cache.row_offset[i]).collect();
        let via_absolute = cache.sum_absolute(&absolute_x);
        assert_eq!(via_relative.rgb(1), via_absolute.rgb(1));
    }
}

//! A node in the partition tree, and the per-leaf "best cut" evaluator.

use crate::codec_params::CodecParams;
use crate::distance_range::DistanceRange;
use crate::region::Region;
use crate::sincos;
use crate::ubercache::{Cache, Stats};

/// Between-class-variance split score: zero if either side is empty.
pub fn score(whole: &Stats, left: &Stats, right: &Stats) -> f32 {
    if left.count() <= 0.0 || right.count() <= 0.0 {
        return 0.0;
    }
    let mut acc = 0.0f32;
    for c in 0..3 {
        let left_avg = left.rgb(c) / left.count();
        let right_avg = right.rgb(c) / right.count();
        let delta = left_avg - right_avg;
        acc += delta * delta;
    }
    acc * left.count() * right.count() / whole.count()
}

fn update_ge(cache: &mut Cache, angle: i32, d: i32) {
    let table = sincos::table();
    let count = cache.row_count();
    if angle == 0 {
        let ny = table.cos[0];
        let dny = d as f32 / ny as f32;
        for i in 0..count {
            let y = cache.y[i];
            let x = if y < dny { cache.x1[i] } else { cache.x0[i] };
            cache.x[i] = 4 * x + cache.row_offset[i];
        }
    } else {
        let m_ny_nx = table.minus_cot[angle as usize];
        let d_nx = (d as f64 * table.inv_sin[angle as usize] + 0.5) as f32;
        for i in 0..count {
            let y = cache.y[i];
            let xf = y * m_ny_nx + d_nx;
            let xi = xf as i32;
            let x = xi.clamp(cache.x0[i], cache.x1[i]);
            cache.x[i] = 4 * x + cache.row_offset[i];
        }
    }
}

/// A node in the partition tree.
///
/// Children are referenced by index into the arena (`Partition::fragments`)
/// that owns every `Fragment`, rather than by `Box` — the partition builder
/// needs to hold a fragment's index in a priority queue while still being
/// able to mutate the arena, which a tree of owned boxes can't do without
/// unsafe aliasing.
pub struct Fragment {
    pub region: Region,
    pub left_child: Option<usize>,
    pub right_child: Option<usize>,

    pub stats: Stats,

    /// Assigned by the partition builder in admission order; `u32::MAX`
    /// until then. A fragment with `ordinal >= num_non_leaf` is a leaf of
    /// the final serialized tree.
    pub ordinal: u32,
    pub level: u32,
    pub best_angle_code: u32,
    pub best_line: u32,
    pub best_score: f32,
    pub best_num_lines: u32,
    pub best_cost: f32,
}

impl Fragment {
    pub fn new(region: Region) -> Fragment {
        Fragment {
            region,
            left_child: None,
            right_child: None,
            stats: Stats::default(),
            ordinal: u32::MAX,
            level: 0,
            best_angle_code: 0,
            best_line: 0,
            best_score: -1.0,
            best_num_lines: 0,
            best_cost: -1.0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left_child.is_none()
    }

    /// Picks, for this leaf's region, the `(angle_code, line)` maximizing
    /// the split score; caches the result and, when a positive-score cut
    /// exists, returns the two child regions (the caller is responsible for
    /// inserting them into the arena and wiring up `left_child`/`right_child`).
    pub fn find_best_subdivision(&mut self, cache: &mut Cache, cp: &CodecParams) -> Option<(Region, Region)> {
        let level = cp.level(&self.region).expect("fragment region must be non-empty");
        let angle_max = 1u32 << cp.angle_bits[level as usize];
        let angle_mult = (sincos::MAX_ANGLE as u32) / angle_max;

        cache.prepare(&self.region);
        let plus = cache.sum_relative(&cache.x1.clone());
        let minus = cache.sum_relative(&cache.x0.clone());
        let stats = Stats::diff(&plus, &minus);
        cache.plus = plus;
        cache.minus = minus;

        let mut best_angle_code = 0u32;
        let mut best_line = 0u32;
        let mut best_score = -1.0f32;

        for angle_code in 0..angle_max {
            let angle = (angle_code * angle_mult) as i32;
            let distance_range = DistanceRange::new(&self.region, angle, cp);
            let num_lines = distance_range.num_lines;
            cache.stats[0] = Stats::default();
            for line in 0..num_lines {
                update_ge(cache, angle, distance_range.distance(line));
                let x = cache.x.clone();
                let minus = cache.sum_absolute(&x);
                cache.stats[(line + 1) as usize] = Stats::diff(&cache.plus, &minus);
            }
            cache.stats[(num_lines + 1) as usize] = stats;

            for line in 0..num_lines {
                let left = &cache.stats[(line + 1) as usize];
                let right = Stats::diff(&stats, left);
                let full_score = score(&stats, left, &right);
                if full_score > best_score {
                    best_angle_code = angle_code;
                    best_line = line;
                    best_score = full_score;
                }
            }
        }

        self.level = level;
        self.best_score = best_score;
        self.stats = stats;

        // A cut whose score doesn't clear a small noise floor is treated as
        // no split at all: a perfectly flat region's candidate scores are
        // mathematically zero but can drift a hair above it from float
        // summation order, and 0.5 (in squared-color-times-pixel-count
        // units, where a real split clears it by orders of magnitude) is
        // the reference's own floor for "not actually a split".
        if best_score < 0.5 {
            self.best_score = -1.0;
            self.best_cost = -1.0;
            return None;
        }

        let angle = (best_angle_code * angle_mult) as i32;
        let distance_range = DistanceRange::new(&self.region, angle, cp);
        let (left, right) = self.region.split_line(angle, distance_range.distance(best_line));

        self.best_angle_code = best_angle_code;
        self.best_num_lines = distance_range.num_lines;
        self.best_line = best_line;
        self.best_cost = crate::rangecoder::bit_cost(
            crate::codec_params::node_type::COUNT * angle_max * distance_range.num_lines,
        );

        Some((left, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::ubercache::UberCache;

    #[test]
    fn subdivision_finds_a_positive_score_on_a_two_color_image() {
        let mut image = Image::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                let idx = y * 16 + x;
                if x < 8 {
                    image.r[idx] = 10;
                } else {
                    image.r[idx] = 240;
                }
            }
        }
        let uber = UberCache::new(&image);
        let mut cache = Cache::new(&uber);
        let cp = CodecParams::new(16, 16);
        let mut root = Fragment::new(Region::full(16, 16));
        let children = root.find_best_subdivision(&mut cache, &cp);
        assert!(root.best_score > 0.0);
        assert!(children.is_some());
        assert!(root.best_cost > 0.0);
    }

    #[test]
    fn flat_image_has_no_useful_split() {
        let image = Image::new(16, 16);
        let uber = UberCache::new(&image);
        let mut cache = Cache::new(&uber);
        let cp = CodecParams::new(16, 16);
        let mut root = Fragment::new(Region::full(16, 16));
        let children = root.find_best_subdivision(&mut cache, &cp);
        assert!(root.best_score <= 0.0);
        assert!(root.best_cost < 0.0);
        assert!(children.is_none());
    }
}

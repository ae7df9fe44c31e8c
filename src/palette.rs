//! Per-leaf color selection: either a fixed per-channel quantization grid,
//! or a k-means palette fit over the leaves' average colors.

use crate::codec_params::CodecParams;
use crate::partition::Partition;
use crate::ubercache::Stats;

/// A fast, deterministic, non-cryptographic PRNG used only to seed k-means.
/// Any deterministic seeding is acceptable here (see `SPEC_FULL.md` §9); this
/// implementation does not reproduce either reference RNG variant bit-for-bit.
struct Xorshift32(u32);

impl Xorshift32 {
    fn new(seed: u32) -> Xorshift32 {
        Xorshift32(if seed == 0 { 0x9E3779B9 } else { seed })
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f32) / (u32::MAX as f32)
    }
}

/// The average color and pixel weight of one leaf, as fed into k-means.
#[derive(Clone, Copy, Debug)]
pub struct Patch {
    pub color: [f32; 3],
    pub weight: f32,
}

/// Walks the partition's admission order, unfolding splits one at a time
/// from the root, to recover exactly which fragments are leaves when only
/// the first `num_non_leaf` admitted splits are kept.
pub fn leaves_for_split_count(partition: &Partition, num_non_leaf: usize) -> Vec<usize> {
    let mut leaves = vec![partition.root];
    for &idx in partition.admission_order.iter().take(num_non_leaf) {
        let pos = leaves.iter().position(|&l| l == idx).expect("split node must be a current leaf");
        leaves.swap_remove(pos);
        let fragment = &partition.fragments[idx];
        leaves.push(fragment.left_child.expect("admitted node has children"));
        leaves.push(fragment.right_child.expect("admitted node has children"));
    }
    leaves
}

pub fn gather_patches(partition: &Partition, leaves: &[usize]) -> Vec<Patch> {
    leaves
        .iter()
        .filter_map(|&idx| {
            let stats = &partition.fragments[idx].stats;
            let count = stats.count();
            if count <= 0.0 {
                return None;
            }
            Some(Patch {
                color: [stats.rgb(0) / count, stats.rgb(1) / count, stats.rgb(2) / count],
                weight: count,
            })
        })
        .collect()
}

fn squared_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let mut d = 0.0f32;
    for c in 0..3 {
        let diff = a[c] - b[c];
        d += diff * diff;
    }
    d
}

/// Nearest palette entry to `color`, by squared Euclidean distance.
pub fn choose_color(color: [f32; 3], palette: &[[u8; 3]]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f32::INFINITY;
    for (i, &entry) in palette.iter().enumerate() {
        let entry_f = [entry[0] as f32, entry[1] as f32, entry[2] as f32];
        let d = squared_distance(color, entry_f);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// k-means++ seeding followed by Lloyd iteration to convergence, rounding
/// final centers to integer color components.
pub fn build_palette(patches: &[Patch], m: usize, seed: u32) -> Vec<[u8; 3]> {
    assert!(!patches.is_empty());
    assert!(m >= 1);
    let mut rng = Xorshift32::new(seed);

    let mut centers: Vec<[f32; 3]> = Vec::with_capacity(m);

    let total_weight: f32 = patches.iter().map(|p| p.weight).sum();
    let pick_weighted = |rng: &mut Xorshift32, weights: &[f32], total: f32| -> usize {
        let mut target = rng.next_f32() * total;
        for (i, &w) in weights.iter().enumerate() {
            if target < w {
                return i;
            }
            target -= w;
        }
        weights.len() - 1
    };

    let first = pick_weighted(&mut rng, &patches.iter().map(|p| p.weight).collect::<Vec<_>>(), total_weight);
    centers.push(patches[first].color);

    while centers.len() < m && centers.len() < patches.len() {
        let weights: Vec<f32> = patches
            .iter()
            .map(|p| {
                let nearest = centers
                    .iter()
                    .map(|&c| squared_distance(p.color, c))
                    .fold(f32::INFINITY, f32::min);
                p.weight * nearest
            })
            .collect();
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            break;
        }
        let pick = pick_weighted(&mut rng, &weights, total);
        centers.push(patches[pick].color);
    }

    let mut last_score = f32::INFINITY;
    loop {
        let mut sums = vec![[0.0f32; 3]; centers.len()];
        let mut weights = vec![0.0f32; centers.len()];
        let mut score = 0.0f32;

        for patch in patches {
            let mut best = 0usize;
            let mut best_dist = f32::INFINITY;
            for (i, &c) in centers.iter().enumerate() {
                let d = squared_distance(patch.color, c);
                if d < best_dist {
                    best_dist = d;
                    best = i;
                }
            }
            score += patch.weight * best_dist;
            for c in 0..3 {
                sums[best][c] += patch.weight * patch.color[c];
            }
            weights[best] += patch.weight;
        }

        for i in 0..centers.len() {
            if weights[i] > 0.0 {
                for c in 0..3 {
                    centers[i][c] = sums[i][c] / weights[i];
                }
            }
            // Orphaned centers (weight == 0) are left where they were.
        }

        if last_score - score < 1.0 {
            break;
        }
        last_score = score;
    }

    centers
        .into_iter()
        .map(|c| [c[0].round() as u8, c[1].round() as u8, c[2].round() as u8])
        .collect()
}

/// A leaf's average color, from its accumulated stats.
pub fn leaf_avg(stats: &Stats) -> [f32; 3] {
    let count = stats.count().max(1.0);
    [stats.rgb(0) / count, stats.rgb(1) / count, stats.rgb(2) / count]
}

/// Per-channel fixed-grid quantization indices (each in `[0, q)`) for an
/// average color; the value the serializer writes to the wire.
pub fn quantize_channels(avg: [f32; 3], q: u32) -> [u32; 3] {
    let mut out = [0u32; 3];
    for c in 0..3 {
        out[c] = ((avg[c] * (q - 1) as f32 / 255.0).round() as u32).min(q - 1);
    }
    out
}

/// The float color a leaf's average will be encoded as, under the codec
/// params' current color mode.
pub fn leaf_color(stats: &Stats, cp: &CodecParams, palette: Option<&[[u8; 3]]>) -> [f32; 3] {
    let avg = leaf_avg(stats);
    match palette {
        Some(p) if !p.is_empty() => {
            let idx = choose_color(avg, p);
            [p[idx][0] as f32, p[idx][1] as f32, p[idx][2] as f32]
        }
        _ => {
            let q = cp.color_quant;
            let channels = quantize_channels(avg, q);
            let mut out = [0.0f32; 3];
            for c in 0..3 {
                out[c] = CodecParams::dequantize_color(channels[c], q) as f32;
            }
            out
        }
    }
}

/// Relative quantization error for a candidate leaf set and color
/// assignment; omits the image's constant `sum(orig^2)` term (carried by
/// `UberCache::rgb2`), since that term is identical across every variant
/// competing for the same image. `+inf` when there's nothing to compare
/// (zero or one leaf never benefits from a palette).
pub fn simulate_encode(partition: &Partition, leaves: &[usize], colors: &[[f32; 3]]) -> f32 {
    if leaves.len() <= 1 {
        return f32::INFINITY;
    }
    let mut acc = 0.0f32;
    for (&idx, &color) in leaves.iter().zip(colors.iter()) {
        let stats = &partition.fragments[idx].stats;
        let count = stats.count();
        if count <= 0.0 {
            continue;
        }
        let avg = [stats.rgb(0) / count, stats.rgb(1) / count, stats.rgb(2) / count];
        for c in 0..3 {
            acc += count * (color[c] * color[c] - 2.0 * color[c] * avg[c]);
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kmeans_recovers_two_well_separated_clusters() {
        let patches = vec![
            Patch { color: [10.0, 10.0, 10.0], weight: 5.0 },
            Patch { color: [12.0, 9.0, 11.0], weight: 5.0 },
            Patch { color: [240.0, 240.0, 240.0], weight: 5.0 },
            Patch { color: [238.0, 241.0, 239.0], weight: 5.0 },
        ];
        let palette = build_palette(&patches, 2, 42);
        assert_eq!(palette.len(), 2);
        let dist_to_dark = (palette[0][0] as i32 - 11).abs() + (palette[1][0] as i32 - 11).abs();
        let dist_to_light = (palette[0][0] as i32 - 239).abs() + (palette[1][0] as i32 - 239).abs();
        assert!(dist_to_dark < 40 || dist_to_light < 40);
    }

    #[test]
    fn choose_color_picks_the_nearer_entry() {
        let palette = [[0u8, 0, 0], [255, 255, 255]];
        assert_eq!(choose_color([10.0, 10.0, 10.0], &palette), 0);
        assert_eq!(choose_color([250.0, 250.0, 250.0], &palette), 1);
    }

    #[test]
    fn single_leaf_has_infinite_simulated_cost() {
        let partition = crate::partition::make_root(4, 4);
        let leaves = vec![partition.root];
        let colors = vec![[0.0, 0.0, 0.0]];
        assert!(simulate_encode(&partition, &leaves, &colors).is_infinite());
    }
}

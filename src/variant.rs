//! Tries a grid of partition/quantization parameter combinations in
//! parallel and keeps whichever best matches the target size in simulated
//! squared error.
//!
//! The reference dispatches `SimulationTask`s across a hand-rolled thread
//! pool that claims work from a shared `std::atomic<size_t>` counter. This
//! crate already depends on `rayon` for other parallel work (carried over
//! from the teacher's codebase), so the grid is simply handed to
//! `rayon::ThreadPoolBuilder::build_scoped`/`par_iter` instead of
//! reimplementing the atomic-counter dispatcher; the result is the same
//! "every combination gets a worker, lowest-index wins ties" contract.

use rayon::prelude::*;

use crate::codec_params::CodecParams;
use crate::image::Image;
use crate::palette::{build_palette, gather_patches, leaves_for_split_count, simulate_encode};
use crate::partition::{make_root, Partition};
use crate::ubercache::{Cache, UberCache};

/// One point in the search grid: a partition-shape code, a line limit, and
/// a bitmask over the color-code space (spec.md §4.8) — bit `c` set means
/// "try fixed-grid/palette color code `c` with this partition and line
/// limit", and the task keeps whichever of its set bits scores lowest.
///
/// `line_limit` is zero-based (0..`codec_params::MAX_LINE_LIMIT`), one less
/// than the `CodecParams::line_limit` it is fed into.
#[derive(Clone, Copy, Debug)]
pub struct Variant {
    pub partition_code: u32,
    pub line_limit: u32,
    pub color_options: u32,
}

/// Search configuration: the target size plus the grid to try.
pub struct Params {
    pub target_size: u32,
    pub variants: Vec<Variant>,
    pub num_threads: usize,
}

impl Params {
    /// A reasonably broad default grid: a handful of partition shapes and
    /// line limits crossed with every color code. Exhaustively trying the
    /// reference's full combinatorial space (500 partition codes x 64 line
    /// limits x 17 color codes) is wasteful for most images; this crate
    /// samples a coarser grid instead, documented as this implementation's
    /// own choice in `DESIGN.md`.
    pub fn default_grid(target_size: u32) -> Params {
        let partition_codes = [0, 1, 50, 100, 250, 499];
        let line_limits = [8, 16, 32, 62];
        // Every color code's bit set: each (partition_code, line_limit) task
        // tries the whole color-code space itself and keeps its own best,
        // per spec.md §4.8, rather than one task per color code.
        let all_colors = (1u32 << crate::codec_params::MAX_COLOR_CODE) - 1;
        let mut variants = Vec::new();
        for &pc in &partition_codes {
            for &ll in &line_limits {
                variants.push(Variant { partition_code: pc, line_limit: ll, color_options: all_colors });
            }
        }
        Params { target_size, variants, num_threads: rayon::current_num_threads() }
    }
}

/// The outcome of evaluating one variant: its params, the built partition,
/// how many of its splits the target size affords, the fitted palette (if
/// any), and the simulated squared error (lower is better, `+inf` if the
/// variant can't usefully encode anything within budget).
pub struct Candidate {
    pub cp: CodecParams,
    pub partition: Partition,
    pub num_non_leaf: usize,
    pub palette: Option<Vec<[u8; 3]>>,
    pub sqe: f32,
    /// Mean squared error the winning candidate would reconstruct with:
    /// `sqe` rebaselined by `UberCache::rgb2` and divided by pixel count.
    /// `NAN` until `search_best` fills it in for the overall winner.
    pub reported_mse: f32,
}

/// Builds one partition for `variant`'s (partition_code, line_limit), then
/// tries every color code whose bit is set in `variant.color_options`,
/// keeping whichever yields the lowest simulated squared error (spec.md
/// §4.8 step 3). The partition itself does not depend on the color code, so
/// it is built once and reused across the whole bitmask.
fn evaluate(image: &Image, uber: &UberCache, variant: &Variant, target_size: u32, task_index: usize) -> Candidate {
    let mut cp = CodecParams::new(image.width, image.height);
    cp.set_partition_code(variant.partition_code);
    // A `Variant`'s line_limit is zero-based (0..kMaxLineLimit); `CodecParams`
    // stores the real limit used by `DistanceRange`, one higher.
    cp.line_limit = variant.line_limit + 1;

    let mut cache = Cache::new(uber);
    let mut partition = make_root(image.width, image.height);
    partition.build_partition(target_size, &cp, &mut cache);

    let mut best: Option<(CodecParams, usize, Option<Vec<[u8; 3]>>, f32)> = None;

    for color_code in 0..crate::codec_params::MAX_COLOR_CODE {
        if variant.color_options & (1 << color_code) == 0 {
            continue;
        }
        let mut candidate_cp = cp.clone();
        candidate_cp.set_color_code(color_code);

        let num_non_leaf = partition.subpartition(&candidate_cp, target_size).min(partition.num_non_leaf());
        let leaves = leaves_for_split_count(&partition, num_non_leaf);
        let palette = if candidate_cp.palette_size > 0 {
            let patches = gather_patches(&partition, &leaves);
            if patches.is_empty() {
                None
            } else {
                let seed = 0x2545F491u32.wrapping_add(task_index as u32).wrapping_add(color_code * 0x9E37);
                Some(build_palette(&patches, candidate_cp.palette_size as usize, seed))
            }
        } else {
            None
        };

        let colors: Vec<[f32; 3]> = leaves
            .iter()
            .map(|&idx| {
                crate::palette::leaf_color(&partition.fragments[idx].stats, &candidate_cp, palette.as_deref())
            })
            .collect();
        let sqe = simulate_encode(&partition, &leaves, &colors);
        log::trace!(
            "variant {{partition_code={}, line_limit={}, color_code={}}}: {} splits, sqe={sqe}",
            variant.partition_code,
            variant.line_limit,
            color_code,
            num_non_leaf,
        );

        if best.as_ref().map_or(true, |(_, _, _, best_sqe)| sqe < *best_sqe) {
            best = Some((candidate_cp, num_non_leaf, palette, sqe));
        }
    }

    // A bitmask with no bit in [0, MAX_COLOR_CODE) set (e.g. one of the
    // reference's fixtures that pins a single out-of-range bit) leaves
    // nothing to compare; fall back to plain grid code 0 rather than
    // propagate the reference's undefined-behavior-on-overflow quirk.
    let (cp, num_non_leaf, palette, sqe) = best.unwrap_or_else(|| {
        let mut fallback_cp = cp.clone();
        fallback_cp.set_color_code(0);
        let num_non_leaf = partition.subpartition(&fallback_cp, target_size).min(partition.num_non_leaf());
        let leaves = leaves_for_split_count(&partition, num_non_leaf);
        let colors: Vec<[f32; 3]> = leaves
            .iter()
            .map(|&idx| crate::palette::leaf_color(&partition.fragments[idx].stats, &fallback_cp, None))
            .collect();
        let sqe = simulate_encode(&partition, &leaves, &colors);
        (fallback_cp, num_non_leaf, None, sqe)
    });

    Candidate { cp, partition, num_non_leaf, palette, sqe, reported_mse: f32::NAN }
}

/// Runs every variant in the grid, returning the one with the lowest
/// simulated squared error. Ties favor the lowest index in `params.variants`
/// to keep the result deterministic regardless of scheduling.
pub fn search_best(image: &Image, params: &Params) -> Candidate {
    let uber = UberCache::new(image);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.num_threads.max(1))
        .build()
        .expect("failed to build variant search thread pool");

    let results: Vec<Candidate> = pool.install(|| {
        params
            .variants
            .par_iter()
            .enumerate()
            .map(|(i, variant)| evaluate(image, &uber, variant, params.target_size, i))
            .collect()
    });

    let mut best = results
        .into_iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| {
            a.sqe.partial_cmp(&b.sqe).unwrap_or(std::cmp::Ordering::Equal).then(ia.cmp(ib))
        })
        .map(|(_, c)| c)
        .expect("variant grid must not be empty");

    let pixel_count = (image.width as f64) * (image.height as f64);
    let rgb2: f32 = uber.rgb2.iter().sum();
    best.reported_mse = ((best.sqe as f64 + rgb2 as f64) / pixel_count) as f32;
    log::debug!(
        "picked variant with {} splits, {} palette entries, mse={}",
        best.num_non_leaf,
        best.palette.as_ref().map_or(0, |p| p.len()),
        best.reported_mse,
    );
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_picks_a_candidate_that_encodes_something() {
        let mut image = Image::new(16, 16);
        for y in 0..16usize {
            for x in 0..16usize {
                let idx = y * 16 + x;
                image.r[idx] = if x < 8 { 20 } else { 230 };
            }
        }
        let params = Params {
            target_size: 64,
            variants: vec![
                Variant { partition_code: 0, line_limit: 16, color_options: 1 << 0 },
                Variant { partition_code: 3, line_limit: 16, color_options: 1 << 13 },
            ],
            num_threads: 2,
        };
        let best = search_best(&image, &params);
        assert!(best.num_non_leaf >= 1);
    }
}

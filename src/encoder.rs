//! Traverses the winning partition in canonical breadth-first order and
//! writes node types, angle, line, and color to an entropy coder.
//!
//! The traversal here and the one `decoder::decode` performs must stay in
//! lockstep: both start at the root, pop a FIFO queue, and enqueue
//! left-then-right on every internal node. Nothing about tree shape is
//! communicated except through this shared walk order.

use std::collections::VecDeque;

use crate::codec_params::{node_type, CodecParams};
use crate::palette::{choose_color, leaf_avg, quantize_channels};
use crate::partition::Partition;
use crate::rangecoder::SymbolWriter;

/// Writes the self-describing header: codec params, then (palette mode
/// only) each palette entry as three raw bytes.
pub fn write_header<W: SymbolWriter>(dst: &mut W, cp: &CodecParams, palette: Option<&[[u8; 3]]>) {
    cp.write(dst);
    if let Some(p) = palette {
        for color in p {
            dst.write_number(256, color[0] as u32);
            dst.write_number(256, color[1] as u32);
            dst.write_number(256, color[2] as u32);
        }
    }
}

/// Serializes `partition`, keeping only its first `num_non_leaf` admitted
/// splits (a fragment whose ordinal falls outside that prefix is written
/// out as a `FILL` leaf even if the full search went on to split it
/// further — see `Partition::subpartition`).
pub fn do_encode<W: SymbolWriter>(
    dst: &mut W,
    num_non_leaf: usize,
    partition: &Partition,
    cp: &CodecParams,
    palette: Option<&[[u8; 3]]>,
) {
    write_header(dst, cp, palette);

    let mut queue = VecDeque::new();
    queue.push_back(partition.root);
    while let Some(idx) = queue.pop_front() {
        let fragment = &partition.fragments[idx];
        if (fragment.ordinal as usize) < num_non_leaf {
            dst.write_number(node_type::COUNT, node_type::HALF_PLANE);
            let angle_max = 1u32 << cp.angle_bits[fragment.level as usize];
            dst.write_number(angle_max, fragment.best_angle_code);
            dst.write_number(fragment.best_num_lines, fragment.best_line);
            queue.push_back(fragment.left_child.expect("admitted split has children"));
            queue.push_back(fragment.right_child.expect("admitted split has children"));
        } else {
            dst.write_number(node_type::COUNT, node_type::FILL);
            let avg = leaf_avg(&fragment.stats);
            match palette {
                Some(p) if !p.is_empty() => {
                    let color_idx = choose_color(avg, p);
                    dst.write_number(p.len() as u32, color_idx as u32);
                }
                _ => {
                    for v in quantize_channels(avg, cp.color_quant) {
                        dst.write_number(cp.color_quant, v);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::rangecoder::xrange::XRangeEncoder;
    use crate::ubercache::{Cache, UberCache};

    #[test]
    fn serializes_a_single_fill_as_one_node() {
        let image = Image::new(8, 8);
        let uber = UberCache::new(&image);
        let mut cache = Cache::new(&uber);
        let cp = CodecParams::new(8, 8);
        let mut partition = crate::partition::make_root(8, 8);
        partition.build_partition(0, &cp, &mut cache);
        assert_eq!(partition.num_non_leaf(), 0);

        let mut enc = XRangeEncoder::new();
        do_encode(&mut enc, 0, &partition, &cp, None);
        let bytes = enc.finish();
        assert!(!bytes.is_empty());
    }
}

//! `twim`: a lossy image codec that recursively partitions an image into
//! irregular polygonal regions, cut by straight half-planes at quantized
//! angles, and fills each leaf region with one representative color.
//!
//! The encoder searches, under a strict byte budget, for the partition and
//! color palette minimizing reconstruction error; the decoder deterministically
//! replays that partition and paints each region. See `codec_params` for the
//! self-describing wire header and `rangecoder` for the entropy coders that
//! carry it.

pub mod codec_params;
pub mod decoder;
pub mod distance_range;
pub mod encoder;
pub mod error;
pub mod fragment;
pub mod image;
pub mod palette;
pub mod partition;
pub mod rangecoder;
pub mod region;
pub mod sincos;
pub mod ubercache;
pub mod variant;

#[cfg(test)]
mod test_support;

pub use decoder::{decode, decode_checked};
pub use error::{Error, Result};
pub use image::Image;
pub use variant::{Candidate, Params, Variant};

use rangecoder::xrange::XRangeEncoder;

/// Searches `params.variants` for the best-fitting partition and palette,
/// then serializes the winner with the xrange entropy coder. Fails only on
/// the configuration error from spec.md §7: an image smaller than 8x8.
pub fn encode(image: &Image, params: &Params) -> Result<Vec<u8>> {
    if image.width < 8 || image.height < 8 {
        return Err(Error::InvalidConfiguration(format!(
            "image is {}x{}, minimum is 8x8",
            image.width, image.height
        )));
    }

    let best = variant::search_best(image, params);
    let mut dst = XRangeEncoder::new();
    encoder::do_encode(&mut dst, best.num_non_leaf, &best.partition, &best.cp, best.palette.as_deref());
    log::info!(
        "encoded {}x{} image: {} splits, mse={}",
        image.width,
        image.height,
        best.num_non_leaf,
        best.reported_mse,
    );
    Ok(dst.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_images_smaller_than_eight_by_eight() {
        let image = Image::new(4, 4);
        let params = Params::default_grid(64);
        let err = encode(&image, &params).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn encodes_and_decodes_a_cross_image_within_budget() {
        // A 20x20 two-color "cross": a black cross on a white background,
        // cell size 4 (spec.md §8 scenario 6).
        let mut image = Image::new(20, 20);
        for p in image.r.iter_mut().chain(image.g.iter_mut()).chain(image.b.iter_mut()) {
            *p = 255;
        }
        for y in 0..20usize {
            for x in 0..20usize {
                let cell_y = y / 4;
                let cell_x = x / 4;
                if cell_y == 2 || cell_x == 2 {
                    let idx = y * 20 + x;
                    image.r[idx] = 0;
                    image.g[idx] = 0;
                    image.b[idx] = 0;
                }
            }
        }

        let params = Params {
            target_size: 24,
            variants: vec![Variant { partition_code: 0xD7, line_limit: 6, color_options: 1 << 18 }],
            num_threads: 1,
        };
        let bytes = encode(&image, &params).expect("encode should succeed");
        let decoded = decode(&bytes);
        assert!(decoded.ok());
        assert_eq!(decoded.width, 20);
        assert_eq!(decoded.height, 20);
    }

    #[test]
    fn single_threaded_and_multi_threaded_search_agree() {
        let mut image = Image::new(16, 16);
        for y in 0..16usize {
            for x in 0..16usize {
                let idx = y * 16 + x;
                image.r[idx] = if x < 8 { 10 } else { 240 };
            }
        }
        let variants = vec![
            Variant { partition_code: 0, line_limit: 16, color_options: 1 << 0 },
            Variant { partition_code: 5, line_limit: 32, color_options: 1 << 13 },
        ];
        let one = encode(
            &image,
            &Params { target_size: 48, variants: variants.clone(), num_threads: 1 },
        )
        .unwrap();
        let many = encode(&image, &Params { target_size: 48, variants, num_threads: 4 }).unwrap();
        assert_eq!(one, many);
    }
}

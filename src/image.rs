//! Planar RGB image container and RGBA ingestion.

/// Three byte planes of identical dimensions; alpha is always opaque.
#[derive(Clone, Debug, Default)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
    ok: bool,
}

impl Image {
    pub fn new(width: u32, height: u32) -> Image {
        let n = (width as usize) * (height as usize);
        Image { width, height, r: vec![0; n], g: vec![0; n], b: vec![0; n], ok: true }
    }

    /// Mirrors the reference's `{ok: bool}` convention for a failed decode:
    /// an empty, not-ok image that callers can check without unwrapping a
    /// `Result`. See `decode_checked` for the `Result`-based alternative.
    pub fn failed() -> Image {
        Image { width: 0, height: 0, r: Vec::new(), g: Vec::new(), b: Vec::new(), ok: false }
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn from_rgba(src: &[u8], width: u32, height: u32) -> Image {
        let mut image = Image::new(width, height);
        let w = width as usize;
        for y in 0..height as usize {
            let row = &src[y * 4 * w..(y + 1) * 4 * w];
            for x in 0..w {
                image.r[y * w + x] = row[4 * x];
                image.g[y * w + x] = row[4 * x + 1];
                image.b[y * w + x] = row[4 * x + 2];
            }
        }
        image
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        let n = (self.width as usize) * (self.height as usize);
        let mut out = vec![255u8; n * 4];
        for i in 0..n {
            out[4 * i] = self.r[i];
            out[4 * i + 1] = self.g[i];
            out[4 * i + 2] = self.b[i];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_roundtrip_drops_alpha() {
        let mut rgba = Vec::new();
        for i in 0..16u8 {
            rgba.extend_from_slice(&[i, i.wrapping_add(1), i.wrapping_add(2), 17]);
        }
        let image = Image::from_rgba(&rgba, 4, 4);
        assert_eq!(image.r[5], 5);
        assert_eq!(image.g[5], 6);
        assert_eq!(image.b[5], 7);
        let back = image.to_rgba();
        assert_eq!(back[4 * 5 + 3], 255);
    }

    #[test]
    fn failed_image_is_not_ok() {
        assert!(!Image::failed().ok());
        assert!(Image::new(8, 8).ok());
    }
}

/// Read-back depth image and its display tonemap
///
/// Depth is view-space w per pixel, row-major, top row first. Pixels no
/// occluder touched read back as 0.0.
use super::hiz_buffer::HiZBuffer;
use crate::error::{OcclusionError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    width: usize,
    height: usize,
    depth: Vec<f32>,
}

impl DepthImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            depth: vec![0.0; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    #[inline]
    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.depth[y * self.width + x]
    }

    pub(crate) fn copy_from_hiz(&mut self, hiz: &HiZBuffer) -> Result<()> {
        if self.width != hiz.width() || self.height != hiz.height() {
            return Err(OcclusionError::ImageSizeMismatch {
                expected: hiz.width() * hiz.height(),
                actual: self.width * self.height,
            });
        }

        hiz.copy_row_major(&mut self.depth);
        for d in &mut self.depth {
            if !d.is_finite() {
                *d = 0.0;
            }
        }
        Ok(())
    }

    /// Nearest and farthest written depth, None if nothing was written
    pub fn written_range(&self) -> Option<(f32, f32)> {
        self.depth
            .iter()
            .filter(|&&d| d > 0.0)
            .fold(None, |range, &d| match range {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }

    /// Map depth to grey 0x00RRGGBB pixels (alpha byte set): nearest written
    /// depth → 32, farthest → 255, cleared pixels black.
    pub fn tonemap(&self, out: &mut [u32]) -> Result<()> {
        if out.len() != self.depth.len() {
            return Err(OcclusionError::ImageSizeMismatch {
                expected: self.depth.len(),
                actual: out.len(),
            });
        }

        let (min_w, max_w) = self.written_range().unwrap_or((0.0, 0.0));
        let range = max_w - min_w;

        for (pixel, &d) in out.iter_mut().zip(&self.depth) {
            let intensity = if d > 0.0 {
                let t = if range > 0.0 { (d - min_w) / range } else { 0.0 };
                (223.0 * t + 32.0) as u32
            } else {
                0
            };
            *pixel = 0xFF00_0000 | (intensity << 16) | (intensity << 8) | intensity;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_maps_cleared_pixels_to_zero() {
        let mut hiz = HiZBuffer::new(4, 2);
        hiz.write(1, 1, 7.5);

        let mut image = DepthImage::new(4, 2);
        image.copy_from_hiz(&hiz).unwrap();
        assert_eq!(image.depth_at(1, 1), 7.5);
        assert_eq!(image.depth_at(0, 0), 0.0);
        assert_eq!(image.written_range(), Some((7.5, 7.5)));
    }

    #[test]
    fn readback_rejects_wrong_size() {
        let hiz = HiZBuffer::new(4, 2);
        let mut image = DepthImage::new(2, 2);
        assert!(matches!(
            image.copy_from_hiz(&hiz),
            Err(OcclusionError::ImageSizeMismatch { expected: 8, actual: 4 })
        ));
    }

    #[test]
    fn tonemap_spans_32_to_255() {
        let mut hiz = HiZBuffer::new(3, 1);
        hiz.write(0, 0, 10.0);
        hiz.write(1, 0, 20.0);
        let mut image = DepthImage::new(3, 1);
        image.copy_from_hiz(&hiz).unwrap();

        let mut out = vec![0u32; 3];
        image.tonemap(&mut out).unwrap();
        assert_eq!(out[0], 0xFF20_2020);
        assert_eq!(out[1], 0xFFFF_FFFF);
        assert_eq!(out[2], 0xFF00_0000);
    }
}

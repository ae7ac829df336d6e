//! Heatmap overlays.

use image::RgbImage;
use tracing::warn;

use cnnlens_core::{CoreError, HwcImage};

use crate::cam::CamMap;
use crate::error::{ExplainError, Result};

/// JET colormap in RGB order for `v` in [0, 1].
pub fn jet(v: f32) -> [f32; 3] {
    let v = v.clamp(0.0, 1.0);
    let channel = |offset: f32| (1.5 - (4.0 * v - offset).abs()).clamp(0.0, 1.0);
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Blend a JET heatmap of `mask` over `image`.
///
/// `image` must be RGB with values in [0, 1]. The result is
/// `(1 - image_weight) * heatmap + image_weight * image`, rescaled so its
/// maximum is 1 and quantized to `u8`.
pub fn show_cam_on_image(image: &HwcImage, mask: &CamMap, image_weight: f32) -> Result<RgbImage> {
    if image.channels() != 3 {
        return Err(CoreError::ChannelMismatch {
            expected: 3,
            got: image.channels(),
        }
        .into());
    }
    let max = image.max_value();
    if max > 1.0 {
        warn!(max, "overlay image is not scaled to [0, 1]");
        return Err(ExplainError::ImageRange(max));
    }
    if !(0.0..=1.0).contains(&image_weight) {
        return Err(ExplainError::InvalidWeight(image_weight));
    }
    if (mask.height(), mask.width()) != (image.height(), image.width()) {
        return Err(ExplainError::SizeMismatch {
            map: (mask.height(), mask.width()),
            image: (image.height(), image.width()),
        });
    }

    let mut blended = Vec::with_capacity(image.as_slice().len());
    for (&m, px) in mask.as_slice().iter().zip(image.as_slice().chunks(3)) {
        // The heatmap is built from the mask quantized to 8 bits.
        let level = (255.0 * m.clamp(0.0, 1.0)).floor() / 255.0;
        for (heat, &value) in jet(level).iter().zip(px) {
            let heat = (255.0 * heat).round() / 255.0;
            blended.push((1.0 - image_weight) * heat + image_weight * value);
        }
    }

    let peak = blended.iter().copied().fold(0.0f32, f32::max);
    let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };
    let bytes = blended
        .into_iter()
        .map(|v| (255.0 * v * scale).clamp(0.0, 255.0) as u8)
        .collect();

    RgbImage::from_raw(image.width() as u32, image.height() as u32, bytes)
        .ok_or_else(|| ExplainError::InvalidMap("overlay buffer size mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(height: usize, width: usize, value: f32) -> HwcImage {
        HwcImage::new(height, width, 3, vec![value; height * width * 3]).unwrap()
    }

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0.0), [0.0, 0.0, 0.5]);
        assert_eq!(jet(0.5), [0.5, 1.0, 0.5]);
        assert_eq!(jet(1.0), [0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_overlay_size() {
        let mask = CamMap::new(4, 6, (0..24).map(|i| i as f32 / 23.0).collect()).unwrap();
        let overlay = show_cam_on_image(&gray(4, 6, 0.5), &mask, 0.725).unwrap();
        assert_eq!(overlay.dimensions(), (6, 4));
    }

    #[test]
    fn test_overlay_is_rescaled_to_full_range() {
        let mask = CamMap::new(2, 2, vec![0.0, 0.3, 0.6, 1.0]).unwrap();
        let overlay = show_cam_on_image(&gray(2, 2, 0.2), &mask, 0.5).unwrap();
        let max = overlay.as_raw().iter().copied().max().unwrap();
        assert!(max >= 254);
    }

    #[test]
    fn test_full_image_weight_keeps_image() {
        let mask = CamMap::new(1, 2, vec![0.0, 1.0]).unwrap();
        let image = HwcImage::new(1, 2, 3, vec![1.0, 0.5, 0.0, 0.25, 0.5, 1.0]).unwrap();
        let overlay = show_cam_on_image(&image, &mask, 1.0).unwrap();
        assert_eq!(overlay.get_pixel(0, 0).0, [255, 127, 0]);
        assert_eq!(overlay.get_pixel(1, 0).0, [63, 127, 255]);
    }

    #[test]
    fn test_rejects_out_of_range_image() {
        let mask = CamMap::new(2, 2, vec![0.5; 4]).unwrap();
        let err = show_cam_on_image(&gray(2, 2, 1.5), &mask, 0.5).unwrap_err();
        assert!(matches!(err, ExplainError::ImageRange(_)));
    }

    #[test]
    fn test_rejects_bad_weight_and_size() {
        let mask = CamMap::new(2, 2, vec![0.5; 4]).unwrap();
        assert!(matches!(
            show_cam_on_image(&gray(2, 2, 0.5), &mask, 1.5),
            Err(ExplainError::InvalidWeight(_))
        ));
        assert!(matches!(
            show_cam_on_image(&gray(3, 2, 0.5), &mask, 0.5),
            Err(ExplainError::SizeMismatch { .. })
        ));
    }
}

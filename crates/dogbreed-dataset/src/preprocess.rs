//! Image preprocessing: center crop, resize, pixel scaling and label encoding.

use dogbreed_core::{Error, InputShape, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Crops the largest centered region with the aspect ratio of `shape`
pub fn center_crop(image: &RgbImage, shape: InputShape) -> RgbImage {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = (shape.width as u64, shape.height as u64);

    // Compare width / height against target_w / target_h without floats
    let (crop_w, crop_h) = if width as u64 * target_h > height as u64 * target_w {
        ((height as u64 * target_w / target_h).max(1) as u32, height)
    } else {
        (width, (width as u64 * target_h / target_w).max(1) as u32)
    };

    let x = (width - crop_w) / 2;
    let y = (height - crop_h) / 2;
    imageops::crop_imm(image, x, y, crop_w, crop_h).to_image()
}

/// Center-crops and resizes an image, returning HWC pixels scaled to [0, 1]
pub fn to_pixels(image: &RgbImage, shape: InputShape) -> Vec<f32> {
    let cropped = center_crop(image, shape);
    let (w, h) = (shape.width as u32, shape.height as u32);

    let resized = if cropped.dimensions() == (w, h) {
        cropped
    } else {
        imageops::resize(&cropped, w, h, FilterType::Triangle)
    };

    resized
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect()
}

/// One-hot encodes a label
pub fn one_hot(label: usize, num_classes: usize) -> Result<Vec<f32>> {
    if label >= num_classes {
        return Err(Error::Dataset(format!(
            "Label {label} out of range for {num_classes} classes"
        )));
    }
    let mut encoded = vec![0.0; num_classes];
    encoded[label] = 1.0;
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_center_crop_wide_image() {
        let mut image = RgbImage::new(300, 200);
        image.put_pixel(150, 100, Rgb([255, 0, 0]));

        let cropped = center_crop(&image, InputShape::new(224, 224, 3));
        assert_eq!(cropped.dimensions(), (200, 200));
        assert_eq!(cropped.get_pixel(100, 100).0, [255, 0, 0]);
    }

    #[test]
    fn test_center_crop_tall_image() {
        let image = RgbImage::new(100, 400);
        let cropped = center_crop(&image, InputShape::new(50, 100, 3));
        assert_eq!(cropped.dimensions(), (100, 50));
    }

    #[test]
    fn test_pixels_are_scaled_hwc() {
        let image = RgbImage::from_pixel(64, 48, Rgb([255, 0, 51]));
        let pixels = to_pixels(&image, InputShape::new(8, 8, 3));

        assert_eq!(pixels.len(), 8 * 8 * 3);
        assert!((pixels[0] - 1.0).abs() < 1e-6);
        assert!(pixels[1].abs() < 1e-6);
        assert!((pixels[2] - 0.2).abs() < 1e-6);
        assert!(pixels.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_one_hot() {
        assert_eq!(one_hot(2, 4).unwrap(), vec![0.0, 0.0, 1.0, 0.0]);
        assert!(matches!(one_hot(4, 4), Err(Error::Dataset(_))));
    }
}

//! Image color conversion
//!
//! CARLA delivers every camera image as BGRA8. Depth cameras pack a 24-bit
//! normalized depth into R, G, B; semantic cameras store the class tag in R.

use contracts::{ColorConverter, ImageData};
use image::RgbImage;

use crate::error::FrameSinkError;

/// CityScapes palette indexed by semantic tag
pub const CITYSCAPES_PALETTE: [[u8; 3]; 23] = [
    [0, 0, 0],       // unlabeled
    [70, 70, 70],    // building
    [190, 153, 153], // fence
    [250, 170, 160], // other
    [220, 20, 60],   // pedestrian
    [153, 153, 153], // pole
    [157, 234, 50],  // road line
    [128, 64, 128],  // road
    [244, 35, 232],  // sidewalk
    [107, 142, 35],  // vegetation
    [0, 0, 142],     // car
    [102, 102, 156], // wall
    [220, 220, 0],   // traffic sign
    [70, 130, 180],  // sky
    [81, 0, 81],     // ground
    [150, 100, 100], // bridge
    [230, 150, 140], // rail track
    [180, 165, 180], // guard rail
    [250, 170, 30],  // traffic light
    [110, 190, 160], // static
    [170, 120, 50],  // dynamic
    [45, 60, 150],   // water
    [145, 170, 100], // terrain
];

/// ln(300): normalized depths below 1/300 of the far plane map to the floor
const LOG_DEPTH_SCALE: f32 = 5.70378;

/// Lower bound of the logarithmic depth encoding
const LOG_DEPTH_FLOOR: f32 = 0.005;

/// Decode the 24-bit packed depth into `[0, 1]` (1.0 = far plane)
pub fn decode_depth(r: u8, g: u8, b: u8) -> f32 {
    let packed = r as u32 + g as u32 * 256 + b as u32 * 256 * 256;
    packed as f32 / (256 * 256 * 256 - 1) as f32
}

/// Logarithmic gray level for a normalized depth
pub fn logarithmic_depth(normalized: f32) -> u8 {
    let value = 1.0 + normalized.ln() / LOG_DEPTH_SCALE;
    to_channel(value.clamp(LOG_DEPTH_FLOOR, 1.0))
}

/// Linear gray level for a normalized depth
pub fn linear_depth(normalized: f32) -> u8 {
    to_channel(normalized.clamp(0.0, 1.0))
}

/// Palette color for a semantic tag; tags past the table wrap around
pub fn palette_color(tag: u8) -> [u8; 3] {
    CITYSCAPES_PALETTE[tag as usize % CITYSCAPES_PALETTE.len()]
}

fn to_channel(value: f32) -> u8 {
    (value * 255.0).round() as u8
}

/// Convert a BGRA8 image into RGB8, applying `converter`
pub fn to_rgb(image: &ImageData, converter: ColorConverter) -> Result<RgbImage, FrameSinkError> {
    let expected = image.expected_len();
    if image.data.len() != expected {
        return Err(FrameSinkError::InvalidImage {
            width: image.width,
            height: image.height,
            expected,
            actual: image.data.len(),
        });
    }

    let mut rgb = Vec::with_capacity(image.width as usize * image.height as usize * 3);
    for bgra in image.data.chunks_exact(4) {
        let (b, g, r) = (bgra[0], bgra[1], bgra[2]);
        let pixel = match converter {
            ColorConverter::Raw => [r, g, b],
            ColorConverter::Depth => [linear_depth(decode_depth(r, g, b)); 3],
            ColorConverter::LogarithmicDepth => [logarithmic_depth(decode_depth(r, g, b)); 3],
            ColorConverter::CityScapesPalette => palette_color(r),
        };
        rgb.extend_from_slice(&pixel);
    }

    // Length was checked above, so the buffer always fits.
    RgbImage::from_raw(image.width, image.height, rgb).ok_or(FrameSinkError::InvalidImage {
        width: image.width,
        height: image.height,
        expected,
        actual: image.data.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn image(pixels: &[[u8; 4]]) -> ImageData {
        ImageData {
            width: pixels.len() as u32,
            height: 1,
            data: Bytes::from(pixels.concat()),
        }
    }

    #[test]
    fn test_decode_depth_extremes() {
        assert_eq!(decode_depth(0, 0, 0), 0.0);
        assert_eq!(decode_depth(255, 255, 255), 1.0);
        // B is the most significant byte
        assert!(decode_depth(0, 0, 1) > decode_depth(255, 255, 0));
    }

    #[test]
    fn test_logarithmic_depth_range() {
        assert_eq!(logarithmic_depth(1.0), 255);
        // Clamped to the floor rather than zero
        assert_eq!(logarithmic_depth(0.0), 1);
        assert_eq!(logarithmic_depth(1e-6), 1);
        // Halfway point of the log scale
        let half = (-LOG_DEPTH_SCALE / 2.0).exp();
        assert!((127..=128).contains(&logarithmic_depth(half)));
    }

    #[test]
    fn test_logarithmic_depth_is_monotonic() {
        let mut previous = 0u8;
        for step in 1..=100 {
            let level = logarithmic_depth(step as f32 / 100.0);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn test_log_depth_differs_from_linear() {
        let d = 0.01;
        assert!(logarithmic_depth(d) > linear_depth(d));
    }

    #[test]
    fn test_raw_swaps_bgr_to_rgb() {
        let rgb = to_rgb(&image(&[[1, 2, 3, 255]]), ColorConverter::Raw).unwrap();
        assert_eq!(rgb.as_raw(), &vec![3, 2, 1]);
    }

    #[test]
    fn test_log_depth_output_is_gray() {
        let rgb = to_rgb(
            &image(&[[255, 255, 255, 255], [0, 0, 0, 255]]),
            ColorConverter::LogarithmicDepth,
        )
        .unwrap();
        assert_eq!(rgb.as_raw(), &vec![255, 255, 255, 1, 1, 1]);
    }

    #[test]
    fn test_palette_uses_red_channel_tag() {
        // BGRA with tag 7 (road) in R, noise in B and G
        let rgb = to_rgb(&image(&[[9, 9, 7, 255]]), ColorConverter::CityScapesPalette).unwrap();
        assert_eq!(rgb.as_raw(), &vec![128, 64, 128]);
        assert_eq!(palette_color(10), [0, 0, 142]);
        assert_eq!(palette_color(23), palette_color(0));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let bad = ImageData {
            width: 2,
            height: 2,
            data: Bytes::from(vec![0u8; 4]),
        };
        let err = to_rgb(&bad, ColorConverter::Raw).unwrap_err();
        assert!(matches!(
            err,
            FrameSinkError::InvalidImage {
                expected: 16,
                actual: 4,
                ..
            }
        ));
    }
}

//! Fixed rectangle overlay.

use async_trait::async_trait;
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, Pixel, Rgba};
use std::io::Cursor;

use super::HeatmapRenderer;
use crate::error::{MaculaError, MaculaResult};
use crate::intake::model::ImagePayload;

/// Resizes the image to a square canvas and tints its central region.
#[derive(Debug, Clone)]
pub struct RectangleOverlay {
    pub canvas_size: u32,
    /// `(x, y, width, height)` on the canvas.
    pub rect: (u32, u32, u32, u32),
    pub color: Rgba<u8>,
}

impl Default for RectangleOverlay {
    fn default() -> Self {
        Self {
            canvas_size: 224,
            rect: (56, 56, 112, 112),
            // rgba(255, 0, 0, 0.3)
            color: Rgba([255, 0, 0, 77]),
        }
    }
}

impl RectangleOverlay {
    /// Draw the overlay and encode it as PNG bytes.
    pub fn draw(&self, image: &ImagePayload) -> MaculaResult<Vec<u8>> {
        let decoded = image::load_from_memory(&image.bytes)
            .map_err(|e| MaculaError::heatmap(format!("cannot decode image: {}", e)))?;

        let mut canvas = decoded
            .resize_exact(self.canvas_size, self.canvas_size, FilterType::Triangle)
            .to_rgba8();

        let (x0, y0, w, h) = self.rect;
        let x1 = (x0 + w).min(self.canvas_size);
        let y1 = (y0 + h).min(self.canvas_size);
        for y in y0..y1 {
            for x in x0..x1 {
                canvas.get_pixel_mut(x, y).blend(&self.color);
            }
        }

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| MaculaError::heatmap(format!("cannot encode overlay: {}", e)))?;
        Ok(png)
    }
}

#[async_trait]
impl HeatmapRenderer for RectangleOverlay {
    async fn render(&self, image: &ImagePayload) -> MaculaResult<String> {
        let renderer = self.clone();
        let image = image.clone();
        let png = tokio::task::spawn_blocking(move || renderer.draw(&image))
            .await
            .map_err(|e| MaculaError::heatmap(format!("overlay task failed: {}", e)))??;

        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        ))
    }

    fn name(&self) -> &str {
        "overlay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::model::{ImageFormat, IntakeLimits};
    use crate::intake::parse_data_url;
    use image::{Rgb, RgbImage};

    fn green_png(width: u32, height: u32) -> ImagePayload {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 200, 10]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        ImagePayload {
            format: ImageFormat::Png,
            bytes,
        }
    }

    #[tokio::test]
    async fn test_overlay_tints_center_only() {
        let overlay = RectangleOverlay::default();
        let data_url = overlay.render(&green_png(300, 200)).await.unwrap();
        assert!(data_url.starts_with("data:image/png;base64,"));

        let payload = parse_data_url(&data_url, &IntakeLimits::default()).unwrap();
        let rendered = image::load_from_memory(&payload.bytes).unwrap().to_rgba8();
        assert_eq!(rendered.dimensions(), (224, 224));

        let center = rendered.get_pixel(112, 112);
        let corner = rendered.get_pixel(5, 5);
        assert!(center[0] > corner[0] + 50, "center {:?} corner {:?}", center, corner);
        assert!(center[1] < corner[1]);
    }

    #[tokio::test]
    async fn test_undecodable_image_is_heatmap_error() {
        let payload = ImagePayload {
            format: ImageFormat::Jpeg,
            bytes: vec![0xFF, 0xD8, 0xFF, 0x00, 0x01],
        };
        let err = RectangleOverlay::default().render(&payload).await.unwrap_err();
        assert!(matches!(err, MaculaError::Heatmap(_)));
    }
}

//! Heatmap delegate.
//!
//! No saliency is computed here. Renderers are interchangeable placeholders
//! that produce a PNG data URL for display next to the prediction.

pub mod overlay;
pub mod process;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{HeatmapConfig, HeatmapMode};
use crate::error::{MaculaError, MaculaResult};
use crate::intake::model::ImagePayload;

pub use overlay::RectangleOverlay;
pub use process::ProcessRenderer;

/// Produces an overlay image for a classified payload.
#[async_trait]
pub trait HeatmapRenderer: Send + Sync {
    /// Render the overlay as a data URL.
    async fn render(&self, image: &ImagePayload) -> MaculaResult<String>;

    fn name(&self) -> &str;
}

/// Renderer for deployments without heatmaps. Always fails, so analyses carry
/// a null heatmap.
pub struct NoHeatmap;

#[async_trait]
impl HeatmapRenderer for NoHeatmap {
    async fn render(&self, _image: &ImagePayload) -> MaculaResult<String> {
        Err(MaculaError::heatmap("heatmaps are disabled"))
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Build the renderer selected by configuration.
pub fn build_renderer(config: &HeatmapConfig) -> MaculaResult<Arc<dyn HeatmapRenderer>> {
    let renderer: Arc<dyn HeatmapRenderer> = match config.mode {
        HeatmapMode::Overlay => Arc::new(RectangleOverlay::default()),
        HeatmapMode::Process => {
            let command = config
                .command
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| MaculaError::startup("heatmap.command is required in process mode"))?;
            Arc::new(ProcessRenderer::new(command, config.args.clone()))
        }
        HeatmapMode::None => Arc::new(NoHeatmap),
    };
    Ok(renderer)
}

//! External renderer process.
//!
//! Protocol: one JSON line `{"imageData": "<data url>"}` on stdin, then EOF.
//! The process answers on stdout with `{"heatmapData": "<data url>"}`,
//! `{"error": "<message>"}`, or a bare data URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::HeatmapRenderer;
use crate::error::{MaculaError, MaculaResult};
use crate::intake::model::ImagePayload;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest {
    image_data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderReply {
    heatmap_data: Option<String>,
    error: Option<String>,
}

/// Spawns one process per render.
#[derive(Debug, Clone)]
pub struct ProcessRenderer {
    program: String,
    args: Vec<String>,
}

impl ProcessRenderer {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }
}

#[async_trait]
impl HeatmapRenderer for ProcessRenderer {
    async fn render(&self, image: &ImagePayload) -> MaculaResult<String> {
        let mut request = serde_json::to_string(&RenderRequest {
            image_data: image.to_data_url(),
        })?;
        request.push('\n');

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MaculaError::heatmap(format!("cannot start '{}': {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MaculaError::heatmap("renderer stdin unavailable"))?;

        // Feed stdin while stdout drains so a chatty renderer cannot block us.
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(request.as_bytes()).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| MaculaError::heatmap(format!("renderer failed: {}", e)))?;

        if let Ok(Err(e)) = writer.await {
            debug!(error = %e, "Renderer closed stdin early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MaculaError::heatmap(format!(
                "renderer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_reply(stdout.trim())
    }

    fn name(&self) -> &str {
        "process"
    }
}

fn parse_reply(stdout: &str) -> MaculaResult<String> {
    if stdout.is_empty() {
        return Err(MaculaError::heatmap("renderer produced no output"));
    }

    let data_url = if stdout.starts_with('{') {
        let reply: RenderReply = serde_json::from_str(stdout)
            .map_err(|e| MaculaError::heatmap(format!("unreadable renderer reply: {}", e)))?;
        if let Some(error) = reply.error {
            return Err(MaculaError::heatmap(error));
        }
        reply.heatmap_data.unwrap_or_default()
    } else {
        stdout.to_string()
    };

    if !data_url.starts_with("data:image/") {
        return Err(MaculaError::heatmap("renderer reply is not an image data URL"));
    }
    Ok(data_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::model::ImageFormat;

    fn payload() -> ImagePayload {
        ImagePayload {
            format: ImageFormat::Png,
            bytes: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3],
        }
    }

    fn sh(script: &str) -> ProcessRenderer {
        ProcessRenderer::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    fn heatmap_message(err: MaculaError) -> String {
        match err {
            MaculaError::Heatmap(msg) => msg,
            other => panic!("expected heatmap error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_reply_shapes() {
        assert_eq!(
            parse_reply(r#"{"heatmapData": "data:image/png;base64,AAAA"}"#).unwrap(),
            "data:image/png;base64,AAAA"
        );
        assert_eq!(
            parse_reply("data:image/png;base64,BBBB").unwrap(),
            "data:image/png;base64,BBBB"
        );
        assert_eq!(heatmap_message(parse_reply(r#"{"error": "boom"}"#).unwrap_err()), "boom");
        assert!(parse_reply(r#"{"heatmapData": ""}"#).is_err());
        assert!(parse_reply("").is_err());
        assert!(parse_reply("hello").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_renderer_round_trip() {
        let renderer = sh(r#"grep -q '"imageData":"data:image/png;base64,' && printf '{"heatmapData":"data:image/png;base64,AAAA"}'"#);
        let result = renderer.render(&payload()).await.unwrap();
        assert_eq!(result, "data:image/png;base64,AAAA");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_renderer_error_reply() {
        let renderer = sh(r#"cat > /dev/null; printf '{"error":"no attribution data"}'"#);
        let msg = heatmap_message(renderer.render(&payload()).await.unwrap_err());
        assert_eq!(msg, "no attribution data");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_renderer_non_zero_exit() {
        let renderer = sh("cat > /dev/null; echo 'matplotlib missing' >&2; exit 3");
        let msg = heatmap_message(renderer.render(&payload()).await.unwrap_err());
        assert!(msg.contains("matplotlib missing"), "{msg}");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let renderer = ProcessRenderer::new("/nonexistent/heatmap-renderer", Vec::new());
        let msg = heatmap_message(renderer.render(&payload()).await.unwrap_err());
        assert!(msg.starts_with("cannot start"));
    }
}

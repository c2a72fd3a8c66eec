//! Image intake.
//!
//! Turns client-supplied Base64 (with or without a data-URL header) or a local
//! file into a validated `ImagePayload`. Every rejection is a
//! `MaculaError::Validation` carrying a message fit for the end user.

pub mod model;

use base64::Engine;
use std::path::Path;
use tracing::debug;

use crate::error::{MaculaError, MaculaResult};
use model::{ImageFormat, ImagePayload, IntakeLimits};

/// Split a data URL into its declared MIME type and Base64 body.
///
/// Bare Base64 comes back with no MIME type.
pub fn split_data_url(input: &str) -> MaculaResult<(Option<&str>, &str)> {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("data:") else {
        return Ok((None, trimmed));
    };

    let (header, body) = rest
        .split_once(',')
        .ok_or_else(|| MaculaError::validation("Malformed data URL: missing ',' separator"))?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| MaculaError::validation("Image data must be Base64 encoded"))?;

    Ok((Some(mime), body))
}

/// Validate and decode a Base64 image, optionally prefixed with a data-URL header.
pub fn parse_data_url(input: &str, limits: &IntakeLimits) -> MaculaResult<ImagePayload> {
    if input.trim().is_empty() {
        return Err(MaculaError::validation("No image data provided"));
    }

    let (declared_mime, body) = split_data_url(input)?;

    let declared = match declared_mime {
        Some(mime) => {
            if !mime.to_lowercase().starts_with("image/") {
                return Err(MaculaError::validation("Invalid image format"));
            }
            let format = ImageFormat::from_mime(mime)
                .filter(|f| limits.allows(*f))
                .ok_or_else(|| unsupported_type(mime, limits))?;
            Some(format)
        }
        None => None,
    };

    let cleaned: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(MaculaError::validation("No image data provided"));
    }
    if cleaned.len() > limits.max_encoded_len() {
        return Err(too_large(limits));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|_| MaculaError::validation("Image data is not valid Base64"))?;

    let payload = check_bytes(bytes, declared, limits)?;
    debug!(size = payload.len(), mime = payload.mime(), "Image accepted");
    Ok(payload)
}

/// Read an image from disk, checking the size before loading it.
pub fn load_image_file(path: &Path, limits: &IntakeLimits) -> MaculaResult<ImagePayload> {
    let metadata = std::fs::metadata(path)?;
    if metadata.len() > limits.max_bytes as u64 {
        return Err(too_large(limits));
    }

    let bytes = std::fs::read(path)?;
    let declared = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|ext| match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        });

    check_bytes(bytes, declared, limits)
}

/// Shared checks on decoded content.
fn check_bytes(
    bytes: Vec<u8>,
    declared: Option<ImageFormat>,
    limits: &IntakeLimits,
) -> MaculaResult<ImagePayload> {
    if bytes.is_empty() {
        return Err(MaculaError::validation("Image is empty"));
    }
    if bytes.len() > limits.max_bytes {
        return Err(too_large(limits));
    }

    let sniffed = ImageFormat::sniff(&bytes)
        .ok_or_else(|| MaculaError::validation("Failed to read image: unrecognized content"))?;

    if let Some(declared) = declared {
        if declared != sniffed {
            return Err(MaculaError::validation(format!(
                "Image content does not match declared type {}",
                declared.mime()
            )));
        }
    }
    if !limits.allows(sniffed) {
        return Err(unsupported_type(sniffed.mime(), limits));
    }

    Ok(ImagePayload {
        format: sniffed,
        bytes,
    })
}

fn too_large(limits: &IntakeLimits) -> MaculaError {
    MaculaError::validation(format!(
        "Image size must be less than {}",
        limits.max_size_label()
    ))
}

fn unsupported_type(mime: &str, limits: &IntakeLimits) -> MaculaError {
    MaculaError::validation(format!(
        "Unsupported image type: {}. Allowed: {}",
        mime,
        limits.allowed_mimes()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn jpeg_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.resize(len, 0x42);
        bytes
    }

    fn png_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.resize(len, 0x07);
        bytes
    }

    fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn validation_message(err: MaculaError) -> String {
        match err {
            MaculaError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_data_url_round_trip() {
        let original = jpeg_bytes(500 * 1024);
        let input = format!("data:image/jpeg;base64,{}", encode(&original));

        let payload = parse_data_url(&input, &IntakeLimits::default()).unwrap();
        assert_eq!(payload.format, ImageFormat::Jpeg);

        let reparsed = parse_data_url(&payload.to_data_url(), &IntakeLimits::default()).unwrap();
        assert_eq!(reparsed.bytes, original);
        assert_eq!(payload.to_data_url(), input);
    }

    #[test]
    fn test_bare_base64_is_sniffed() {
        let payload = parse_data_url(&encode(&png_bytes(64)), &IntakeLimits::default()).unwrap();
        assert_eq!(payload.format, ImageFormat::Png);
        assert!(payload.to_data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_whitespace_in_body_is_ignored() {
        let encoded = encode(&png_bytes(300));
        let (a, b) = encoded.split_at(40);
        let input = format!("data:image/png;base64,{}\n{}\n", a, b);
        assert!(parse_data_url(&input, &IntakeLimits::default()).is_ok());
    }

    #[test]
    fn test_oversized_image_rejected() {
        let input = format!("data:image/png;base64,{}", encode(&png_bytes(2 * 1024 * 1024)));
        let msg = validation_message(parse_data_url(&input, &IntakeLimits::default()).unwrap_err());
        assert_eq!(msg, "Image size must be less than 1MB");
    }

    #[test]
    fn test_just_over_limit_rejected_after_decode() {
        let limits = IntakeLimits {
            max_bytes: 1000,
            ..IntakeLimits::default()
        };
        // 1001 bytes encode to 1336 chars, under the 1336-char precheck.
        let input = encode(&png_bytes(1001));
        let msg = validation_message(parse_data_url(&input, &limits).unwrap_err());
        assert!(msg.starts_with("Image size must be less than"));
        assert!(parse_data_url(&encode(&png_bytes(1000)), &limits).is_ok());
    }

    #[test]
    fn test_disallowed_mime_rejected() {
        let input = format!("data:image/gif;base64,{}", encode(b"GIF89a...."));
        let msg = validation_message(parse_data_url(&input, &IntakeLimits::default()).unwrap_err());
        assert!(msg.contains("Unsupported image type: image/gif"));
    }

    #[test]
    fn test_non_image_data_url_rejected() {
        let input = format!("data:text/plain;base64,{}", encode(b"hello"));
        let msg = validation_message(parse_data_url(&input, &IntakeLimits::default()).unwrap_err());
        assert_eq!(msg, "Invalid image format");
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let msg = validation_message(
            parse_data_url("data:image/png;base64,@@not-base64@@", &IntakeLimits::default())
                .unwrap_err(),
        );
        assert_eq!(msg, "Image data is not valid Base64");
    }

    #[test]
    fn test_missing_base64_marker_rejected() {
        let msg = validation_message(
            parse_data_url("data:image/png,abcd", &IntakeLimits::default()).unwrap_err(),
        );
        assert_eq!(msg, "Image data must be Base64 encoded");
    }

    #[test]
    fn test_content_mismatch_rejected() {
        let input = format!("data:image/png;base64,{}", encode(&jpeg_bytes(32)));
        let msg = validation_message(parse_data_url(&input, &IntakeLimits::default()).unwrap_err());
        assert_eq!(msg, "Image content does not match declared type image/png");
    }

    #[test]
    fn test_unrecognized_content_rejected() {
        let input = encode(b"definitely not an image");
        let msg = validation_message(parse_data_url(&input, &IntakeLimits::default()).unwrap_err());
        assert!(msg.starts_with("Failed to read image"));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        for input in ["", "   ", "data:image/png;base64,"] {
            let msg = validation_message(parse_data_url(input, &IntakeLimits::default()).unwrap_err());
            assert_eq!(msg, "No image data provided");
        }
    }

    #[test]
    fn test_format_restricted_by_limits() {
        let limits = IntakeLimits {
            allowed: vec![ImageFormat::Jpeg],
            ..IntakeLimits::default()
        };
        let msg = validation_message(parse_data_url(&encode(&png_bytes(16)), &limits).unwrap_err());
        assert_eq!(msg, "Unsupported image type: image/png. Allowed: image/jpeg");
    }

    #[test]
    fn test_load_image_file() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        let bytes = jpeg_bytes(2048);
        file.write_all(&bytes).unwrap();

        let payload = load_image_file(file.path(), &IntakeLimits::default()).unwrap();
        assert_eq!(payload.format, ImageFormat::Jpeg);
        assert_eq!(payload.bytes, bytes);
    }

    #[test]
    fn test_load_image_file_too_large() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&png_bytes(4096)).unwrap();

        let limits = IntakeLimits {
            max_bytes: 1024,
            ..IntakeLimits::default()
        };
        let msg = validation_message(load_image_file(file.path(), &limits).unwrap_err());
        assert_eq!(msg, "Image size must be less than 1KB");
    }

    #[test]
    fn test_size_labels() {
        let mut limits = IntakeLimits::default();
        assert_eq!(limits.max_size_label(), "1MB");
        limits.max_bytes = 512 * 1024;
        assert_eq!(limits.max_size_label(), "512KB");
        limits.max_bytes = 1000;
        assert_eq!(limits.max_size_label(), "1000 bytes");
    }
}

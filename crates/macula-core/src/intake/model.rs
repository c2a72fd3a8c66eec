//! Image intake domain models.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Default upper bound for a decoded image (1 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 1024 * 1024;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Image formats the intake understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Parse from a MIME type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Canonical MIME type.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Detect the format from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_MAGIC) {
            Some(Self::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }
}

/// Size and type constraints applied to every uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeLimits {
    pub max_bytes: usize,
    pub allowed: Vec<ImageFormat>,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            allowed: vec![ImageFormat::Jpeg, ImageFormat::Png],
        }
    }
}

impl IntakeLimits {
    pub fn allows(&self, format: ImageFormat) -> bool {
        self.allowed.contains(&format)
    }

    /// Allowed MIME types as a comma-separated list, for error messages.
    pub fn allowed_mimes(&self) -> String {
        self.allowed
            .iter()
            .map(|f| f.mime())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Longest Base64 text that can decode to at most `max_bytes`.
    pub fn max_encoded_len(&self) -> usize {
        self.max_bytes.div_ceil(3) * 4
    }

    /// The size limit in the form shown to users ("1MB", "512KB").
    pub fn max_size_label(&self) -> String {
        const MB: usize = 1024 * 1024;
        if self.max_bytes >= MB && self.max_bytes % MB == 0 {
            format!("{}MB", self.max_bytes / MB)
        } else if self.max_bytes >= 1024 && self.max_bytes % 1024 == 0 {
            format!("{}KB", self.max_bytes / 1024)
        } else {
            format!("{} bytes", self.max_bytes)
        }
    }
}

/// A validated image ready to be sent to the delegates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw Base64 without any data-URL header.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime(), self.to_base64())
    }
}

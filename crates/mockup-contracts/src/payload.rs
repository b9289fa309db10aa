use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::styles::AspectRatio;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,
    #[error("data URI is not an image ({0})")]
    NotAnImage(String),
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("data URI payload is not valid base64: {0}")]
    Decode(String),
}

/// Encoded image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new("image/png", bytes)
    }

    /// `data:image/<fmt>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    pub fn parse_data_uri(raw: &str) -> Result<Self, DataUriError> {
        let rest = raw
            .trim()
            .strip_prefix("data:")
            .ok_or(DataUriError::MissingScheme)?;
        let (mime_type, payload) = rest.split_once(";base64,").ok_or(DataUriError::NotBase64)?;
        let format = mime_type.strip_prefix("image/").unwrap_or_default();
        if format.is_empty() || format.contains([';', ',', '/']) {
            return Err(DataUriError::NotAnImage(mime_type.to_string()));
        }
        let bytes = BASE64
            .decode(payload.as_bytes())
            .map_err(|err| DataUriError::Decode(err.to_string()))?;
        Ok(Self::new(mime_type, bytes))
    }

    pub fn base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// The uploaded artwork. Dimensions only drive the default aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub payload: ImagePayload,
    pub width: u32,
    pub height: u32,
}

impl SourceImage {
    pub fn new(payload: ImagePayload, width: u32, height: u32) -> Self {
        Self {
            payload,
            width,
            height,
        }
    }

    /// Reads natural dimensions from the encoded bytes; unreadable headers yield 0x0.
    pub fn from_bytes(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let (width, height) = image::ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok())
            .unwrap_or((0, 0));
        Self::new(ImagePayload::new(mime_type, bytes), width, height)
    }

    pub fn default_aspect_ratio(&self) -> AspectRatio {
        AspectRatio::nearest(self.width, self.height)
    }
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BASE64
            .decode(raw.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

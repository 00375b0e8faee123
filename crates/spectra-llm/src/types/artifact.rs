use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SpectraError};

/// Generated payload (image, audio, file) attached to a tool result.
///
/// `data` always holds base64 text; `raw_content` decodes it back to bytes
/// and `from_raw_content` is its inverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Option<String>,
    pub data: String,
    pub mime_type: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Artifact {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: None,
            data: data.into(),
            mime_type: mime_type.into(),
            metadata: Map::new(),
        }
    }

    pub fn from_raw_content(content: impl AsRef<[u8]>, mime_type: impl Into<String>) -> Self {
        Self::new(STANDARD.encode(content.as_ref()), mime_type)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn raw_content(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| SpectraError::InvalidStream(format!("Artifact data is not base64: {}", e)))
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single source backing part of the model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_index: Option<u32>,
}

impl Citation {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_title: None,
            source_text: None,
            start_index: None,
            end_index: None,
        }
    }
}

/// A slice of output text together with the citations that support it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePartWithCitations {
    pub output_text: String,

    #[serde(default)]
    pub citations: Vec<Citation>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_content: Map<String, Value>,
}

impl MessagePartWithCitations {
    pub fn new(output_text: impl Into<String>) -> Self {
        Self {
            output_text: output_text.into(),
            citations: Vec::new(),
            additional_content: Map::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}

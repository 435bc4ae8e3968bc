use crate::error::{ReconciliationError, Result};
use crate::schema::FormType;
use base64::Engine;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// A user turn carrying the document bytes inline, followed by the instruction text.
    pub fn user_with_document(text: impl Into<String>, document: &SourceDocument) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![
                Part::InlineData {
                    inline_data: Blob {
                        mime_type: document.mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(&document.bytes),
                    },
                },
                Part::Text { text: text.into() },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    BankStatement,
    TaxForm(FormType),
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::BankStatement => f.write_str("bank statement"),
            DocumentKind::TaxForm(form) => write!(f, "{} form", form),
        }
    }
}

/// A scanned source document and the reconciliation line it feeds.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Reconciliation item label, e.g. the bank name or `PND3`.
    pub label: String,
    pub kind: DocumentKind,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(
        label: impl Into<String>,
        kind: DocumentKind,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            label: label.into(),
            kind,
            file_name,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(
        label: impl Into<String>,
        kind: DocumentKind,
        path: &Path,
    ) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ReconciliationError::ExtractionFailed(format!(
                    "Invalid file name: {}",
                    path.display()
                ))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(label, kind, file_name, bytes))
    }
}

/// Structured answer the model is asked to return for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedAmountResponse {
    #[schemars(description = "True when the requested amount is printed in the document")]
    pub found: bool,

    #[schemars(description = "The amount as a plain number without separators; 0 when not found")]
    pub amount: f64,

    #[schemars(description = "The printed text the amount was read from")]
    pub evidence: String,
}

/// JSON schema for `T` in the subset the Gemini `responseSchema` field accepts.
pub fn response_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
        object.remove("definitions");
    }
    value
}

use crate::error::{ReconciliationError, Result};
use crate::llm::prompts::{instruction_for, SYSTEM_PROMPT_AMOUNT};
use crate::llm::{client::GeminiClient, types::*};
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Reads one reconciliation amount per document through Gemini.
pub struct AmountExtractor {
    client: GeminiClient,
    model: String,
    system_prompt: String,
    period: Option<(i32, u32)>,
}

impl AmountExtractor {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: SYSTEM_PROMPT_AMOUNT.to_string(),
            period: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Pins every instruction to one reporting month.
    pub fn with_period(mut self, year: i32, month: u32) -> Self {
        self.period = Some((year, month));
        self
    }

    pub async fn extract(&self, document: &SourceDocument) -> Result<f64> {
        debug!(
            "Extracting {} amount from '{}'",
            document.kind, document.file_name
        );

        let instruction = instruction_for(document.kind, &document.file_name, self.period);
        let messages = vec![Content::user_with_document(instruction, document)];

        let raw = self
            .client
            .generate_content(
                &self.model,
                &self.system_prompt,
                messages,
                Some(response_schema_for::<ExtractedAmountResponse>()),
            )
            .await?;

        parse_amount_response(&raw)
    }

    /// Like [`extract`](Self::extract), but any failure becomes an absent amount.
    pub async fn extract_or_absent(&self, document: &SourceDocument) -> Option<f64> {
        match self.extract(document).await {
            Ok(amount) => Some(amount),
            Err(e) => {
                warn!(
                    "No amount for '{}' from '{}': {}",
                    document.label, document.file_name, e
                );
                None
            }
        }
    }

    /// Extracts every document concurrently. The map is keyed by item label and
    /// feeds straight into [`crate::reconciliation::build_items`].
    pub async fn extract_all(&self, documents: &[SourceDocument]) -> BTreeMap<String, Option<f64>> {
        let results = join_all(documents.iter().map(|doc| self.extract_or_absent(doc))).await;

        let amounts: BTreeMap<String, Option<f64>> = documents
            .iter()
            .map(|doc| doc.label.clone())
            .zip(results)
            .collect();

        info!(
            "Extracted {} of {} document amounts",
            amounts.values().filter(|a| a.is_some()).count(),
            amounts.len()
        );

        amounts
    }
}

fn parse_amount_response(raw: &str) -> Result<f64> {
    let cleaned = clean_json_output(raw);
    let response: ExtractedAmountResponse = serde_json::from_str(&cleaned).map_err(|e| {
        ReconciliationError::ExtractionFailed(format!("Response JSON parse failed: {}", e))
    })?;

    if !response.found {
        return Err(ReconciliationError::ExtractionFailed(
            "Amount not found in document".to_string(),
        ));
    }
    if !response.amount.is_finite() {
        return Err(ReconciliationError::ExtractionFailed(format!(
            "Model returned a non-finite amount ({})",
            response.evidence
        )));
    }

    Ok(response.amount)
}

fn clean_json_output(raw: &str) -> String {
    if let Some(start) = raw.find('{') {
        if let Some(end) = raw.rfind('}') {
            if end > start {
                return raw[start..=end].to_string();
            }
        }
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_found_amount() {
        let raw = r#"{"found": true, "amount": 152340.5, "evidence": "ยอดคงเหลือ 152,340.50"}"#;
        assert!((parse_amount_response(raw).unwrap() - 152_340.5).abs() < 0.01);
    }

    #[test]
    fn test_parse_strips_code_fences() {
        let raw = "```json\n{\"found\": true, \"amount\": -200, \"evidence\": \"(200.00)\"}\n```";
        assert!((parse_amount_response(raw).unwrap() + 200.0).abs() < 0.01);
    }

    #[test]
    fn test_not_found_is_an_error() {
        let raw = r#"{"found": false, "amount": 0, "evidence": ""}"#;
        assert!(matches!(
            parse_amount_response(raw),
            Err(ReconciliationError::ExtractionFailed(_))
        ));
        assert!(parse_amount_response("no json here").is_err());
    }
}

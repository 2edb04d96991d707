//! Clasificación de todas las páginas de una reclamación en las cinco
//! categorías documentales, con una única llamada estructurada al LLM.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::llm::{LlmError, StructuredLlm};
use crate::models::{ClassificationEntry, ClassificationResult, Page};
use crate::prompts;

/// Error terminal: no existe clasificación parcial.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("no pages to classify")]
    NoPages,

    #[error("classification call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("malformed classification response: {0}")]
    Malformed(String),
}

pub struct Classifier<L> {
    llm: Arc<L>,
}

impl<L: StructuredLlm> Classifier<L> {
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }

    pub async fn classify(&self, pages: &[Page]) -> Result<ClassificationResult, ClassificationError> {
        if pages.is_empty() {
            return Err(ClassificationError::NoPages);
        }

        let prompt = prompts::CLASSIFICATION_PROMPT
            .replace("{categories}", &prompts::category_list())
            .replace("{documents_text}", &prompts::classification_text(pages));

        let raw: ClassificationResult = self
            .llm
            .invoke_structured(prompts::CLASSIFIER_PREAMBLE, &prompt)
            .await?;

        let result = normalize(raw)?;
        info!(
            pages = pages.len(),
            present = ?result.present_categories(),
            "Clasificación completada"
        );
        Ok(result)
    }
}

/// Valida confianzas y limpia las entradas de categorías ausentes para que
/// nunca lleven un fichero o una confianza inventados.
pub fn normalize(mut result: ClassificationResult) -> Result<ClassificationResult, ClassificationError> {
    for category in crate::models::DocumentCategory::ALL {
        let entry = result.entry_mut(category);
        if !entry.present {
            *entry = ClassificationEntry::absent(std::mem::take(&mut entry.reason));
            continue;
        }
        if let Some(confidence) = entry.confidence {
            if !(0.0..=100.0).contains(&confidence) {
                return Err(ClassificationError::Malformed(format!(
                    "confidence {confidence} for {category} is outside 0-100"
                )));
            }
        }
        if entry.filename.as_deref().is_some_and(|f| f.trim().is_empty()) {
            entry.filename = None;
        }
    }
    Ok(result)
}

//! Vía rápida: clasificación y extracción en una única llamada al LLM.
//!
//! La respuesta ancha se reconvierte en `(ClassificationResult, ExtractionBatch)`
//! para pasar por el mismo unificador que la vía normal.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::{self, ClassificationError};
use crate::llm::StructuredLlm;
use crate::models::{
    ClassificationEntry, ClassificationResult, DocumentCategory, ExtractionBatch,
    ExtractionOutcome, Page,
};
use crate::prompts;
use crate::schema::{
    BillExtraction, ClaimFormExtraction, DischargeSummaryExtraction, ExtractedFields,
    IdCardExtraction, PharmacyBillExtraction,
};

/// Classification of all five document types plus the extracted data of each present one
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationAndExtraction {
    /// Hospital or medical bill classification
    #[serde(rename = "BILL_classification")]
    pub bill_classification: ClassificationEntry,
    /// Patient discharge summary classification
    #[serde(rename = "DISCHARGE_SUMMARY_classification")]
    pub discharge_summary_classification: ClassificationEntry,
    /// Identity card classification
    #[serde(rename = "ID_CARD_classification")]
    pub id_card_classification: ClassificationEntry,
    /// Pharmacy or medicine bill classification
    #[serde(rename = "PHARMACY_BILL_classification")]
    pub pharmacy_bill_classification: ClassificationEntry,
    /// Insurance claim form classification
    #[serde(rename = "CLAIM_FORM_classification")]
    pub claim_form_classification: ClassificationEntry,

    /// Extracted bill data if BILL is present
    #[serde(rename = "BILL_data", default)]
    pub bill_data: Option<BillExtraction>,
    /// Extracted discharge summary data if present
    #[serde(rename = "DISCHARGE_SUMMARY_data", default)]
    pub discharge_summary_data: Option<DischargeSummaryExtraction>,
    /// Extracted ID card data if present
    #[serde(rename = "ID_CARD_data", default)]
    pub id_card_data: Option<IdCardExtraction>,
    /// Extracted pharmacy bill data if present
    #[serde(rename = "PHARMACY_BILL_data", default)]
    pub pharmacy_bill_data: Option<PharmacyBillExtraction>,
    /// Extracted claim form data if present
    #[serde(rename = "CLAIM_FORM_data", default)]
    pub claim_form_data: Option<ClaimFormExtraction>,
}

impl ClassificationAndExtraction {
    fn take_data(&mut self, category: DocumentCategory) -> Option<ExtractedFields> {
        match category {
            DocumentCategory::Bill => self.bill_data.take().map(ExtractedFields::Bill),
            DocumentCategory::DischargeSummary => self
                .discharge_summary_data
                .take()
                .map(ExtractedFields::DischargeSummary),
            DocumentCategory::IdCard => self.id_card_data.take().map(ExtractedFields::IdCard),
            DocumentCategory::PharmacyBill => self
                .pharmacy_bill_data
                .take()
                .map(ExtractedFields::PharmacyBill),
            DocumentCategory::ClaimForm => {
                self.claim_form_data.take().map(ExtractedFields::ClaimForm)
            }
        }
    }

    /// Reparte la respuesta ancha en la forma de la vía normal.
    /// Categoría presente sin datos ⇒ extracción fallida; ausente ⇒ sin resultado.
    pub fn into_parts(mut self) -> Result<(ClassificationResult, ExtractionBatch), ClassificationError> {
        let classification = classifier::normalize(ClassificationResult {
            bill: self.bill_classification.clone(),
            discharge_summary: self.discharge_summary_classification.clone(),
            id_card: self.id_card_classification.clone(),
            pharmacy_bill: self.pharmacy_bill_classification.clone(),
            claim_form: self.claim_form_classification.clone(),
        })?;

        let mut outcomes = Vec::new();
        for (category, entry) in classification.iter() {
            if !entry.present {
                continue;
            }
            let filename = entry.filename.clone().unwrap_or_default();
            let outcome = match self.take_data(category) {
                Some(fields) => ExtractionOutcome::succeeded(filename, fields),
                None => ExtractionOutcome::failed(
                    filename,
                    category,
                    format!("no data extracted for {category}"),
                ),
            };
            outcomes.push(outcome);
        }

        Ok((classification, ExtractionBatch::from_outcomes(outcomes)))
    }
}

pub struct FastClaimGenerator<L> {
    llm: Arc<L>,
}

impl<L: StructuredLlm> FastClaimGenerator<L> {
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }

    pub async fn generate(&self, pages: &[Page]) -> Result<ClassificationAndExtraction, ClassificationError> {
        if pages.is_empty() {
            return Err(ClassificationError::NoPages);
        }

        info!(pages = pages.len(), "Iniciando generación rápida de la reclamación");
        let prompt = prompts::FAST_CLAIM_PROMPT
            .replace("{documents_text}", &prompts::fast_claim_text(pages));

        let response: ClassificationAndExtraction = self
            .llm
            .invoke_structured(prompts::FAST_CLAIM_PREAMBLE, &prompt)
            .await?;
        info!("Generación rápida completada");
        Ok(response)
    }
}

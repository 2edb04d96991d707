//! Orquestación completa de una reclamación:
//!   1. Clasificación (una llamada, debe terminar antes de extraer).
//!   2. Extracción en paralelo de cada documento presente.
//!   3. Unificación y decisión.
//!
//! La vía rápida sustituye 1 y 2 por una sola llamada y comparte el paso 3.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::classifier::{ClassificationError, Classifier};
use crate::extractor::{ExtractionError, Extractor};
use crate::fast_claim::FastClaimGenerator;
use crate::llm::StructuredLlm;
use crate::models::{ClassificationResult, ExtractionBatch, Page};
use crate::unifier::{self, UnifiedReport};

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Todo lo que produce una petición; nada sobrevive a ella.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub classification: ClassificationResult,
    pub extraction: ExtractionBatch,
    pub report: UnifiedReport,
}

impl ClaimOutcome {
    fn build(classification: ClassificationResult, extraction: ExtractionBatch) -> Self {
        let report = unifier::unify(&classification, &extraction);
        info!(
            documents = report.documents.len(),
            missing = ?report.validation.missing_documents,
            discrepancies = report.validation.discrepancies.len(),
            status = ?report.decision.status,
            "Decisión de la reclamación"
        );
        Self {
            classification,
            extraction,
            report,
        }
    }
}

pub struct ClaimPipeline<L> {
    classifier: Classifier<L>,
    extractor: Extractor<L>,
    fast: FastClaimGenerator<L>,
}

impl<L: StructuredLlm> ClaimPipeline<L> {
    /// `fast_llm` atiende la vía rápida; puede ser el mismo cliente.
    pub fn new(llm: Arc<L>, fast_llm: Arc<L>) -> Self {
        Self {
            classifier: Classifier::new(Arc::clone(&llm)),
            extractor: Extractor::new(llm),
            fast: FastClaimGenerator::new(fast_llm),
        }
    }

    pub async fn generate_claim(&self, pages: Arc<[Page]>) -> Result<ClaimOutcome, ClaimError> {
        info!(pages = pages.len(), "Procesando reclamación");

        let classification = self.classifier.classify(&pages).await?;
        let extraction = self
            .extractor
            .extract_batch(&classification, Arc::clone(&pages))
            .await?;

        Ok(ClaimOutcome::build(classification, extraction))
    }

    pub async fn generate_claim_fast(&self, pages: Arc<[Page]>) -> Result<ClaimOutcome, ClaimError> {
        let response = self.fast.generate(&pages).await?;
        let (classification, extraction) = response.into_parts()?;

        Ok(ClaimOutcome::build(classification, extraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;
    use crate::models::DocumentCategory;
    use crate::unifier::{DecisionStatus, APPROVED_REASON};
    use serde_json::{json, Value};

    fn pages() -> Arc<[Page]> {
        vec![
            Page::new("bill.pdf", 1, "CITY HOSPITAL INVOICE"),
            Page::new("summary.pdf", 1, "DISCHARGE SUMMARY"),
            Page::new("id.pdf", 1, "AADHAR"),
            Page::new("form.pdf", 1, "CLAIM FORM"),
        ]
        .into()
    }

    fn entry(filename: &str, present: bool) -> Value {
        if present {
            json!({"filename": filename, "confidence": 95.0, "present": true, "reason": "match"})
        } else {
            json!({"filename": null, "confidence": null, "present": false, "reason": "not found"})
        }
    }

    fn classification(id_card_present: bool) -> Value {
        json!({
            "BILL": entry("bill.pdf", true),
            "DISCHARGE_SUMMARY": entry("summary.pdf", true),
            "ID_CARD": entry("id.pdf", id_card_present),
            "PHARMACY_BILL": entry("", false),
            "CLAIM_FORM": entry("form.pdf", true),
        })
    }

    fn mock(id_card_present: bool, claim_name: &str) -> MockLlm {
        let dates = json!({"admission_date": "2024-03-01", "discharge_date": "2024-03-05"});
        let mut bill = json!({"patient_name": "Jane Doe", "total_amount": 1200.0});
        let mut summary = json!({"patient_name": "Jane Doe", "diagnosis": "Dengue"});
        for target in [&mut bill, &mut summary] {
            for (k, v) in dates.as_object().unwrap() {
                target[k] = v.clone();
            }
        }
        MockLlm::new()
            .with_response("ClassificationResult", classification(id_card_present))
            .with_response("BillExtraction", bill)
            .with_response("DischargeSummaryExtraction", summary)
            .with_response("IdCardExtraction", json!({"name": "Jane Doe", "id_type": "Aadhar"}))
            .with_response("ClaimFormExtraction", json!({"patient_name": claim_name}))
    }

    fn pipeline(llm: MockLlm) -> (ClaimPipeline<MockLlm>, Arc<MockLlm>) {
        let llm = Arc::new(llm);
        (ClaimPipeline::new(llm.clone(), llm.clone()), llm)
    }

    #[tokio::test]
    async fn complete_consistent_claim_is_approved() {
        let (pipeline, llm) = pipeline(mock(true, "Jane Doe"));

        let outcome = pipeline.generate_claim(pages()).await.unwrap();
        assert_eq!(outcome.report.decision.status, DecisionStatus::Approved);
        assert_eq!(outcome.report.decision.reason, APPROVED_REASON);
        assert_eq!(outcome.extraction.successful_extractions, 4);

        let calls = llm.calls();
        assert_eq!(calls[0].schema, "ClassificationResult");
        assert_eq!(calls.len(), 5);
        assert!(llm.calls_for("PharmacyBillExtraction").is_empty());
    }

    #[tokio::test]
    async fn absent_id_card_is_pending() {
        let (pipeline, llm) = pipeline(mock(false, "Jane Doe"));

        let outcome = pipeline.generate_claim(pages()).await.unwrap();
        assert_eq!(outcome.report.decision.status, DecisionStatus::Pending);
        assert_eq!(
            outcome.report.validation.missing_documents,
            vec![DocumentCategory::IdCard]
        );
        assert!(outcome.report.decision.reason.contains("ID_CARD"));
        assert!(llm.calls_for("IdCardExtraction").is_empty());
    }

    #[tokio::test]
    async fn mismatching_names_are_pending() {
        let (pipeline, _) = pipeline(mock(true, "John Doe"));

        let outcome = pipeline.generate_claim(pages()).await.unwrap();
        assert_eq!(outcome.report.decision.status, DecisionStatus::Pending);
        let discrepancies = &outcome.report.validation.discrepancies;
        assert_eq!(discrepancies.len(), 1);
        assert!(discrepancies[0].contains("Jane Doe"));
        assert!(discrepancies[0].contains("John Doe"));
    }

    #[tokio::test]
    async fn classified_file_without_pages_counts_as_missing() {
        let llm = mock(true, "Jane Doe");
        let mut classification = classification(true);
        classification["ID_CARD"]["filename"] = json!("scan_003.pdf");
        let (pipeline, _) =
            pipeline(llm.with_response("ClassificationResult", classification));

        let outcome = pipeline.generate_claim(pages()).await.unwrap();
        let id_outcome = outcome
            .extraction
            .results
            .iter()
            .find(|r| r.document_type == DocumentCategory::IdCard)
            .unwrap();
        assert!(!id_outcome.is_success());
        assert!(id_outcome.error_message.as_ref().unwrap().contains("not found"));
        assert_eq!(
            outcome.report.validation.missing_documents,
            vec![DocumentCategory::IdCard]
        );
        assert_eq!(outcome.report.decision.status, DecisionStatus::Pending);
    }

    #[tokio::test]
    async fn classification_failure_aborts_before_extraction() {
        let (pipeline, llm) =
            pipeline(mock(true, "Jane Doe").with_failure("ClassificationResult", "503"));

        let err = pipeline.generate_claim(pages()).await.unwrap_err();
        assert!(matches!(err, ClaimError::Classification(_)));
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test]
    async fn fast_path_reaches_same_decision_as_regular_path() {
        let wide = json!({
            "BILL_classification": entry("bill.pdf", true),
            "DISCHARGE_SUMMARY_classification": entry("summary.pdf", true),
            "ID_CARD_classification": entry("id.pdf", true),
            "PHARMACY_BILL_classification": entry("", false),
            "CLAIM_FORM_classification": entry("form.pdf", true),
            "BILL_data": {"patient_name": "Jane Doe", "admission_date": "2024-03-01", "discharge_date": "2024-03-05", "total_amount": 1200.0},
            "DISCHARGE_SUMMARY_data": {"patient_name": "Jane Doe", "diagnosis": "Dengue", "admission_date": "2024-03-01", "discharge_date": "2024-03-05"},
            "ID_CARD_data": {"name": "Jane Doe", "id_type": "Aadhar"},
            "CLAIM_FORM_data": {"patient_name": "John Doe"}
        });
        let (pipeline, llm) = pipeline(
            mock(true, "John Doe").with_response("ClassificationAndExtraction", wide),
        );

        let regular = pipeline.generate_claim(pages()).await.unwrap();
        let fast = pipeline.generate_claim_fast(pages()).await.unwrap();

        assert_eq!(
            serde_json::to_value(&regular.report).unwrap(),
            serde_json::to_value(&fast.report).unwrap()
        );
        assert_eq!(llm.calls_for("ClassificationAndExtraction").len(), 1);
    }
}

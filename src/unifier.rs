//! Unificación de clasificación + extracción en un informe y decisión final.
//!
//! Función pura: mismas entradas, mismo informe byte a byte.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::models::{ClassificationResult, DocumentCategory, ExtractionBatch};
use crate::schema::{ExtractedFields, IdentityField};

pub const APPROVED_REASON: &str = "all documents consistent and complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Approved,
    Pending,
    /// Reservado: ninguna regla actual produce este estado.
    #[allow(dead_code)]
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub status: DecisionStatus,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub category: DocumentCategory,
    pub fields: ExtractedFields,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub missing_documents: Vec<DocumentCategory>,
    pub discrepancies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedReport {
    pub documents: Vec<ReportDocument>,
    pub validation: Validation,
    pub decision: Decision,
}

pub fn unify(classification: &ClassificationResult, batch: &ExtractionBatch) -> UnifiedReport {
    let documents: Vec<ReportDocument> = batch
        .results
        .iter()
        .filter(|outcome| outcome.is_success())
        .filter_map(|outcome| {
            outcome.extracted_data.as_ref().map(|fields| ReportDocument {
                category: outcome.document_type,
                fields: fields.clone(),
                confidence: classification.entry(outcome.document_type).confidence,
            })
        })
        .collect();

    let missing_documents = missing_required(&documents);
    let discrepancies = find_discrepancies(documents.iter().map(|d| &d.fields));
    let decision = decide(&missing_documents, &discrepancies);

    UnifiedReport {
        documents,
        validation: Validation {
            missing_documents,
            discrepancies,
        },
        decision,
    }
}

/// Categorías obligatorias sin extracción correcta, en el orden de la lista obligatoria.
/// Una extracción fallida no cuenta como presencia.
pub fn missing_required(documents: &[ReportDocument]) -> Vec<DocumentCategory> {
    let present: HashSet<DocumentCategory> = documents.iter().map(|d| d.category).collect();
    DocumentCategory::ALL
        .into_iter()
        .filter(|category| category.is_required() && !present.contains(category))
        .collect()
}

/// Un mensaje por campo de identidad con más de un valor distinto.
/// Los valores se comparan como cadenas opacas y se listan ordenados,
/// así que el orden de los documentos no afecta al resultado.
pub fn find_discrepancies<'a>(fields: impl Iterator<Item = &'a ExtractedFields> + Clone) -> Vec<String> {
    IdentityField::ALL
        .into_iter()
        .filter_map(|field| {
            let values: BTreeSet<&str> = fields.clone().filter_map(|f| f.identity(field)).collect();
            (values.len() > 1).then(|| {
                format!(
                    "{} mismatch across documents: {}",
                    field.label(),
                    values.into_iter().collect::<Vec<_>>().join(", ")
                )
            })
        })
        .collect()
}

/// Precedencia estricta: faltantes, después discrepancias, después aprobado.
pub fn decide(missing: &[DocumentCategory], discrepancies: &[String]) -> Decision {
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|c| c.as_str()).collect();
        return Decision {
            status: DecisionStatus::Pending,
            reason: format!("missing required documents: {}", names.join(", ")),
        };
    }
    if !discrepancies.is_empty() {
        return Decision {
            status: DecisionStatus::Pending,
            reason: format!("inconsistent data across documents: {}", discrepancies.join("; ")),
        };
    }
    Decision {
        status: DecisionStatus::Approved,
        reason: APPROVED_REASON.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationEntry, ExtractionOutcome};
    use crate::schema::{
        BillExtraction, ClaimFormExtraction, DischargeSummaryExtraction, IdCardExtraction,
    };

    fn classification(absent: &[DocumentCategory]) -> ClassificationResult {
        let mut result = ClassificationResult {
            bill: ClassificationEntry::present("bill.pdf", 95.0, ""),
            discharge_summary: ClassificationEntry::present("summary.pdf", 90.0, ""),
            id_card: ClassificationEntry::present("id.pdf", 99.0, ""),
            pharmacy_bill: ClassificationEntry::absent(""),
            claim_form: ClassificationEntry::present("form.pdf", 85.0, ""),
        };
        for category in absent {
            *result.entry_mut(*category) = ClassificationEntry::absent("");
        }
        result
    }

    fn bill(name: &str) -> ExtractionOutcome {
        ExtractionOutcome::succeeded(
            "bill.pdf",
            ExtractedFields::Bill(BillExtraction {
                patient_name: Some(name.into()),
                admission_date: Some("2024-03-01".into()),
                discharge_date: Some("2024-03-05".into()),
                total_amount: Some(1200.0),
                ..Default::default()
            }),
        )
    }

    fn summary(name: &str) -> ExtractionOutcome {
        ExtractionOutcome::succeeded(
            "summary.pdf",
            ExtractedFields::DischargeSummary(DischargeSummaryExtraction {
                patient_name: Some(name.into()),
                admission_date: Some("2024-03-01".into()),
                discharge_date: Some("2024-03-05".into()),
                ..Default::default()
            }),
        )
    }

    fn id_card(name: &str) -> ExtractionOutcome {
        ExtractionOutcome::succeeded(
            "id.pdf",
            ExtractedFields::IdCard(IdCardExtraction {
                name: Some(name.into()),
                ..Default::default()
            }),
        )
    }

    fn claim_form(name: &str) -> ExtractionOutcome {
        ExtractionOutcome::succeeded(
            "form.pdf",
            ExtractedFields::ClaimForm(ClaimFormExtraction {
                patient_name: Some(name.into()),
                ..Default::default()
            }),
        )
    }

    fn consistent_batch() -> ExtractionBatch {
        ExtractionBatch::from_outcomes(vec![
            bill("Jane Doe"),
            summary("Jane Doe"),
            id_card("Jane Doe"),
            claim_form("Jane Doe"),
        ])
    }

    #[test]
    fn complete_and_consistent_claim_is_approved() {
        let report = unify(&classification(&[]), &consistent_batch());

        assert_eq!(report.decision.status, DecisionStatus::Approved);
        assert_eq!(report.decision.reason, APPROVED_REASON);
        assert!(report.validation.missing_documents.is_empty());
        assert!(report.validation.discrepancies.is_empty());
        assert_eq!(report.documents.len(), 4);
        assert_eq!(report.documents[2].confidence, Some(99.0));
    }

    #[test]
    fn absent_id_card_leaves_claim_pending() {
        let classification = classification(&[DocumentCategory::IdCard]);
        let batch = ExtractionBatch::from_outcomes(vec![
            bill("Jane Doe"),
            summary("Jane Doe"),
            claim_form("Jane Doe"),
        ]);

        let report = unify(&classification, &batch);
        assert_eq!(report.decision.status, DecisionStatus::Pending);
        assert_eq!(report.validation.missing_documents, vec![DocumentCategory::IdCard]);
        assert!(report.decision.reason.contains("ID_CARD"));
    }

    #[test]
    fn conflicting_patient_names_leave_claim_pending() {
        let batch = ExtractionBatch::from_outcomes(vec![
            bill("Jane Doe"),
            summary("Jane Doe"),
            id_card("Jane Doe"),
            claim_form("John Doe"),
        ]);

        let report = unify(&classification(&[]), &batch);
        assert_eq!(report.decision.status, DecisionStatus::Pending);
        assert_eq!(
            report.validation.discrepancies,
            vec!["patient name mismatch across documents: Jane Doe, John Doe".to_string()]
        );
        assert!(report.decision.reason.contains("Jane Doe"));
        assert!(report.decision.reason.contains("John Doe"));
    }

    #[test]
    fn failed_extraction_counts_as_missing() {
        let batch = ExtractionBatch::from_outcomes(vec![
            ExtractionOutcome::failed("bill.pdf", DocumentCategory::Bill, "Document bill.pdf not found"),
            summary("Jane Doe"),
            id_card("Jane Doe"),
            claim_form("Jane Doe"),
        ]);

        let report = unify(&classification(&[]), &batch);
        assert_eq!(report.validation.missing_documents, vec![DocumentCategory::Bill]);
        assert_eq!(report.decision.status, DecisionStatus::Pending);
        assert_eq!(report.documents.len(), 3);
    }

    #[test]
    fn missing_documents_take_precedence_over_discrepancies() {
        let classification = classification(&[DocumentCategory::DischargeSummary]);
        let batch = ExtractionBatch::from_outcomes(vec![
            bill("Jane Doe"),
            id_card("John Doe"),
            claim_form("Jane Doe"),
        ]);

        let report = unify(&classification, &batch);
        assert_eq!(report.validation.discrepancies.len(), 1);
        assert!(report.decision.reason.starts_with("missing required documents"));
        assert!(!report.decision.reason.contains("John Doe"));
    }

    #[test]
    fn missing_list_keeps_required_order() {
        let report = unify(&classification(&[]), &ExtractionBatch::from_outcomes(vec![summary("A")]));
        assert_eq!(
            report.validation.missing_documents,
            vec![DocumentCategory::Bill, DocumentCategory::IdCard, DocumentCategory::ClaimForm]
        );
        assert_eq!(
            report.decision.reason,
            "missing required documents: BILL, ID_CARD, CLAIM_FORM"
        );
    }

    #[test]
    fn unify_is_deterministic() {
        let classification = classification(&[]);
        let batch = ExtractionBatch::from_outcomes(vec![
            bill("Jane Doe"),
            summary("J. Doe"),
            id_card("Jane Doe"),
            claim_form("John Doe"),
        ]);

        let first = serde_json::to_string(&unify(&classification, &batch)).unwrap();
        let second = serde_json::to_string(&unify(&classification, &batch)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn discrepancies_do_not_depend_on_document_order() {
        let mut outcomes = vec![
            bill("Jane Doe"),
            summary("J. Doe"),
            id_card("Jane Doe"),
            claim_form("John Doe"),
        ];
        let forward = unify(&classification(&[]), &ExtractionBatch::from_outcomes(outcomes.clone()));
        outcomes.reverse();
        let backward = unify(&classification(&[]), &ExtractionBatch::from_outcomes(outcomes));

        assert_eq!(forward.validation.discrepancies, backward.validation.discrepancies);
        assert_eq!(
            forward.validation.discrepancies,
            vec!["patient name mismatch across documents: J. Doe, Jane Doe, John Doe".to_string()]
        );
    }

    #[test]
    fn dates_are_compared_as_opaque_strings() {
        let other_format = ExtractionOutcome::succeeded(
            "summary.pdf",
            ExtractedFields::DischargeSummary(DischargeSummaryExtraction {
                patient_name: Some("Jane Doe".into()),
                admission_date: Some("01/03/2024".into()),
                discharge_date: Some("2024-03-05".into()),
                ..Default::default()
            }),
        );
        let batch = ExtractionBatch::from_outcomes(vec![
            bill("Jane Doe"),
            other_format,
            id_card("Jane Doe"),
            claim_form("Jane Doe"),
        ]);

        let report = unify(&classification(&[]), &batch);
        assert_eq!(
            report.validation.discrepancies,
            vec!["admission date mismatch across documents: 01/03/2024, 2024-03-01".to_string()]
        );
    }

    #[test]
    fn surrounding_whitespace_is_not_a_discrepancy() {
        let batch = ExtractionBatch::from_outcomes(vec![
            bill("Jane Doe"),
            summary(" Jane Doe"),
            id_card("Jane Doe"),
            claim_form("Jane Doe "),
        ]);

        let report = unify(&classification(&[]), &batch);
        assert!(report.validation.discrepancies.is_empty());
        assert_eq!(report.decision.status, DecisionStatus::Approved);
    }

    #[test]
    fn pharmacy_bill_is_optional() {
        let report = unify(&classification(&[]), &consistent_batch());
        assert!(!report
            .validation
            .missing_documents
            .contains(&DocumentCategory::PharmacyBill));
    }

    #[test]
    fn rejected_is_never_produced() {
        let cases = [
            decide(&[], &[]),
            decide(&[DocumentCategory::Bill], &[]),
            decide(&[], &["x".to_string()]),
            decide(&[DocumentCategory::ClaimForm], &["x".to_string()]),
        ];
        assert!(cases.iter().all(|d| d.status != DecisionStatus::Rejected));
        assert_eq!(
            serde_json::to_string(&DecisionStatus::Rejected).unwrap(),
            "\"rejected\""
        );
    }
}

//! Modelos de dominio: páginas cargadas, categorías documentales,
//! resultado de clasificación y resultados de extracción.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::ExtractedFields;

/// Unidad inmutable de texto: una página de un fichero subido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub source_filename: String,
    /// Empieza en 1.
    pub page_index: u32,
    pub text: String,
}

impl Page {
    pub fn new(source_filename: impl Into<String>, page_index: u32, text: impl Into<String>) -> Self {
        Self {
            source_filename: source_filename.into(),
            page_index,
            text: text.into(),
        }
    }
}

/// Conjunto cerrado de categorías documentales de una reclamación.
/// El orden de declaración es el orden de enumeración en el wire y no debe cambiar.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    Bill,
    DischargeSummary,
    IdCard,
    PharmacyBill,
    ClaimForm,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 5] = [
        Self::Bill,
        Self::DischargeSummary,
        Self::IdCard,
        Self::PharmacyBill,
        Self::ClaimForm,
    ];


    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bill => "BILL",
            Self::DischargeSummary => "DISCHARGE_SUMMARY",
            Self::IdCard => "ID_CARD",
            Self::PharmacyBill => "PHARMACY_BILL",
            Self::ClaimForm => "CLAIM_FORM",
        }
    }

    /// PHARMACY_BILL es la única categoría opcional.
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::PharmacyBill)
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clasificación de una categoría concreta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationEntry {
    /// Exact filename of the uploaded document holding this category, null if not present
    #[serde(default)]
    pub filename: Option<String>,
    /// Confidence score between 0 and 100, null if not present
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Whether a document of this category is present
    pub present: bool,
    /// Brief explanation for the classification
    #[serde(default)]
    pub reason: String,
}

impl ClassificationEntry {
    pub fn absent(reason: impl Into<String>) -> Self {
        Self {
            filename: None,
            confidence: None,
            present: false,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
impl ClassificationEntry {
    pub fn present(filename: impl Into<String>, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            confidence: Some(confidence),
            present: true,
            reason: reason.into(),
        }
    }
}

/// Resultado de clasificación: exactamente una entrada por categoría.
/// Es también el esquema estructurado que se pide al LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationResult {
    /// Hospital or medical bill
    #[serde(rename = "BILL")]
    pub bill: ClassificationEntry,
    /// Patient discharge summary
    #[serde(rename = "DISCHARGE_SUMMARY")]
    pub discharge_summary: ClassificationEntry,
    /// Identity card (Aadhar, PAN, Driver's License, etc.)
    #[serde(rename = "ID_CARD")]
    pub id_card: ClassificationEntry,
    /// Pharmacy or medicine bill
    #[serde(rename = "PHARMACY_BILL")]
    pub pharmacy_bill: ClassificationEntry,
    /// Insurance claim form
    #[serde(rename = "CLAIM_FORM")]
    pub claim_form: ClassificationEntry,
}

impl ClassificationResult {
    pub fn entry(&self, category: DocumentCategory) -> &ClassificationEntry {
        match category {
            DocumentCategory::Bill => &self.bill,
            DocumentCategory::DischargeSummary => &self.discharge_summary,
            DocumentCategory::IdCard => &self.id_card,
            DocumentCategory::PharmacyBill => &self.pharmacy_bill,
            DocumentCategory::ClaimForm => &self.claim_form,
        }
    }

    pub fn entry_mut(&mut self, category: DocumentCategory) -> &mut ClassificationEntry {
        match category {
            DocumentCategory::Bill => &mut self.bill,
            DocumentCategory::DischargeSummary => &mut self.discharge_summary,
            DocumentCategory::IdCard => &mut self.id_card,
            DocumentCategory::PharmacyBill => &mut self.pharmacy_bill,
            DocumentCategory::ClaimForm => &mut self.claim_form,
        }
    }

    /// Recorre las cinco entradas en orden de enumeración.
    pub fn iter(&self) -> impl Iterator<Item = (DocumentCategory, &ClassificationEntry)> + '_ {
        DocumentCategory::ALL
            .into_iter()
            .map(move |category| (category, self.entry(category)))
    }

    pub fn present_categories(&self) -> Vec<DocumentCategory> {
        self.iter()
            .filter(|(_, entry)| entry.present)
            .map(|(category, _)| category)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Success,
    Failed,
}

/// Resultado de extraer un documento. Inmutable una vez devuelto.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutcome {
    pub filename: String,
    pub document_type: DocumentCategory,
    pub extraction_status: ExtractionStatus,
    pub extracted_data: Option<ExtractedFields>,
    pub error_message: Option<String>,
}

impl ExtractionOutcome {
    pub fn succeeded(filename: impl Into<String>, data: ExtractedFields) -> Self {
        Self {
            filename: filename.into(),
            document_type: data.category(),
            extraction_status: ExtractionStatus::Success,
            extracted_data: Some(data),
            error_message: None,
        }
    }

    pub fn failed(
        filename: impl Into<String>,
        category: DocumentCategory,
        error: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            document_type: category,
            extraction_status: ExtractionStatus::Failed,
            extracted_data: None,
            error_message: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.extraction_status == ExtractionStatus::Success && self.extracted_data.is_some()
    }
}

/// Agregado de todas las extracciones de una petición.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ExtractionBatch {
    pub results: Vec<ExtractionOutcome>,
    pub total_extracted: usize,
    pub successful_extractions: usize,
    pub failed_extractions: usize,
}

impl ExtractionBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_outcomes(results: Vec<ExtractionOutcome>) -> Self {
        let successful_extractions = results.iter().filter(|r| r.is_success()).count();
        Self {
            total_extracted: results.len(),
            failed_extractions: results.len() - successful_extractions,
            successful_extractions,
            results,
        }
    }
}

//! Esquemas de extracción por categoría y tabla de despacho
//! categoría → (esquema, prompt).
//!
//! Cada categoría tiene exactamente un esquema y un prompt. Los `match` de
//! este módulo son exhaustivos y sin rama por defecto: añadir una sexta
//! categoría obliga a darle aquí su esquema y su prompt.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::llm::{LlmError, StructuredLlm};
use crate::models::DocumentCategory;
use crate::prompts;

/// Hospital or medical bill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BillExtraction {
    /// Name of the hospital or medical facility
    pub hospital_name: Option<String>,
    /// Name of the patient
    pub patient_name: Option<String>,
    /// Bill or invoice number
    pub bill_number: Option<String>,
    /// Date of the bill
    pub bill_date: Option<String>,
    /// Admission date if applicable
    pub admission_date: Option<String>,
    /// Discharge date if applicable
    pub discharge_date: Option<String>,
    /// Total bill amount
    pub total_amount: Option<f64>,
    /// Amount paid
    pub paid_amount: Option<f64>,
    /// Balance or outstanding amount
    pub balance_amount: Option<f64>,
    /// List of billed items or services
    pub items: Option<Vec<String>>,
}

/// Patient discharge summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DischargeSummaryExtraction {
    /// Name of the patient
    pub patient_name: Option<String>,
    /// Age of the patient
    pub patient_age: Option<String>,
    /// Gender of the patient
    pub patient_gender: Option<String>,
    /// Date of admission
    pub admission_date: Option<String>,
    /// Date of discharge
    pub discharge_date: Option<String>,
    /// Name of the hospital
    pub hospital_name: Option<String>,
    /// Name of the treating doctor
    pub doctor_name: Option<String>,
    /// Primary diagnosis or condition
    pub diagnosis: Option<String>,
    /// List of procedures or treatments performed
    pub procedures_performed: Option<Vec<String>>,
    /// List of medications prescribed
    pub medications: Option<Vec<String>>,
}

/// Identity card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IdCardExtraction {
    /// Type of ID (Aadhar, PAN, Driver's License, etc.)
    pub id_type: Option<String>,
    /// ID card number
    pub id_number: Option<String>,
    /// Name on the ID card
    pub name: Option<String>,
    /// Date of birth
    pub date_of_birth: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// Address on the ID card
    pub address: Option<String>,
    /// Date of issue
    pub issue_date: Option<String>,
    /// Date of expiry if applicable
    pub expiry_date: Option<String>,
}

/// One medicine line of a pharmacy bill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MedicineLine {
    /// Medicine name
    pub name: Option<String>,
    /// Quantity as printed on the bill
    pub quantity: Option<String>,
    /// Line price
    pub price: Option<f64>,
}

/// Pharmacy or medicine bill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PharmacyBillExtraction {
    /// Name of the pharmacy
    pub pharmacy_name: Option<String>,
    /// Address of the pharmacy
    pub pharmacy_address: Option<String>,
    /// Bill or receipt number
    pub bill_number: Option<String>,
    /// Date of the bill
    pub bill_date: Option<String>,
    /// Name of the patient if available
    pub patient_name: Option<String>,
    /// Name of the prescribing doctor if available
    pub doctor_name: Option<String>,
    /// List of medicines with name, quantity and price
    pub medicines: Option<Vec<MedicineLine>>,
    /// Total bill amount
    pub total_amount: Option<f64>,
    /// Discount applied if any
    pub discount: Option<f64>,
    /// Final amount paid
    pub paid_amount: Option<f64>,
}

/// Insurance claim form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClaimFormExtraction {
    /// Claim form number
    pub claim_number: Option<String>,
    /// Insurance policy number
    pub policy_number: Option<String>,
    /// Name of the insured/patient
    pub patient_name: Option<String>,
    /// Date of claim submission
    pub date_of_claim: Option<String>,
    /// Date of medical incident or treatment
    pub date_of_incident: Option<String>,
    /// Name of the hospital where treatment was received
    pub hospital_name: Option<String>,
    /// Amount claimed
    pub claimed_amount: Option<f64>,
    /// Diagnosis or reason for claim
    pub diagnosis: Option<String>,
    /// Details of treatment received
    pub treatment_details: Option<String>,
    /// Name of the insurance company
    pub insurer_name: Option<String>,
}

/// Campos extraídos de un documento, etiquetados por su categoría.
/// En el wire se serializa como el mapa plano de campos.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractedFields {
    Bill(BillExtraction),
    DischargeSummary(DischargeSummaryExtraction),
    IdCard(IdCardExtraction),
    PharmacyBill(PharmacyBillExtraction),
    ClaimForm(ClaimFormExtraction),
}

/// Campos de identidad que se cruzan entre documentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    PatientName,
    AdmissionDate,
    DischargeDate,
}

impl IdentityField {
    pub const ALL: [IdentityField; 3] = [
        Self::PatientName,
        Self::AdmissionDate,
        Self::DischargeDate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::PatientName => "patient name",
            Self::AdmissionDate => "admission date",
            Self::DischargeDate => "discharge date",
        }
    }
}

impl ExtractedFields {
    pub fn category(&self) -> DocumentCategory {
        match self {
            Self::Bill(_) => DocumentCategory::Bill,
            Self::DischargeSummary(_) => DocumentCategory::DischargeSummary,
            Self::IdCard(_) => DocumentCategory::IdCard,
            Self::PharmacyBill(_) => DocumentCategory::PharmacyBill,
            Self::ClaimForm(_) => DocumentCategory::ClaimForm,
        }
    }

    /// Valor de un campo de identidad; las cadenas vacías cuentan como ausentes.
    /// El nombre del paciente es `patient_name`, o `name` en el documento de identidad.
    pub fn identity(&self, field: IdentityField) -> Option<&str> {
        use IdentityField::*;

        let value = match (self, field) {
            (Self::Bill(b), PatientName) => b.patient_name.as_deref(),
            (Self::Bill(b), AdmissionDate) => b.admission_date.as_deref(),
            (Self::Bill(b), DischargeDate) => b.discharge_date.as_deref(),
            (Self::DischargeSummary(d), PatientName) => d.patient_name.as_deref(),
            (Self::DischargeSummary(d), AdmissionDate) => d.admission_date.as_deref(),
            (Self::DischargeSummary(d), DischargeDate) => d.discharge_date.as_deref(),
            (Self::IdCard(c), PatientName) => c.name.as_deref(),
            (Self::PharmacyBill(p), PatientName) => p.patient_name.as_deref(),
            (Self::ClaimForm(c), PatientName) => c.patient_name.as_deref(),
            (Self::IdCard(_) | Self::PharmacyBill(_) | Self::ClaimForm(_), _) => None,
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Descriptor de una categoría: descripción y plantilla de extracción.
#[derive(Debug, Clone, Copy)]
pub struct CategorySchema {
    pub category: DocumentCategory,
    pub description: &'static str,
    pub extraction_prompt: &'static str,
}

impl CategorySchema {
    pub fn render_prompt(&self, content: &str) -> String {
        self.extraction_prompt.replace("{content}", content)
    }

    /// Línea `CATEGORÍA: descripción` del listado del prompt de clasificación.
    pub fn classification_line(&self) -> String {
        format!("{}: {}", self.category, self.description)
    }
}

impl DocumentCategory {
    pub fn schema(&self) -> CategorySchema {
        let (description, extraction_prompt) = match self {
            Self::Bill => ("Hospital or medical bills", prompts::BILL_PROMPT),
            Self::DischargeSummary => (
                "Patient discharge summaries",
                prompts::DISCHARGE_SUMMARY_PROMPT,
            ),
            Self::IdCard => (
                "Identity cards (Aadhar, PAN, Driver's License, etc.)",
                prompts::ID_CARD_PROMPT,
            ),
            Self::PharmacyBill => ("Pharmacy or medicine bills", prompts::PHARMACY_BILL_PROMPT),
            Self::ClaimForm => ("Insurance claim forms", prompts::CLAIM_FORM_PROMPT),
        };
        CategorySchema {
            category: *self,
            description,
            extraction_prompt,
        }
    }
}

/// Llamada estructurada con el esquema propio de la categoría.
pub async fn extract_fields<L: StructuredLlm>(
    llm: &L,
    category: DocumentCategory,
    content: &str,
) -> Result<ExtractedFields, LlmError> {
    let prompt = category.schema().render_prompt(content);
    let preamble = prompts::EXTRACTOR_PREAMBLE;

    match category {
        DocumentCategory::Bill => llm
            .invoke_structured::<BillExtraction>(preamble, &prompt)
            .await
            .map(ExtractedFields::Bill),
        DocumentCategory::DischargeSummary => llm
            .invoke_structured::<DischargeSummaryExtraction>(preamble, &prompt)
            .await
            .map(ExtractedFields::DischargeSummary),
        DocumentCategory::IdCard => llm
            .invoke_structured::<IdCardExtraction>(preamble, &prompt)
            .await
            .map(ExtractedFields::IdCard),
        DocumentCategory::PharmacyBill => llm
            .invoke_structured::<PharmacyBillExtraction>(preamble, &prompt)
            .await
            .map(ExtractedFields::PharmacyBill),
        DocumentCategory::ClaimForm => llm
            .invoke_structured::<ClaimFormExtraction>(preamble, &prompt)
            .await
            .map(ExtractedFields::ClaimForm),
    }
}

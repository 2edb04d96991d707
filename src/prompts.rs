//! Prompts de clasificación, extracción y vía rápida, y los constructores
//! del texto de las páginas que se inyecta en ellos.

use crate::models::{DocumentCategory, Page};

pub const CLASSIFIER_PREAMBLE: &str = "You are an insurance claim document classifier. \
Answer only through the provided structured schema.";

pub const EXTRACTOR_PREAMBLE: &str = "You are an insurance claim data extractor. \
Answer only through the provided structured schema and never invent values.";

pub const FAST_CLAIM_PREAMBLE: &str = "You are an expert insurance claim processor. \
Answer only through the provided structured schema.";

pub const CLASSIFICATION_PROMPT: &str = r#"Analyze and classify the following documents. For EACH of these 5 categories, determine if it's present:

{categories}

Documents:
{documents_text}

For EACH document type (all 5), you must specify:
- present: true if this type exists, false otherwise
- filename: the exact source filename if present, null if not present
- confidence: score between 0 and 100 if present, null if not present
- reason: brief explanation

Important: Return information for ALL 5 document types, even if some are not present."#;

pub const BILL_PROMPT: &str = r#"Extract all relevant information from this medical bill document.
Focus on extracting:
- Hospital/facility name
- Patient name
- Bill number and date
- Admission and discharge dates
- Amount details (total, paid, balance)
- List of billed items or services

Document content:
{content}

Extract as much information as possible. If a field is not found, leave it as null."#;

pub const DISCHARGE_SUMMARY_PROMPT: &str = r#"Extract all relevant information from this discharge summary document.
Focus on extracting:
- Patient demographics (name, age, gender)
- Admission and discharge dates
- Hospital and doctor name
- Diagnosis
- Procedures performed
- Medications prescribed

Document content:
{content}

Extract as much information as possible. If a field is not found, leave it as null."#;

pub const ID_CARD_PROMPT: &str = r#"Extract all relevant information from this ID card document.
Focus on extracting:
- Type of ID card
- ID number
- Name
- Date of birth
- Gender
- Address
- Issue and expiry dates

Document content:
{content}

Extract as much information as possible. If a field is not found, leave it as null."#;

pub const PHARMACY_BILL_PROMPT: &str = r#"Extract all relevant information from this pharmacy bill document.
Focus on extracting:
- Pharmacy name and address
- Bill number and date
- Patient and doctor names
- List of medicines with name, quantity and price
- Amount details (total, discount, paid)

Document content:
{content}

Extract as much information as possible. If a field is not found, leave it as null."#;

pub const CLAIM_FORM_PROMPT: &str = r#"Extract all relevant information from this insurance claim form document.
Focus on extracting:
- Claim and policy numbers
- Patient name
- Claim and incident dates
- Hospital name
- Claimed amount
- Diagnosis and treatment details
- Insurer name

Document content:
{content}

Extract as much information as possible. If a field is not found, leave it as null."#;

pub const FAST_CLAIM_PROMPT: &str = r#"Analyze ALL the provided documents and perform BOTH classification AND extraction in a single pass.

Documents:
{documents_text}

Your task is to:
1. CLASSIFY each of the 5 document types (BILL, DISCHARGE_SUMMARY, ID_CARD, PHARMACY_BILL, CLAIM_FORM):
   - Determine if each type is present in the uploaded documents
   - Provide the exact source filename for each present document
   - Give a confidence score (0-100) for each present document
   - Explain your reasoning for each classification

2. EXTRACT detailed information from EACH document that is present:
   - BILL: hospital and patient name, bill number and date, admission and discharge dates, amounts (total, paid, balance), billed items
   - DISCHARGE_SUMMARY: patient demographics, admission and discharge dates, hospital and doctor, diagnosis, procedures, medications
   - ID_CARD: ID type and number, name, date of birth, gender, address, issue and expiry dates
   - PHARMACY_BILL: pharmacy name and address, bill number and date, patient and doctor names, medicines, amounts (total, discount, paid)
   - CLAIM_FORM: claim and policy numbers, patient name, claim and incident dates, hospital, claimed amount, diagnosis, treatment, insurer

IMPORTANT:
- You MUST provide classification info for ALL 5 document types (even if not present, set present=false)
- You MUST extract data for EVERY document type that is present, and leave the data null otherwise
- If a field is not found, set it to null"#;

/// Listado numerado de categorías para el prompt de clasificación.
pub fn category_list() -> String {
    DocumentCategory::ALL
        .iter()
        .enumerate()
        .map(|(i, category)| format!("{}. {}", i + 1, category.schema().classification_line()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Texto de todas las páginas para el clasificador.
pub fn classification_text(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|p| format!("Source: {}, Page: {}\n{}", p.source_filename, p.page_index, p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Contenido de un único documento, con separadores explícitos entre páginas.
/// Las páginas deben llegar ya ordenadas.
pub fn extraction_content(pages: &[&Page]) -> String {
    pages
        .iter()
        .map(|p| format!("Page {}:\n{}", p.page_index, p.text))
        .collect::<Vec<_>>()
        .join("\n\n--- Page Break ---\n\n")
}

pub fn fast_claim_text(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|p| {
            format!(
                "=== Document: {}, Page: {} ===\n{}",
                p.source_filename, p.page_index, p.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

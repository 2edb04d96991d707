//! Extracción estructurada por documento.
//!
//! Una tarea por categoría presente, todas en paralelo sobre la misma
//! secuencia inmutable de páginas, y una barrera final que espera a todas.
//! Los fallos de un documento se devuelven como datos (`status = failed`);
//! sólo un fallo de la propia orquestación corta la petición.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn, Instrument};

use crate::llm::StructuredLlm;
use crate::models::{
    ClassificationResult, DocumentCategory, ExtractionBatch, ExtractionOutcome, Page,
};
use crate::{prompts, schema};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction task for {category} did not complete: {message}")]
    TaskJoin {
        category: DocumentCategory,
        message: String,
    },
}

pub struct Extractor<L> {
    llm: Arc<L>,
}

impl<L> Clone for Extractor<L> {
    fn clone(&self) -> Self {
        Self {
            llm: Arc::clone(&self.llm),
        }
    }
}

impl<L: StructuredLlm> Extractor<L> {
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }

    /// Extrae un documento. Nunca devuelve error: cualquier fallo queda
    /// reflejado en el `ExtractionOutcome`.
    pub async fn extract_single(
        &self,
        filename: &str,
        category: DocumentCategory,
        pages: &[Page],
    ) -> ExtractionOutcome {
        let mut doc_pages: Vec<&Page> = pages
            .iter()
            .filter(|p| p.source_filename == filename)
            .collect();

        if doc_pages.is_empty() {
            warn!(%category, filename, "Documento clasificado sin páginas asociadas");
            return ExtractionOutcome::failed(
                filename,
                category,
                format!("Document {filename} not found"),
            );
        }

        doc_pages.sort_by_key(|p| p.page_index);
        let content = prompts::extraction_content(&doc_pages);

        let start = Instant::now();
        match schema::extract_fields(self.llm.as_ref(), category, &content).await {
            Ok(fields) => {
                info!(
                    %category,
                    filename,
                    pages = doc_pages.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Extracción completada"
                );
                ExtractionOutcome::succeeded(filename, fields)
            }
            Err(e) => {
                warn!(%category, filename, error = %e, "Extracción fallida");
                ExtractionOutcome::failed(filename, category, e.to_string())
            }
        }
    }

    /// Lanza una extracción por cada categoría presente, en orden de
    /// enumeración, y espera a que terminen todas antes de agregar.
    pub async fn extract_batch(
        &self,
        classification: &ClassificationResult,
        pages: Arc<[Page]>,
    ) -> Result<ExtractionBatch, ExtractionError> {
        let jobs: Vec<(DocumentCategory, String)> = classification
            .iter()
            .filter(|(_, entry)| entry.present)
            .map(|(category, entry)| (category, entry.filename.clone().unwrap_or_default()))
            .collect();

        if jobs.is_empty() {
            info!("Ninguna categoría presente; no hay nada que extraer");
            return Ok(ExtractionBatch::empty());
        }

        let handles: Vec<_> = jobs
            .iter()
            .map(|(category, filename)| {
                let extractor = self.clone();
                let pages = Arc::clone(&pages);
                let category = *category;
                let filename = filename.clone();
                tokio::spawn(
                    async move { extractor.extract_single(&filename, category, &pages).await }
                        .in_current_span(),
                )
            })
            .collect();

        let joined = join_all(handles).await;

        let mut outcomes = Vec::with_capacity(joined.len());
        for ((category, _), result) in jobs.iter().zip(joined) {
            let outcome = result.map_err(|e| ExtractionError::TaskJoin {
                category: *category,
                message: e.to_string(),
            })?;
            outcomes.push(outcome);
        }

        let batch = ExtractionBatch::from_outcomes(outcomes);
        info!(
            total = batch.total_extracted,
            successful = batch.successful_extractions,
            failed = batch.failed_extractions,
            "Lote de extracción completado"
        );
        Ok(batch)
    }
}

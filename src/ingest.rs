//! Carga de los PDFs subidos en una petición: validación, copia opcional en
//! disco bajo un directorio propio de la petición y extracción del texto
//! página a página.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::Page;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No files provided")]
    NoFiles,

    #[error("Filename is required")]
    MissingFilename,

    #[error("Only PDF files are supported (got {0})")]
    UnsupportedType(String),

    #[error("Could not read PDF {filename}: {message}")]
    Pdf { filename: String, message: String },

    #[error("Could not store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Errores atribuibles a la petición del cliente.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

/// Fichero recibido tal cual llega en el multipart.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    upload_dir: Option<PathBuf>,
}

impl DocumentLoader {
    pub fn new(upload_dir: Option<PathBuf>) -> Self {
        Self { upload_dir }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.upload_dir.clone())
    }

    /// Valida, guarda (si hay directorio configurado) y extrae las páginas.
    /// El orden de salida es el de subida y, dentro de cada fichero, el de página.
    pub async fn load(&self, request_id: Uuid, files: Vec<UploadedFile>) -> Result<Vec<Page>, LoadError> {
        let names = validate(&files)?;
        let source_names = assign_source_names(&names);

        if let Some(dir) = &self.upload_dir {
            persist(&dir.join(request_id.to_string()), &source_names, &files).await?;
        }

        let parse_tasks = source_names
            .into_iter()
            .zip(files)
            .map(|(filename, file)| async move {
                let name = filename.clone();
                tokio::task::spawn_blocking(move || pages_from_pdf(&name, &file.bytes))
                    .await
                    .unwrap_or_else(|e| {
                        Err(LoadError::Pdf {
                            filename,
                            message: e.to_string(),
                        })
                    })
            });

        let mut pages = Vec::new();
        for result in join_all(parse_tasks).await {
            pages.extend(result?);
        }

        info!(%request_id, pages = pages.len(), "Documentos cargados");
        Ok(pages)
    }
}

/// Comprueba la lista de ficheros y devuelve sus nombres originales.
pub fn validate(files: &[UploadedFile]) -> Result<Vec<String>, LoadError> {
    if files.is_empty() {
        return Err(LoadError::NoFiles);
    }

    files
        .iter()
        .map(|file| {
            let name = file
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or(LoadError::MissingFilename)?;

            match mime_guess::from_path(name).first_raw() {
                Some("application/pdf") => Ok(name.to_string()),
                _ => Err(LoadError::UnsupportedType(name.to_string())),
            }
        })
        .collect()
}

/// Nombre base saneado, único dentro de la petición (`a.pdf`, `a-2.pdf`, ...).
pub fn assign_source_names(names: &[String]) -> Vec<String> {
    let mut taken = HashSet::new();
    names
        .iter()
        .map(|name| {
            let base = sanitize_filename(name);
            let (stem, ext) = match base.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
                _ => (base.clone(), String::new()),
            };

            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{stem}-{n}{ext}");
                n += 1;
            }
            candidate
        })
        .collect()
}

fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}

async fn persist(dir: &Path, names: &[String], files: &[UploadedFile]) -> Result<(), LoadError> {
    tokio::fs::create_dir_all(dir).await.map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for (name, file) in names.iter().zip(files) {
        let path = dir.join(name);
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|source| LoadError::Io { path, source })?;
    }
    Ok(())
}

fn pages_from_pdf(filename: &str, bytes: &[u8]) -> Result<Vec<Page>, LoadError> {
    let texts = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
        warn!("No se pudo extraer texto del PDF {}: {}", filename, e);
        LoadError::Pdf {
            filename: filename.to_string(),
            message: e.to_string(),
        }
    })?;

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(idx, text)| Page::new(filename, idx as u32 + 1, text))
        .collect())
}

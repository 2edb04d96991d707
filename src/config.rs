//! Carga y gestión de configuración de la aplicación (servidor + LLM + subidas).

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }

    /// Variable de entorno con la API key que lee el cliente de Rig.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,

    pub llm_provider: LlmProvider,
    pub llm_chat_model: String,
    pub llm_fast_model: String,
    pub llm_temperature: f64,
    pub llm_max_retries: u32,

    /// `None` desactiva la copia en disco de los ficheros subidos.
    pub upload_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8000".to_string());

        let llm_provider_str = lookup("LLM_PROVIDER").unwrap_or_else(|| "gemini".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;

        let key_var = llm_provider.api_key_var();
        if lookup(key_var).map_or(true, |v| v.trim().is_empty()) {
            return Err(anyhow!("Falta {key_var} en el entorno"));
        }

        let llm_chat_model =
            lookup("LLM_CHAT_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string());
        let llm_fast_model = lookup("LLM_FAST_MODEL").unwrap_or_else(|| llm_chat_model.clone());

        let llm_temperature = match lookup("LLM_TEMPERATURE") {
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| anyhow!("LLM_TEMPERATURE no es un número válido: {raw}"))?,
            None => 0.0,
        };
        let llm_max_retries = match lookup("LLM_MAX_RETRIES") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| anyhow!("LLM_MAX_RETRIES no es un entero válido: {raw}"))?,
            None => 3,
        };

        let upload_dir = match lookup("UPLOAD_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => Some(PathBuf::from("uploaded_documents")),
        };
        let max_upload_mb = match lookup("MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| anyhow!("MAX_UPLOAD_MB no es un entero válido: {raw}"))?,
            None => 25,
        };
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow!("MAX_UPLOAD_MB demasiado grande: {max_upload_mb}"))?;

        Ok(Self {
            server_addr,
            llm_provider,
            llm_chat_model,
            llm_fast_model,
            llm_temperature,
            llm_max_retries,
            upload_dir,
            max_upload_bytes,
        })
    }
}

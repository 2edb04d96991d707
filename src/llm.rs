//! Abstracción sobre Rig para las llamadas estructuradas al LLM.
//! El núcleo sólo conoce el trait `StructuredLlm`; `LlmManager` es la
//! implementación real (OpenAI / Gemini) y en tests se usa `testing::MockLlm`.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AppConfig, LlmProvider};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Provider(String),
}

/// Tipos que pueden pedirse como salida estructurada al LLM.
pub trait StructuredOutput:
    JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static
{
}

impl<T> StructuredOutput for T where
    T: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static
{
}

/// Capacidad `invoke_structured(prompt, schema)`: el esquema objetivo es `T`.
pub trait StructuredLlm: Send + Sync + 'static {
    fn invoke_structured<T>(
        &self,
        preamble: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<T, LlmError>> + Send
    where
        T: StructuredOutput;
}

/// Gestor de LLMs basado en extractores de Rig.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub model: String,
    pub temperature: f64,
    pub max_retries: u32,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración (modelo de chat).
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            provider: cfg.llm_provider.clone(),
            model: cfg.llm_chat_model.clone(),
            temperature: cfg.llm_temperature,
            max_retries: cfg.llm_max_retries,
        })
    }

    /// Mismo proveedor, pero con el modelo configurado para la vía rápida.
    pub fn for_fast_path(&self, cfg: &AppConfig) -> Self {
        Self {
            model: cfg.llm_fast_model.clone(),
            ..self.clone()
        }
    }

    /// Intentos totales por llamada: el primero más los reintentos.
    fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    async fn extract_once<T: StructuredOutput>(&self, preamble: &str, prompt: &str) -> Result<T, LlmError> {
        match self.provider {
            LlmProvider::OpenAI => self.extract_with_openai(preamble, prompt).await,
            LlmProvider::Gemini => self.extract_with_gemini(preamble, prompt).await,
        }
    }

    async fn extract_with_openai<T: StructuredOutput>(
        &self,
        preamble: &str,
        prompt: &str,
    ) -> Result<T, LlmError> {
        use rig::providers::openai;
        // Trait para client.extractor(...)
        use rig::client::CompletionClient as _;

        let client = openai::Client::from_env();
        let extractor = client
            .extractor::<T>(&self.model)
            .preamble(preamble)
            .additional_params(serde_json::json!({ "temperature": self.temperature }))
            .build();

        extractor
            .extract(prompt.to_string())
            .await
            .map_err(|e| LlmError::Provider(e.to_string()))
    }

    async fn extract_with_gemini<T: StructuredOutput>(
        &self,
        preamble: &str,
        prompt: &str,
    ) -> Result<T, LlmError> {
        use rig::providers::gemini;
        use rig::client::CompletionClient as _;

        // La temperatura de Gemini va en generationConfig; se deja la del modelo.
        let client = gemini::Client::from_env();
        let extractor = client.extractor::<T>(&self.model).preamble(preamble).build();

        extractor
            .extract(prompt.to_string())
            .await
            .map_err(|e| LlmError::Provider(e.to_string()))
    }
}

impl StructuredLlm for LlmManager {
    async fn invoke_structured<T: StructuredOutput>(
        &self,
        preamble: &str,
        prompt: &str,
    ) -> Result<T, LlmError> {
        let schema = T::schema_name();
        let attempts = self.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            let start = Instant::now();
            match self.extract_once::<T>(preamble, prompt).await {
                Ok(value) => {
                    debug!(
                        schema = %schema,
                        model = %self.model,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        prompt_length = prompt.len(),
                        "Llamada estructurada completada"
                    );
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        schema = %schema,
                        model = %self.model,
                        attempt,
                        attempts,
                        error = %e,
                        "Fallo en la llamada estructurada al LLM"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Provider("sin intentos configurados".to_string())))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn manager(max_retries: u32) -> LlmManager {
        LlmManager {
            provider: LlmProvider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.0,
            max_retries,
        }
    }

    #[test]
    fn attempts_include_first_call() {
        assert_eq!(manager(0).attempts(), 1);
        assert_eq!(manager(3).attempts(), 4);
    }

    #[test]
    fn attempts_saturate_on_extreme_retry_counts() {
        assert_eq!(manager(u32::MAX).attempts(), u32::MAX);
    }
}

use std::sync::Arc;

use crate::{config::AppConfig, ingest::DocumentLoader, pipeline::ClaimPipeline};

/// Estado compartido por los handlers. No guarda nada entre peticiones.
pub struct AppState<L> {
    pub config: Arc<AppConfig>,
    pub loader: DocumentLoader,
    pub pipeline: Arc<ClaimPipeline<L>>,
}

// `derive(Clone)` exigiría `L: Clone`; basta con clonar los `Arc`.
impl<L> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            loader: self.loader.clone(),
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<L> AppState<L> {
    pub fn new(config: AppConfig, pipeline: ClaimPipeline<L>) -> Self {
        let loader = DocumentLoader::from_config(&config);
        Self {
            config: Arc::new(config),
            loader,
            pipeline: Arc::new(pipeline),
        }
    }
}

// Módulos de la aplicación
mod api;
mod app_state;
mod classifier;
mod config;
mod extractor;
mod fast_claim;
mod ingest;
mod llm;
mod models;
mod pipeline;
mod prompts;
mod schema;
mod unifier;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::pipeline::ClaimPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Inicializar gestores de LLM (normal y vía rápida)
    let llm_manager =
        llm::LlmManager::from_config(&cfg).context("Error inicializando LLM Manager")?;
    let fast_llm_manager = llm_manager.for_fast_path(&cfg);
    info!(
        provider = ?cfg.llm_provider,
        model = %cfg.llm_chat_model,
        fast_model = %cfg.llm_fast_model,
        "Gestores de LLM listos"
    );

    // 4. Crear estado compartido de la aplicación
    let pipeline = ClaimPipeline::new(Arc::new(llm_manager), Arc::new(fast_llm_manager));
    let app_state = AppState::new(cfg, pipeline);

    // 5. Configurar el router de la API
    let server_addr = app_state.config.server_addr.clone();
    let app = Router::new().merge(api::create_router(app_state)).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    // 6. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    info!("🚀 Servidor escuchando en http://{}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}

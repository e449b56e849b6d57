// Módulos de la aplicación
mod app_state;
mod chat;
mod config;
mod console;
mod content;
mod error;
mod file_tree;
mod indexing;
mod ingest;
mod language;
mod llm;
mod models;
mod project;
mod settings;

use crate::app_state::{AppState, Collaborators};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración (incluye los ajustes iniciales del modelo)
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;
    info!(
        "Proyecto '{}', exportaciones en {}",
        cfg.project_name,
        cfg.export_dir.display()
    );

    // 3. Colaboradores simulados (IA, ingesta y contenido de ficheros)
    let collaborators = Collaborators::placeholders(&cfg);

    // 4. Crear el estado de la aplicación y arrancar la consola
    let (app_state, notifications) = AppState::new(cfg, collaborators);
    console::run(app_state, notifications).await?;

    info!("✅ Sesión cerrada correctamente.");
    Ok(())
}

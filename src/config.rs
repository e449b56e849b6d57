//! Carga y gestión de configuración de la aplicación (proyecto, exportación,
//! latencias simuladas y ajustes iniciales del modelo).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::project::DEFAULT_PROJECT_NAME;
use crate::settings::SettingsStore;

/// Variables de entorno que alimentan los ajustes iniciales, con la clave
/// de `SettingsStore::apply` a la que corresponden.
const SETTINGS_KEYS: [(&str, &str); 5] = [
    ("GROQ_API_KEY", "apiKey"),
    ("DATABASE_URL", "databaseUrl"),
    ("LLM_MODEL", "model"),
    ("LLM_TEMPERATURE", "temperature"),
    ("LLM_MAX_TOKENS", "maxTokens"),
];

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub project_name: String,
    pub export_dir: PathBuf,
    pub reply_latency: Duration,
    pub indexing_step: Duration,
    settings: SettingsStore,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env`, pero leyendo de cualquier fuente clave/valor.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project_name = get("PROJECT_NAME").unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

        let export_dir = get("EXPORT_DIR")
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let reply_latency = parse_millis(get("REPLY_LATENCY_MS"), "REPLY_LATENCY_MS", 1500)?;
        let indexing_step = parse_millis(get("INDEXING_STEP_MS"), "INDEXING_STEP_MS", 1000)?;

        let mut settings = SettingsStore::default();
        for (env_key, field) in SETTINGS_KEYS {
            if let Some(value) = get(env_key) {
                settings
                    .apply(field, &value)
                    .with_context(|| format!("Valor no válido en {env_key}"))?;
            }
        }

        Ok(Self {
            project_name,
            export_dir,
            reply_latency,
            indexing_step,
            settings,
        })
    }

    /// Ajustes iniciales del proyecto (`loadSettings`). Guardarlos queda
    /// fuera de alcance: sólo viven en memoria.
    pub fn load_settings(&self) -> SettingsStore {
        self.settings.clone()
    }
}

fn parse_millis(raw: Option<String>, key: &str, default_ms: u64) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(Duration::from_millis(default_ms));
    };
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| anyhow!("{key} debe ser un número de milisegundos, recibido '{raw}'"))
}

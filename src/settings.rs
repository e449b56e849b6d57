//! Ajustes del proyecto (modelo, temperatura, límite de tokens y credenciales).
//!
//! Los límites se aplican en el propio almacén, no en el control de entrada.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ShellError, ShellResult};

pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
pub const MAX_TOKENS_RANGE: (u32, u32) = (256, 8192);
pub const MAX_TOKENS_STEP: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Model {
    #[default]
    #[serde(rename = "llama-3.1-70b-versatile")]
    Llama31_70bVersatile,
    #[serde(rename = "llama-3.1-8b-instant")]
    Llama31_8bInstant,
    #[serde(rename = "llama3-70b-8192")]
    Llama3_70b8192,
    #[serde(rename = "llama3-8b-8192")]
    Llama3_8b8192,
}

impl Model {
    pub const ALL: [Model; 4] = [
        Model::Llama31_70bVersatile,
        Model::Llama31_8bInstant,
        Model::Llama3_70b8192,
        Model::Llama3_8b8192,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Model::Llama31_70bVersatile => "llama-3.1-70b-versatile",
            Model::Llama31_8bInstant => "llama-3.1-8b-instant",
            Model::Llama3_70b8192 => "llama3-70b-8192",
            Model::Llama3_8b8192 => "llama3-8b-8192",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Model::Llama31_70bVersatile => "Llama 3.1 70B",
            Model::Llama31_8bInstant => "Llama 3.1 8B",
            Model::Llama3_70b8192 => "Llama 3 70B",
            Model::Llama3_8b8192 => "Llama 3 8B",
        }
    }
}

impl FromStr for Model {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|m| m.id() == s.trim())
            .ok_or_else(|| ShellError::InvalidConfig(format!("Modelo no soportado: {s}")))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub api_key: String,
    pub database_url: String,
    pub model: Model,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_url: String::new(),
            model: Model::default(),
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

// La clave de API no debe acabar en los logs.
impl fmt::Debug for ProjectSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() { "" } else { "***" };
        f.debug_struct("ProjectSettings")
            .field("api_key", &api_key)
            .field("database_url", &self.database_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Registro plano de ajustes con setters acotados.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    settings: ProjectSettings,
}

impl SettingsStore {
    pub fn get(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.settings.api_key = api_key.into();
    }

    /// Una cadena vacía desactiva la conexión; cualquier otra debe ser una URL.
    pub fn set_database_url(&mut self, database_url: &str) -> ShellResult<()> {
        let database_url = database_url.trim();
        if !database_url.is_empty() {
            Url::parse(database_url).map_err(|e| {
                ShellError::InvalidConfig(format!("URL de base de datos no válida: {e}"))
            })?;
        }
        self.settings.database_url = database_url.to_string();
        Ok(())
    }

    pub fn set_model(&mut self, model: &str) -> ShellResult<()> {
        self.settings.model = model.parse()?;
        Ok(())
    }

    /// Acota a [0, 2] y redondea al décimo.
    pub fn set_temperature(&mut self, temperature: f64) -> ShellResult<f64> {
        if !temperature.is_finite() {
            return Err(ShellError::InvalidConfig(format!(
                "Temperatura no válida: {temperature}"
            )));
        }
        let (min, max) = TEMPERATURE_RANGE;
        let snapped = (temperature.clamp(min, max) * 10.0).round() / 10.0;
        self.settings.temperature = snapped;
        Ok(snapped)
    }

    /// Acota a [256, 8192] y redondea al múltiplo de 256 más cercano.
    pub fn set_max_tokens(&mut self, max_tokens: i64) -> u32 {
        let (min, max) = MAX_TOKENS_RANGE;
        let clamped = max_tokens.clamp(i64::from(min), i64::from(max));
        let step = i64::from(MAX_TOKENS_STEP);
        let snapped = ((clamped + step / 2) / step * step).clamp(i64::from(min), i64::from(max));
        // `snapped` está dentro de [256, 8192], cabe en u32.
        self.settings.max_tokens = snapped as u32;
        self.settings.max_tokens
    }

    /// Setter genérico por nombre de campo, tal como llega de la consola o del entorno.
    pub fn apply(&mut self, key: &str, value: &str) -> ShellResult<()> {
        match key {
            "apiKey" | "api_key" => self.set_api_key(value.trim()),
            "databaseUrl" | "database_url" => self.set_database_url(value)?,
            "model" => self.set_model(value)?,
            "temperature" => {
                let parsed: f64 = value.trim().parse().map_err(|_| {
                    ShellError::InvalidConfig(format!("Temperatura no numérica: {value}"))
                })?;
                self.set_temperature(parsed)?;
            }
            "maxTokens" | "max_tokens" => {
                let parsed: i64 = value.trim().parse().map_err(|_| {
                    ShellError::InvalidConfig(format!("maxTokens no es un entero: {value}"))
                })?;
                self.set_max_tokens(parsed);
            }
            other => {
                return Err(ShellError::InvalidConfig(format!("Ajuste desconocido: {other}")))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn defaults_match_new_workspace() {
        let s = ProjectSettings::default();
        assert_eq!(s.model.id(), "llama-3.1-70b-versatile");
        assert_eq!(s.temperature, 0.7);
        assert_eq!(s.max_tokens, 2048);
        assert!(s.api_key.is_empty());
    }

    #[test]
    fn model_accepts_only_known_ids() {
        let mut store = SettingsStore::default();
        assert_ok!(store.set_model("llama3-8b-8192"));
        assert_eq!(store.get().model, Model::Llama3_8b8192);

        let err = store.set_model("gpt-4o").unwrap_err();
        assert!(matches!(err, ShellError::InvalidConfig(_)));
        assert_eq!(store.get().model, Model::Llama3_8b8192);
    }

    #[test]
    fn temperature_is_clamped_and_snapped() {
        let mut store = SettingsStore::default();
        assert_eq!(assert_ok!(store.set_temperature(0.74)), 0.7);
        assert_eq!(assert_ok!(store.set_temperature(1.26)), 1.3);
        assert_eq!(assert_ok!(store.set_temperature(-3.0)), 0.0);
        assert_eq!(assert_ok!(store.set_temperature(9.0)), 2.0);
        assert_err!(store.set_temperature(f64::NAN));
        assert_eq!(store.get().temperature, 2.0);
    }

    #[test]
    fn max_tokens_is_clamped_and_snapped() {
        let mut store = SettingsStore::default();
        assert_eq!(store.set_max_tokens(2048), 2048);
        assert_eq!(store.set_max_tokens(1000), 1024);
        assert_eq!(store.set_max_tokens(100), 256);
        assert_eq!(store.set_max_tokens(100_000), 8192);
        assert_eq!(store.set_max_tokens(-5), 256);
    }

    #[test]
    fn database_url_must_parse_when_present() {
        let mut store = SettingsStore::default();
        assert_ok!(store.set_database_url("postgresql://user@localhost:5432/db"));
        assert_err!(store.set_database_url("no es una url"));
        assert_eq!(store.get().database_url, "postgresql://user@localhost:5432/db");
        assert_ok!(store.set_database_url("  "));
        assert!(store.get().database_url.is_empty());
    }

    #[test]
    fn apply_routes_by_key() {
        let mut store = SettingsStore::default();
        assert_ok!(store.apply("maxTokens", "4000"));
        assert_ok!(store.apply("temperature", "1.04"));
        assert_ok!(store.apply("apiKey", " gsk_123 "));
        assert_eq!(store.get().max_tokens, 4096);
        assert_eq!(store.get().temperature, 1.0);
        assert_eq!(store.get().api_key, "gsk_123");

        assert_err!(store.apply("temperature", "caliente"));
        assert_err!(store.apply("colour", "blue"));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let mut store = SettingsStore::default();
        store.set_api_key("gsk_secret");
        let rendered = format!("{:?}", store.get());
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn serializes_with_camel_case_and_model_id() {
        let value = serde_json::to_value(ProjectSettings::default()).unwrap();
        assert_eq!(value["model"], "llama-3.1-70b-versatile");
        assert_eq!(value["maxTokens"], 2048);
        assert!(value.get("databaseUrl").is_some());
    }
}

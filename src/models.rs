//! Modelos de dominio (nodos del árbol de ficheros, mensajes y formas persistidas).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::ProjectSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// Nodo del árbol del proyecto. `path` es la concatenación de los nombres de
/// los ancestros unidos por `/`; los ficheros nunca tienen hijos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileNode {
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File,
            children: Vec::new(),
            size,
        }
    }

    pub fn folder(name: impl Into<String>, path: impl Into<String>, children: Vec<FileNode>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Folder,
            children,
            size: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Profundidad en el árbol, derivada del número de separadores del path.
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Identificador de mensaje: contador monótono, serializado como cadena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for MessageId {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map(MessageId)
    }
}

/// Fechas en ISO-8601 con milisegundos y `Z` (`2024-05-01T12:00:00.000Z`),
/// el mismo formato que la marca de tiempo de la exportación.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

/// Bloque de código delimitado con ``` dentro de un mensaje.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Message {
    /// Extrae los bloques de código con lenguaje declarado (```lang ... ```).
    /// Los bloques sin lenguaje se tratan como texto normal.
    pub fn code_blocks(&self) -> Vec<CodeBlock> {
        let mut blocks = Vec::new();
        let mut current: Option<(String, Option<String>, Vec<&str>)> = None;

        for line in self.content.lines() {
            let trimmed = line.trim_start();
            match current.take() {
                None => {
                    if let Some(info) = trimmed.strip_prefix("```") {
                        let mut parts = info.split_whitespace();
                        let language = parts.next().unwrap_or_default().to_string();
                        let filename = parts.next().map(str::to_string);
                        current = Some((language, filename, Vec::new()));
                    }
                }
                Some((language, filename, mut lines)) => {
                    if trimmed.starts_with("```") {
                        if !language.is_empty() {
                            blocks.push(CodeBlock {
                                language,
                                code: lines.join("\n"),
                                filename,
                            });
                        }
                    } else {
                        lines.push(line);
                        current = Some((language, filename, lines));
                    }
                }
            }
        }

        blocks
    }
}

/// Forma persistida de una conversación (no la usa ninguna transición en vivo).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

/// Forma persistida de un proyecto completo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub files: Vec<FileNode>,
    pub sessions: Vec<Session>,
    pub settings: ProjectSettings,
}

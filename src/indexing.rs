//! Indicador de progreso de la indexación de un código subido.
//!
//! Ciclo de vida: `idle -> indexing(0,0) -> indexing(n,p)* -> completed(n,100)`,
//! o bien `failed{reason}` si la ingesta falla después de validar el archivo.

use serde::{Deserialize, Serialize};

use crate::error::{ShellError, ShellResult};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IndexingStatus {
    #[default]
    Idle,
    #[serde(rename_all = "camelCase")]
    Indexing { files_indexed: usize, progress: u8 },
    #[serde(rename_all = "camelCase")]
    Completed { files_indexed: usize, progress: u8 },
    Failed { reason: String },
}

impl IndexingStatus {
    pub fn progress(&self) -> u8 {
        match self {
            IndexingStatus::Indexing { progress, .. } | IndexingStatus::Completed { progress, .. } => {
                *progress
            }
            IndexingStatus::Idle | IndexingStatus::Failed { .. } => 0,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, IndexingStatus::Indexing { .. })
    }

    /// Texto de la cabecera del explorador.
    pub fn label(&self) -> String {
        match self {
            IndexingStatus::Idle => "Sin indexar".to_string(),
            IndexingStatus::Indexing { files_indexed, progress } => {
                format!("Indexando... {files_indexed} ficheros ({progress}%)")
            }
            IndexingStatus::Completed { files_indexed, .. } => {
                format!("Indexado: {files_indexed} ficheros")
            }
            IndexingStatus::Failed { reason } => format!("Error de indexación: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexingTracker {
    status: IndexingStatus,
}

impl IndexingTracker {
    pub fn status(&self) -> &IndexingStatus {
        &self.status
    }

    /// Inicia un ciclo nuevo desde cualquier estado.
    pub fn start(&mut self) -> &IndexingStatus {
        self.status = IndexingStatus::Indexing {
            files_indexed: 0,
            progress: 0,
        };
        &self.status
    }

    pub fn advance(&mut self, files_indexed: usize, progress: u8) -> ShellResult<&IndexingStatus> {
        let IndexingStatus::Indexing { progress: current, .. } = self.status else {
            return Err(ShellError::InvalidInput(
                "No hay ninguna indexación en curso".to_string(),
            ));
        };
        if progress > 100 || progress < current {
            return Err(ShellError::InvalidInput(format!(
                "Progreso fuera de orden: {current}% -> {progress}%"
            )));
        }
        self.status = IndexingStatus::Indexing {
            files_indexed,
            progress,
        };
        Ok(&self.status)
    }

    pub fn complete(&mut self, files_indexed: usize) -> ShellResult<&IndexingStatus> {
        if !self.status.is_active() {
            return Err(ShellError::InvalidInput(
                "No hay ninguna indexación en curso".to_string(),
            ));
        }
        self.status = IndexingStatus::Completed {
            files_indexed,
            progress: 100,
        };
        Ok(&self.status)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> &IndexingStatus {
        self.status = IndexingStatus::Failed {
            reason: reason.into(),
        };
        &self.status
    }

    pub fn reset(&mut self) {
        self.status = IndexingStatus::Idle;
    }
}

//! Ingesta de un código subido como archivo `.zip`, produciendo eventos de
//! progreso y, al final, el árbol de ficheros del proyecto.
//!
//! El pipeline real queda detrás de `CodebaseIngestor`; `MockIngestor`
//! reproduce la indexación simulada con pasos de duración fija.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{ShellError, ShellResult};
use crate::file_tree::FileTree;
use crate::models::FileNode;

pub const ACCEPTED_EXTENSION: &str = ".zip";

/// Archivo binario tal como lo entrega el usuario.
#[derive(Debug, Clone)]
pub struct UploadArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadArchive {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lee el archivo del disco. El formato se comprueba por el nombre antes
    /// de leer nada.
    pub async fn read_from(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let mut archive = Self::new(file_name, Vec::new());
        archive.validate()?;
        archive.bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("No se pudo leer {}", path.display()))?;
        Ok(archive)
    }

    /// Sólo se aceptan ficheros `.zip` (sin distinguir mayúsculas).
    pub fn validate(&self) -> ShellResult<()> {
        if self.file_name.to_ascii_lowercase().ends_with(ACCEPTED_EXTENSION) {
            Ok(())
        } else {
            Err(ShellError::InvalidInput(format!(
                "Sube un fichero {ACCEPTED_EXTENSION} (recibido '{}')",
                self.file_name
            )))
        }
    }
}

/// Evento de progreso emitido durante la ingesta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    pub files_indexed: usize,
    pub progress: u8,
}

pub trait CodebaseIngestor: Send + Sync {
    /// Indexa el archivo enviando el progreso por `progress` y devuelve las
    /// raíces del árbol resultante, que el proyecto valida antes de usarlas.
    /// El canal se cierra cuando el futuro termina.
    fn ingest<'a>(
        &'a self,
        archive: &'a UploadArchive,
        progress: mpsc::Sender<IngestProgress>,
    ) -> BoxFuture<'a, Result<Vec<FileNode>>>;
}

/// Resumen de una ingesta completada.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestionSummary {
    pub files: usize,
    pub folders: usize,
}

impl IngestionSummary {
    pub fn of(tree: &FileTree) -> Self {
        Self {
            files: tree.file_count(),
            folders: tree.folder_count(),
        }
    }
}

impl std::fmt::Display for IngestionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resumen: {} ficheros indexados en {} carpetas.",
            self.files, self.folders
        )
    }
}

const DEMO_ENTRIES: [(&str, Option<u64>); 6] = [
    ("src/components/App.tsx", Some(1024)),
    ("src/components/Header.tsx", Some(512)),
    ("src/index.tsx", Some(256)),
    ("src/utils.ts", Some(768)),
    ("package.json", Some(2048)),
    ("tsconfig.json", Some(512)),
];

/// Árbol de ejemplo que devuelve la ingesta simulada.
pub fn demo_tree() -> ShellResult<FileTree> {
    FileTree::from_entries(DEMO_ENTRIES)
}

#[derive(Debug, Clone)]
pub struct MockIngestor {
    pub step: Duration,
}

impl MockIngestor {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }
}

impl CodebaseIngestor for MockIngestor {
    fn ingest<'a>(
        &'a self,
        archive: &'a UploadArchive,
        progress: mpsc::Sender<IngestProgress>,
    ) -> BoxFuture<'a, Result<Vec<FileNode>>> {
        Box::pin(async move {
            info!(
                "Indexando '{}' ({} bytes) con la ingesta simulada...",
                archive.file_name,
                archive.bytes.len()
            );
            let tree = demo_tree()?;
            let total = tree.file_count();

            tokio::time::sleep(self.step).await;
            // Si nadie escucha, la subida ya fue sustituida; se sigue igualmente.
            if progress
                .send(IngestProgress {
                    files_indexed: total / 2,
                    progress: 50,
                })
                .await
                .is_err()
            {
                debug!("Receptor de progreso cerrado para '{}'", archive.file_name);
            }

            tokio::time::sleep(self.step).await;
            Ok(tree.into_roots())
        })
    }
}

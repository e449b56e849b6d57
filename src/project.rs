//! Agregado del proyecto: árbol de ficheros, conversación, selección,
//! ajustes e indicador de indexación. Es la única fuente de verdad que pinta
//! la capa de presentación.
//!
//! Todas las transiciones son síncronas; el trabajo asíncrono vive en
//! `AppState`, que aplica aquí sus resultados mediante tickets de época.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::ChatSession;
use crate::content::FilePreview;
use crate::error::{ShellError, ShellResult};
use crate::file_tree::{require_file, ExpandState, FileTree, Selection};
use crate::indexing::{IndexingStatus, IndexingTracker};
use crate::ingest::IngestProgress;
use crate::models::{FileNode, Message, Project, Role, Session};
use crate::settings::SettingsStore;

pub const DEFAULT_PROJECT_NAME: &str = "My Project";
const SESSION_TITLE_CHARS: usize = 40;

/// Identifica una subida concreta; sólo la más reciente puede aplicar cambios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    epoch: u64,
}

/// Identifica una apertura de fichero; sólo la más reciente cambia la selección.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTicket {
    epoch: u64,
}

/// Documento exportado: `{projectName, messages, files, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub project_name: String,
    pub messages: Vec<Message>,
    pub files: Vec<FileNode>,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct ProjectState {
    pub project_id: Uuid,
    pub name: String,
    default_name: String,
    pub tree: FileTree,
    pub expand: ExpandState,
    pub selection: Selection,
    pub preview: Option<FilePreview>,
    pub chat: ChatSession,
    pub settings: SettingsStore,
    pub indexing: IndexingTracker,
    upload_epoch: u64,
    preview_epoch: u64,
    created_at: DateTime<Utc>,
}

impl ProjectState {
    pub fn new(default_name: impl Into<String>, settings: SettingsStore) -> Self {
        let default_name = default_name.into();
        Self {
            project_id: Uuid::new_v4(),
            name: default_name.clone(),
            default_name,
            tree: FileTree::default(),
            expand: ExpandState::default(),
            selection: Selection::default(),
            preview: None,
            chat: ChatSession::default(),
            settings,
            indexing: IndexingTracker::default(),
            upload_epoch: 0,
            preview_epoch: 0,
            created_at: Utc::now().trunc_subsecs(3),
        }
    }

    pub fn rename_project(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
        info!("Proyecto renombrado a '{}'", self.name);
    }

    // --- Subida e indexación ---

    /// Abre un ciclo de indexación nuevo e invalida cualquier subida anterior.
    pub fn begin_upload(&mut self) -> (UploadTicket, IndexingStatus) {
        self.upload_epoch += 1;
        let status = self.indexing.start().clone();
        (
            UploadTicket {
                epoch: self.upload_epoch,
            },
            status,
        )
    }

    pub fn is_current_upload(&self, ticket: UploadTicket) -> bool {
        ticket.epoch == self.upload_epoch
    }

    /// Aplica un evento de progreso. Devuelve `None` si la subida ya no es la
    /// vigente o si el evento no respeta el orden del ciclo.
    pub fn apply_progress(&mut self, ticket: UploadTicket, event: IngestProgress) -> Option<IndexingStatus> {
        if !self.is_current_upload(ticket) {
            return None;
        }
        match self.indexing.advance(event.files_indexed, event.progress) {
            Ok(status) => Some(status.clone()),
            Err(err) => {
                warn!("Evento de progreso ignorado: {err}");
                None
            }
        }
    }

    /// Cierra la subida. Con éxito sustituye el árbol de golpe; si el
    /// colaborador falla o entrega un árbol incoherente, marca el indicador
    /// como fallido y deja el árbol anterior intacto.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: anyhow::Result<Vec<FileNode>>,
    ) -> ShellResult<Option<IndexingStatus>> {
        if !self.is_current_upload(ticket) {
            info!("Resultado de una subida sustituida descartado");
            return Ok(None);
        }
        // Los nodos del colaborador se validan antes de sustituir el árbol.
        let checked = result.and_then(|roots| Ok(FileTree::new(roots)?));
        let tree = match checked {
            Ok(tree) => tree,
            Err(err) => {
                self.indexing.fail(err.to_string());
                return Err(ShellError::IngestionFailure(err.to_string()));
            }
        };
        let files = tree.file_count();
        let status = self.indexing.complete(files)?.clone();
        self.tree.replace(tree);
        self.expand.clear();
        Ok(Some(status))
    }

    // --- Explorador ---

    pub fn filtered_files(&self, query: &str) -> Vec<FileNode> {
        self.tree.filter(query)
    }

    pub fn toggle_expand(&mut self, path: &str) -> ShellResult<bool> {
        self.expand.toggle(&self.tree, path)
    }

    pub fn toggle_context_file(&mut self, path: &str) -> ShellResult<bool> {
        self.selection.toggle_context(&self.tree, path)
    }

    /// Comprueba que `path` es un fichero del árbol y reserva la apertura.
    /// La selección no cambia hasta `finish_preview`.
    pub fn begin_preview(&mut self, path: &str) -> ShellResult<PreviewTicket> {
        require_file(&self.tree, path)?;
        self.preview_epoch += 1;
        Ok(PreviewTicket {
            epoch: self.preview_epoch,
        })
    }

    /// Selecciona el fichero y guarda su vista previa en una sola transición.
    /// Devuelve `Ok(false)` si otra apertura más reciente lo sustituyó.
    pub fn finish_preview(&mut self, ticket: PreviewTicket, preview: FilePreview) -> ShellResult<bool> {
        if ticket.epoch != self.preview_epoch {
            return Ok(false);
        }
        self.selection.select_file(&self.tree, &preview.path)?;
        self.preview = Some(preview);
        Ok(true)
    }

    pub fn context_files(&self) -> Vec<String> {
        self.selection.context_paths.iter().cloned().collect()
    }

    // --- Proyecto ---

    /// Reinicia el espacio de trabajo si el usuario lo confirma. Todo ocurre
    /// en una sola transición; los ajustes se conservan.
    pub fn new_project(&mut self, confirmed: bool) -> ShellResult<()> {
        if !confirmed {
            return Err(ShellError::ConfirmationDeclined);
        }
        self.tree = FileTree::default();
        self.expand.clear();
        self.selection.clear();
        self.preview = None;
        self.chat.clear();
        self.name = self.default_name.clone();
        self.indexing.reset();
        self.upload_epoch += 1;
        self.preview_epoch += 1;
        self.project_id = Uuid::new_v4();
        self.created_at = Utc::now().trunc_subsecs(3);
        info!("Proyecto nuevo creado ({})", self.project_id);
        Ok(())
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> ExportSnapshot {
        ExportSnapshot {
            project_name: self.name.clone(),
            messages: self.chat.messages().to_vec(),
            files: self.tree.roots().to_vec(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// JSON determinista del estado actual; no modifica nada.
    pub fn export_snapshot(&self, now: DateTime<Utc>) -> ShellResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.snapshot(now))?)
    }

    /// Nombre del fichero exportado. Siempre es un único componente de ruta:
    /// espacios y separadores se convierten en guiones y se quitan los puntos
    /// iniciales.
    pub fn export_file_name(&self) -> String {
        // Cada tramo de espacios o separadores se convierte en un único guion.
        let mut slug = String::with_capacity(self.name.len());
        let mut in_separator = false;
        for c in self.name.trim_start_matches('.').chars() {
            if c.is_whitespace() || c == '/' || c == '\\' {
                if !in_separator {
                    slug.push('-');
                }
                in_separator = true;
            } else {
                slug.push(c);
                in_separator = false;
            }
        }
        format!("{slug}-export.json")
    }

    /// Forma persistida con una única sesión que contiene la conversación actual.
    pub fn to_project(&self) -> Project {
        let messages = self.chat.messages().to_vec();
        let title = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.chars().take(SESSION_TITLE_CHARS).collect())
            .unwrap_or_else(|| "Nueva conversación".to_string());
        let updated_at = messages.last().map(|m| m.timestamp).unwrap_or(self.created_at);

        Project {
            id: self.project_id,
            name: self.name.clone(),
            files: self.tree.roots().to_vec(),
            sessions: vec![Session {
                id: Uuid::new_v4(),
                project_id: self.project_id,
                title,
                messages,
                created_at: self.created_at,
                updated_at,
            }],
            settings: self.settings.get().clone(),
        }
    }
}

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    chat::GenerationTicket,
    config::AppConfig,
    content::{FileContentSource, FilePreview, PlaceholderContent},
    error::{ShellError, ShellResult},
    indexing::IndexingStatus,
    ingest::{CodebaseIngestor, IngestionSummary, MockIngestor, UploadArchive},
    llm::{PlaceholderGenerator, ReplyGenerator, ReplyRequest},
    project::{ProjectState, UploadTicket},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Aviso transitorio para el usuario (el "toast" de la interfaz).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
}

/// Backends externos con los que habla el estado.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn ReplyGenerator>,
    pub ingestor: Arc<dyn CodebaseIngestor>,
    pub content: Arc<dyn FileContentSource>,
}

impl Collaborators {
    pub fn placeholders(cfg: &AppConfig) -> Self {
        Self {
            generator: Arc::new(PlaceholderGenerator::new(cfg.reply_latency)),
            ingestor: Arc::new(MockIngestor::new(cfg.indexing_step)),
            content: Arc::new(PlaceholderContent),
        }
    }
}

/// Subida en curso: la tarea y el flujo de estados de indexación aplicados.
pub struct UploadHandle {
    pub task: JoinHandle<()>,
    pub updates: mpsc::UnboundedReceiver<IndexingStatus>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    project: Arc<Mutex<ProjectState>>,
    collaborators: Collaborators,
    upload_task: Arc<Mutex<Option<AbortHandle>>>,
    reply_task: Arc<Mutex<Option<AbortHandle>>>,
    notifier: mpsc::UnboundedSender<Notification>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn replace_task(slot: &Mutex<Option<AbortHandle>>, handle: Option<AbortHandle>) {
    if let Some(previous) = std::mem::replace(&mut *lock(slot), handle) {
        previous.abort();
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        collaborators: Collaborators,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifier, notifications) = mpsc::unbounded_channel();
        let project = ProjectState::new(config.project_name.clone(), config.load_settings());
        let state = Self {
            config,
            project: Arc::new(Mutex::new(project)),
            collaborators,
            upload_task: Arc::new(Mutex::new(None)),
            reply_task: Arc::new(Mutex::new(None)),
            notifier,
        };
        (state, notifications)
    }

    fn project(&self) -> MutexGuard<'_, ProjectState> {
        lock(&self.project)
    }

    /// Lectura del estado para la capa de presentación.
    pub fn with_project<R>(&self, f: impl FnOnce(&ProjectState) -> R) -> R {
        f(&self.project())
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => warn!("{message}"),
            _ => info!("{message}"),
        }
        // Sin receptor no hay a quién avisar; no es un error.
        let _ = self.notifier.send(Notification { level, message });
    }

    fn report(&self, err: &ShellError) {
        if err.is_noop() {
            debug!("{err}");
        } else {
            self.notify(NoticeLevel::Error, err.to_string());
        }
    }

    fn surface<T>(&self, result: ShellResult<T>) -> ShellResult<T> {
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    // --- Subida de código ---

    /// Valida el archivo y lanza la ingesta. Una subida nueva sustituye a la
    /// anterior: su tarea se aborta y sus eventos ya no se aplican.
    pub fn upload_codebase(&self, archive: UploadArchive) -> ShellResult<UploadHandle> {
        self.surface(archive.validate())?;
        self.notify(NoticeLevel::Info, format!("Subiendo '{}'...", archive.file_name));

        let (updates_tx, updates) = mpsc::unbounded_channel();
        let ticket = {
            let mut project = self.project();
            let (ticket, status) = project.begin_upload();
            let _ = updates_tx.send(status);
            ticket
        };

        let state = self.clone();
        let task = tokio::spawn(async move {
            state.run_upload(ticket, archive, updates_tx).await;
        });
        replace_task(&self.upload_task, Some(task.abort_handle()));

        Ok(UploadHandle { task, updates })
    }

    async fn run_upload(
        &self,
        ticket: UploadTicket,
        archive: UploadArchive,
        updates: mpsc::UnboundedSender<IndexingStatus>,
    ) {
        let (progress_tx, mut progress_rx) = mpsc::channel(16);
        let ingest = self.collaborators.ingestor.ingest(&archive, progress_tx);
        let apply_progress = async {
            while let Some(event) = progress_rx.recv().await {
                let applied = {
                    let mut project = self.project();
                    project.apply_progress(ticket, event)
                };
                if let Some(status) = applied {
                    let _ = updates.send(status);
                }
            }
        };
        let (result, ()) = tokio::join!(ingest, apply_progress);

        let (outcome, status, summary) = {
            let mut project = self.project();
            let outcome = project.finish_upload(ticket, result);
            (
                outcome,
                project.indexing.status().clone(),
                IngestionSummary::of(&project.tree),
            )
        };

        match outcome {
            Ok(Some(_)) => {
                let _ = updates.send(status);
                self.notify(
                    NoticeLevel::Success,
                    format!("¡Código indexado correctamente! {summary}"),
                );
            }
            Ok(None) => debug!("Subida '{}' sustituida por otra más reciente", archive.file_name),
            Err(err) => {
                let _ = updates.send(status);
                error!("Error de ingesta de '{}': {err}", archive.file_name);
                self.report(&err);
            }
        }
    }

    pub fn indexing_status(&self) -> IndexingStatus {
        self.project().indexing.status().clone()
    }

    // --- Conversación ---

    fn prepare_reply(&self, text: &str) -> ShellResult<(GenerationTicket, ReplyRequest)> {
        let mut project = self.project();
        let ticket = project.chat.submit(text)?;
        let request = ReplyRequest {
            history: project.chat.messages().to_vec(),
            context_files: project.context_files(),
            settings: project.settings.get().clone(),
        };
        Ok((ticket, request))
    }

    /// Añade el mensaje del usuario y pide la respuesta en segundo plano.
    /// Texto vacío o una generación en curso no cambian nada.
    pub fn send_message(&self, text: &str) -> ShellResult<JoinHandle<()>> {
        let (ticket, request) = self.surface(self.prepare_reply(text))?;

        let state = self.clone();
        let task = tokio::spawn(async move {
            let reply = state.collaborators.generator.generate_reply(&request).await;
            let outcome = {
                let mut project = state.project();
                project.chat.complete(ticket, reply).map(|m| m.is_some())
            };
            match outcome {
                Ok(true) => info!("Respuesta del asistente añadida a la conversación"),
                Ok(false) => {}
                Err(err) => state.report(&err),
            }
        });
        replace_task(&self.reply_task, Some(task.abort_handle()));

        Ok(task)
    }

    /// Detiene la generación en curso. Devuelve `false` si no había ninguna.
    pub fn stop_generation(&self) -> bool {
        let was_generating = self.project().chat.cancel_generation();
        replace_task(&self.reply_task, None);
        if was_generating {
            self.notify(NoticeLevel::Info, "Generación detenida");
        }
        was_generating
    }

    // --- Explorador y vista previa ---

    /// Abre un fichero en la vista previa. La selección y el contenido sólo
    /// cambian, juntos, cuando la lectura termina bien.
    pub async fn select_file(&self, path: &str) -> ShellResult<FilePreview> {
        let opened = self.project().begin_preview(path);
        let ticket = self.surface(opened)?;

        let fetched = self.collaborators.content.fetch_content(path).await;
        let content = self.surface(
            fetched.map_err(|e| ShellError::NotFound(format!("{path}: {e}"))),
        )?;

        let preview = FilePreview::new(path, content);
        let applied = self.project().finish_preview(ticket, preview.clone());
        if !self.surface(applied)? {
            debug!("Vista previa de '{path}' descartada: hay una apertura más reciente");
        }
        Ok(preview)
    }

    pub fn toggle_context_file(&self, path: &str) -> ShellResult<bool> {
        let toggled = self.project().toggle_context_file(path);
        self.surface(toggled)
    }

    pub fn toggle_expand(&self, path: &str) -> ShellResult<bool> {
        let toggled = self.project().toggle_expand(path);
        self.surface(toggled)
    }

    // --- Proyecto y ajustes ---

    pub fn rename_project(&self, new_name: &str) {
        self.project().rename_project(new_name);
    }

    pub fn update_setting(&self, key: &str, value: &str) -> ShellResult<()> {
        let applied = self.project().settings.apply(key, value);
        self.surface(applied)
    }

    /// Reinicia el espacio de trabajo si `confirmed`; si no, no hace nada.
    pub fn new_project(&self, confirmed: bool) -> ShellResult<()> {
        let reset = self.project().new_project(confirmed);
        self.surface(reset)?;
        replace_task(&self.upload_task, None);
        replace_task(&self.reply_task, None);
        self.notify(NoticeLevel::Success, "Proyecto nuevo creado");
        Ok(())
    }

    /// Escribe la exportación JSON en el directorio configurado.
    pub async fn export(&self) -> ShellResult<PathBuf> {
        let written = self.write_export().await;
        let path = self.surface(written)?;
        self.notify(
            NoticeLevel::Success,
            format!("Conversación exportada en {}", path.display()),
        );
        Ok(path)
    }

    async fn write_export(&self) -> ShellResult<PathBuf> {
        let (bytes, file_name) = {
            let project = self.project();
            (project.export_snapshot(Utc::now())?, project.export_file_name())
        };
        tokio::fs::create_dir_all(&self.config.export_dir).await?;
        let path = self.config.export_dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_tree::FileTree;
    use crate::ingest::IngestProgress;
    use crate::models::{FileNode, Role};
    use anyhow::{anyhow, Result};
    use futures::future::BoxFuture;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    /// Ingesta con una secuencia fija de eventos y un resultado configurable.
    struct ScriptedIngestor {
        events: Vec<IngestProgress>,
        step: Duration,
        files: Vec<&'static str>,
        fail: bool,
    }

    impl CodebaseIngestor for ScriptedIngestor {
        fn ingest<'a>(
            &'a self,
            _archive: &'a UploadArchive,
            progress: mpsc::Sender<IngestProgress>,
        ) -> BoxFuture<'a, Result<Vec<FileNode>>> {
            Box::pin(async move {
                for event in &self.events {
                    tokio::time::sleep(self.step).await;
                    let _ = progress.send(*event).await;
                }
                tokio::time::sleep(self.step).await;
                if self.fail {
                    return Err(anyhow!("zip corrupto"));
                }
                Ok(FileTree::from_entries(self.files.iter().map(|p| (*p, None)))?.into_roots())
            })
        }
    }

    struct FailingGenerator;

    impl ReplyGenerator for FailingGenerator {
        fn generate_reply<'a>(&'a self, _request: &'a ReplyRequest) -> BoxFuture<'a, Result<String>> {
            Box::pin(async { Err(anyhow!("límite de peticiones")) })
        }
    }

    /// Fuente de contenido que sólo sabe leer un fichero.
    struct OnlyOneFile(&'static str);

    impl FileContentSource for OnlyOneFile {
        fn fetch_content<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move {
                if path == self.0 {
                    Ok(format!("contenido de {path}"))
                } else {
                    Err(anyhow!("backend caído"))
                }
            })
        }
    }

    fn test_config(export_dir: &std::path::Path, latency_ms: u64) -> AppConfig {
        let dir = export_dir.to_string_lossy().to_string();
        let latency = latency_ms.to_string();
        AppConfig::from_lookup(|key| match key {
            "EXPORT_DIR" => Some(dir.clone()),
            "REPLY_LATENCY_MS" => Some(latency.clone()),
            "INDEXING_STEP_MS" => Some("2".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn app(latency_ms: u64) -> (AppState, mpsc::UnboundedReceiver<Notification>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path(), latency_ms);
        let collaborators = Collaborators::placeholders(&cfg);
        let (state, rx) = AppState::new(cfg, collaborators);
        (state, rx, dir)
    }

    fn app_with_ingestor(ingestor: ScriptedIngestor) -> (AppState, mpsc::UnboundedReceiver<Notification>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path(), 1);
        let mut collaborators = Collaborators::placeholders(&cfg);
        collaborators.ingestor = Arc::new(ingestor);
        let (state, rx) = AppState::new(cfg, collaborators);
        (state, rx, dir)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    async fn collect(mut handle: UploadHandle) -> Vec<IndexingStatus> {
        let mut statuses = Vec::new();
        while let Some(status) = handle.updates.recv().await {
            statuses.push(status);
        }
        assert_ok!(handle.task.await);
        statuses
    }

    async fn load_demo(state: &AppState) {
        let handle = assert_ok!(state.upload_codebase(UploadArchive::new("demo.zip", Vec::new())));
        collect(handle).await;
    }

    #[tokio::test]
    async fn upload_progress_is_monotonic_and_ends_completed_once() {
        let events = [10, 10, 35, 60, 60, 90]
            .into_iter()
            .enumerate()
            .map(|(i, p)| IngestProgress { files_indexed: i, progress: p })
            .collect();
        let (state, mut rx, _dir) = app_with_ingestor(ScriptedIngestor {
            events,
            step: Duration::from_millis(1),
            files: vec!["src/lib.rs", "Cargo.toml"],
            fail: false,
        });

        let handle = assert_ok!(state.upload_codebase(UploadArchive::new("crate.zip", vec![0; 8])));
        let statuses = collect(handle).await;

        assert_eq!(statuses.first(), Some(&IndexingStatus::Indexing { files_indexed: 0, progress: 0 }));
        let progress: Vec<u8> = statuses.iter().map(IndexingStatus::progress).collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        let completed = statuses
            .iter()
            .filter(|s| matches!(s, IndexingStatus::Completed { .. }))
            .count();
        assert_eq!(completed, 1);
        assert_eq!(
            statuses.last(),
            Some(&IndexingStatus::Completed { files_indexed: 2, progress: 100 })
        );

        assert_eq!(state.with_project(|p| p.tree.file_count()), 2);
        let notices = drain(&mut rx);
        assert_eq!(notices.last().map(|n| n.level), Some(NoticeLevel::Success));
    }

    #[tokio::test]
    async fn out_of_order_progress_is_ignored() {
        let events = vec![
            IngestProgress { files_indexed: 1, progress: 70 },
            IngestProgress { files_indexed: 1, progress: 20 },
        ];
        let (state, _rx, _dir) = app_with_ingestor(ScriptedIngestor {
            events,
            step: Duration::from_millis(1),
            files: vec!["a.rs"],
            fail: false,
        });
        let handle = assert_ok!(state.upload_codebase(UploadArchive::new("a.zip", Vec::new())));
        let progress: Vec<u8> = collect(handle).await.iter().map(IndexingStatus::progress).collect();
        assert_eq!(progress, [0, 70, 100]);
    }

    #[tokio::test]
    async fn rejected_archive_changes_nothing() {
        let (state, mut rx, _dir) = app(1);
        let err = state
            .upload_codebase(UploadArchive::new("repo.tar.gz", Vec::new()))
            .err()
            .unwrap();
        assert!(matches!(err, ShellError::InvalidInput(_)));
        assert_eq!(state.indexing_status(), IndexingStatus::Idle);
        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn later_upload_supersedes_earlier_one() {
        let (state, _rx, _dir) = app(1);
        let slow = {
            let mut collaborators = state.collaborators.clone();
            collaborators.ingestor = Arc::new(ScriptedIngestor {
                events: vec![IngestProgress { files_indexed: 1, progress: 50 }],
                step: Duration::from_millis(50),
                files: vec!["old.rs"],
                fail: false,
            });
            AppState { collaborators, ..state.clone() }
        };
        let mut first = assert_ok!(slow.upload_codebase(UploadArchive::new("old.zip", Vec::new())));
        let second = assert_ok!(state.upload_codebase(UploadArchive::new("new.zip", Vec::new())));

        let statuses = collect(second).await;
        assert!(matches!(statuses.last(), Some(IndexingStatus::Completed { .. })));

        let aborted = (&mut first.task).await;
        assert!(aborted.unwrap_err().is_cancelled());
        // Sólo llegó el arranque antes de ser sustituida.
        let mut stale = Vec::new();
        while let Ok(s) = first.updates.try_recv() {
            stale.push(s);
        }
        assert!(stale.iter().all(|s| s.progress() == 0));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(state.with_project(|p| p.tree.find("old.rs").is_none()));
        assert!(state.with_project(|p| p.tree.find("src/utils.ts").is_some()));
    }

    #[tokio::test]
    async fn failed_ingestion_keeps_previous_tree() {
        let (state, mut rx, _dir) = app(1);
        load_demo(&state).await;
        let failing = {
            let mut collaborators = state.collaborators.clone();
            collaborators.ingestor = Arc::new(ScriptedIngestor {
                events: Vec::new(),
                step: Duration::from_millis(1),
                files: Vec::new(),
                fail: true,
            });
            AppState { collaborators, ..state.clone() }
        };
        drain(&mut rx);

        let handle = assert_ok!(failing.upload_codebase(UploadArchive::new("broken.zip", Vec::new())));
        let statuses = collect(handle).await;
        assert!(matches!(statuses.last(), Some(IndexingStatus::Failed { .. })));
        assert_eq!(state.with_project(|p| p.tree.file_count()), 6);
        assert!(drain(&mut rx).iter().any(|n| n.level == NoticeLevel::Error));
    }

    #[tokio::test]
    async fn send_message_appends_reply() {
        let (state, _rx, _dir) = app(1);
        load_demo(&state).await;
        assert_ok!(state.toggle_context_file("src/utils.ts"));

        let task = assert_ok!(state.send_message("  ¿Qué hace utils?  "));
        assert!(state.with_project(|p| p.chat.is_generating()));
        assert_err!(state.send_message("otra pregunta"));
        assert_ok!(task.await);

        state.with_project(|p| {
            let messages = p.chat.messages();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].content, "¿Qué hace utils?");
            assert_eq!(messages[1].role, Role::Assistant);
            assert!(messages[1].content.contains("src/utils.ts"));
            assert_eq!(messages[1].code_blocks().len(), 1);
            assert!(!p.chat.is_generating());
        });
    }

    #[tokio::test]
    async fn blank_message_is_a_no_op() {
        let (state, _rx, _dir) = app(1);
        assert_err!(state.send_message("   "));
        state.with_project(|p| {
            assert!(p.chat.messages().is_empty());
            assert!(!p.chat.is_generating());
        });
    }

    #[tokio::test]
    async fn stop_generation_drops_pending_reply() {
        let (state, mut rx, _dir) = app(200);
        let task = assert_ok!(state.send_message("explícame el proyecto"));
        assert!(state.stop_generation());
        assert!(task.await.unwrap_err().is_cancelled());

        state.with_project(|p| {
            assert_eq!(p.chat.messages().len(), 1);
            assert!(!p.chat.is_generating());
        });
        assert!(drain(&mut rx).iter().any(|n| n.message == "Generación detenida"));
        assert!(!state.stop_generation());
    }

    #[tokio::test]
    async fn generation_failure_is_reported() {
        let (state, mut rx, _dir) = app(1);
        let failing = {
            let mut collaborators = state.collaborators.clone();
            collaborators.generator = Arc::new(FailingGenerator);
            AppState { collaborators, ..state.clone() }
        };
        let task = assert_ok!(failing.send_message("hola"));
        assert_ok!(task.await);
        assert!(!state.with_project(|p| p.chat.is_generating()));
        assert!(drain(&mut rx)
            .iter()
            .any(|n| n.level == NoticeLevel::Error && n.message.contains("límite")));
    }

    #[tokio::test]
    async fn select_file_builds_preview() {
        let (state, _rx, _dir) = app(1);
        load_demo(&state).await;

        let preview = assert_ok!(state.select_file("src/components/App.tsx").await);
        assert_eq!(preview.language.as_str(), "typescript");
        assert!(preview.content.contains("src/components/App.tsx"));
        assert_eq!(state.with_project(|p| p.preview.clone()), Some(preview));

        let err = state.select_file("src/missing.rs").await.unwrap_err();
        assert!(matches!(err, ShellError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_selection_and_preview() {
        let (state, mut rx, _dir) = app(1);
        load_demo(&state).await;
        let flaky = {
            let mut collaborators = state.collaborators.clone();
            collaborators.content = Arc::new(OnlyOneFile("src/index.tsx"));
            AppState { collaborators, ..state.clone() }
        };
        assert_ok!(flaky.select_file("src/index.tsx").await);
        drain(&mut rx);

        let err = assert_err!(flaky.select_file("src/utils.ts").await);
        assert!(matches!(err, ShellError::NotFound(_)));
        state.with_project(|p| {
            assert_eq!(p.selection.selected_file.as_deref(), Some("src/index.tsx"));
            assert_eq!(p.preview.as_ref().map(|v| v.path.as_str()), Some("src/index.tsx"));
        });
        assert!(drain(&mut rx).iter().any(|n| n.level == NoticeLevel::Error));
    }

    #[tokio::test]
    async fn new_project_declined_keeps_workspace() {
        let (state, mut rx, _dir) = app(1);
        load_demo(&state).await;
        drain(&mut rx);

        assert!(assert_err!(state.new_project(false)).is_noop());
        assert_eq!(state.with_project(|p| p.tree.file_count()), 6);
        assert!(drain(&mut rx).is_empty());

        assert_ok!(state.new_project(true));
        state.with_project(|p| {
            assert!(p.tree.is_empty());
            assert_eq!(p.indexing.status(), &IndexingStatus::Idle);
        });
    }

    #[tokio::test]
    async fn export_writes_named_file() {
        let (state, _rx, dir) = app(1);
        state.rename_project("Proyecto Demo");
        let task = assert_ok!(state.send_message("hola"));
        assert_ok!(task.await);

        let path = assert_ok!(state.export().await);
        assert_eq!(path, dir.path().join("Proyecto-Demo-export.json"));

        let bytes = tokio::fs::read(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["projectName"], "Proyecto Demo");
        assert_eq!(value["messages"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn export_with_separators_in_name_stays_in_export_dir() {
        let (state, _rx, dir) = app(1);
        state.rename_project("client/server app");
        let path = assert_ok!(state.export().await);
        assert_eq!(path, dir.path().join("client-server-app-export.json"));
        assert!(tokio::fs::metadata(&path).await.unwrap().is_file());

        state.rename_project("/tmp/x");
        let path = assert_ok!(state.export().await);
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[tokio::test]
    async fn settings_updates_are_bounded() {
        let (state, mut rx, _dir) = app(1);
        assert_ok!(state.update_setting("maxTokens", "9000"));
        assert_err!(state.update_setting("model", "gpt-4"));
        assert_eq!(state.with_project(|p| p.settings.get().max_tokens), 8192);
        assert_eq!(drain(&mut rx).len(), 1);
    }
}

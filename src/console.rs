//! Consola de línea de comandos: sustituye a la interfaz web para manejar el
//! estado del proyecto desde la terminal.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app_state::{AppState, NoticeLevel, Notification};
use crate::indexing::IndexingStatus;
use crate::ingest::UploadArchive;
use crate::models::{CodeBlock, Message, Role};

const HELP: &str = "\
Comandos:
  upload <fichero.zip>     sube e indexa un código
  ask <texto>              pregunta al asistente
  stop                     detiene la respuesta en curso
  chat                     muestra la conversación
  open <ruta>              abre un fichero en la vista previa
  ctx <ruta>               añade/quita un fichero del contexto
  tree [filtro]            muestra el explorador
  expand <ruta>            expande/contrae una carpeta
  new                      proyecto nuevo (pide confirmación)
  rename <nombre>          renombra el proyecto
  export                   exporta la conversación a JSON
  project                  muestra el proyecto en su forma persistida
  set <ajuste> <valor>     apiKey, databaseUrl, model, temperature, maxTokens
  settings                 muestra los ajustes
  status                   estado del proyecto
  help                     esta ayuda
  quit                     salir";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Ask(String),
    Stop,
    Chat,
    Open(String),
    Context(String),
    Tree(String),
    Expand(String),
    New,
    Rename(String),
    Export,
    Project,
    Set { key: String, value: String },
    Settings,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let require = |what: &str| {
            if rest.is_empty() {
                Err(format!("Falta {what}. Escribe 'help' para ver los comandos."))
            } else {
                Ok(rest.to_string())
            }
        };

        match word {
            "upload" => require("el fichero").map(|p| Command::Upload(PathBuf::from(p))),
            // El texto vacío lo rechaza el propio estado.
            "ask" => Ok(Command::Ask(rest.to_string())),
            "stop" => Ok(Command::Stop),
            "chat" | "history" => Ok(Command::Chat),
            "open" => require("la ruta").map(Command::Open),
            "ctx" => require("la ruta").map(Command::Context),
            "tree" => Ok(Command::Tree(rest.to_string())),
            "expand" => require("la ruta").map(Command::Expand),
            "new" => Ok(Command::New),
            "rename" => require("el nombre").map(Command::Rename),
            "export" => Ok(Command::Export),
            "project" => Ok(Command::Project),
            "set" => {
                let (key, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if key.is_empty() {
                    return Err("Uso: set <ajuste> <valor>".to_string());
                }
                Ok(Command::Set {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                })
            }
            "settings" => Ok(Command::Settings),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err(String::new()),
            other => Err(format!("Comando desconocido: {other}")),
        }
    }
}

fn render_notification(n: &Notification) -> String {
    let tag = match n.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => " ok ",
        NoticeLevel::Error => "fallo",
    };
    format!("[{tag}] {}", n.message)
}

/// Bucle principal: lee comandos de la entrada estándar hasta `quit`, fin de
/// entrada o Ctrl+C.
pub async fn run(state: AppState, mut notifications: mpsc::UnboundedReceiver<Notification>) -> Result<()> {
    let printer = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            println!("{}", render_notification(&notification));
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C recibido, cerrando la consola.");
                break;
            }
        };
        let Some(line) = line else { break };

        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(&state, command, &mut lines).await?,
            Err(message) if message.is_empty() => {}
            Err(message) => println!("{message}"),
        }
    }

    printer.abort();
    Ok(())
}

// Los errores del estado ya se notifican; aquí sólo se ignoran.
async fn execute(state: &AppState, command: Command, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
    match command {
        Command::Upload(path) => match UploadArchive::read_from(&path).await {
            Ok(archive) => {
                if let Ok(mut handle) = state.upload_codebase(archive) {
                    tokio::spawn(async move {
                        while let Some(status) = handle.updates.recv().await {
                            println!("  {}", render_status(&status));
                        }
                        if let Err(err) = handle.task.await {
                            debug!("Tarea de subida terminada sin resultado: {err}");
                        }
                    });
                }
            }
            Err(err) => println!("{err:#}"),
        },
        Command::Ask(text) => {
            if let Ok(task) = state.send_message(&text) {
                let state = state.clone();
                tokio::spawn(async move {
                    if let Some(reply) = landed_reply(&state, task).await {
                        println!("{}", render_message(&reply));
                    }
                });
            }
        }
        Command::Stop => {
            state.stop_generation();
        }
        Command::Chat => print_chat(state),
        Command::Open(path) => {
            if let Ok(preview) = state.select_file(&path).await {
                println!("--- {} ({}) ---", preview.path, preview.language);
                println!("{}", preview.content);
            }
        }
        Command::Context(path) => {
            if let Ok(included) = state.toggle_context_file(&path) {
                let verb = if included { "añadido al" } else { "quitado del" };
                println!("'{path}' {verb} contexto");
            }
        }
        Command::Tree(query) => print_tree(state, &query),
        Command::Expand(path) => {
            let _ = state.toggle_expand(&path);
            print_tree(state, "");
        }
        Command::New => {
            println!("¿Iniciar un proyecto nuevo? Se borrará el espacio de trabajo actual. [s/N]");
            let answer = lines.next_line().await?.unwrap_or_default();
            let confirmed = matches!(answer.trim().to_lowercase().as_str(), "s" | "si" | "sí" | "y" | "yes");
            let _ = state.new_project(confirmed);
        }
        Command::Rename(name) => state.rename_project(&name),
        Command::Export => {
            let _ = state.export().await;
        }
        Command::Project => print_project(state)?,
        Command::Set { key, value } => {
            if state.update_setting(&key, &value).is_ok() {
                print_settings(state);
            }
        }
        Command::Settings => print_settings(state),
        Command::Status => print_status(state),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

/// Espera a la tarea de respuesta y devuelve el mensaje del asistente que
/// añadió. Una respuesta cancelada o fallida no devuelve nada.
async fn landed_reply(state: &AppState, task: JoinHandle<()>) -> Option<Message> {
    task.await.ok()?;
    state.with_project(|project| {
        project
            .chat
            .messages()
            .last()
            .filter(|m| m.role == Role::Assistant)
            .cloned()
    })
}

fn render_status(status: &IndexingStatus) -> String {
    const WIDTH: usize = 20;
    let filled = usize::from(status.progress().min(100)) * WIDTH / 100;
    format!(
        "[{}{}] {}",
        "#".repeat(filled),
        " ".repeat(WIDTH - filled),
        status.label()
    )
}

/// Pinta un mensaje del chat. Los bloques de código con lenguaje se
/// enmarcan con su cabecera; el resto del texto se muestra tal cual.
fn render_message(message: &Message) -> String {
    let author = match message.role {
        Role::User => "Tú",
        Role::Assistant => "Asistente",
    };
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let mut out = format!("── {author} · {time} ──\n");

    let mut blocks = message.code_blocks().into_iter();
    // Some(true): dentro de un bloque ya pintado; Some(false): bloque sin lenguaje.
    let mut fence: Option<bool> = None;
    for line in message.content.lines() {
        let info = line.trim_start().strip_prefix("```");
        match (fence, info) {
            (None, Some(info)) => {
                let block = if info.trim().is_empty() { None } else { blocks.next() };
                match block {
                    Some(block) => {
                        push_code_block(&mut out, &block);
                        fence = Some(true);
                    }
                    None => fence = Some(false),
                }
            }
            (None, None) => {
                out.push_str(line);
                out.push('\n');
            }
            (Some(_), Some(_)) => fence = None,
            (Some(true), None) => {}
            (Some(false), None) => {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out.trim_end().to_string()
}

fn push_code_block(out: &mut String, block: &CodeBlock) {
    match &block.filename {
        Some(filename) => out.push_str(&format!("┌─ {} · {filename}\n", block.language)),
        None => out.push_str(&format!("┌─ {}\n", block.language)),
    }
    for line in block.code.lines() {
        out.push_str("│ ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("└─\n");
}

fn print_chat(state: &AppState) {
    let messages = state.with_project(|project| project.chat.messages().to_vec());
    if messages.is_empty() {
        println!("Todavía no hay mensajes. Usa 'ask <texto>' para empezar.");
        return;
    }
    for message in &messages {
        println!("{}\n", render_message(message));
    }
}

fn print_project(state: &AppState) -> Result<()> {
    let mut project = state.with_project(|project| project.to_project());
    if !project.settings.api_key.is_empty() {
        project.settings.api_key = "********".to_string();
    }
    println!("{}", serde_json::to_string_pretty(&project)?);
    Ok(())
}

fn print_tree(state: &AppState, query: &str) {
    state.with_project(|project| {
        if project.tree.is_empty() {
            println!("Sube un código para empezar");
            return;
        }
        let filtered = project.filtered_files(query);
        if filtered.is_empty() {
            println!("No se encontraron ficheros");
            return;
        }
        for (depth, node) in project.expand.visible_rows(&filtered) {
            let marker = if node.is_folder() {
                if project.expand.is_expanded(node) { "▾ " } else { "▸ " }
            } else if project.selection.context_paths.contains(&node.path) {
                "[x] "
            } else {
                "[ ] "
            };
            println!("{}{marker}{}", "  ".repeat(depth), node.name);
        }
        if project.selection.context_count() > 0 {
            println!("{} seleccionados", project.selection.context_count());
        }
    });
}

fn print_settings(state: &AppState) {
    state.with_project(|project| {
        let s = project.settings.get();
        println!("Modelo:        {} ({})", s.model.display_name(), s.model);
        println!("Temperatura:   {:.2}", s.temperature);
        println!("Max tokens:    {}", s.max_tokens);
        println!("API key:       {}", if s.api_key.is_empty() { "(sin definir)" } else { "********" });
        println!("Base de datos: {}", if s.database_url.is_empty() { "(sin definir)" } else { s.database_url.as_str() });
    });
}

fn print_status(state: &AppState) {
    let indexing = state.indexing_status();
    state.with_project(|project| {
        println!("Proyecto:    {}", project.name);
        println!("Indexación:  {}", render_status(&indexing));
        println!("Mensajes:    {}", project.chat.messages().len());
        println!("Generando:   {}", if project.chat.is_generating() { "sí" } else { "no" });
        println!("Contexto:    {} ficheros", project.selection.context_count());
        println!(
            "Abierto:     {}",
            project.selection.selected_file.as_deref().unwrap_or("ninguno")
        );
    });
}

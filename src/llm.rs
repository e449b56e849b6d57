//! Colaborador de generación de respuestas del asistente.
//!
//! `ReplyGenerator` es la frontera con el backend de IA. De momento sólo
//! existe `PlaceholderGenerator`, que responde tras una latencia fija con una
//! plantilla que repite la última pregunta del usuario.

use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use tracing::debug;

use crate::models::{Message, Role};
use crate::settings::ProjectSettings;

/// Todo lo que el backend necesita para contestar.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub history: Vec<Message>,
    pub context_files: Vec<String>,
    pub settings: ProjectSettings,
}

impl ReplyRequest {
    pub fn last_question(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Generación asíncrona y cancelable: el llamante puede soltar el futuro (o
/// abortar la tarea) en cualquier momento.
pub trait ReplyGenerator: Send + Sync {
    fn generate_reply<'a>(&'a self, request: &'a ReplyRequest) -> BoxFuture<'a, Result<String>>;
}

#[derive(Debug, Clone)]
pub struct PlaceholderGenerator {
    pub latency: Duration,
}

impl PlaceholderGenerator {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    fn render(question: &str, context_files: &[String]) -> String {
        let mut reply = format!(
            "Entiendo que preguntas sobre: \"{question}\"\n\n\
Aquí tienes un ejemplo de respuesta con código:\n\n\
```typescript\n\
function analyzeCode() {{\n  \
// Aquí iría el análisis inteligente del código\n  \
console.log(\"Analizando tu código...\");\n  \
return \"¡Análisis completado!\";\n\
}}\n\
```\n\n\
En una implementación real:\n\
1. Analizaría la estructura de tu código\n\
2. Daría sugerencias según el contexto\n\
3. Ayudaría con refactorizaciones y mejoras"
        );
        if !context_files.is_empty() {
            reply.push_str("\n\nFicheros de contexto: ");
            reply.push_str(&context_files.join(", "));
        }
        reply
    }
}

impl ReplyGenerator for PlaceholderGenerator {
    fn generate_reply<'a>(&'a self, request: &'a ReplyRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let question = request
                .last_question()
                .ok_or_else(|| anyhow!("No hay ninguna pregunta del usuario en el historial"))?;
            debug!(
                "Generando respuesta simulada con {} (temperatura {}, max {} tokens)",
                request.settings.model, request.settings.temperature, request.settings.max_tokens
            );
            tokio::time::sleep(self.latency).await;
            Ok(Self::render(question, &request.context_files))
        })
    }
}

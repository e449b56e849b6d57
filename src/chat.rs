//! Registro de la conversación (turnos de usuario y asistente) y bandera de
//! generación en curso.
//!
//! Cada generación recibe un ticket con una época; cancelar o iniciar otra
//! avanza la época y cualquier respuesta con un ticket antiguo se descarta.

use chrono::{SubsecRound, Utc};
use tracing::{debug, info};

use crate::error::{ShellError, ShellResult};
use crate::models::{Message, MessageId, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket {
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
    next_id: u64,
    is_generating: bool,
    epoch: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
            is_generating: false,
            epoch: 0,
        }
    }
}

impl ChatSession {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    fn push(&mut self, role: Role, content: String) -> &Message {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            role,
            content,
            timestamp: Utc::now().trunc_subsecs(3),
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Añade un mensaje de usuario con el texto recortado. El texto vacío se
    /// rechaza sin tocar el registro.
    pub fn append_user_message(&mut self, text: &str) -> ShellResult<&Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ShellError::InvalidInput(
                "El mensaje está vacío".to_string(),
            ));
        }
        Ok(self.push(Role::User, text.to_string()))
    }

    pub fn append_assistant_message(&mut self, text: impl Into<String>) -> &Message {
        self.push(Role::Assistant, text.into())
    }

    /// Envío desde la caja de texto: añade el mensaje del usuario y pasa a
    /// `generating`. Mientras haya una generación en curso no se admite otro envío.
    pub fn submit(&mut self, text: &str) -> ShellResult<GenerationTicket> {
        if self.is_generating {
            return Err(ShellError::InvalidInput(
                "Ya hay una respuesta en curso".to_string(),
            ));
        }
        let id = self.append_user_message(text)?.id;
        self.epoch += 1;
        self.is_generating = true;
        debug!("Mensaje {id} enviado, generación {} en curso", self.epoch);
        Ok(GenerationTicket { epoch: self.epoch })
    }

    pub fn is_current(&self, ticket: GenerationTicket) -> bool {
        self.is_generating && ticket.epoch == self.epoch
    }

    /// Aplica el resultado de una generación. Un ticket caducado (cancelado
    /// o sustituido) no modifica nada y devuelve `Ok(None)`.
    pub fn complete(
        &mut self,
        ticket: GenerationTicket,
        reply: anyhow::Result<String>,
    ) -> ShellResult<Option<&Message>> {
        if !self.is_current(ticket) {
            info!("Respuesta de la generación {} descartada (caducada)", ticket.epoch);
            return Ok(None);
        }
        self.is_generating = false;
        match reply {
            Ok(text) => Ok(Some(self.append_assistant_message(text))),
            Err(err) => Err(ShellError::GenerationFailure(err.to_string())),
        }
    }

    /// Baja la bandera de generación. Lo que ya esté en el registro se queda.
    pub fn cancel_generation(&mut self) -> bool {
        let was_generating = self.is_generating;
        self.is_generating = false;
        self.epoch += 1;
        was_generating
    }

    /// Vacía el registro. El contador de ids no se reinicia.
    pub fn clear(&mut self) {
        self.cancel_generation();
        self.messages.clear();
    }
}

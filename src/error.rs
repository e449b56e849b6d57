//! Taxonomía de errores del modelo de estado.
//!
//! Todos los errores se recuperan en el punto de la acción del usuario y se
//! muestran como notificación; ninguno es fatal para el proceso.

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Entrada no válida: {0}")]
    InvalidInput(String),

    #[error("Configuración no válida: {0}")]
    InvalidConfig(String),

    #[error("No encontrado: {0}")]
    NotFound(String),

    #[error("Error generando la respuesta: {0}")]
    GenerationFailure(String),

    #[error("Error indexando el código: {0}")]
    IngestionFailure(String),

    #[error("Operación cancelada por el usuario")]
    ConfirmationDeclined,

    #[error("Error de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error de JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShellError {
    /// `true` cuando el "error" no es más que el usuario rechazando una acción.
    pub fn is_noop(&self) -> bool {
        matches!(self, ShellError::ConfirmationDeclined)
    }
}

pub type ShellResult<T> = Result<T, ShellError>;

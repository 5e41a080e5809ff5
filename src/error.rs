use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised by the booking flow and the admin panel.
///
/// User-facing messages are Spanish, matching what the front ends display.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("No se encontró el registro solicitado")]
    NotFound,

    #[error("Este horario ya fue reservado por otra cita. Por favor, elige otro horario.")]
    SlotUnavailable,

    #[error("Conflicto detectado: Este horario ya fue aceptado para otra cita.")]
    SlotConflict,

    #[error("Error de base de datos: {0}")]
    Database(String),

    #[error("No se pudo guardar la identificación: {0}")]
    Upload(String),

    #[error("No se pudo enviar el correo: {0}")]
    Email(String),

    #[error("Error interno: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::NotFound => StatusCode::NOT_FOUND,
            BookingError::SlotUnavailable | BookingError::SlotConflict => StatusCode::CONFLICT,
            BookingError::Database(_) | BookingError::Upload(_) | BookingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BookingError::Email(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<diesel::result::Error> for BookingError {
    fn from(err: diesel::result::Error) -> Self {
        BookingError::Database(err.to_string())
    }
}

//! # Errores del servidor
//! src/error.rs
//!
//! - [`ServeError`]: lo que retorna `listen_and_serve` (fatal para el loop)
//! - [`ConnectionError`]: el resultado de una conexión; solo se loguea
//! - [`HandlerError`]: lo que puede retornar un handler
//!
//! Los errores de parsing viven en [`crate::http::ParseError`].

use std::io;

use thiserror::Error;

use crate::http::ParseError;
use crate::server::ServerState;

/// Error arbitrario de un handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Resultado de un handler
pub type HandlerResult = Result<(), HandlerError>;

/// Errores fatales del loop de accept
#[derive(Debug, Error)]
pub enum ServeError {
    /// No se pudo hacer bind de la dirección configurada
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Error no transitorio en accept; el servidor deja de escuchar
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// `listen_and_serve` solo se puede llamar una vez
    #[error("server already started (state: {0:?})")]
    AlreadyStarted(ServerState),
}

/// Motivo por el que una conexión terminó sin respuesta completa
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Request malformado o error de lectura; no se escribe nada
    #[error("parse request error: {0}")]
    Parse(#[from] ParseError),

    /// El handler falló (o hizo panic); no se escribe nada
    #[error("handler error: {0}")]
    Handler(#[source] HandlerError),

    /// Se escribieron menos bytes que los compuestos
    #[error("write incomplete: {written} of {expected} bytes")]
    WriteIncomplete {
        written: usize,
        expected: usize,
        #[source]
        source: io::Error,
    },

    /// Error configurando el socket de la conexión
    #[error("connection setup error: {0}")]
    Io(#[from] io::Error),
}

//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en una dirección
//! 2. Acepta conexiones en un loop que respeta el shutdown
//! 3. Atiende cada conexión en su propio thread
//! 4. Responde y cierra (sin keep-alive)

mod connection;
pub mod mux;

// Re-exportar para facilitar el uso
pub use mux::{Multiplexer, ServerState};

//! # minimux
//! src/lib.rs
//!
//! Servidor HTTP/1.x mínimo implementado desde cero: un thread por
//! conexión, un request por conexión y dispatch por path exacto.
//!
//! ## Arquitectura
//!
//! - `http`: Request, Response, Body perezoso y el parser por streaming
//! - `router`: Registro path → handler y el default handler (404)
//! - `server`: Multiplexer (loop de accept, shutdown) y ciclo de vida de
//!   cada conexión
//! - `config`: CLI/env y configuración de runtime
//! - `error`: Errores del servidor y de cada conexión
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use minimux::server::Multiplexer;
//!
//! let mut mux = Multiplexer::new("127.0.0.1:8080");
//! mux.handle_func("/about", |_req, resp| {
//!     resp.set_content_type("text/html");
//!     resp.set_body("<h1>About</h1>");
//!     Ok(())
//! });
//! mux.listen_and_serve().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod server;

pub use error::{ConnectionError, HandlerError, HandlerResult, ServeError};
pub use server::{Multiplexer, ServerState};

//! # Módulo HTTP
//!
//! Subconjunto mínimo de HTTP/1.x, implementado desde cero:
//!
//! - Parsing por streaming de la request line y los headers
//! - Body perezoso que recuerda si fue leído
//! - Construcción y serialización de responses
//!
//! No hay keep-alive, chunked encoding ni headers repetidos: cada conexión
//! lleva un request y una respuesta.
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! <body opcional, hasta Content-Length bytes>
//! ```

pub mod body;      // Body perezoso con flag de lectura
pub mod parser;    // Parsing de la request line y headers
pub mod request;   // Request parseado
pub mod response;  // Construcción de responses
pub mod status;    // Códigos de estado conocidos

pub use body::{Body, BodyLength};
pub use parser::{parse_request, parse_request_with_limit, ParseError};
pub use request::Request;
pub use response::Response;
pub use status::{is_server_error_code, status_line_code, StatusCode};

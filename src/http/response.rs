//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! El servidor crea una `Response` vacía y se la pasa al handler, que la
//! llena. El status viaja en el pseudo-header `Status` (ej: `"404 Not
//! Found"`); si el handler no lo pone, se responde `200 OK`.
//!
//! ## Formato en el cable
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Length: 22\r\n
//! Content-Type: text/html\r\n
//! \r\n
//! <h1>Hello, World!</h1>
//! ```
//!
//! Solo se emiten `Content-Length` (calculado del body real) y
//! `Content-Type`; el resto de headers queda del lado del servidor.

use super::request::canonical_header_name;
use super::StatusCode;
use std::collections::HashMap;

/// Nombre del pseudo-header que lleva la status line
pub const STATUS_HEADER: &str = "Status";

/// Status line que se usa cuando el handler no puso ninguna
pub const DEFAULT_STATUS: &str = "200 OK";

/// Respuesta que construye un handler
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Headers, incluyendo el pseudo-header `Status`
    pub headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    pub body: Vec<u8>,
}

impl Response {
    /// Respuesta vacía: sin headers y sin body
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un header; si ya existe, se sobrescribe.
    ///
    /// El nombre se guarda canónico, igual que en el request:
    /// `content-type` y `Content-Type` son el mismo header.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(canonical_header_name(name), value.to_string());
    }

    /// Busca un header sin importar mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_name(name))
            .map(|s| s.as_str())
    }

    /// Pone el status a partir de un código conocido
    ///
    /// # Ejemplo
    /// ```
    /// use minimux::http::{Response, StatusCode};
    ///
    /// let mut response = Response::new();
    /// response.set_status(StatusCode::NotFound);
    /// assert_eq!(response.status(), Some("404 Not Found"));
    /// ```
    pub fn set_status(&mut self, status: StatusCode) {
        self.set_status_line(&status.to_string());
    }

    /// Pone una status line arbitraria (ej: `"418 I'm a teapot"`)
    pub fn set_status_line(&mut self, line: &str) {
        self.set_header(STATUS_HEADER, line);
    }

    /// Status line explícita, si el handler puso alguna
    pub fn status(&self) -> Option<&str> {
        self.header(STATUS_HEADER).filter(|s| !s.is_empty())
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header("Content-Type", content_type);
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Reemplaza el body
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Si no hay status explícito, pone `200 OK`
    pub fn normalize_status(&mut self) {
        if self.status().is_none() {
            self.set_status_line(DEFAULT_STATUS);
        }
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - `Content-Length` con el largo real del body
    /// - `Content-Type` solo si el handler lo puso
    /// - Línea vacía y el body tal cual
    pub fn to_bytes(&self) -> Vec<u8> {
        let status = self.status().unwrap_or(DEFAULT_STATUS);

        let mut head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\n",
            status,
            self.body.len()
        );
        if let Some(content_type) = self.content_type() {
            head.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        head.push_str("\r\n");

        let mut result = Vec::with_capacity(head.len() + self.body.len());
        result.extend_from_slice(head.as_bytes());
        result.extend_from_slice(&self.body);
        result
    }
}

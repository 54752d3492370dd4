//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Los handlers pueden escribir el pseudo-header `Status` a mano
//! (`"200 OK"`), pero este enum evita errores de tipeo en los códigos que
//! el propio servidor produce.

/// Códigos de estado que el servidor conoce por nombre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 404 Not Found - Usado por el default handler
    NotFound = 404,

    /// 500 Internal Server Error - Usado cuando no se pudo drenar el body
    InternalServerError = 500,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use minimux::http::StatusCode;
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Texto de razón asociado al código
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// Busca el código a partir de una status line como `"404 Not Found"`.
    ///
    /// Solo mira el número; el texto de razón puede ser cualquiera.
    pub fn from_status_line(line: &str) -> Option<Self> {
        match status_line_code(line)? {
            200 => Some(StatusCode::Ok),
            404 => Some(StatusCode::NotFound),
            500 => Some(StatusCode::InternalServerError),
            _ => None,
        }
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        is_server_error_code(self.as_u16())
    }
}

/// Código numérico al inicio de una status line (`"503 Busy"` → `503`).
///
/// Acepta cualquier código de tres dígitos, lo conozca el enum o no.
pub fn status_line_code(line: &str) -> Option<u16> {
    let code = line.split_whitespace().next()?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    code.parse().ok()
}

/// `true` para cualquier código 5xx
pub fn is_server_error_code(code: u16) -> bool {
    (500..600).contains(&code)
}

impl std::fmt::Display for StatusCode {
    /// Formato de status line: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

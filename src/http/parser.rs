//! # Parsing de Requests HTTP/1.x
//! src/http/parser.rs
//!
//! Parser por streaming: lee la request line y los headers línea por línea
//! directo del socket y deja el stream posicionado en el primer byte del
//! body. El body nunca se lee acá.
//!
//! ## Formato
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```
//!
//! Se aceptan líneas terminadas en `\r\n` o solo en `\n`.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read};

use thiserror::Error;
use url::Url;

use super::request::canonical_header_name;
use super::{Body, BodyLength, Request};

/// Límite por defecto para request line + headers
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8192;

/// Base para resolver targets en origin-form (`/path`)
const ORIGIN_BASE: &str = "http://localhost/";

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Error)]
pub enum ParseError {
    /// La request line no tiene exactamente tres tokens
    #[error("invalid request line: {0:?}")]
    InvalidRequestLine(String),

    /// El request-target no es una URL válida
    #[error("invalid url {target:?}: {reason}")]
    InvalidUrl { target: String, reason: String },

    /// La versión no tiene la forma `HTTP/<major>.<minor>`
    #[error("invalid protocol version: {0:?}")]
    InvalidVersion(String),

    /// Header sin `:`
    #[error("invalid header: {0:?}")]
    InvalidHeader(String),

    /// `Content-Length` no numérico
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// Request line + headers superan el límite configurado
    #[error("request head exceeds {0} bytes")]
    HeadersTooLarge(usize),

    /// Falló la lectura del socket (o se cerró antes de terminar los headers)
    #[error("connection read failed: {0}")]
    ConnectionRead(#[from] io::Error),
}

/// Parsea un request con el límite de headers por defecto
///
/// # Ejemplo
///
/// ```
/// use minimux::http::parse_request;
///
/// let raw: &'static [u8] = b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n";
/// let request = parse_request(raw).unwrap();
///
/// assert_eq!(request.method(), "GET");
/// assert_eq!(request.path(), "/hello");
/// assert_eq!(request.header("Host"), Some("x"));
/// ```
pub fn parse_request<R: Read + Send + 'static>(reader: R) -> Result<Request, ParseError> {
    parse_request_with_limit(reader, DEFAULT_MAX_HEADER_BYTES)
}

/// Parsea un request leyendo como máximo `max_header_bytes` antes del body
pub fn parse_request_with_limit<R: Read + Send + 'static>(
    reader: R,
    max_header_bytes: usize,
) -> Result<Request, ParseError> {
    let mut reader = BufReader::new(reader);
    let mut budget = max_header_bytes;

    // 1. Request line
    let line = read_line(&mut reader, &mut budget, max_header_bytes)?;
    let line = String::from_utf8(line)
        .map_err(|e| ParseError::InvalidRequestLine(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;

    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(ParseError::InvalidRequestLine(line));
    }
    let (method, target, proto) = (parts[0], parts[1], parts[2]);

    // 2. Request-target
    let (url, path) = parse_target(target)?;

    // 3. Versión
    let (proto_major, proto_minor) = parse_version(proto)?;

    // 4. Headers hasta la línea vacía
    let mut headers = HashMap::new();
    loop {
        let line = read_line(&mut reader, &mut budget, max_header_bytes)?;
        if line.is_empty() {
            break;
        }

        let line = String::from_utf8(line)
            .map_err(|e| ParseError::InvalidHeader(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.clone()))?;

        headers.insert(canonical_header_name(name.trim()), value.trim().to_string());
    }

    // 5. Host
    let host = headers
        .get("Host")
        .cloned()
        .or_else(|| url.host_str().filter(|_| !target.starts_with('/')).map(str::to_string))
        .unwrap_or_default();

    // 6. Body, sin leerlo
    let length = match headers.get("Content-Length") {
        Some(value) => BodyLength::Declared(parse_content_length(value)?),
        None => BodyLength::UntilEof,
    };

    Ok(Request {
        method: method.to_string(),
        path,
        url,
        host,
        proto: proto.to_string(),
        proto_major,
        proto_minor,
        headers,
        body: Body::new(reader, length),
    })
}

/// Solo dígitos ASCII: `u64::from_str` aceptaría un `+` adelante
fn parse_content_length(value: &str) -> Result<u64, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength(value.to_string()));
    }
    value
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidContentLength(value.to_string()))
}

/// Lee una línea sin el terminador (`\n` o `\r\n`).
///
/// Descuenta los bytes leídos de `budget`.
fn read_line<R: BufRead>(
    reader: &mut R,
    budget: &mut usize,
    max_header_bytes: usize,
) -> Result<Vec<u8>, ParseError> {
    let mut line = Vec::new();
    let n = (&mut *reader).take(*budget as u64).read_until(b'\n', &mut line)?;

    if line.last() != Some(&b'\n') {
        if n == *budget {
            return Err(ParseError::HeadersTooLarge(max_header_bytes));
        }
        return Err(ParseError::ConnectionRead(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before end of request head",
        )));
    }
    *budget -= n;

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(line)
}

/// Parsea el request-target y retorna la URL y el path sin query
fn parse_target(target: &str) -> Result<(Url, String), ParseError> {
    let invalid = |reason: String| ParseError::InvalidUrl {
        target: target.to_string(),
        reason,
    };

    let mut url = if target.starts_with('/') {
        let base = Url::parse(ORIGIN_BASE).map_err(|e| invalid(e.to_string()))?;
        base.join(target).map_err(|e| invalid(e.to_string()))?
    } else {
        Url::parse(target).map_err(|e| invalid(e.to_string()))?
    };

    if url.scheme() != "http" {
        url.set_scheme("http")
            .map_err(|_| invalid(format!("cannot normalize scheme {:?}", url.scheme())))?;
    }
    if url.cannot_be_a_base() {
        return Err(invalid("target has no path".to_string()));
    }

    // En origin-form el path se conserva tal cual vino
    let path = if target.starts_with('/') {
        let end = target.find(|c| c == '?' || c == '#').unwrap_or(target.len());
        target[..end].to_string()
    } else {
        url.path().to_string()
    };

    Ok((url, path))
}

/// Parsea `HTTP/<major>.<minor>`
fn parse_version(proto: &str) -> Result<(u8, u8), ParseError> {
    let invalid = || ParseError::InvalidVersion(proto.to_string());

    let (major, minor) = proto
        .strip_prefix("HTTP/")
        .and_then(|v| v.split_once('.'))
        .ok_or_else(invalid)?;

    let major = major.parse::<u8>().map_err(|_| invalid())?;
    let minor = minor.parse::<u8>().map_err(|_| invalid())?;
    Ok((major, minor))
}

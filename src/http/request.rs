//! # Request HTTP parseado
//! src/http/request.rs
//!
//! El `Request` es lo que recibe cada handler. Se construye en
//! [`crate::http::parser`] y, salvo el body, no cambia después del parsing.
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.1`
//! 2. **Headers**: Pares `Name: Value`, con el nombre canonicalizado
//! 3. **Body**: [`Body`] sobre los bytes que quedan en la conexión

use std::collections::HashMap;

use url::Url;

use super::Body;

/// Representa un request HTTP/1.x parseado
#[derive(Debug)]
pub struct Request {
    /// Método tal cual vino en la request line (ej: "GET")
    pub(crate) method: String,

    /// Path sin query (ej: "/echo")
    pub(crate) path: String,

    /// Request-target parseado, siempre con scheme `http`
    pub(crate) url: Url,

    /// Header `Host`, o el host de un target absoluto
    pub(crate) host: String,

    /// Versión tal cual vino (ej: "HTTP/1.1")
    pub(crate) proto: String,
    pub(crate) proto_major: u8,
    pub(crate) proto_minor: u8,

    /// Headers con nombre canónico; el último repetido gana
    pub(crate) headers: HashMap<String, String>,

    pub(crate) body: Body,
}

impl Request {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path de la petición, usado para el dispatch exacto
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Versión completa, ej: "HTTP/1.1"
    pub fn proto(&self) -> &str {
        &self.proto
    }

    /// Versión como `(major, minor)`
    pub fn proto_version(&self) -> (u8, u8) {
        (self.proto_major, self.proto_minor)
    }

    /// Query string cruda, sin el `?`
    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// Obtiene un query parameter decodificado
    ///
    /// # Ejemplo
    /// ```
    /// use minimux::http::parse_request;
    ///
    /// let raw: &'static [u8] = b"GET /reverse?text=hola%20mundo HTTP/1.1\r\n\r\n";
    /// let request = parse_request(raw).unwrap();
    ///
    /// assert_eq!(request.query_param("text").as_deref(), Some("hola mundo"));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header, sin importar mayúsculas/minúsculas en `name`
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_name(name))
            .map(|s| s.as_str())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Acceso mutable al body para leerlo (`std::io::Read`)
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

/// Canonicaliza un nombre de header: `content-length` → `Content-Length`.
///
/// Cada segmento separado por `-` queda con la primera letra en mayúscula y
/// el resto en minúscula.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first
                    .to_ascii_uppercase()
                    .to_string()
                    + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

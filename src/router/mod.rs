//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea paths exactos a handlers.
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! No hay wildcards ni parámetros: `/about` y `/about/` son rutas distintas.
//! Si no hay handler para el path, corre [`default_handler`] (404 en JSON).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use crate::error::HandlerResult;
use crate::http::{Request, Response, StatusCode};

/// Handler registrado para un path.
///
/// Recibe el request (mutable para poder leer el body) y una respuesta vacía
/// que debe llenar. Si retorna error, la conexión se cierra sin respuesta.
pub type Handler = Arc<dyn Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync>;

/// Router que mapea paths a handlers
#[derive(Clone, Default)]
pub struct Router {
    /// Mapa de path → handler
    routes: HashMap<String, Handler>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Registra una ruta con su handler; si el path ya existía, lo reemplaza
    ///
    /// # Ejemplo
    /// ```
    /// use minimux::router::Router;
    ///
    /// let mut router = Router::new();
    /// router.register("/hello", |_req, resp| {
    ///     resp.set_content_type("text/plain");
    ///     resp.set_body("hello");
    ///     Ok(())
    /// });
    /// assert!(router.contains("/hello"));
    /// ```
    pub fn register<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.routes.insert(path.to_string(), Arc::new(handler));
    }

    /// `true` si hay un handler para exactamente ese path
    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Ejecuta el handler del path del request, o el default si no hay
    pub fn route(&self, request: &mut Request, response: &mut Response) -> HandlerResult {
        match self.routes.get(request.path()) {
            Some(handler) => handler(request, response),
            None => {
                tracing::warn!(path = request.path(), "handler no encontrado, usando default");
                default_handler(request, response)
            }
        }
    }
}

/// Handler para paths sin registrar: `404 Not Found` con un JSON que
/// identifica el path. Nunca falla.
pub fn default_handler(request: &mut Request, response: &mut Response) -> HandlerResult {
    let body = json!({
        "error": "not found",
        "path": request.path(),
    });

    response.set_status(StatusCode::NotFound);
    response.set_content_type("application/json");
    response.set_body(body.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::parse_request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(raw: &'static [u8]) -> Request {
        parse_request(raw).unwrap()
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert!(router.is_empty());
    }

    #[test]
    fn test_register_route() {
        let mut router = Router::new();
        router.register("/test", |_req, _resp| Ok(()));

        assert_eq!(router.len(), 1);
        assert!(router.contains("/test"));
        assert!(!router.contains("/test/"));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut router = Router::new();
        router.register("/test", |_req, resp| {
            resp.set_body("first");
            Ok(())
        });
        router.register("/test", |_req, resp| {
            resp.set_body("second");
            Ok(())
        });
        assert_eq!(router.len(), 1);

        let mut req = request(b"GET /test HTTP/1.1\r\n\r\n");
        let mut resp = Response::new();
        router.route(&mut req, &mut resp).unwrap();
        assert_eq!(resp.body, b"second");
    }

    #[test]
    fn test_route_invokes_exact_handler_only() {
        let hits_a = Arc::new(AtomicUsize::new(0));
        let hits_b = Arc::new(AtomicUsize::new(0));

        let mut router = Router::new();
        let a = Arc::clone(&hits_a);
        router.register("/a", move |_req, _resp| {
            a.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let b = Arc::clone(&hits_b);
        router.register("/b", move |_req, _resp| {
            b.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut req = request(b"GET /a HTTP/1.1\r\n\r\n");
        router.route(&mut req, &mut Response::new()).unwrap();

        assert_eq!(hits_a.load(Ordering::SeqCst), 1);
        assert_eq!(hits_b.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_route_not_found_uses_default() {
        let mut router = Router::new();
        router.register("/", |_req, resp| {
            resp.set_body("root");
            Ok(())
        });

        let mut req = request(b"GET /missing HTTP/1.1\r\n\r\n");
        let mut resp = Response::new();
        router.route(&mut req, &mut resp).unwrap();

        assert_eq!(resp.status(), Some("404 Not Found"));
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["path"], "/missing");
    }

    #[test]
    fn test_query_does_not_affect_match() {
        let mut router = Router::new();
        router.register("/search", |req, resp| {
            resp.set_body(req.query_param("q").unwrap_or_default());
            Ok(())
        });

        let mut req = request(b"GET /search?q=rust HTTP/1.1\r\n\r\n");
        let mut resp = Response::new();
        router.route(&mut req, &mut resp).unwrap();
        assert_eq!(resp.body, b"rust");
    }

    #[test]
    fn test_handler_error_propagates() {
        let mut router = Router::new();
        router.register("/fail", |_req, _resp| Err("boom".into()));

        let mut req = request(b"GET /fail HTTP/1.1\r\n\r\n");
        let err = router.route(&mut req, &mut Response::new()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_default_handler() {
        let mut req = request(b"GET /nope HTTP/1.1\r\n\r\n");
        let mut resp = Response::new();
        default_handler(&mut req, &mut resp).unwrap();

        assert_eq!(resp.status(), Some("404 Not Found"));
        assert_eq!(resp.content_type(), Some("application/json"));
        assert_eq!(resp.body, br#"{"error":"not found","path":"/nope"}"#);
    }
}

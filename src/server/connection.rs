//! # Ciclo de vida de una conexión
//! src/server/connection.rs
//!
//! Cada conexión aceptada corre en su propio thread:
//!
//! ```text
//! parse → dispatch → normalizar status → drenar body → escribir → cerrar
//! ```
//!
//! Si el parsing o el handler fallan, la conexión se cierra sin escribir
//! nada: el peer ve una respuesta completa o un cierre, nunca algo a medias.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ConnectionError;
use crate::http::{
    is_server_error_code, parse_request_with_limit, status_line_code, BodyLength, Response, StatusCode,
};
use crate::router::Router;

/// Atiende una conexión y loguea el resultado. Nunca falla hacia afuera.
pub(crate) fn serve(stream: TcpStream, peer: SocketAddr, router: &Router, config: &ServerConfig) {
    let span = tracing::info_span!("connection", %peer);
    let _guard = span.enter();

    match handle_connection(stream, router, config) {
        Ok(()) => {}
        Err(ConnectionError::Parse(e)) => {
            warn!(error = %e, "parse request error, cerrando sin respuesta");
        }
        Err(ConnectionError::Handler(e)) => {
            error!(error = %e, "handler error, cerrando sin respuesta");
        }
        Err(e @ ConnectionError::WriteIncomplete { .. }) => {
            error!(error = %e, "write response error");
        }
        Err(e) => {
            error!(error = %e, "connection error");
        }
    }
}

/// Procesa un request completo sobre `stream`
pub(crate) fn handle_connection(
    mut stream: TcpStream,
    router: &Router,
    config: &ServerConfig,
) -> Result<(), ConnectionError> {
    let start = Instant::now();

    stream.set_read_timeout(Some(config.read_timeout))?;
    stream.set_write_timeout(Some(config.write_timeout))?;

    // El body se queda con una copia del socket para leer
    let reader = stream.try_clone()?;
    let mut request = parse_request_with_limit(reader, config.max_header_bytes)?;

    debug!(
        method = request.method(),
        path = request.path(),
        host = request.host(),
        headers = request.headers().len(),
        "request parseado"
    );

    let mut response = Response::new();

    // Un panic en el handler se trata igual que un error
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        router.route(&mut request, &mut response)
    }));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(ConnectionError::Handler(e)),
        Err(_) => return Err(ConnectionError::Handler("handler panicked".into())),
    }

    response.normalize_status();

    if !request.body().is_read() {
        let drain = match request.body().length() {
            BodyLength::Declared(_) => request.body_mut().close(),
            // Sin Content-Length el peer suele dejar el socket abierto
            // esperando la respuesta: solo se descarta lo que ya llegó, y
            // nunca más allá de drain_timeout
            BodyLength::UntilEof => {
                stream.set_nonblocking(true)?;
                let drained = request
                    .body_mut()
                    .close_before(Instant::now() + config.drain_timeout);
                stream.set_nonblocking(false)?;
                drained
            }
        };

        match drain {
            Ok(drained) => debug!(drained, "body no leído, drenado"),
            Err(e) => {
                error!(error = %e, "close body error");
                response.set_status(StatusCode::InternalServerError);
            }
        }
    }

    let bytes = response.to_bytes();
    write_response(&mut stream, &bytes)?;

    let status = response.status().unwrap_or_default();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    if status_line_code(status).is_some_and(is_server_error_code) {
        warn!(path = request.path(), status, bytes = bytes.len(), elapsed_ms, "respuesta enviada con error");
    } else {
        info!(path = request.path(), status, bytes = bytes.len(), elapsed_ms, "respuesta enviada");
    }

    // Sin keep-alive: siempre se cierra
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        debug!(error = %e, "shutdown del socket");
    }
    Ok(())
}

/// Escribe todos los bytes o reporta cuántos alcanzaron a salir
pub(crate) fn write_response<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), ConnectionError> {
    let expected = bytes.len();
    let mut written = 0;

    while written < expected {
        match writer.write(&bytes[written..]) {
            Ok(0) => {
                return Err(ConnectionError::WriteIncomplete {
                    written,
                    expected,
                    source: io::Error::from(io::ErrorKind::WriteZero),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(ConnectionError::WriteIncomplete {
                    written,
                    expected,
                    source,
                })
            }
        }
    }

    writer.flush().map_err(|source| ConnectionError::WriteIncomplete {
        written,
        expected,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    /// Writer que acepta `capacity` bytes y después falla
    struct ShortWriter {
        data: Vec<u8>,
        capacity: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.capacity - self.data.len();
            if room == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
            }
            let n = room.min(buf.len()).min(3);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_response_handles_partial_writes() {
        let mut writer = ShortWriter {
            data: Vec::new(),
            capacity: 64,
        };
        write_response(&mut writer, b"HTTP/1.1 200 OK\r\n\r\n").unwrap();
        assert_eq!(writer.data, b"HTTP/1.1 200 OK\r\n\r\n");
    }

    #[test]
    fn test_write_response_reports_incomplete() {
        let mut writer = ShortWriter {
            data: Vec::new(),
            capacity: 5,
        };
        let err = write_response(&mut writer, b"0123456789").unwrap_err();
        match err {
            ConnectionError::WriteIncomplete { written, expected, .. } => {
                assert_eq!(written, 5);
                assert_eq!(expected, 10);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    /// Acepta una conexión, la procesa con `router` y retorna el resultado
    fn run_once(router: Router, raw: &'static [u8]) -> (Vec<u8>, Result<(), ConnectionError>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().unwrap();
        let config = ServerConfig::with_address("127.0.0.1:0");

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &router, &config)
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(raw).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        (buf, server.join().unwrap())
    }

    #[test]
    fn test_handle_connection_default_status() {
        let mut router = Router::new();
        router.register("/", |_req, resp| {
            resp.set_body("ok");
            Ok(())
        });

        let (buf, result) = run_once(router, b"GET / HTTP/1.1\r\n\r\n");
        assert!(result.is_ok());
        assert_eq!(buf, b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");
    }

    #[test]
    fn test_handle_connection_parse_error_writes_nothing() {
        let (buf, result) = run_once(Router::new(), b"\x00\x01\x02\x03garbage\r\n\r\n");
        assert!(buf.is_empty());
        assert!(matches!(result, Err(ConnectionError::Parse(_))));
    }

    #[test]
    fn test_handle_connection_handler_error_writes_nothing() {
        let mut router = Router::new();
        router.register("/fail", |_req, resp| {
            resp.set_body("never sent");
            Err("boom".into())
        });

        let (buf, result) = run_once(router, b"GET /fail HTTP/1.1\r\n\r\n");
        assert!(buf.is_empty());
        assert!(matches!(result, Err(ConnectionError::Handler(_))));
    }

    #[test]
    fn test_handle_connection_handler_panic_writes_nothing() {
        let mut router = Router::new();
        router.register("/panic", |_req, _resp| panic!("handler exploded"));

        let (buf, result) = run_once(router, b"GET /panic HTTP/1.1\r\n\r\n");
        assert!(buf.is_empty());
        assert!(matches!(result, Err(ConnectionError::Handler(_))));
    }

    #[test]
    fn test_handle_connection_drains_unread_body() {
        let saw_unread = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&saw_unread);

        let mut router = Router::new();
        router.register("/upload", move |req, _resp| {
            flag.store(!req.body().is_read(), Ordering::SeqCst);
            Ok(())
        });

        let (buf, result) = run_once(
            router,
            b"POST /upload HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world",
        );
        assert!(result.is_ok());
        assert!(saw_unread.load(Ordering::SeqCst));
        assert_eq!(buf, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn test_handle_connection_truncated_body_forces_500() {
        let mut router = Router::new();
        router.register("/upload", |_req, resp| {
            resp.set_content_type("text/plain");
            resp.set_body("stored");
            Ok(())
        });

        // Declara 100 bytes pero el peer cierra después de 5
        let (buf, result) = run_once(
            router,
            b"POST /upload HTTP/1.1\r\nContent-Length: 100\r\n\r\nhello",
        );
        assert!(result.is_ok());
        assert_eq!(
            buf,
            b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 6\r\nContent-Type: text/plain\r\n\r\nstored"
        );
    }

    #[test]
    fn test_handle_connection_handler_reads_body() {
        let mut router = Router::new();
        router.register("/echo", |req, resp| {
            let mut body = Vec::new();
            req.body_mut().read_to_end(&mut body)?;
            resp.set_content_type("text/plain");
            resp.set_body(body);
            Ok(())
        });

        let (buf, result) = run_once(
            router,
            b"POST /echo HTTP/1.1\r\nContent-Length: 4\r\n\r\nping",
        );
        assert!(result.is_ok());
        assert_eq!(
            buf,
            b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nContent-Type: text/plain\r\n\r\nping"
        );
    }
}

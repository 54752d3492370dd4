//! # Body del Request
//! src/http/body.rs
//!
//! El body no se lee al parsear: queda en el socket y el handler decide si
//! lo consume. `Body` envuelve los bytes restantes de la conexión y recuerda
//! si alguien los leyó, para que el servidor pueda drenarlos antes de
//! cerrar cuando el handler los ignoró.

use std::fmt;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cuántos bytes puede entregar el body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    /// El request trajo `Content-Length`
    Declared(u64),

    /// Sin `Content-Length`: el body termina con el EOF de la conexión
    UntilEof,
}

/// Bytes restantes de la conexión después de los headers.
///
/// Implementa [`Read`]. La primera lectura marca el body como leído y esa
/// marca nunca vuelve atrás; el drenado que hace [`Body::close`] no la toca.
pub struct Body {
    reader: io::Take<Box<dyn Read + Send>>,
    length: BodyLength,
    read: AtomicBool,
    closed: bool,
}

impl Body {
    /// Crea un body sobre `reader`, acotado por `length`
    pub fn new<R: Read + Send + 'static>(reader: R, length: BodyLength) -> Self {
        let limit = match length {
            BodyLength::Declared(n) => n,
            BodyLength::UntilEof => u64::MAX,
        };
        let boxed: Box<dyn Read + Send> = Box::new(reader);

        Self {
            reader: boxed.take(limit),
            length,
            read: AtomicBool::new(false),
            closed: false,
        }
    }

    /// Body sin bytes (útil en tests y para requests construidos a mano)
    pub fn empty() -> Self {
        Self::new(io::empty(), BodyLength::Declared(0))
    }

    /// `true` si algún handler leyó del body
    pub fn is_read(&self) -> bool {
        self.read.load(Ordering::Acquire)
    }

    /// `true` después de [`Body::close`]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn length(&self) -> BodyLength {
        self.length
    }

    /// Drena y descarta lo que quede del body.
    ///
    /// Solo drena la primera vez; las llamadas siguientes retornan `Ok(0)`.
    /// Retorna la cantidad de bytes descartados.
    ///
    /// # Errores
    ///
    /// - Con `Content-Length`: cualquier error de lectura, o un EOF antes de
    ///   completar la longitud declarada (`UnexpectedEof`).
    /// - Sin `Content-Length`: un timeout de lectura marca el fin del body y
    ///   no es error; el resto de errores se propaga.
    pub fn close(&mut self) -> io::Result<u64> {
        self.close_inner(None)
    }

    /// Igual que [`Body::close`], pero un body sin `Content-Length` deja de
    /// drenarse al llegar a `deadline` aunque el peer siga mandando bytes.
    ///
    /// Un body con `Content-Length` no tiene plazo: su largo ya lo acota.
    pub fn close_before(&mut self, deadline: Instant) -> io::Result<u64> {
        self.close_inner(Some(deadline))
    }

    fn close_inner(&mut self, deadline: Option<Instant>) -> io::Result<u64> {
        if self.closed {
            return Ok(0);
        }
        self.closed = true;

        match self.length {
            BodyLength::Declared(declared) => {
                let drained = io::copy(&mut self.reader, &mut io::sink())?;
                if self.reader.limit() > 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "body truncado: se esperaban {} bytes, quedaron {} sin llegar",
                            declared,
                            self.reader.limit()
                        ),
                    ));
                }
                Ok(drained)
            }
            BodyLength::UntilEof => self.drain_until_eof(deadline),
        }
    }

    fn drain_until_eof(&mut self, deadline: Option<Instant>) -> io::Result<u64> {
        let mut buf = [0u8; 4096];
        let mut drained = 0u64;

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(drained);
            }
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(drained),
                Ok(n) => drained += n as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // El peer dejó de mandar pero sigue esperando la respuesta
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Ok(drained)
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Ok(0);
        }
        if !buf.is_empty() {
            self.read.store(true, Ordering::Release);
        }
        self.reader.read(buf)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("length", &self.length)
            .field("read", &self.is_read())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    /// Reader que cuenta cuántas veces lo leyeron
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    /// Reader que entrega unos bytes y después simula un timeout del socket
    struct StallingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for StallingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::WouldBlock, "timeout")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_new_body_is_unread() {
        let body = Body::new(Cursor::new(b"hola".to_vec()), BodyLength::Declared(4));
        assert!(!body.is_read());
        assert!(!body.is_closed());
    }

    #[test]
    fn test_read_sets_flag_once() {
        let mut body = Body::new(Cursor::new(b"hola".to_vec()), BodyLength::Declared(4));

        let mut buf = [0u8; 2];
        body.read_exact(&mut buf).unwrap();
        assert!(body.is_read());
        assert_eq!(&buf, b"ho");

        // Llegar al final no desmarca el flag
        let mut rest = Vec::new();
        body.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"la");
        assert!(body.is_read());
    }

    #[test]
    fn test_empty_buffer_does_not_mark_read() {
        let mut body = Body::new(Cursor::new(b"hola".to_vec()), BodyLength::Declared(4));
        let n = body.read(&mut []).unwrap();
        assert_eq!(n, 0);
        assert!(!body.is_read());
    }

    #[test]
    fn test_declared_length_bounds_reads() {
        let mut body = Body::new(
            Cursor::new(b"hola mundo".to_vec()),
            BodyLength::Declared(4),
        );
        let mut all = Vec::new();
        body.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"hola");
    }

    #[test]
    fn test_close_drains_without_marking_read() {
        let mut body = Body::new(Cursor::new(b"12345".to_vec()), BodyLength::Declared(5));
        assert_eq!(body.close().unwrap(), 5);
        assert!(body.is_closed());
        assert!(!body.is_read());
    }

    #[test]
    fn test_close_drains_only_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let reader = CountingReader {
            inner: Cursor::new(b"abc".to_vec()),
            reads: Arc::clone(&reads),
        };
        let mut body = Body::new(reader, BodyLength::Declared(3));

        assert_eq!(body.close().unwrap(), 3);
        let after_first = reads.load(Ordering::SeqCst);
        assert!(after_first > 0);

        assert_eq!(body.close().unwrap(), 0);
        assert_eq!(reads.load(Ordering::SeqCst), after_first);
    }

    #[test]
    fn test_close_truncated_declared_body_fails() {
        let mut body = Body::new(Cursor::new(b"abc".to_vec()), BodyLength::Declared(10));
        let err = body.close().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_close_until_eof_stops_at_timeout() {
        let reader = StallingReader {
            data: Cursor::new(b"restos".to_vec()),
        };
        let mut body = Body::new(reader, BodyLength::UntilEof);
        assert_eq!(body.close().unwrap(), 6);
    }

    #[test]
    fn test_close_before_stops_endless_body() {
        // Un peer que nunca deja de mandar no puede retener el drenado
        let mut body = Body::new(io::repeat(b'x'), BodyLength::UntilEof);
        let deadline = Instant::now() + Duration::from_millis(20);

        let drained = body.close_before(deadline).unwrap();
        assert!(drained > 0);
        assert!(body.is_closed());
        assert!(!body.is_read());
    }

    #[test]
    fn test_close_before_expired_deadline_drains_nothing() {
        let mut body = Body::new(io::repeat(b'x'), BodyLength::UntilEof);
        assert_eq!(body.close_before(Instant::now()).unwrap(), 0);
        assert_eq!(body.close().unwrap(), 0);
    }

    #[test]
    fn test_close_before_ignores_deadline_for_declared_body() {
        let mut body = Body::new(Cursor::new(b"12345".to_vec()), BodyLength::Declared(5));
        assert_eq!(body.close_before(Instant::now()).unwrap(), 5);
    }

    #[test]
    fn test_read_after_close_returns_eof() {
        let mut body = Body::new(Cursor::new(b"abc".to_vec()), BodyLength::Declared(3));
        body.close().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(body.read(&mut buf).unwrap(), 0);
    }
}

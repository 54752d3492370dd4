//! # Multiplexer
//! src/server/mux.rs
//!
//! Dueño del socket de escucha y del registro de handlers.
//!
//! ## Estados
//!
//! ```text
//! Idle → Listening → ShuttingDown → Stopped
//! ```
//!
//! El listener es no bloqueante: el loop de accept revisa el flag de
//! shutdown en cada vuelta y duerme `accept_poll_interval` cuando no hay
//! conexiones pendientes. Cada conexión aceptada se procesa en su propio
//! thread y el loop sigue de inmediato.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{HandlerResult, ServeError};
use crate::http::{Request, Response};
use crate::router::Router;

use super::connection;

/// Estado del servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Creado, todavía sin bind
    Idle,
    /// Aceptando conexiones
    Listening,
    /// Shutdown pedido, el loop todavía no lo vio
    ShuttingDown,
    /// El loop terminó y el listener está cerrado
    Stopped,
}

/// Servidor HTTP/1.x mínimo: un thread por conexión y dispatch por path exacto
///
/// # Ejemplo
///
/// ```no_run
/// use std::sync::Arc;
/// use minimux::server::Multiplexer;
///
/// let mut mux = Multiplexer::new("127.0.0.1:8080");
/// mux.handle_func("/", |_req, resp| {
///     resp.set_content_type("text/html");
///     resp.set_body("<h1>Hello, World!</h1>");
///     Ok(())
/// });
///
/// let mux = Arc::new(mux);
/// let server = {
///     let mux = Arc::clone(&mux);
///     std::thread::spawn(move || mux.listen_and_serve())
/// };
///
/// // ... más tarde
/// mux.shutdown().unwrap();
/// server.join().unwrap().unwrap();
/// ```
pub struct Multiplexer {
    config: ServerConfig,
    router: Router,
    shutdown: Arc<AtomicBool>,
    state: Mutex<ServerState>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Multiplexer {
    /// Crea un multiplexer con la configuración por defecto en `address`
    pub fn new(address: &str) -> Self {
        Self::with_config(ServerConfig::with_address(address))
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(ServerState::Idle),
            local_addr: Mutex::new(None),
        }
    }

    /// Registra un handler para `path` (match exacto).
    ///
    /// Requiere `&mut self`: una vez que el multiplexer se comparte con el
    /// thread que sirve, ya no se puede registrar.
    pub fn handle_func<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.register(path, handler);
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        *lock(&self.state)
    }

    /// Dirección real del listener; `None` antes del bind
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local_addr)
    }

    /// Hace bind y acepta conexiones hasta que se llame a [`shutdown`].
    ///
    /// Bloquea el thread actual. Retorna `Ok(())` después de un shutdown.
    ///
    /// # Errores
    ///
    /// - [`ServeError::Bind`] si no se pudo hacer bind (sin reintentos)
    /// - [`ServeError::Accept`] ante un error de accept no transitorio
    /// - [`ServeError::AlreadyStarted`] si ya se llamó antes
    ///
    /// [`shutdown`]: Multiplexer::shutdown
    pub fn listen_and_serve(&self) -> Result<(), ServeError> {
        {
            let state = lock(&self.state);
            if *state != ServerState::Idle {
                return Err(ServeError::AlreadyStarted(*state));
            }
        }

        let listener = self.bind()?;
        let router = Arc::new(self.router.clone());
        let config = Arc::new(self.config.clone());

        self.transition_from(ServerState::Idle, ServerState::Listening);
        info!(
            address = %self.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            routes = router.len(),
            "servidor escuchando, un thread por conexión"
        );

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                self.set_state(ServerState::ShuttingDown);
                drop(listener);
                self.set_state(ServerState::Stopped);
                info!("listener cerrado, servidor detenido");
                return Ok(());
            }

            match listener.accept() {
                Ok((stream, peer)) => {
                    // En algunas plataformas el socket hereda el modo no bloqueante
                    if let Err(e) = stream.set_nonblocking(false) {
                        warn!(%peer, error = %e, "no se pudo configurar la conexión, descartada");
                        continue;
                    }

                    debug!(%peer, "nueva conexión");
                    let router = Arc::clone(&router);
                    let config = Arc::clone(&config);
                    let spawned = thread::Builder::new()
                        .name(format!("conn-{}", peer))
                        .spawn(move || connection::serve(stream, peer, &router, &config));

                    if let Err(e) = spawned {
                        error!(%peer, error = %e, "no se pudo crear el thread, conexión descartada");
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.config.accept_poll_interval);
                }
                Err(e) if is_transient(&e) => {
                    warn!(error = %e, "error transitorio en accept, sigo escuchando");
                }
                Err(e) => {
                    error!(error = %e, "error fatal en accept, dejo de escuchar");
                    self.set_state(ServerState::Stopped);
                    return Err(ServeError::Accept(e));
                }
            }
        }
    }

    /// Pide al loop de accept que termine. Idempotente.
    ///
    /// No corta las conexiones en curso: terminan por su cuenta.
    pub fn shutdown(&self) -> Result<(), ServeError> {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            info!("shutdown solicitado");
        }
        self.transition_from(ServerState::Listening, ServerState::ShuttingDown);
        Ok(())
    }

    fn bind(&self) -> Result<TcpListener, ServeError> {
        let bind_error = |source: io::Error| ServeError::Bind {
            address: self.config.address.clone(),
            source,
        };

        let listener = TcpListener::bind(&self.config.address).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        *lock(&self.local_addr) = Some(local_addr);
        Ok(listener)
    }

    fn set_state(&self, next: ServerState) {
        *lock(&self.state) = next;
    }

    fn transition_from(&self, current: ServerState, next: ServerState) {
        let mut state = lock(&self.state);
        if *state == current {
            *state = next;
        }
    }
}

/// Errores de accept que afectan solo a esa conexión
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::TimedOut
    )
}

/// Un mutex envenenado solo guarda un enum Copy: se usa el valor igual
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración con soporte para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./minimux --port 8080 --read-timeout-ms 5000 --drain-timeout-ms 50
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! MINIMUX_PORT=8080 MINIMUX_HOST=0.0.0.0 ./minimux
//! ```

use std::time::Duration;

use clap::Parser;

use crate::http::parser::DEFAULT_MAX_HEADER_BYTES;

/// Configuración de línea de comandos del binario
#[derive(Debug, Clone, Parser)]
#[command(name = "minimux")]
#[command(about = "Servidor HTTP/1.x mínimo con dispatch por path exacto")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "MINIMUX_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "MINIMUX_HOST")]
    pub host: String,

    // === Timeouts por conexión ===

    /// Timeout de lectura del socket en milisegundos
    #[arg(long = "read-timeout-ms", default_value = "5000", env = "MINIMUX_READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// Timeout de escritura del socket en milisegundos
    #[arg(long = "write-timeout-ms", default_value = "5000", env = "MINIMUX_WRITE_TIMEOUT_MS")]
    pub write_timeout_ms: u64,

    /// Plazo total para descartar un body sin Content-Length no leído
    #[arg(long = "drain-timeout-ms", default_value = "50", env = "MINIMUX_DRAIN_TIMEOUT_MS")]
    pub drain_timeout_ms: u64,

    // === Accept loop ===

    /// Intervalo entre chequeos de shutdown cuando no hay conexiones
    #[arg(long = "accept-poll-ms", default_value = "25", env = "MINIMUX_ACCEPT_POLL_MS")]
    pub accept_poll_ms: u64,

    // === Límites ===

    /// Máximo de bytes para request line + headers
    #[arg(long = "max-header-bytes", default_value = "8192", env = "MINIMUX_MAX_HEADER_BYTES")]
    pub max_header_bytes: usize,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use minimux::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.read_timeout_ms == 0 {
            return Err("Read timeout must be > 0".to_string());
        }
        if self.write_timeout_ms == 0 {
            return Err("Write timeout must be > 0".to_string());
        }
        if self.drain_timeout_ms == 0 {
            return Err("Drain timeout must be > 0".to_string());
        }
        if self.accept_poll_ms == 0 {
            return Err("Accept poll interval must be > 0".to_string());
        }
        // Tiene que entrar al menos una request line mínima
        if self.max_header_bytes < 16 {
            return Err("Max header bytes must be >= 16".to_string());
        }
        Ok(())
    }

    /// Configuración de runtime para el multiplexer
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            address: self.address(),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            accept_poll_interval: Duration::from_millis(self.accept_poll_ms),
            max_header_bytes: self.max_header_bytes,
        }
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            read_timeout_ms: 5_000,
            write_timeout_ms: 5_000,
            drain_timeout_ms: 50,
            accept_poll_ms: 25,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

/// Configuración que usa el [`crate::server::Multiplexer`] en runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Dirección de bind (ej: "127.0.0.1:8080" o "127.0.0.1:0")
    pub address: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub drain_timeout: Duration,
    pub accept_poll_interval: Duration,
    pub max_header_bytes: usize,
}

impl ServerConfig {
    /// Valores por defecto con otra dirección
    pub fn with_address(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ..Config::default().server_config()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Config::default().server_config()
    }
}

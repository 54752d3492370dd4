//! # minimux - Entry Point
//! src/main.rs
//!
//! Levanta el servidor con tres rutas de ejemplo (`/`, `/about`, `/echo`)
//! y lo detiene con Ctrl-C.

use std::io::Read;
use std::sync::Arc;
use std::thread;

use serde::Deserialize;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minimux::config::Config;
use minimux::http::{Request, Response, StatusCode};
use minimux::server::Multiplexer;
use minimux::HandlerResult;

/// Máximo de bytes que `/echo` lee del body
const MAX_ECHO_BYTES: u64 = 1024;

#[derive(Debug, Deserialize)]
struct Echo {
    message: String,
}

fn hello_handler(_req: &mut Request, resp: &mut Response) -> HandlerResult {
    resp.set_content_type("text/html");
    resp.set_body("<h1>Hello, World!</h1>");
    Ok(())
}

fn about_handler(_req: &mut Request, resp: &mut Response) -> HandlerResult {
    resp.set_content_type("text/html");
    resp.set_status(StatusCode::Ok);
    resp.set_body("<h1>About</h1>");
    Ok(())
}

/// Lee `{"message": "..."}` del body y devuelve el mensaje como texto
fn echo_handler(req: &mut Request, resp: &mut Response) -> HandlerResult {
    let mut buf = Vec::new();
    req.body_mut().take(MAX_ECHO_BYTES).read_to_end(&mut buf)?;

    let echo: Echo = serde_json::from_slice(&buf)?;

    resp.set_content_type("text/plain");
    resp.set_status(StatusCode::Ok);
    resp.set_body(echo.message);
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minimux=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "configuración inválida");
        std::process::exit(2);
    }

    let mut mux = Multiplexer::with_config(config.server_config());
    mux.handle_func("/", hello_handler);
    mux.handle_func("/about", about_handler);
    mux.handle_func("/echo", echo_handler);

    let mux = Arc::new(mux);
    let (done_tx, done_rx) = oneshot::channel();
    let server = {
        let mux = Arc::clone(&mux);
        thread::spawn(move || {
            let result = mux.listen_and_serve();
            let _ = done_tx.send(());
            result
        })
    };
    tracing::info!(address = %config.address(), "servidor iniciado");

    if let Err(e) = wait_for_stop(done_rx) {
        tracing::error!(error = %e, "no se pudo esperar Ctrl-C, deteniendo");
    }

    if let Err(e) = mux.shutdown() {
        tracing::error!(error = %e, "shutdown error");
    }

    match server.join() {
        Ok(Ok(())) => tracing::info!("servidor detenido"),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "💥 Error fatal");
            std::process::exit(1);
        }
        Err(_) => {
            tracing::error!("el thread del servidor hizo panic");
            std::process::exit(1);
        }
    }
}

/// Bloquea hasta recibir Ctrl-C o hasta que el servidor termine solo
fn wait_for_stop(server_done: oneshot::Receiver<()>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => signal,
            _ = server_done => Ok(()),
        }
    })
}

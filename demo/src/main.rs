//! Answers every request on every connection with a fixed HTTP response.
//!
//! ```text
//! edge-uv-demo [host:port]
//! ```

use edge_uv_core::{error, info, Config, Reactor, Result};
use edge_uv_net::{TcpConn, TcpListener};
use std::process::ExitCode;

const DEFAULT_ADDRESS: &str = ":8080";

const BODY: &str = "edge-uv\r\n";

fn response() -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nServer: edge-uv\r\nContent-Length: {}\r\n\r\n{BODY}",
        BODY.len()
    )
    .into_bytes()
}

fn serve(reactor: &mut Reactor, conn: TcpConn) {
    let size = reactor.config().get_read_buffer_size();
    if let Err(e) = conn.read(reactor, vec![0; size], on_request) {
        error!("{} read failed: {e}", conn.token());
        _ = conn.close(reactor);
    }
}

fn on_request(reactor: &mut Reactor, conn: TcpConn, buffer: Vec<u8>, n: usize) {
    if n == 0 {
        if let Ok(peer) = conn.remote_addr(reactor) {
            info!("{peer} closed");
        }
        _ = conn.close(reactor);
        return;
    }
    info!("{}", String::from_utf8_lossy(&buffer[..n]));
    let result = conn.write(reactor, response(), |reactor, conn, _, written| {
        edge_uv_core::debug!("{} answered with {written} bytes", conn.token());
        serve(reactor, conn);
    });
    if let Err(e) = result {
        error!("{} write failed: {e}", conn.token());
        _ = conn.close(reactor);
    }
}

fn listen_and_serve(address: &str) -> Result<()> {
    let mut reactor = Reactor::with_config(Config::from_env())?;
    let listener = TcpListener::bind(&mut reactor, address)?;
    let waiting = listener.accept(&mut reactor, |reactor, conn| {
        if let Ok(peer) = conn.remote_addr(reactor) {
            info!("accepted {peer}");
        }
        serve(reactor, conn);
    })?;
    if waiting > 0 {
        info!("{waiting} connections were already waiting");
    }
    reactor.run()
}

fn main() -> ExitCode {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from(DEFAULT_ADDRESS));
    match listen_and_serve(&address) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("serving {address} failed: {e}");
            ExitCode::FAILURE
        }
    }
}

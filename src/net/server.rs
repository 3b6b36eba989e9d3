//! TCP accept loop.
//!
//! This module is responsible only for networking concerns: binding the
//! listening socket, accepting connections and handing each one to its own
//! task. Everything that happens on a connection lives in
//! [`connection`](crate::net::connection).
//!
//! Connections are independent of each other and of the accept loop. The
//! only state shared across tasks is the closed flag, which lets the accept
//! loop tell a shutdown apart from a genuine accept failure.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_std::net::{TcpListener, TcpStream};
use async_std::task::{self, JoinHandle};
use log::{debug, info, warn};

use crate::config::ServerConfig;
use crate::handler::Handler;
use crate::net::connection;

pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    accept_task: JoinHandle<()>,
}

impl Server {
    /// Binds to the configured address and port and starts accepting
    /// connections in the background.
    ///
    /// Every accepted connection is served by `handler` on a task of its
    /// own. Those tasks are never joined.
    pub async fn serve<H>(config: ServerConfig, handler: H) -> io::Result<Server>
    where
        H: Handler,
    {
        let listener = TcpListener::bind((config.address, config.port)).await?;
        let local_addr = listener.local_addr()?;
        info!("TCP server listening on {}", local_addr);

        let closed = Arc::new(AtomicBool::new(false));
        let handler: Arc<dyn Handler> = Arc::new(handler);
        let accept_task = task::spawn(accept_loop(
            listener,
            handler,
            Arc::new(config),
            Arc::clone(&closed),
        ));

        Ok(Server {
            local_addr,
            closed,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and closes the listening socket.
    ///
    /// Connections already accepted keep running until they finish.
    pub async fn close(self) {
        self.closed.store(true, Ordering::SeqCst);

        // A pending accept cannot be interrupted from here, so wake it with a
        // throwaway connection; the loop sees the flag and drops the listener.
        match TcpStream::connect(wake_addr(self.local_addr)).await {
            Ok(_) => self.accept_task.await,
            Err(err) => {
                debug!("could not wake accept loop on {}: {}", self.local_addr, err);
                self.accept_task.cancel().await;
            }
        }
        info!("server on {} stopped", self.local_addr);
    }

    /// Keeps accepting connections for as long as the process runs.
    pub async fn run(self) {
        self.accept_task.await
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    config: Arc<ServerConfig>,
    closed: Arc<AtomicBool>,
) {
    loop {
        let accepted = listener.accept().await;

        // Whatever woke us after close, successful or not, means shutdown.
        if closed.load(Ordering::SeqCst) {
            return;
        }

        match accepted {
            Ok((stream, _addr)) => {
                task::spawn(connection::handle(
                    stream,
                    Arc::clone(&handler),
                    Arc::clone(&config),
                ));
            }
            Err(err) => warn!("error accepting connection: {}", err),
        }
    }
}

/// Address a local client can reach the listener on.
fn wake_addr(mut addr: SocketAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        let loopback = match addr.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
        };
        addr.set_ip(loopback);
    }
    addr
}

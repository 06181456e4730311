//! Loopback listener that hands accepted connections to sessions.

use tokio::net::TcpListener;
use tracing::{debug, error};

use crate::connection::Connection;
use crate::session::Session;

/// TCP listener bound to the loopback interface
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind loopback on the given port, or an OS-assigned ephemeral port
    /// when `None`
    pub async fn bind(port: Option<u16>) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(("127.0.0.1", port.unwrap_or(0))).await?;
        Ok(Self { listener })
    }

    /// The port this server is bound to. The daemon reports it on stdout
    /// so the spawning host can discover where to connect
    pub fn port(&self) -> Result<u16, std::io::Error> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Accept connections indefinitely, serving each over its own
    /// session. A failed session is logged; the listener keeps accepting
    pub async fn serve(self) -> Result<(), std::io::Error> {
        loop {
            let (socket, addr) = self.listener.accept().await?;
            debug!("connected to client: {}", addr);
            tokio::spawn(async move {
                let session = Session::new(Connection::new(socket));
                if let Err(e) = session.run().await {
                    error!("session {} ended with error - {}", addr, e);
                }
            });
        }
    }
}

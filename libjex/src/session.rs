//! Lifecycle of one accepted connection.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::connection::Connection;
use crate::dispatch::dispatch;
use crate::scope::Scope;

/// One serving connection: its transport and its private scope.
///
/// The scope is allocated when the session is and dropped with it, so
/// bindings live exactly as long as the peer stays connected. Closing a
/// session never affects the listener or other sessions.
pub struct Session<T> {
    conn: Connection<T>,
    scope: Scope,
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session with a fresh scope over the given connection
    pub fn new(conn: Connection<T>) -> Self {
        Self {
            conn,
            scope: Scope::spawn(),
        }
    }

    /// Serve until the peer disconnects. Requests are processed strictly
    /// in arrival order; the next line is not read until the current
    /// response has been written
    pub async fn run(mut self) -> Result<(), std::io::Error> {
        while let Some(line) = self.conn.recv_line().await {
            let line = line?;
            let resp = dispatch(&self.scope, &line).await;
            self.conn.send_resp(&resp).await?;
        }
        debug!("peer disconnected");
        Ok(())
    }
}

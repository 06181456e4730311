//! Headless client for driving a running bridge.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::connection::Connection;
use crate::message::{Request, Response};

/// Client handle over one connection to the bridge.
///
/// The wire protocol carries no request ids; responses correlate to
/// requests purely by arrival order, so each call holds the client until
/// its response is read.
pub struct Client<T = TcpStream> {
    conn: Connection<T>,
}

/// Errors from interacting with [Client]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error("Connection disconnected")]
    Disconnected,
}

impl Client {
    /// Connect to a bridge listening on the loopback interface
    pub async fn connect(port: u16) -> Result<Client, Error> {
        let stream = TcpStream::connect(("127.0.0.1", port)).await?;
        Ok(Client::new(Connection::new(stream)))
    }
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a client over an established connection
    pub fn new(conn: Connection<T>) -> Self {
        Self { conn }
    }

    /// Run source on the bridge for side effect
    pub async fn statement(&mut self, source: &str) -> Result<Response, Error> {
        self.request(&Request::Statement(source.to_string())).await
    }

    /// Run source on the bridge and return its value
    pub async fn expression(&mut self, source: &str) -> Result<Response, Error> {
        self.request(&Request::Expression(source.to_string())).await
    }

    /// Run source on the bridge and return its diagnostic rendering
    pub async fn expression_display(&mut self, source: &str) -> Result<Response, Error> {
        self.request(&Request::ExpressionStringified(source.to_string()))
            .await
    }

    /// Bind a variable in the remote scope to a JSON value
    pub async fn assign(&mut self, name: &str, value: Value) -> Result<Response, Error> {
        self.request(&Request::Assignment {
            var_name: name.to_string(),
            value,
        })
        .await
    }

    /// Dispatch a request and await its order-matched response
    pub async fn request(&mut self, req: &Request) -> Result<Response, Error> {
        debug!("request req = {:?}", req);
        self.conn.send_req(req).await?;
        match self.conn.recv_resp().await {
            Some(resp) => Ok(resp?),
            None => Err(Error::Disconnected),
        }
    }
}

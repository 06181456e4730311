//! Sending and receiving newline-delimited JSON lines over a connection
//! between a host application and the bridge.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::message::{Request, Response};

/// Connection that frames a byte stream into wire lines, one JSON value
/// per line
pub struct Connection<T = TcpStream> {
    stream: Framed<T, LinesCodec>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns a new [Connection] over the given transport
    pub fn new(stream: T) -> Self {
        let stream = Framed::new(stream, LinesCodec::new());
        Connection { stream }
    }

    /// Send one line. The newline terminator is appended by the codec and
    /// the whole line is emitted as a single write
    pub async fn send_line(&mut self, line: String) -> Result<(), std::io::Error> {
        debug!("send line={}", line);
        self.stream.send(line).await.map_err(into_io)
    }

    /// Receive the next complete line. `None` once the peer disconnects
    pub async fn recv_line(&mut self) -> Option<Result<String, std::io::Error>> {
        let line = self.stream.next().await?;
        match line {
            Ok(line) => {
                debug!("recv line={}", line);
                Some(Ok(line))
            }
            Err(e) => Some(Err(into_io(e))),
        }
    }
}

// Convenience APIs
impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Send a request
    pub async fn send_req(&mut self, req: &Request) -> Result<(), std::io::Error> {
        self.send_line(req.to_value().to_string()).await
    }

    /// Send a response
    pub async fn send_resp(&mut self, resp: &Response) -> Result<(), std::io::Error> {
        self.send_line(resp.to_value().to_string()).await
    }

    /// Receive a response
    pub async fn recv_resp(&mut self) -> Option<Result<Response, std::io::Error>> {
        let line = match self.recv_line().await? {
            Ok(line) => line,
            Err(e) => return Some(Err(e)),
        };
        match Response::parse(&line) {
            Some(resp) => Some(Ok(resp)),
            None => Some(Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Unable to decode response - {}", line),
            ))),
        }
    }
}

impl Connection<DuplexStream> {
    /// Returns a pair of in-memory [Connection] connected to one another
    pub fn pair() -> (Connection<DuplexStream>, Connection<DuplexStream>) {
        let (local, remote) = tokio::io::duplex(64 * 1024);
        (Connection::new(local), Connection::new(remote))
    }
}

fn into_io(err: LinesCodecError) -> std::io::Error {
    match err {
        LinesCodecError::Io(err) => err,
        LinesCodecError::MaxLineLengthExceeded => {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "max line length exceeded")
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use serde_json::json;

    /// Test that dropping one end of connection results in other end
    /// returning `None` on `recv` call
    #[tokio::test]
    async fn drop_remote() {
        let (mut local, remote) = Connection::pair();

        drop(remote);

        assert!(
            local.recv_line().await.is_none(),
            "Dropped connection should return None"
        );
    }

    #[tokio::test]
    async fn line_roundtrip() {
        let (mut local, mut remote) = Connection::pair();

        local
            .send_line(r#"{"type":1,"body":"1+1"}"#.to_string())
            .await
            .unwrap();

        let line = remote.recv_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"type":1,"body":"1+1"}"#);
    }

    #[tokio::test]
    async fn response_roundtrip() {
        let (mut local, mut remote) = Connection::pair();

        local
            .send_resp(&Response::Success(json!(2)))
            .await
            .unwrap();

        let resp = remote.recv_resp().await.unwrap().unwrap();
        assert_eq!(resp, Response::Success(json!(2)));
    }
}

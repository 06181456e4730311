//! jex is a loopback bridge that lets a local host application evaluate
//! JavaScript snippets over a line-delimited JSON protocol, one persistent
//! scope per connection.

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod message;
pub mod scope;
pub mod server;
pub mod session;

pub use client::Client;
pub use connection::Connection;
pub use message::{ProtocolError, Request, Response};
pub use scope::Scope;
pub use server::Server;
pub use session::Session;

//! # Frog Client
//!
//! Client side of the Frog protocol.
//!
//! A [`Connection`] dials the server with a bounded number of retries, performs
//! the version handshake, and then hands the socket to a dedicated reader
//! thread. Every decoded [`Message`](frog_types::Message) is offered to the
//! authentication-token capture and then fanned out to the registered
//! [`PacketSubscriber`]s in arrival order.
//!
//! ```rust,no_run
//! use frog_client::{ChannelSubscriber, Connection, ConnectionConfig};
//!
//! # fn main() -> Result<(), frog_client::ClientError> {
//! let connection = Connection::new(ConnectionConfig::default());
//! let (subscriber, packets) = ChannelSubscriber::new();
//! connection.add_packet_subscriber(subscriber);
//!
//! connection.start("127.0.0.1", 8080)?;
//! connection.connect("frog", "secret")?;
//! let reply = packets.recv().expect("reader thread alive");
//! println!("{} -> token {:?}", reply.kind(), connection.token());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod dialer;
pub mod dispatcher;
pub mod error;
mod reader;

pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionState};
pub use dialer::{Dialer, TcpDialer};
pub use dispatcher::{ChannelSubscriber, PacketDispatcher, PacketSubscriber, SubscriberId};
pub use error::{ClientError, ProtocolError, SubscriberError};

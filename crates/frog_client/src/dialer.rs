//! Socket establishment.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Opens the raw socket for a connection attempt.
///
/// The retry policy lives in [`Connection`](crate::Connection); a dialer
/// performs exactly one attempt per call.
pub trait Dialer: Send + Sync {
    fn dial(&self, address: &str, port: u16) -> io::Result<TcpStream>;
}

/// Plain TCP dialer with a per-attempt connect timeout.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    connect_timeout: Duration,
}

impl TcpDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Dialer for TcpDialer {
    fn dial(&self, address: &str, port: u16) -> io::Result<TcpStream> {
        let mut last_error = None;
        for addr in (address, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{address}:{port} did not resolve to any address"),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_dial_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = TcpDialer::default().dial("127.0.0.1", port).unwrap();
        assert_eq!(stream.peer_addr().unwrap().port(), port);
    }

    #[test]
    fn test_dial_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(TcpDialer::default().dial("127.0.0.1", port).is_err());
    }
}

//! Connection layer
//!
//! This module turns a display name into a byte stream to the X server, over
//! TCP or a local Unix socket.

pub mod auth;

use crate::error::ConnectionFailure;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::str::FromStr;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// X servers listen on 6000 + display number for TCP
pub const X11_TCP_BASE: u16 = 6000;
pub const X11_UNIX_DIR: &str = "/tmp/.X11-unix";

/// A byte stream a session can speak the protocol over
pub trait Transport: Read + Write {
    /// Bound how long a blocking read may wait; `None` waits forever
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let _ = timeout;
        Ok(())
    }

    /// Close both directions of the stream
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Parsed `[protocol/][host]:display[.screen]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName {
    /// `None` means the local Unix socket
    pub host: Option<String>,
    pub display: u16,
    pub screen: usize,
}

impl DisplayName {
    pub fn is_local(&self) -> bool {
        self.host.is_none()
    }
}

impl FromStr for DisplayName {
    type Err = ConnectionFailure;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let bad = || ConnectionFailure::BadDisplay(name.to_string());
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(bad());
        }

        let (protocol, rest) = match trimmed.split_once('/') {
            Some((protocol, rest)) => (Some(protocol), rest),
            None => (None, trimmed),
        };
        let (host, number) = rest.rsplit_once(':').ok_or_else(bad)?;
        let (display, screen) = match number.split_once('.') {
            Some((display, screen)) => (display, screen.parse().map_err(|_| bad())?),
            None => (number, 0),
        };
        let display: u16 = display.parse().map_err(|_| bad())?;

        let host = match (protocol, host) {
            (Some("unix"), _) | (None, "") | (None, "unix") => None,
            (Some("tcp") | Some("inet") | None, host) if !host.is_empty() => Some(host.to_string()),
            (Some("tcp") | Some("inet"), _) => Some("localhost".to_string()),
            _ => return Err(bad()),
        };

        Ok(DisplayName {
            host,
            display,
            screen,
        })
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}.{}",
            self.host.as_deref().unwrap_or(""),
            self.display,
            self.screen
        )
    }
}

/// Connection type
pub enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Tcp(_) => write!(f, "Connection::Tcp"),
            #[cfg(unix)]
            Connection::Unix(_) => write!(f, "Connection::Unix"),
        }
    }
}

impl Connection {
    /// Open a stream to the server named by `name`
    pub fn open(name: &DisplayName) -> io::Result<Self> {
        match &name.host {
            #[cfg(unix)]
            None => Self::open_local(name.display),
            #[cfg(not(unix))]
            None => Self::open_tcp("localhost", name.display),
            Some(host) => Self::open_tcp(host, name.display),
        }
    }

    fn open_tcp(host: &str, display: u16) -> io::Result<Self> {
        let port = X11_TCP_BASE.checked_add(display).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "display number too large")
        })?;
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        log::debug!("Connected to {}:{} over TCP", host, port);
        Ok(Connection::Tcp(stream))
    }

    #[cfg(unix)]
    fn open_local(display: u16) -> io::Result<Self> {
        let path = format!("{}/X{}", X11_UNIX_DIR, display);

        #[cfg(target_os = "linux")]
        {
            match Self::open_abstract(&path) {
                Ok(stream) => {
                    log::debug!("Connected to abstract socket @{}", path);
                    return Ok(Connection::Unix(stream));
                }
                Err(e) => log::debug!("Abstract socket @{} unavailable: {}", path, e),
            }
        }

        let stream = UnixStream::connect(&path)?;
        log::debug!("Connected to {}", path);
        Ok(Connection::Unix(stream))
    }

    #[cfg(target_os = "linux")]
    fn open_abstract(path: &str) -> io::Result<UnixStream> {
        use nix::sys::socket::{connect, socket, AddressFamily, SockFlag, SockType, UnixAddr};
        use std::os::fd::AsRawFd;

        let fd = socket(
            AddressFamily::Unix,
            SockType::Stream,
            SockFlag::SOCK_CLOEXEC,
            None,
        )?;
        let addr = UnixAddr::new_abstract(path.as_bytes())?;
        connect(fd.as_raw_fd(), &addr)?;
        Ok(UnixStream::from(fd))
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.flush(),
        }
    }
}

impl Transport for Connection {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Connection::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_display_names() {
        let name: DisplayName = ":0".parse().unwrap();
        assert_eq!(
            name,
            DisplayName {
                host: None,
                display: 0,
                screen: 0
            }
        );
        let name: DisplayName = "unix:2.1".parse().unwrap();
        assert!(name.is_local());
        assert_eq!((name.display, name.screen), (2, 1));
    }

    #[test]
    fn test_remote_display_names() {
        let name: DisplayName = "workstation:10.0".parse().unwrap();
        assert_eq!(name.host.as_deref(), Some("workstation"));
        assert_eq!(name.display, 10);

        let name: DisplayName = "tcp/localhost:1".parse().unwrap();
        assert_eq!(name.host.as_deref(), Some("localhost"));

        let name: DisplayName = "::1:3".parse().unwrap();
        assert_eq!(name.host.as_deref(), Some("::1"));
        assert_eq!(name.display, 3);
    }

    #[test]
    fn test_malformed_display_names() {
        for bad in ["", "   ", "localhost", ":x", ":0.y", "carrier/host:0", ":70000"] {
            assert!(
                bad.parse::<DisplayName>().is_err(),
                "{:?} should not parse",
                bad
            );
        }
    }
}

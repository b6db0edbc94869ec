//! Error type shared by the whole backend

use crate::geometry::Color;
use crate::protocol::{RequestOpcode, X11Error, XID};
use std::error::Error;
use std::fmt;
use std::io;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, GraphicsError>;

/// Where a connection failure came from
#[derive(Debug)]
pub enum ConnectionFailure {
    /// DISPLAY missing, empty or unparseable
    BadDisplay(String),
    /// Socket level failure (connect, read, write, timeout)
    Io(io::Error),
    /// The server refused the setup handshake
    Refused(String),
    /// The server sent something we could not make sense of
    Malformed(String),
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionFailure::BadDisplay(name) => write!(f, "invalid display name {:?}", name),
            ConnectionFailure::Io(e) => write!(f, "{}", e),
            ConnectionFailure::Refused(reason) => write!(f, "server refused connection: {}", reason),
            ConnectionFailure::Malformed(what) => write!(f, "malformed server data: {}", what),
        }
    }
}

impl From<io::Error> for ConnectionFailure {
    fn from(e: io::Error) -> Self {
        ConnectionFailure::Io(e)
    }
}

/// Why a round trip did not produce its reply
#[derive(Debug)]
pub enum RoundTripFailure {
    /// The server answered with an X11 error packet
    Server(X11Error),
    /// The connection broke while waiting
    Connection(ConnectionFailure),
}

impl fmt::Display for RoundTripFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundTripFailure::Server(e) => write!(f, "{}", e),
            RoundTripFailure::Connection(e) => write!(f, "{}", e),
        }
    }
}

/// Errors surfaced by the graphics backend
#[derive(Debug)]
pub enum GraphicsError {
    /// Cannot establish or maintain the session
    Connection(ConnectionFailure),
    /// A color allocation round trip failed
    Allocation {
        color: Color,
        cause: RoundTripFailure,
    },
    /// A geometry query round trip failed
    GeometryQuery {
        resource: XID,
        cause: RoundTripFailure,
    },
    /// The handle was destroyed or belongs to another session
    InvalidResource(XID),
    /// A coordinate does not fit its wire representation
    OutOfRange { field: &'static str, value: i32 },
    /// The server-assigned resource id range is used up
    IdsExhausted,
    /// The encoded request does not fit the 16-bit length field
    RequestTooLong { opcode: RequestOpcode, len: usize },
    /// An unexpected X11 error during a round trip
    Protocol(X11Error),
}

impl GraphicsError {
    pub fn is_connection(&self) -> bool {
        matches!(self, GraphicsError::Connection(_))
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::Connection(e) => write!(f, "connection error: {}", e),
            GraphicsError::Allocation { color, cause } => write!(
                f,
                "cannot allocate color ({}, {}, {}): {}",
                color.red, color.green, color.blue, cause
            ),
            GraphicsError::GeometryQuery { resource, cause } => {
                write!(f, "cannot query geometry of {}: {}", resource, cause)
            }
            GraphicsError::InvalidResource(id) => {
                write!(f, "resource {} is not live in this session", id)
            }
            GraphicsError::OutOfRange { field, value } => {
                write!(f, "{} = {} does not fit the wire format", field, value)
            }
            GraphicsError::IdsExhausted => write!(f, "resource id range exhausted"),
            GraphicsError::RequestTooLong { opcode, len } => {
                write!(f, "{:?} request of {} bytes is too long", opcode, len)
            }
            GraphicsError::Protocol(e) => write!(f, "protocol error: {}", e),
        }
    }
}

impl Error for GraphicsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GraphicsError::Connection(ConnectionFailure::Io(e)) => Some(e),
            GraphicsError::Allocation {
                cause: RoundTripFailure::Server(e),
                ..
            }
            | GraphicsError::GeometryQuery {
                cause: RoundTripFailure::Server(e),
                ..
            }
            | GraphicsError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GraphicsError {
    fn from(e: io::Error) -> Self {
        GraphicsError::Connection(ConnectionFailure::Io(e))
    }
}

impl From<ConnectionFailure> for GraphicsError {
    fn from(e: ConnectionFailure) -> Self {
        GraphicsError::Connection(e)
    }
}

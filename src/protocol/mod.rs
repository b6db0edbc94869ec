/// X11 protocol implementation
///
/// This module implements the subset of the X11 wire protocol the graphics
/// backend speaks: types, requests, replies, events, errors and the
/// connection setup handshake.

pub mod types;
pub mod errors;
pub mod events;
pub mod requests;
pub mod setup;
pub mod parser;
pub mod encoder;
pub mod wire;

pub use types::*;
pub use errors::*;
pub use events::*;
pub use requests::*;
pub use setup::*;
pub use parser::*;
pub use encoder::*;

/// X11 protocol version
pub const PROTOCOL_MAJOR_VERSION: u16 = 11;
pub const PROTOCOL_MINOR_VERSION: u16 = 0;

/// Every reply, error and event starts with a 32-byte block
pub const PACKET_SIZE: usize = 32;

/// Padding helper - X11 requires data to be padded to 4-byte boundaries
pub fn pad(n: usize) -> usize {
    (4 - (n % 4)) % 4
}

/// Calculate padded length
pub fn padded_len(n: usize) -> usize {
    n + pad(n)
}

//! X11 protocol error codes and error packets

use super::types::*;
use super::wire::{WireReader, WireWriter};
use std::fmt;
use std::io;

/// X11 error codes as defined in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Request = 1,
    Value = 2,
    Window = 3,
    Pixmap = 4,
    Atom = 5,
    Cursor = 6,
    Font = 7,
    Match = 8,
    Drawable = 9,
    Access = 10,
    Alloc = 11,
    Colormap = 12,
    GContext = 13,
    IDChoice = 14,
    Name = 15,
    Length = 16,
    Implementation = 17,
}

impl ErrorCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(ErrorCode::Request),
            2 => Some(ErrorCode::Value),
            3 => Some(ErrorCode::Window),
            4 => Some(ErrorCode::Pixmap),
            5 => Some(ErrorCode::Atom),
            6 => Some(ErrorCode::Cursor),
            7 => Some(ErrorCode::Font),
            8 => Some(ErrorCode::Match),
            9 => Some(ErrorCode::Drawable),
            10 => Some(ErrorCode::Access),
            11 => Some(ErrorCode::Alloc),
            12 => Some(ErrorCode::Colormap),
            13 => Some(ErrorCode::GContext),
            14 => Some(ErrorCode::IDChoice),
            15 => Some(ErrorCode::Name),
            16 => Some(ErrorCode::Length),
            17 => Some(ErrorCode::Implementation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Request => "Request: bad request code",
            ErrorCode::Value => "Value: integer parameter out of range",
            ErrorCode::Window => "Window: invalid Window parameter",
            ErrorCode::Pixmap => "Pixmap: invalid Pixmap parameter",
            ErrorCode::Atom => "Atom: invalid Atom parameter",
            ErrorCode::Cursor => "Cursor: invalid Cursor parameter",
            ErrorCode::Font => "Font: invalid Font parameter",
            ErrorCode::Match => "Match: parameter mismatch",
            ErrorCode::Drawable => "Drawable: invalid Drawable parameter",
            ErrorCode::Access => "Access: attempt to access private resource",
            ErrorCode::Alloc => "Alloc: insufficient resources",
            ErrorCode::Colormap => "Colormap: invalid Colormap parameter",
            ErrorCode::GContext => "GContext: invalid GC parameter",
            ErrorCode::IDChoice => "IDChoice: invalid resource ID for this connection",
            ErrorCode::Name => "Name: font or color name doesn't exist",
            ErrorCode::Length => "Length: request length incorrect",
            ErrorCode::Implementation => "Implementation: server implementation error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// X11 error packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X11Error {
    pub code: ErrorCode,
    pub sequence: u16,
    pub bad_value: u32,
    pub minor_opcode: u16,
    pub major_opcode: u8,
}

impl X11Error {
    pub fn new(
        code: ErrorCode,
        sequence: u16,
        bad_value: u32,
        minor_opcode: u16,
        major_opcode: u8,
    ) -> Self {
        X11Error {
            code,
            sequence,
            bad_value,
            minor_opcode,
            major_opcode,
        }
    }

    /// Decode an error packet (32 bytes, first byte 0)
    pub fn decode(packet: &[u8], byte_order: ByteOrder) -> io::Result<Self> {
        let mut r = WireReader::new(byte_order, packet);
        let kind = r.u8()?;
        if kind != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("packet type {} is not an error", kind),
            ));
        }
        let raw_code = r.u8()?;
        let code = ErrorCode::from_u8(raw_code).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown X11 error code {}", raw_code),
            )
        })?;
        let sequence = r.u16()?;
        let bad_value = r.u32()?;
        let minor_opcode = r.u16()?;
        let major_opcode = r.u8()?;
        Ok(X11Error {
            code,
            sequence,
            bad_value,
            minor_opcode,
            major_opcode,
        })
    }

    /// Encode error to wire format (32 bytes)
    pub fn encode(&self, byte_order: ByteOrder) -> Vec<u8> {
        let mut w = WireWriter::new(byte_order);
        w.u8(0) // Error reply type
            .u8(self.code as u8)
            .u16(self.sequence)
            .u32(self.bad_value)
            .u16(self.minor_opcode)
            .u8(self.major_opcode)
            .zeros(21);
        w.into_vec()
    }
}

impl fmt::Display for X11Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X11 Error: {} (sequence: {}, value: 0x{:08x}, major: {}, minor: {})",
            self.code, self.sequence, self.bad_value, self.major_opcode, self.minor_opcode
        )
    }
}

impl std::error::Error for X11Error {}

/// Result type for X11 operations
pub type X11Result<T> = Result<T, X11Error>;

/// Helper functions to create common errors
impl X11Error {
    pub fn bad_request(sequence: u16, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Request, sequence, 0, 0, major_opcode)
    }

    pub fn bad_value(sequence: u16, value: u32, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Value, sequence, value, 0, major_opcode)
    }

    pub fn bad_window(sequence: u16, window: Window, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Window, sequence, window.id().get(), 0, major_opcode)
    }

    pub fn bad_drawable(sequence: u16, id: XID, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Drawable, sequence, id.get(), 0, major_opcode)
    }

    pub fn bad_gc(sequence: u16, gc: GContext, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::GContext, sequence, gc.id().get(), 0, major_opcode)
    }

    pub fn bad_colormap(sequence: u16, colormap: Colormap, major_opcode: u8) -> Self {
        X11Error::new(
            ErrorCode::Colormap,
            sequence,
            colormap.id().get(),
            0,
            major_opcode,
        )
    }

    pub fn bad_alloc(sequence: u16, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Alloc, sequence, 0, 0, major_opcode)
    }

    pub fn bad_id_choice(sequence: u16, id: u32, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::IDChoice, sequence, id, 0, major_opcode)
    }

    pub fn bad_length(sequence: u16, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Length, sequence, 0, 0, major_opcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_packet_layout() {
        let err = X11Error::bad_alloc(7, 84);
        let packet = err.encode(ByteOrder::LSBFirst);
        assert_eq!(packet.len(), 32);
        assert_eq!(packet[0], 0);
        assert_eq!(packet[1], ErrorCode::Alloc as u8);
        assert_eq!(&packet[2..4], &7u16.to_le_bytes());
        assert_eq!(packet[10], 84);
    }

    #[test]
    fn test_decode_big_endian_error() {
        let err = X11Error::bad_window(0x0102, Window::new(0x00400001), 8);
        let packet = err.encode(ByteOrder::MSBFirst);
        let decoded = X11Error::decode(&packet, ByteOrder::MSBFirst).unwrap();
        assert_eq!(decoded.code, ErrorCode::Window);
        assert_eq!(decoded.sequence, 0x0102);
        assert_eq!(decoded.bad_value, 0x00400001);
    }

    #[test]
    fn test_decode_rejects_unknown_code() {
        let mut packet = vec![0u8; 32];
        packet[1] = 200;
        assert!(X11Error::decode(&packet, ByteOrder::LSBFirst).is_err());
    }
}

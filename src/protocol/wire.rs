//! Byte-order aware readers and writers for wire packets

use super::types::ByteOrder;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read};

/// Growable packet buffer that writes in the connection's byte order
#[derive(Debug, Clone)]
pub struct WireWriter {
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl WireWriter {
    pub fn new(order: ByteOrder) -> Self {
        WireWriter {
            order,
            bytes: Vec::with_capacity(32),
        }
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.u8(if value { 1 } else { 0 })
    }

    // Writes into a Vec never fail, so the io::Result from byteorder is dropped.
    pub fn u16(&mut self, value: u16) -> &mut Self {
        let _ = match self.order {
            ByteOrder::MSBFirst => self.bytes.write_u16::<BigEndian>(value),
            ByteOrder::LSBFirst => self.bytes.write_u16::<LittleEndian>(value),
        };
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        let _ = match self.order {
            ByteOrder::MSBFirst => self.bytes.write_i16::<BigEndian>(value),
            ByteOrder::LSBFirst => self.bytes.write_i16::<LittleEndian>(value),
        };
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        let _ = match self.order {
            ByteOrder::MSBFirst => self.bytes.write_u32::<BigEndian>(value),
            ByteOrder::LSBFirst => self.bytes.write_u32::<LittleEndian>(value),
        };
        self
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn zeros(&mut self, count: usize) -> &mut Self {
        self.bytes.resize(self.bytes.len() + count, 0);
        self
    }

    /// Pad to the next 4-byte boundary
    pub fn align(&mut self) -> &mut Self {
        let pad = super::pad(self.bytes.len());
        self.zeros(pad)
    }

    /// Overwrite a u16 already in the buffer (length fields)
    pub fn patch_u16(&mut self, at: usize, value: u16) {
        let encoded = match self.order {
            ByteOrder::MSBFirst => value.to_be_bytes(),
            ByteOrder::LSBFirst => value.to_le_bytes(),
        };
        self.bytes[at..at + 2].copy_from_slice(&encoded);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

/// Bounds-checked reader over a received packet
pub struct WireReader<'a> {
    order: ByteOrder,
    cursor: Cursor<&'a [u8]>,
}

impl<'a> WireReader<'a> {
    pub fn new(order: ByteOrder, data: &'a [u8]) -> Self {
        WireReader {
            order,
            cursor: Cursor::new(data),
        }
    }

    pub fn u8(&mut self) -> io::Result<u8> {
        self.cursor.read_u8()
    }

    pub fn u16(&mut self) -> io::Result<u16> {
        match self.order {
            ByteOrder::MSBFirst => self.cursor.read_u16::<BigEndian>(),
            ByteOrder::LSBFirst => self.cursor.read_u16::<LittleEndian>(),
        }
    }

    pub fn i16(&mut self) -> io::Result<i16> {
        match self.order {
            ByteOrder::MSBFirst => self.cursor.read_i16::<BigEndian>(),
            ByteOrder::LSBFirst => self.cursor.read_i16::<LittleEndian>(),
        }
    }

    pub fn u32(&mut self) -> io::Result<u32> {
        match self.order {
            ByteOrder::MSBFirst => self.cursor.read_u32::<BigEndian>(),
            ByteOrder::LSBFirst => self.cursor.read_u32::<LittleEndian>(),
        }
    }

    pub fn bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.cursor.read_exact(&mut out)?;
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> io::Result<()> {
        let target = self.cursor.position() + len as u64;
        if target > self.cursor.get_ref().len() as u64 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "packet shorter than its declared layout",
            ));
        }
        self.cursor.set_position(target);
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }
}

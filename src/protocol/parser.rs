//! X11 packet parser
//!
//! Splits the server's byte stream into replies, errors and events, decodes
//! the replies the backend waits for, and parses client requests back into
//! structured form for the in-process server.

use super::wire::WireReader;
use super::*;
use std::io::{self, Read};

/// One unit read from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPacket {
    /// Reply packet: the full bytes, 32 or more
    Reply { sequence: u16, bytes: Vec<u8> },
    Error(X11Error),
    Event(InputEvent),
}

/// GetGeometry reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryReply {
    pub depth: u8,
    pub root: Window,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
}

/// AllocColor reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocColorReply {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub pixel: u32,
}

/// GetInputFocus reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFocusReply {
    pub revert_to: u8,
    pub focus: Window,
}

/// Packet parser bound to a connection's byte order
#[derive(Debug, Clone, Copy)]
pub struct ProtocolParser {
    byte_order: ByteOrder,
}

impl ProtocolParser {
    pub fn new(byte_order: ByteOrder) -> Self {
        ProtocolParser { byte_order }
    }

    /// Block until one complete packet has been read from the stream
    pub fn read_packet<R: Read>(&self, stream: &mut R) -> io::Result<ServerPacket> {
        let mut head = [0u8; PACKET_SIZE];
        stream.read_exact(&mut head)?;

        match head[0] {
            0 => Ok(ServerPacket::Error(X11Error::decode(&head, self.byte_order)?)),
            1 => {
                let mut r = WireReader::new(self.byte_order, &head);
                r.skip(2)?;
                let sequence = r.u16()?;
                let extra = r.u32()? as usize * 4;
                let mut bytes = head.to_vec();
                if extra > 0 {
                    let mut tail = vec![0u8; extra];
                    stream.read_exact(&mut tail)?;
                    bytes.extend_from_slice(&tail);
                }
                Ok(ServerPacket::Reply { sequence, bytes })
            }
            _ => Ok(ServerPacket::Event(InputEvent::decode(&head, self.byte_order)?)),
        }
    }

    pub fn decode_geometry_reply(&self, bytes: &[u8]) -> io::Result<GeometryReply> {
        let mut r = WireReader::new(self.byte_order, bytes);
        r.skip(1)?;
        let depth = r.u8()?;
        r.skip(6)?;
        Ok(GeometryReply {
            depth,
            root: Window::new(r.u32()?),
            x: r.i16()?,
            y: r.i16()?,
            width: r.u16()?,
            height: r.u16()?,
            border_width: r.u16()?,
        })
    }

    pub fn decode_alloc_color_reply(&self, bytes: &[u8]) -> io::Result<AllocColorReply> {
        let mut r = WireReader::new(self.byte_order, bytes);
        r.skip(8)?;
        let red = r.u16()?;
        let green = r.u16()?;
        let blue = r.u16()?;
        r.skip(2)?;
        Ok(AllocColorReply {
            red,
            green,
            blue,
            pixel: r.u32()?,
        })
    }

    pub fn decode_input_focus_reply(&self, bytes: &[u8]) -> io::Result<InputFocusReply> {
        let mut r = WireReader::new(self.byte_order, bytes);
        r.skip(1)?;
        let revert_to = r.u8()?;
        r.skip(6)?;
        Ok(InputFocusReply {
            revert_to,
            focus: Window::new(r.u32()?),
        })
    }

    /// Size in bytes of the request starting at `prefix`, once its header is buffered
    pub fn request_len(&self, prefix: &[u8]) -> Option<usize> {
        if prefix.len() < 4 {
            return None;
        }
        let mut r = WireReader::new(self.byte_order, &prefix[2..4]);
        r.u16().ok().map(|units| units as usize * 4)
    }

    /// Parse a request from buffer, which must hold exactly one request
    pub fn parse_request(&self, buffer: &[u8], sequence: u16) -> Result<Request, X11Error> {
        let opcode = *buffer.first().ok_or_else(|| X11Error::bad_length(sequence, 0))?;
        if buffer.len() < 4 {
            return Err(X11Error::bad_length(sequence, opcode));
        }
        let detail = buffer[1];
        let declared = self.request_len(buffer).unwrap_or(0);
        if declared < 4 || declared != buffer.len() {
            return Err(X11Error::bad_length(sequence, opcode));
        }

        log::debug!(
            "Parsing request: opcode={}, detail={}, length={}",
            opcode,
            detail,
            declared / 4
        );

        let data = &buffer[4..];
        let short = |_: io::Error| X11Error::bad_length(sequence, opcode);
        let mut r = WireReader::new(self.byte_order, data);

        let request = match RequestOpcode::from_u8(opcode) {
            Some(RequestOpcode::CreateWindow) => {
                let wid = Window::new(r.u32().map_err(short)?);
                let parent = Window::new(r.u32().map_err(short)?);
                let x = r.i16().map_err(short)?;
                let y = r.i16().map_err(short)?;
                let width = r.u16().map_err(short)?;
                let height = r.u16().map_err(short)?;
                let border_width = r.u16().map_err(short)?;
                let class = WindowClass::from_u16(r.u16().map_err(short)?)
                    .ok_or_else(|| X11Error::bad_value(sequence, 0, opcode))?;
                let visual = VisualID::new(r.u32().map_err(short)?);
                let value_mask = r.u32().map_err(short)?;
                let (background_pixel, event_mask) =
                    self.read_window_values(&mut r, value_mask).map_err(short)?;
                Request::CreateWindow(CreateWindowRequest {
                    depth: detail,
                    wid,
                    parent,
                    x,
                    y,
                    width,
                    height,
                    border_width,
                    class,
                    visual,
                    background_pixel,
                    event_mask,
                })
            }
            Some(RequestOpcode::ChangeWindowAttributes) => {
                let window = Window::new(r.u32().map_err(short)?);
                let value_mask = r.u32().map_err(short)?;
                let (background_pixel, event_mask) =
                    self.read_window_values(&mut r, value_mask).map_err(short)?;
                Request::ChangeWindowAttributes(ChangeWindowAttributesRequest {
                    window,
                    background_pixel,
                    event_mask,
                })
            }
            Some(RequestOpcode::DestroyWindow) => {
                Request::DestroyWindow(Window::new(r.u32().map_err(short)?))
            }
            Some(RequestOpcode::MapWindow) => Request::MapWindow(Window::new(r.u32().map_err(short)?)),
            Some(RequestOpcode::UnmapWindow) => {
                Request::UnmapWindow(Window::new(r.u32().map_err(short)?))
            }
            Some(RequestOpcode::GetGeometry) => {
                Request::GetGeometry(Window::new(r.u32().map_err(short)?))
            }
            Some(RequestOpcode::ChangeProperty) => {
                let mode = PropMode::from_u8(detail)
                    .ok_or_else(|| X11Error::bad_value(sequence, detail as u32, opcode))?;
                let window = Window::new(r.u32().map_err(short)?);
                let property = Atom::new(r.u32().map_err(short)?);
                let type_ = Atom::new(r.u32().map_err(short)?);
                let format = r.u8().map_err(short)?;
                r.skip(3).map_err(short)?;
                let units = r.u32().map_err(short)? as usize;
                let unit = match format {
                    8 => 1,
                    16 => 2,
                    32 => 4,
                    _ => return Err(X11Error::bad_value(sequence, format as u32, opcode)),
                };
                let data = r.bytes(units * unit).map_err(short)?;
                Request::ChangeProperty(ChangePropertyRequest {
                    mode,
                    window,
                    property,
                    type_,
                    format,
                    data,
                })
            }
            Some(RequestOpcode::GetInputFocus) => Request::GetInputFocus,
            Some(RequestOpcode::CreateGC) => {
                let cid = GContext::new(r.u32().map_err(short)?);
                let drawable = Window::new(r.u32().map_err(short)?);
                let value_mask = r.u32().map_err(short)?;
                let (foreground, background) =
                    self.read_gc_values(&mut r, value_mask).map_err(short)?;
                Request::CreateGC(CreateGCRequest {
                    cid,
                    drawable,
                    foreground,
                    background,
                })
            }
            Some(RequestOpcode::ChangeGC) => {
                let gc = GContext::new(r.u32().map_err(short)?);
                let value_mask = r.u32().map_err(short)?;
                let (foreground, background) =
                    self.read_gc_values(&mut r, value_mask).map_err(short)?;
                Request::ChangeGC(ChangeGCRequest {
                    gc,
                    foreground,
                    background,
                })
            }
            Some(RequestOpcode::FreeGC) => Request::FreeGC(GContext::new(r.u32().map_err(short)?)),
            Some(RequestOpcode::PolyRectangle) => {
                Request::PolyRectangle(self.read_rectangles(&mut r).map_err(short)?)
            }
            Some(RequestOpcode::PolyFillRectangle) => {
                Request::PolyFillRectangle(self.read_rectangles(&mut r).map_err(short)?)
            }
            Some(RequestOpcode::AllocColor) => {
                let colormap = Colormap::new(r.u32().map_err(short)?);
                let red = r.u16().map_err(short)?;
                let green = r.u16().map_err(short)?;
                let blue = r.u16().map_err(short)?;
                Request::AllocColor(AllocColorRequest {
                    colormap,
                    red,
                    green,
                    blue,
                })
            }
            Some(RequestOpcode::NoOperation) => Request::NoOperation,
            None => {
                log::warn!("Unimplemented request opcode: {}", opcode);
                return Err(X11Error::bad_request(sequence, opcode));
            }
        };

        Ok(request)
    }

    fn read_window_values(
        &self,
        r: &mut WireReader<'_>,
        value_mask: u32,
    ) -> io::Result<(Option<u32>, Option<u32>)> {
        let mut background_pixel = None;
        let mut event_mask = None;
        // Values appear in bit order, one u32 per set bit
        for bit in 0..15 {
            if value_mask & (1 << bit) == 0 {
                continue;
            }
            let value = r.u32()?;
            match 1u32 << bit {
                window_attr::BACK_PIXEL => background_pixel = Some(value),
                window_attr::EVENT_MASK => event_mask = Some(value),
                _ => {}
            }
        }
        Ok((background_pixel, event_mask))
    }

    fn read_gc_values(
        &self,
        r: &mut WireReader<'_>,
        value_mask: u32,
    ) -> io::Result<(Option<u32>, Option<u32>)> {
        let mut foreground = None;
        let mut background = None;
        for bit in 0..23 {
            if value_mask & (1 << bit) == 0 {
                continue;
            }
            let value = r.u32()?;
            match 1u32 << bit {
                gc_mask::FOREGROUND => foreground = Some(value),
                gc_mask::BACKGROUND => background = Some(value),
                _ => {}
            }
        }
        Ok((foreground, background))
    }

    fn read_rectangles(&self, r: &mut WireReader<'_>) -> io::Result<PolyRectangleRequest> {
        let drawable = Window::new(r.u32()?);
        let gc = GContext::new(r.u32()?);
        let mut rectangles = Vec::new();
        while r.remaining() >= 8 {
            rectangles.push(Rectangle {
                x: r.i16()?,
                y: r.i16()?,
                width: r.u16()?,
                height: r.u16()?,
            });
        }
        Ok(PolyRectangleRequest {
            drawable,
            gc,
            rectangles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encoded_requests_parse_back() {
        let order = ByteOrder::MSBFirst;
        let encoder = ProtocolEncoder::new(order);
        let parser = ProtocolParser::new(order);

        let requests = vec![
            Request::CreateWindow(CreateWindowRequest {
                depth: 0,
                wid: Window::new(0x00200001),
                parent: Window::new(0x100),
                x: 50,
                y: 50,
                width: 400,
                height: 350,
                border_width: 0,
                class: WindowClass::CopyFromParent,
                visual: VisualID::new(0x21),
                background_pixel: None,
                event_mask: Some(event_mask::EXPOSURE),
            }),
            Request::PolyFillRectangle(PolyRectangleRequest {
                drawable: Window::new(0x00200001),
                gc: GContext::new(0x00200002),
                rectangles: vec![Rectangle::new(-5, 10, 20, 30)],
            }),
            Request::ChangeProperty(ChangePropertyRequest {
                mode: PropMode::Replace,
                window: Window::new(0x00200001),
                property: Atom::WM_NAME,
                type_: Atom::STRING,
                format: 8,
                data: b"Drawing".to_vec(),
            }),
        ];

        for request in requests {
            let bytes = encoder.encode_request(&request);
            assert_eq!(parser.request_len(&bytes), Some(bytes.len()));
            assert_eq!(parser.parse_request(&bytes, 1).unwrap(), request);
        }
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let parser = ProtocolParser::new(ByteOrder::LSBFirst);
        let bytes = [8u8, 0, 3, 0, 1, 0, 0, 0];
        let err = parser.parse_request(&bytes, 4).unwrap_err();
        assert_eq!(err.code, ErrorCode::Length);
        assert_eq!(err.sequence, 4);
    }

    #[test]
    fn test_read_packet_splits_stream() {
        let order = ByteOrder::LSBFirst;
        let encoder = ProtocolEncoder::new(order);
        let parser = ProtocolParser::new(order);

        let mut stream = Vec::new();
        stream.extend(encoder.encode_alloc_color_reply(2, 0xff00, 0, 0, 0xff0000));
        stream.extend(X11Error::bad_alloc(3, 84).encode(order));
        let mut cursor = Cursor::new(stream);

        match parser.read_packet(&mut cursor).unwrap() {
            ServerPacket::Reply { sequence, bytes } => {
                assert_eq!(sequence, 2);
                let reply = parser.decode_alloc_color_reply(&bytes).unwrap();
                assert_eq!(reply.pixel, 0xff0000);
                assert_eq!(reply.red, 0xff00);
            }
            other => panic!("expected reply, got {:?}", other),
        }
        match parser.read_packet(&mut cursor).unwrap() {
            ServerPacket::Error(err) => assert_eq!(err.code, ErrorCode::Alloc),
            other => panic!("expected error, got {:?}", other),
        }
        assert!(parser.read_packet(&mut cursor).is_err());
    }
}

//! X11 request and reply encoder
//!
//! Requests are encoded by the client side of a session; replies are encoded
//! by the in-process server.

use super::wire::WireWriter;
use super::*;

/// Largest request the 16-bit length field can describe, in bytes
pub const MAX_REQUEST_LEN: usize = u16::MAX as usize * 4;

/// Wire encoder bound to a connection's byte order
#[derive(Debug, Clone, Copy)]
pub struct ProtocolEncoder {
    byte_order: ByteOrder,
}

impl ProtocolEncoder {
    pub fn new(byte_order: ByteOrder) -> Self {
        ProtocolEncoder { byte_order }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn header(&self, opcode: RequestOpcode, detail: u8) -> WireWriter {
        let mut w = WireWriter::new(self.byte_order);
        w.u8(opcode as u8).u8(detail).u16(0); // length patched in finish()
        w
    }

    fn finish(&self, mut w: WireWriter) -> Vec<u8> {
        w.align();
        // Zero is never a valid core length, so an oversized request is
        // refused by the server instead of being read short
        let units = u16::try_from(w.len() / 4).unwrap_or(0);
        w.patch_u16(2, units);
        w.into_vec()
    }

    /// Encode a request to wire format, length field included.
    ///
    /// Requests longer than [`MAX_REQUEST_LEN`] get a zero length field;
    /// callers check the size before queueing them.
    pub fn encode_request(&self, request: &Request) -> Vec<u8> {
        match request {
            Request::CreateWindow(req) => {
                let mut w = self.header(RequestOpcode::CreateWindow, req.depth);
                w.u32(req.wid.id().get())
                    .u32(req.parent.id().get())
                    .i16(req.x)
                    .i16(req.y)
                    .u16(req.width)
                    .u16(req.height)
                    .u16(req.border_width)
                    .u16(req.class as u16)
                    .u32(req.visual.get());
                let mut mask = 0;
                let mut values = Vec::new();
                // Values appear in bit order
                if let Some(pixel) = req.background_pixel {
                    mask |= window_attr::BACK_PIXEL;
                    values.push(pixel);
                }
                if let Some(events) = req.event_mask {
                    mask |= window_attr::EVENT_MASK;
                    values.push(events);
                }
                w.u32(mask);
                for value in values {
                    w.u32(value);
                }
                self.finish(w)
            }
            Request::ChangeWindowAttributes(req) => {
                let mut w = self.header(RequestOpcode::ChangeWindowAttributes, 0);
                w.u32(req.window.id().get());
                let mut mask = 0;
                let mut values = Vec::new();
                if let Some(pixel) = req.background_pixel {
                    mask |= window_attr::BACK_PIXEL;
                    values.push(pixel);
                }
                if let Some(events) = req.event_mask {
                    mask |= window_attr::EVENT_MASK;
                    values.push(events);
                }
                w.u32(mask);
                for value in values {
                    w.u32(value);
                }
                self.finish(w)
            }
            Request::DestroyWindow(window) => self.encode_single_id(RequestOpcode::DestroyWindow, window.id()),
            Request::MapWindow(window) => self.encode_single_id(RequestOpcode::MapWindow, window.id()),
            Request::UnmapWindow(window) => self.encode_single_id(RequestOpcode::UnmapWindow, window.id()),
            Request::GetGeometry(window) => self.encode_single_id(RequestOpcode::GetGeometry, window.id()),
            Request::FreeGC(gc) => self.encode_single_id(RequestOpcode::FreeGC, gc.id()),
            Request::ChangeProperty(req) => {
                let mut w = self.header(RequestOpcode::ChangeProperty, req.mode as u8);
                let unit = (req.format as usize / 8).max(1);
                w.u32(req.window.id().get())
                    .u32(req.property.get())
                    .u32(req.type_.get())
                    .u8(req.format)
                    .zeros(3)
                    .u32((req.data.len() / unit) as u32)
                    .bytes(&req.data);
                self.finish(w)
            }
            Request::GetInputFocus => self.finish(self.header(RequestOpcode::GetInputFocus, 0)),
            Request::CreateGC(req) => {
                let mut w = self.header(RequestOpcode::CreateGC, 0);
                w.u32(req.cid.id().get()).u32(req.drawable.id().get());
                self.write_gc_values(&mut w, req.foreground, req.background);
                self.finish(w)
            }
            Request::ChangeGC(req) => {
                let mut w = self.header(RequestOpcode::ChangeGC, 0);
                w.u32(req.gc.id().get());
                self.write_gc_values(&mut w, req.foreground, req.background);
                self.finish(w)
            }
            Request::PolyRectangle(req) => self.encode_rectangles(RequestOpcode::PolyRectangle, req),
            Request::PolyFillRectangle(req) => {
                self.encode_rectangles(RequestOpcode::PolyFillRectangle, req)
            }
            Request::AllocColor(req) => {
                let mut w = self.header(RequestOpcode::AllocColor, 0);
                w.u32(req.colormap.id().get())
                    .u16(req.red)
                    .u16(req.green)
                    .u16(req.blue)
                    .zeros(2);
                self.finish(w)
            }
            Request::NoOperation => self.finish(self.header(RequestOpcode::NoOperation, 0)),
        }
    }

    fn encode_single_id(&self, opcode: RequestOpcode, id: XID) -> Vec<u8> {
        let mut w = self.header(opcode, 0);
        w.u32(id.get());
        self.finish(w)
    }

    fn write_gc_values(&self, w: &mut WireWriter, foreground: Option<u32>, background: Option<u32>) {
        let mut mask = 0;
        if foreground.is_some() {
            mask |= gc_mask::FOREGROUND;
        }
        if background.is_some() {
            mask |= gc_mask::BACKGROUND;
        }
        w.u32(mask);
        if let Some(pixel) = foreground {
            w.u32(pixel);
        }
        if let Some(pixel) = background {
            w.u32(pixel);
        }
    }

    fn encode_rectangles(&self, opcode: RequestOpcode, req: &PolyRectangleRequest) -> Vec<u8> {
        let mut w = self.header(opcode, 0);
        w.u32(req.drawable.id().get()).u32(req.gc.id().get());
        for rect in &req.rectangles {
            w.i16(rect.x).i16(rect.y).u16(rect.width).u16(rect.height);
        }
        self.finish(w)
    }

    fn reply_header(&self, sequence: u16, detail: u8, extra_units: u32) -> WireWriter {
        let mut w = WireWriter::new(self.byte_order);
        w.u8(1).u8(detail).u16(sequence).u32(extra_units);
        w
    }

    fn finish_reply(&self, mut w: WireWriter) -> Vec<u8> {
        if w.len() < PACKET_SIZE {
            let missing = PACKET_SIZE - w.len();
            w.zeros(missing);
        }
        w.into_vec()
    }

    /// Encode GetGeometry reply
    #[allow(clippy::too_many_arguments)]
    pub fn encode_get_geometry_reply(
        &self,
        sequence: u16,
        depth: u8,
        root: Window,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
    ) -> Vec<u8> {
        let mut w = self.reply_header(sequence, depth, 0);
        w.u32(root.id().get())
            .i16(x)
            .i16(y)
            .u16(width)
            .u16(height)
            .u16(border_width);
        self.finish_reply(w)
    }

    /// Encode AllocColor reply
    pub fn encode_alloc_color_reply(
        &self,
        sequence: u16,
        red: u16,
        green: u16,
        blue: u16,
        pixel: u32,
    ) -> Vec<u8> {
        let mut w = self.reply_header(sequence, 0, 0);
        w.u16(red).u16(green).u16(blue).zeros(2).u32(pixel);
        self.finish_reply(w)
    }

    /// Encode GetInputFocus reply
    pub fn encode_get_input_focus_reply(&self, sequence: u16, focus: Window, revert_to: u8) -> Vec<u8> {
        let mut w = self.reply_header(sequence, revert_to, 0);
        w.u32(focus.id().get());
        self.finish_reply(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lsb() -> ProtocolEncoder {
        ProtocolEncoder::new(ByteOrder::LSBFirst)
    }

    #[test]
    fn test_map_window_layout() {
        let bytes = lsb().encode_request(&Request::MapWindow(Window::new(0x00200001)));
        assert_eq!(bytes, vec![8, 0, 2, 0, 0x01, 0x00, 0x20, 0x00]);
    }

    #[test]
    fn test_alloc_color_layout() {
        let bytes = lsb().encode_request(&Request::AllocColor(AllocColorRequest {
            colormap: Colormap::new(0x20),
            red: 0xff00,
            green: 0x8000,
            blue: 0,
        }));
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 84);
        assert_eq!(&bytes[2..4], &4u16.to_le_bytes());
        assert_eq!(&bytes[8..10], &0xff00u16.to_le_bytes());
        assert_eq!(&bytes[10..12], &0x8000u16.to_le_bytes());
    }

    #[test]
    fn test_change_property_pads_title() {
        let bytes = lsb().encode_request(&Request::ChangeProperty(ChangePropertyRequest {
            mode: PropMode::Replace,
            window: Window::new(1),
            property: Atom::WM_NAME,
            type_: Atom::STRING,
            format: 8,
            data: b"hello".to_vec(),
        }));
        // 24 byte header + 5 bytes of data padded to 8
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[2..4], &8u16.to_le_bytes());
        assert_eq!(&bytes[20..24], &5u32.to_le_bytes());
        assert_eq!(&bytes[24..29], b"hello");
    }

    #[test]
    fn test_oversized_request_gets_zero_length() {
        let bytes = lsb().encode_request(&Request::ChangeProperty(ChangePropertyRequest {
            mode: PropMode::Replace,
            window: Window::new(1),
            property: Atom::WM_NAME,
            type_: Atom::STRING,
            format: 8,
            data: vec![b'a'; MAX_REQUEST_LEN],
        }));
        assert!(bytes.len() > MAX_REQUEST_LEN);
        assert_eq!(&bytes[2..4], &[0, 0]);
    }

    #[test]
    fn test_change_gc_only_sends_present_values() {
        let bytes = lsb().encode_request(&Request::ChangeGC(ChangeGCRequest {
            gc: GContext::new(2),
            foreground: Some(0xff0000),
            background: None,
        }));
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[8..12], &gc_mask::FOREGROUND.to_le_bytes());
        assert_eq!(&bytes[12..16], &0xff0000u32.to_le_bytes());
    }

    #[test]
    fn test_geometry_reply_is_one_packet() {
        let reply = lsb().encode_get_geometry_reply(3, 24, Window::new(0x100), 50, 50, 400, 350, 0);
        assert_eq!(reply.len(), PACKET_SIZE);
        assert_eq!(reply[0], 1);
        assert_eq!(&reply[16..18], &400u16.to_le_bytes());
        assert_eq!(&reply[18..20], &350u16.to_le_bytes());
    }
}

//! X11 connection setup protocol
//!
//! This module handles the initial connection handshake between client and server.
//! The client encodes a [`SetupRequest`] and reads back a [`SetupResponse`]; the
//! in-process server does the reverse.

use super::wire::{WireReader, WireWriter};
use super::*;
use std::io::{self, Read};

/// Connection setup request from client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRequest {
    pub byte_order: ByteOrder,
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub authorization_protocol_name: String,
    pub authorization_protocol_data: Vec<u8>,
}

impl SetupRequest {
    pub fn new(byte_order: ByteOrder, auth_name: &str, auth_data: &[u8]) -> Self {
        SetupRequest {
            byte_order,
            protocol_major_version: PROTOCOL_MAJOR_VERSION,
            protocol_minor_version: PROTOCOL_MINOR_VERSION,
            authorization_protocol_name: auth_name.to_string(),
            authorization_protocol_data: auth_data.to_vec(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = WireWriter::new(self.byte_order);
        w.u8(self.byte_order.setup_byte())
            .u8(0)
            .u16(self.protocol_major_version)
            .u16(self.protocol_minor_version)
            .u16(self.authorization_protocol_name.len() as u16)
            .u16(self.authorization_protocol_data.len() as u16)
            .zeros(2)
            .bytes(self.authorization_protocol_name.as_bytes())
            .align()
            .bytes(&self.authorization_protocol_data)
            .align();
        w.into_vec()
    }

    /// Total encoded size, if `prefix` holds at least the fixed 12-byte header
    pub fn encoded_len(prefix: &[u8]) -> Option<usize> {
        if prefix.len() < 12 {
            return None;
        }
        let byte_order = ByteOrder::from_setup_byte(prefix[0])?;
        let mut r = WireReader::new(byte_order, &prefix[6..10]);
        let name_len = r.u16().ok()? as usize;
        let data_len = r.u16().ok()? as usize;
        Some(12 + padded_len(name_len) + padded_len(data_len))
    }

    /// Parse setup request from a complete buffer
    pub fn parse(buffer: &[u8]) -> io::Result<Self> {
        let byte_order = buffer
            .first()
            .and_then(|b| ByteOrder::from_setup_byte(*b))
            .ok_or_else(|| invalid("bad byte-order byte in setup request"))?;
        let mut r = WireReader::new(byte_order, buffer);
        r.skip(2)?;
        let protocol_major_version = r.u16()?;
        let protocol_minor_version = r.u16()?;
        let name_len = r.u16()? as usize;
        let data_len = r.u16()? as usize;
        r.skip(2)?;
        let name = r.bytes(name_len)?;
        r.skip(pad(name_len))?;
        let authorization_protocol_data = r.bytes(data_len)?;

        Ok(SetupRequest {
            byte_order,
            protocol_major_version,
            protocol_minor_version,
            authorization_protocol_name: String::from_utf8_lossy(&name).to_string(),
            authorization_protocol_data,
        })
    }
}

/// Setup response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Failed = 0,
    Success = 1,
    Authenticate = 2,
}

/// Format information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub depth: u8,
    pub bits_per_pixel: u8,
    pub scanline_pad: u8,
}

impl Format {
    fn encode(&self, w: &mut WireWriter) {
        w.u8(self.depth)
            .u8(self.bits_per_pixel)
            .u8(self.scanline_pad)
            .zeros(5);
    }

    fn decode(r: &mut WireReader<'_>) -> io::Result<Self> {
        let format = Format {
            depth: r.u8()?,
            bits_per_pixel: r.u8()?,
            scanline_pad: r.u8()?,
        };
        r.skip(5)?;
        Ok(format)
    }
}

/// Visual type information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualType {
    pub visual_id: VisualID,
    pub class: u8,
    pub bits_per_rgb_value: u8,
    pub colormap_entries: u16,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
}

impl VisualType {
    fn encode(&self, w: &mut WireWriter) {
        w.u32(self.visual_id.get())
            .u8(self.class)
            .u8(self.bits_per_rgb_value)
            .u16(self.colormap_entries)
            .u32(self.red_mask)
            .u32(self.green_mask)
            .u32(self.blue_mask)
            .zeros(4);
    }

    fn decode(r: &mut WireReader<'_>) -> io::Result<Self> {
        let visual = VisualType {
            visual_id: VisualID::new(r.u32()?),
            class: r.u8()?,
            bits_per_rgb_value: r.u8()?,
            colormap_entries: r.u16()?,
            red_mask: r.u32()?,
            green_mask: r.u32()?,
            blue_mask: r.u32()?,
        };
        r.skip(4)?;
        Ok(visual)
    }
}

/// Depth information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depth {
    pub depth: u8,
    pub visuals: Vec<VisualType>,
}

impl Depth {
    fn encode(&self, w: &mut WireWriter) {
        w.u8(self.depth)
            .u8(0)
            .u16(self.visuals.len() as u16)
            .zeros(4);
        for visual in &self.visuals {
            visual.encode(w);
        }
    }

    fn decode(r: &mut WireReader<'_>) -> io::Result<Self> {
        let depth = r.u8()?;
        r.skip(1)?;
        let count = r.u16()?;
        r.skip(4)?;
        let visuals = (0..count)
            .map(|_| VisualType::decode(r))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Depth { depth, visuals })
    }
}

/// Screen information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub root: Window,
    pub default_colormap: Colormap,
    pub white_pixel: u32,
    pub black_pixel: u32,
    pub current_input_masks: u32,
    pub width_in_pixels: u16,
    pub height_in_pixels: u16,
    pub width_in_millimeters: u16,
    pub height_in_millimeters: u16,
    pub min_installed_maps: u16,
    pub max_installed_maps: u16,
    pub root_visual: VisualID,
    pub backing_stores: u8,
    pub save_unders: bool,
    pub root_depth: u8,
    pub allowed_depths: Vec<Depth>,
}

impl Screen {
    fn encode(&self, w: &mut WireWriter) {
        w.u32(self.root.id().get())
            .u32(self.default_colormap.id().get())
            .u32(self.white_pixel)
            .u32(self.black_pixel)
            .u32(self.current_input_masks)
            .u16(self.width_in_pixels)
            .u16(self.height_in_pixels)
            .u16(self.width_in_millimeters)
            .u16(self.height_in_millimeters)
            .u16(self.min_installed_maps)
            .u16(self.max_installed_maps)
            .u32(self.root_visual.get())
            .u8(self.backing_stores)
            .bool(self.save_unders)
            .u8(self.root_depth)
            .u8(self.allowed_depths.len() as u8);

        for depth in &self.allowed_depths {
            depth.encode(w);
        }
    }

    fn decode(r: &mut WireReader<'_>) -> io::Result<Self> {
        let root = Window::new(r.u32()?);
        let default_colormap = Colormap::new(r.u32()?);
        let white_pixel = r.u32()?;
        let black_pixel = r.u32()?;
        let current_input_masks = r.u32()?;
        let width_in_pixels = r.u16()?;
        let height_in_pixels = r.u16()?;
        let width_in_millimeters = r.u16()?;
        let height_in_millimeters = r.u16()?;
        let min_installed_maps = r.u16()?;
        let max_installed_maps = r.u16()?;
        let root_visual = VisualID::new(r.u32()?);
        let backing_stores = r.u8()?;
        let save_unders = r.u8()? != 0;
        let root_depth = r.u8()?;
        let num_depths = r.u8()?;
        let allowed_depths = (0..num_depths)
            .map(|_| Depth::decode(r))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Screen {
            root,
            default_colormap,
            white_pixel,
            black_pixel,
            current_input_masks,
            width_in_pixels,
            height_in_pixels,
            width_in_millimeters,
            height_in_millimeters,
            min_installed_maps,
            max_installed_maps,
            root_visual,
            backing_stores,
            save_unders,
            root_depth,
            allowed_depths,
        })
    }
}

/// Setup reply (success case)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSuccess {
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub release_number: u32,
    pub resource_id_base: u32,
    pub resource_id_mask: u32,
    pub motion_buffer_size: u32,
    pub maximum_request_length: u16,
    pub image_byte_order: ByteOrder,
    pub bitmap_format_bit_order: ByteOrder,
    pub bitmap_format_scanline_unit: u8,
    pub bitmap_format_scanline_pad: u8,
    pub min_keycode: u8,
    pub max_keycode: u8,
    pub vendor: String,
    pub pixmap_formats: Vec<Format>,
    pub roots: Vec<Screen>,
}

impl SetupSuccess {
    pub fn encode(&self, byte_order: ByteOrder) -> Vec<u8> {
        let mut w = WireWriter::new(byte_order);

        w.u8(SetupStatus::Success as u8)
            .u8(0)
            .u16(self.protocol_major_version)
            .u16(self.protocol_minor_version)
            .u16(0); // Placeholder for length

        w.u32(self.release_number)
            .u32(self.resource_id_base)
            .u32(self.resource_id_mask)
            .u32(self.motion_buffer_size)
            .u16(self.vendor.len() as u16)
            .u16(self.maximum_request_length)
            .u8(self.roots.len() as u8)
            .u8(self.pixmap_formats.len() as u8)
            .u8(self.image_byte_order as u8)
            .u8(self.bitmap_format_bit_order as u8)
            .u8(self.bitmap_format_scanline_unit)
            .u8(self.bitmap_format_scanline_pad)
            .u8(self.min_keycode)
            .u8(self.max_keycode)
            .zeros(4)
            .bytes(self.vendor.as_bytes())
            .align();

        for format in &self.pixmap_formats {
            format.encode(&mut w);
        }
        for screen in &self.roots {
            screen.encode(&mut w);
        }

        // Length in 4-byte units, excluding the first 8 bytes
        let length = ((w.len() - 8) / 4) as u16;
        w.patch_u16(6, length);
        w.into_vec()
    }

    /// Decode the body that follows the 8-byte reply header
    pub fn decode(major: u16, minor: u16, data: &[u8], byte_order: ByteOrder) -> io::Result<Self> {
        let mut r = WireReader::new(byte_order, data);
        let release_number = r.u32()?;
        let resource_id_base = r.u32()?;
        let resource_id_mask = r.u32()?;
        let motion_buffer_size = r.u32()?;
        let vendor_len = r.u16()? as usize;
        let maximum_request_length = r.u16()?;
        let num_screens = r.u8()?;
        let num_formats = r.u8()?;
        let image_byte_order = order_from_u8(r.u8()?);
        let bitmap_format_bit_order = order_from_u8(r.u8()?);
        let bitmap_format_scanline_unit = r.u8()?;
        let bitmap_format_scanline_pad = r.u8()?;
        let min_keycode = r.u8()?;
        let max_keycode = r.u8()?;
        r.skip(4)?;
        let vendor = String::from_utf8_lossy(&r.bytes(vendor_len)?).to_string();
        r.skip(pad(vendor_len))?;

        let pixmap_formats = (0..num_formats)
            .map(|_| Format::decode(&mut r))
            .collect::<io::Result<Vec<_>>>()?;
        let roots = (0..num_screens)
            .map(|_| Screen::decode(&mut r))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(SetupSuccess {
            protocol_major_version: major,
            protocol_minor_version: minor,
            release_number,
            resource_id_base,
            resource_id_mask,
            motion_buffer_size,
            maximum_request_length,
            image_byte_order,
            bitmap_format_bit_order,
            bitmap_format_scanline_unit,
            bitmap_format_scanline_pad,
            min_keycode,
            max_keycode,
            vendor,
            pixmap_formats,
            roots,
        })
    }
}

fn order_from_u8(value: u8) -> ByteOrder {
    if value == 0 {
        ByteOrder::LSBFirst
    } else {
        ByteOrder::MSBFirst
    }
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Setup failed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupFailed {
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub reason: String,
}

impl SetupFailed {
    pub fn encode(&self, byte_order: ByteOrder) -> Vec<u8> {
        let mut w = WireWriter::new(byte_order);
        w.u8(SetupStatus::Failed as u8)
            .u8(self.reason.len() as u8)
            .u16(self.protocol_major_version)
            .u16(self.protocol_minor_version)
            .u16((padded_len(self.reason.len()) / 4) as u16)
            .bytes(self.reason.as_bytes())
            .align();
        w.into_vec()
    }
}

/// Setup response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupResponse {
    Success(SetupSuccess),
    Failed(SetupFailed),
    /// The server wants further authentication, which this client does not do
    Authenticate(String),
}

impl SetupResponse {
    pub fn encode(&self, byte_order: ByteOrder) -> Vec<u8> {
        match self {
            SetupResponse::Success(success) => success.encode(byte_order),
            SetupResponse::Failed(failed) => failed.encode(byte_order),
            SetupResponse::Authenticate(reason) => {
                let mut w = WireWriter::new(byte_order);
                w.u8(SetupStatus::Authenticate as u8)
                    .zeros(5)
                    .u16((padded_len(reason.len()) / 4) as u16)
                    .bytes(reason.as_bytes())
                    .align();
                w.into_vec()
            }
        }
    }

    /// Read the server's answer to a setup request
    pub fn read<R: Read>(stream: &mut R, byte_order: ByteOrder) -> io::Result<Self> {
        let mut header = [0u8; 8];
        stream.read_exact(&mut header)?;

        let mut r = WireReader::new(byte_order, &header);
        let status = r.u8()?;
        let reason_len = r.u8()? as usize;
        let major = r.u16()?;
        let minor = r.u16()?;
        let additional_length = r.u16()? as usize;

        let mut data = vec![0u8; additional_length * 4];
        stream.read_exact(&mut data)?;

        match status {
            1 => Ok(SetupResponse::Success(SetupSuccess::decode(
                major, minor, &data, byte_order,
            )?)),
            0 => Ok(SetupResponse::Failed(SetupFailed {
                protocol_major_version: major,
                protocol_minor_version: minor,
                reason: String::from_utf8_lossy(&data[..reason_len.min(data.len())]).to_string(),
            })),
            2 => {
                let text = String::from_utf8_lossy(&data);
                Ok(SetupResponse::Authenticate(
                    text.trim_end_matches('\0').to_string(),
                ))
            }
            other => Err(invalid(&format!("unknown setup status {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_setup() -> SetupSuccess {
        SetupSuccess {
            protocol_major_version: 11,
            protocol_minor_version: 0,
            release_number: 1,
            resource_id_base: 0x00200000,
            resource_id_mask: 0x001fffff,
            motion_buffer_size: 256,
            maximum_request_length: 65535,
            image_byte_order: ByteOrder::LSBFirst,
            bitmap_format_bit_order: ByteOrder::LSBFirst,
            bitmap_format_scanline_unit: 32,
            bitmap_format_scanline_pad: 32,
            min_keycode: 8,
            max_keycode: 255,
            vendor: "x11graphics".to_string(),
            pixmap_formats: vec![Format {
                depth: 24,
                bits_per_pixel: 32,
                scanline_pad: 32,
            }],
            roots: vec![Screen {
                root: Window::new(0x100),
                default_colormap: Colormap::new(0x20),
                white_pixel: 0xffffff,
                black_pixel: 0,
                current_input_masks: 0,
                width_in_pixels: 1024,
                height_in_pixels: 768,
                width_in_millimeters: 270,
                height_in_millimeters: 203,
                min_installed_maps: 1,
                max_installed_maps: 1,
                root_visual: VisualID::new(0x21),
                backing_stores: 0,
                save_unders: false,
                root_depth: 24,
                allowed_depths: vec![Depth {
                    depth: 24,
                    visuals: vec![VisualType {
                        visual_id: VisualID::new(0x21),
                        class: 4,
                        bits_per_rgb_value: 8,
                        colormap_entries: 256,
                        red_mask: 0xff0000,
                        green_mask: 0x00ff00,
                        blue_mask: 0x0000ff,
                    }],
                }],
            }],
        }
    }

    #[test]
    fn test_setup_request_layout() {
        let req = SetupRequest::new(ByteOrder::LSBFirst, "MIT-MAGIC-COOKIE-1", &[0xaa; 16]);
        let bytes = req.encode();
        assert_eq!(bytes[0], b'l');
        assert_eq!(&bytes[2..4], &11u16.to_le_bytes());
        assert_eq!(&bytes[6..8], &18u16.to_le_bytes());
        assert_eq!(&bytes[8..10], &16u16.to_le_bytes());
        // 12 header + 20 padded name + 16 data
        assert_eq!(bytes.len(), 48);
        assert_eq!(SetupRequest::encoded_len(&bytes[..12]), Some(48));
        assert_eq!(SetupRequest::parse(&bytes).unwrap(), req);
    }

    #[test]
    fn test_success_reply_decodes_screen() {
        let setup = sample_setup();
        let bytes = SetupResponse::Success(setup.clone()).encode(ByteOrder::MSBFirst);
        let mut cursor = Cursor::new(bytes);
        match SetupResponse::read(&mut cursor, ByteOrder::MSBFirst).unwrap() {
            SetupResponse::Success(decoded) => assert_eq!(decoded, setup),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_failed_reply_carries_reason() {
        let failed = SetupFailed {
            protocol_major_version: 11,
            protocol_minor_version: 0,
            reason: "No protocol specified".to_string(),
        };
        let bytes = failed.encode(ByteOrder::LSBFirst);
        let mut cursor = Cursor::new(bytes);
        match SetupResponse::read(&mut cursor, ByteOrder::LSBFirst).unwrap() {
            SetupResponse::Failed(f) => assert_eq!(f.reason, "No protocol specified"),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}

//! Caller-facing value types: colors, pixel values, rectangles and sizes

use crate::error::{GraphicsError, Result};
use crate::protocol;

/// Default window geometry, in device pixels
pub const DEFAULT_X: i16 = 50;
pub const DEFAULT_Y: i16 = 50;
pub const DEFAULT_WIDTH: u16 = 400;
pub const DEFAULT_HEIGHT: u16 = 350;

/// Logical 8-bit-per-channel color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue }
    }

    /// Channels widened to the server's 16-bit range
    pub fn wire_channels(&self) -> (u16, u16, u16) {
        (
            wire_channel(self.red),
            wire_channel(self.green),
            wire_channel(self.blue),
        )
    }
}

/// Widen an 8-bit channel to the 16-bit wire value
pub const fn wire_channel(channel: u8) -> u16 {
    (channel as u16) << 8
}

/// Recover the 8-bit channel from a wire value produced by [`wire_channel`]
pub const fn channel_from_wire(value: u16) -> u8 {
    (value >> 8) as u8
}

/// Server-assigned color index, only meaningful for the colormap it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelValue(pub u32);

impl PixelValue {
    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Snapshot of a window size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

/// Rectangle in window-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rectangle {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert to the signed-16/unsigned-16 wire form, refusing to truncate
    pub fn to_wire(&self) -> Result<protocol::Rectangle> {
        Ok(protocol::Rectangle {
            x: narrow_i16("x", self.x)?,
            y: narrow_i16("y", self.y)?,
            width: narrow_u16("width", self.width)?,
            height: narrow_u16("height", self.height)?,
        })
    }
}

fn narrow_i16(field: &'static str, value: i32) -> Result<i16> {
    i16::try_from(value).map_err(|_| GraphicsError::OutOfRange { field, value })
}

fn narrow_u16(field: &'static str, value: i32) -> Result<u16> {
    u16::try_from(value).map_err(|_| GraphicsError::OutOfRange { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_scaling_round_trips() {
        for channel in 0..=255u8 {
            let wire = wire_channel(channel);
            assert_eq!(wire, (channel as u16) << 8);
            assert_eq!(channel_from_wire(wire), channel);
        }
    }

    #[test]
    fn test_color_wire_channels() {
        assert_eq!(Color::new(255, 0, 128).wire_channels(), (0xff00, 0, 0x8000));
    }

    #[test]
    fn test_rectangle_range_checks() {
        let ok = Rectangle::new(-32768, 32767, 65535, 0).to_wire().unwrap();
        assert_eq!(ok, protocol::Rectangle::new(-32768, 32767, 65535, 0));

        match Rectangle::new(40000, 0, 1, 1).to_wire() {
            Err(GraphicsError::OutOfRange { field, value }) => {
                assert_eq!(field, "x");
                assert_eq!(value, 40000);
            }
            other => panic!("expected range error, got {:?}", other),
        }
        assert!(Rectangle::new(0, 0, -1, 1).to_wire().is_err());
        assert!(Rectangle::new(0, 0, 1, 65536).to_wire().is_err());
    }
}

//! Color allocation

use super::Session;
use crate::connection::Transport;
use crate::error::{GraphicsError, Result, RoundTripFailure};
use crate::geometry::{Color, PixelValue};
use crate::protocol::*;

impl<T: Transport> Session<T> {
    /// Allocate `color` in the default colormap
    pub fn alloc_color(&mut self, color: Color) -> Result<PixelValue> {
        let colormap = self.default_colormap();
        self.alloc_color_in(colormap, color)
    }

    /// Allocate `color` in `colormap`; always a fresh round trip
    pub fn alloc_color_in(&mut self, colormap: Colormap, color: Color) -> Result<PixelValue> {
        let (red, green, blue) = color.wire_channels();
        let failed = |cause| GraphicsError::Allocation { color, cause };

        let bytes = self
            .round_trip(Request::AllocColor(AllocColorRequest {
                colormap,
                red,
                green,
                blue,
            }))
            .map_err(failed)?;
        let reply = self
            .parser
            .decode_alloc_color_reply(&bytes)
            .map_err(|e| failed(RoundTripFailure::Connection(e.into())))?;

        log::debug!(
            "Allocated ({}, {}, {}) as pixel 0x{:x}",
            color.red,
            color.green,
            color.blue,
            reply.pixel
        );
        Ok(PixelValue(reply.pixel))
    }
}

//! Window lifecycle and attribute requests

use super::Session;
use crate::connection::Transport;
use crate::error::{GraphicsError, Result, RoundTripFailure};
use crate::geometry::{Dimension, PixelValue, Rectangle};
use crate::protocol::*;

/// A server-side window created through a [`Session`].
///
/// Not `Clone`: destroying the window consumes the handle.
#[derive(Debug, PartialEq, Eq)]
pub struct WindowHandle {
    pub(super) id: Window,
    pub(super) session: u64,
    pub(super) geometry: Rectangle,
}

impl WindowHandle {
    pub fn id(&self) -> Window {
        self.id
    }

    /// Geometry requested at creation; never updated
    pub fn geometry(&self) -> Rectangle {
        self.geometry
    }
}

impl<T: Transport> Session<T> {
    /// The window id if `window` was created by this session and is still live
    pub(super) fn live_window(&self, window: &WindowHandle) -> Result<Window> {
        if window.session != self.id || !self.tracker.window_is_live(window.id) {
            return Err(GraphicsError::InvalidResource(window.id.id()));
        }
        Ok(window.id)
    }

    /// Create an unmapped child of the root window with the root visual
    pub fn create_window(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<WindowHandle> {
        let geometry = Rectangle::new(x, y, width, height);
        let wire = geometry.to_wire()?;
        let id = Window(self.new_id()?);

        let request = CreateWindowRequest {
            depth: 0,
            wid: id,
            parent: self.root(),
            x: wire.x,
            y: wire.y,
            width: wire.width,
            height: wire.height,
            border_width: 0,
            class: WindowClass::CopyFromParent,
            visual: self.screen().root_visual,
            background_pixel: None,
            event_mask: None,
        };
        self.submit(Request::CreateWindow(request))?;
        self.tracker.track_window(id);

        Ok(WindowHandle {
            id,
            session: self.id,
            geometry,
        })
    }

    pub fn show_window(&mut self, window: &WindowHandle) -> Result<()> {
        let id = self.live_window(window)?;
        self.submit(Request::MapWindow(id))?;
        Ok(())
    }

    pub fn hide_window(&mut self, window: &WindowHandle) -> Result<()> {
        let id = self.live_window(window)?;
        self.submit(Request::UnmapWindow(id))?;
        Ok(())
    }

    /// Destroy the window, freeing the contexts bound to it first
    pub fn destroy_window(&mut self, window: WindowHandle) -> Result<()> {
        let id = self.live_window(&window)?;
        for gc in self.tracker.release_window(id)? {
            self.submit(Request::FreeGC(gc))?;
        }
        self.submit(Request::DestroyWindow(id))?;
        Ok(())
    }

    /// Replace the window's WM_NAME property.
    ///
    /// The title goes out as type `STRING`, which window managers read as
    /// Latin-1; non-ASCII text may display wrongly.
    pub fn set_title(&mut self, window: &WindowHandle, title: &str) -> Result<()> {
        let id = self.live_window(window)?;
        self.submit(Request::ChangeProperty(ChangePropertyRequest {
            mode: PropMode::Replace,
            window: id,
            property: Atom::WM_NAME,
            type_: Atom::STRING,
            format: 8,
            data: title.as_bytes().to_vec(),
        }))?;
        Ok(())
    }

    /// Background used when the server next clears the window
    pub fn set_window_background(&mut self, window: &WindowHandle, pixel: PixelValue) -> Result<()> {
        let id = self.live_window(window)?;
        self.submit(Request::ChangeWindowAttributes(ChangeWindowAttributesRequest {
            window: id,
            background_pixel: Some(pixel.get()),
            event_mask: None,
        }))?;
        Ok(())
    }

    /// Select which event categories the server reports for this window
    pub fn set_event_mask(&mut self, window: &WindowHandle, mask: u32) -> Result<()> {
        let id = self.live_window(window)?;
        self.submit(Request::ChangeWindowAttributes(ChangeWindowAttributesRequest {
            window: id,
            background_pixel: None,
            event_mask: Some(mask),
        }))?;
        Ok(())
    }

    /// Ask the server for the window's current size
    pub fn window_size(&mut self, window: &WindowHandle) -> Result<Dimension> {
        let id = self.live_window(window)?;
        let query_failed = |cause| GraphicsError::GeometryQuery {
            resource: id.id(),
            cause,
        };

        let bytes = self
            .round_trip(Request::GetGeometry(id))
            .map_err(query_failed)?;
        let reply = self.parser.decode_geometry_reply(&bytes).map_err(|e| {
            query_failed(RoundTripFailure::Connection(e.into()))
        })?;

        Ok(Dimension {
            width: reply.width as u32,
            height: reply.height as u32,
        })
    }
}

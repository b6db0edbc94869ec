//! Rectangle drawing

use super::{ContextHandle, Session, WindowHandle};
use crate::connection::Transport;
use crate::error::{GraphicsError, Result};
use crate::geometry::{Color, Rectangle};
use crate::protocol::*;

impl<T: Transport> Session<T> {
    fn draw_target(
        &self,
        window: &WindowHandle,
        gc: &ContextHandle,
    ) -> Result<(Window, GContext)> {
        let drawable = self.live_window(window)?;
        let gc_id = self.live_context(gc)?;
        if gc.window != drawable {
            return Err(GraphicsError::InvalidResource(gc_id.id()));
        }
        Ok((drawable, gc_id))
    }

    /// Fill with the context's current foreground
    pub fn fill_rect(
        &mut self,
        window: &WindowHandle,
        gc: &ContextHandle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<()> {
        self.fill_rect_from(window, gc, &Rectangle::new(x, y, width, height))
    }

    pub fn fill_rect_from(
        &mut self,
        window: &WindowHandle,
        gc: &ContextHandle,
        rect: &Rectangle,
    ) -> Result<()> {
        let (drawable, gc) = self.draw_target(window, gc)?;
        let wire = rect.to_wire()?;
        self.submit(Request::PolyFillRectangle(PolyRectangleRequest {
            drawable,
            gc,
            rectangles: vec![wire],
        }))?;
        Ok(())
    }

    /// Outline only, with the context's current foreground
    pub fn outline_rect(
        &mut self,
        window: &WindowHandle,
        gc: &ContextHandle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<()> {
        self.outline_rect_from(window, gc, &Rectangle::new(x, y, width, height))
    }

    pub fn outline_rect_from(
        &mut self,
        window: &WindowHandle,
        gc: &ContextHandle,
        rect: &Rectangle,
    ) -> Result<()> {
        let (drawable, gc) = self.draw_target(window, gc)?;
        let wire = rect.to_wire()?;
        self.submit(Request::PolyRectangle(PolyRectangleRequest {
            drawable,
            gc,
            rectangles: vec![wire],
        }))?;
        Ok(())
    }

    /// Fill with the current foreground, then outline in black.
    ///
    /// The context's foreground is left black afterwards.
    pub fn bordered_rect(
        &mut self,
        window: &WindowHandle,
        gc: &ContextHandle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<()> {
        self.bordered_rect_from(window, gc, &Rectangle::new(x, y, width, height))
    }

    pub fn bordered_rect_from(
        &mut self,
        window: &WindowHandle,
        gc: &ContextHandle,
        rect: &Rectangle,
    ) -> Result<()> {
        // Validate everything before the fill goes out
        self.draw_target(window, gc)?;
        rect.to_wire()?;

        self.fill_rect_from(window, gc, rect)?;
        let black = self.alloc_color(Color::BLACK)?;
        self.set_foreground(gc, black)?;
        self.outline_rect_from(window, gc, rect)
    }
}

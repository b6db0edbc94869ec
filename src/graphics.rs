//! The drawing surface consumed by editors and tools
//!
//! [`Graphics`] is the capability an editor sees: listener registration,
//! colors by RGB, window mutation and the rectangle primitives.
//! [`X11Graphics`] implements it with one session, one window and one
//! graphics context.

use crate::connection::{Connection, Transport};
use crate::error::{ConnectionFailure, Result};
use crate::geometry::{
    Color, Dimension, Rectangle, DEFAULT_HEIGHT, DEFAULT_WIDTH, DEFAULT_X, DEFAULT_Y,
};
use crate::listeners::{InputListener, InputListenerRegistry, ListenerId};
use crate::session::{ContextHandle, Session, SessionOptions, WindowHandle};

/// Drawing capability offered to the editing layer
pub trait Graphics {
    fn add_input_listener(&mut self, listener: Box<dyn InputListener>) -> Result<ListenerId>;
    fn remove_input_listener(&mut self, id: ListenerId) -> Result<Option<Box<dyn InputListener>>>;

    fn set_fg_color(&mut self, color: Color) -> Result<()>;
    fn set_bg_color(&mut self, color: Color) -> Result<()>;
    fn show_window(&mut self) -> Result<()>;
    fn set_window_background(&mut self, color: Color) -> Result<()>;
    fn set_window_title(&mut self, title: &str) -> Result<()>;
    /// Ask the server for the listeners' events; delivery belongs to the caller's loop
    fn start_listening(&mut self) -> Result<()>;
    fn window_size(&mut self) -> Result<Dimension>;

    fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()>;
    fn draw_border(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()>;
    fn draw_bordered_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()>;

    fn draw_rect_from(&mut self, rect: &Rectangle) -> Result<()> {
        self.draw_rect(rect.x, rect.y, rect.width, rect.height)
    }

    fn draw_border_from(&mut self, rect: &Rectangle) -> Result<()> {
        self.draw_border(rect.x, rect.y, rect.width, rect.height)
    }

    fn draw_bordered_rect_from(&mut self, rect: &Rectangle) -> Result<()> {
        self.draw_bordered_rect(rect.x, rect.y, rect.width, rect.height)
    }
}

/// [`Graphics`] over one X11 window
pub struct X11Graphics<T: Transport = Connection> {
    session: Session<T>,
    window: WindowHandle,
    context: ContextHandle,
    listeners: InputListenerRegistry,
}

impl X11Graphics<Connection> {
    /// Open `$DISPLAY` with the default geometry
    pub fn new_default() -> Result<Self> {
        Self::new(DEFAULT_X, DEFAULT_Y, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Open `$DISPLAY` with the given geometry
    pub fn new(x: i16, y: i16, width: u16, height: u16) -> Result<Self> {
        let display = std::env::var("DISPLAY")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ConnectionFailure::BadDisplay("DISPLAY is not set".to_string()))?;
        Self::connect(&display, SessionOptions::default(), x, y, width, height)
    }

    pub fn connect(
        display: &str,
        options: SessionOptions,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
    ) -> Result<Self> {
        let session = Session::open(display, options)?;
        Self::with_session(session, x, y, width, height)
    }
}

impl<T: Transport> X11Graphics<T> {
    /// Create the window and its context on an open session
    pub fn with_session(
        mut session: Session<T>,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
    ) -> Result<Self> {
        let window = session.create_window(x.into(), y.into(), width.into(), height.into())?;
        let context = session.create_context(&window)?;
        log::debug!(
            "Graphics on window {} with context {}",
            window.id(),
            context.id()
        );
        Ok(X11Graphics {
            session,
            window,
            context,
            listeners: InputListenerRegistry::new(),
        })
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    pub fn window(&self) -> &WindowHandle {
        &self.window
    }

    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn listeners(&self) -> &InputListenerRegistry {
        &self.listeners
    }

    pub fn hide_window(&mut self) -> Result<()> {
        self.session.hide_window(&self.window)
    }

    /// Wait for the server to catch up, then hand queued events to the listeners
    pub fn pump_events(&mut self) -> Result<usize> {
        self.session.sync()?;
        let mut delivered = 0;
        for event in self.session.take_events() {
            delivered += self.listeners.notify(&event);
        }
        Ok(delivered)
    }

    /// Destroy the window and context and close the session
    pub fn close(self) -> Result<()> {
        let X11Graphics {
            mut session,
            window,
            context,
            ..
        } = self;
        session.free_context(context)?;
        session.destroy_window(window)?;
        session.close()
    }

    fn select_listener_events(&mut self) -> Result<()> {
        let mask = self.listeners.combined_mask();
        self.session.set_event_mask(&self.window, mask)
    }
}

impl<T: Transport> Graphics for X11Graphics<T> {
    fn add_input_listener(&mut self, listener: Box<dyn InputListener>) -> Result<ListenerId> {
        let id = self.listeners.add(listener);
        self.select_listener_events()?;
        Ok(id)
    }

    fn remove_input_listener(&mut self, id: ListenerId) -> Result<Option<Box<dyn InputListener>>> {
        let removed = self.listeners.remove(id);
        if removed.is_some() {
            self.select_listener_events()?;
        }
        Ok(removed)
    }

    fn set_fg_color(&mut self, color: Color) -> Result<()> {
        let pixel = self.session.alloc_color(color)?;
        self.session.set_foreground(&self.context, pixel)
    }

    fn set_bg_color(&mut self, color: Color) -> Result<()> {
        let pixel = self.session.alloc_color(color)?;
        self.session.set_background(&self.context, pixel)
    }

    fn show_window(&mut self) -> Result<()> {
        self.session.show_window(&self.window)
    }

    fn set_window_background(&mut self, color: Color) -> Result<()> {
        let pixel = self.session.alloc_color(color)?;
        self.session.set_window_background(&self.window, pixel)
    }

    fn set_window_title(&mut self, title: &str) -> Result<()> {
        self.session.set_title(&self.window, title)
    }

    fn start_listening(&mut self) -> Result<()> {
        self.select_listener_events()?;
        self.session.flush()
    }

    fn window_size(&mut self) -> Result<Dimension> {
        self.session.window_size(&self.window)
    }

    fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.session
            .fill_rect(&self.window, &self.context, x, y, width, height)
    }

    fn draw_border(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.session
            .outline_rect(&self.window, &self.context, x, y, width, height)
    }

    fn draw_bordered_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.session
            .bordered_rect(&self.window, &self.context, x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{event_mask, RequestOpcode};
    use crate::server::{NullServer, NullTransport};

    struct Quiet;

    impl InputListener for Quiet {
        fn on_event(&mut self, _event: &crate::protocol::InputEvent) {}

        fn event_mask(&self) -> u32 {
            event_mask::BUTTON_PRESS
        }
    }

    fn graphics(server: &NullServer) -> X11Graphics<NullTransport> {
        let session = Session::with_transport(server.connect(), SessionOptions::default()).unwrap();
        X11Graphics::with_session(session, DEFAULT_X, DEFAULT_Y, DEFAULT_WIDTH, DEFAULT_HEIGHT)
            .unwrap()
    }

    #[test]
    fn test_listeners_drive_the_event_mask() {
        let server = NullServer::new();
        let mut g = graphics(&server);
        let id = g.add_input_listener(Box::new(Quiet)).unwrap();
        g.start_listening().unwrap();
        let window = g.window().id();
        assert_eq!(server.window(window).unwrap().event_mask, event_mask::BUTTON_PRESS);

        assert!(g.remove_input_listener(id).unwrap().is_some());
        g.start_listening().unwrap();
        assert_eq!(server.window(window).unwrap().event_mask, event_mask::NO_EVENT);
    }

    #[test]
    fn test_colors_allocate_then_apply() {
        let server = NullServer::new();
        let mut g = graphics(&server);
        g.session_mut().flush().unwrap();
        server.clear_requests();
        g.set_fg_color(Color::new(0, 0, 255)).unwrap();
        g.session_mut().flush().unwrap();
        let opcodes: Vec<_> = server.requests().iter().map(|r| r.opcode()).collect();
        assert_eq!(opcodes, vec![RequestOpcode::AllocColor, RequestOpcode::ChangeGC]);
        assert_eq!(server.context(g.context().id()).unwrap().foreground, 0x0000ff);
    }

    #[test]
    fn test_close_releases_everything() {
        let server = NullServer::new();
        let g = graphics(&server);
        g.close().unwrap();
        assert_eq!(server.window_count(), 0);
        assert_eq!(server.context_count(), 0);

        let opcodes: Vec<_> = server.requests().iter().map(|r| r.opcode()).collect();
        assert_eq!(
            opcodes,
            vec![
                RequestOpcode::CreateWindow,
                RequestOpcode::CreateGC,
                RequestOpcode::FreeGC,
                RequestOpcode::DestroyWindow
            ]
        );
    }
}

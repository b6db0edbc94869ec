//! Graphics contexts

use super::{Session, WindowHandle};
use crate::connection::Transport;
use crate::error::{GraphicsError, Result};
use crate::geometry::PixelValue;
use crate::protocol::*;

/// A server-side drawing context bound to one window.
///
/// Its colors live only on the server; there is no local copy.
#[derive(Debug, PartialEq, Eq)]
pub struct ContextHandle {
    pub(super) id: GContext,
    pub(super) window: Window,
    pub(super) session: u64,
}

impl ContextHandle {
    pub fn id(&self) -> GContext {
        self.id
    }

    /// The window this context draws into
    pub fn window(&self) -> Window {
        self.window
    }
}

impl<T: Transport> Session<T> {
    /// The context id if it belongs to this session and its window is live
    pub(super) fn live_context(&self, gc: &ContextHandle) -> Result<GContext> {
        if gc.session != self.id || self.tracker.context_owner(gc.id) != Some(gc.window) {
            return Err(GraphicsError::InvalidResource(gc.id.id()));
        }
        Ok(gc.id)
    }

    /// Create a context with server default state, bound to `window`
    pub fn create_context(&mut self, window: &WindowHandle) -> Result<ContextHandle> {
        let drawable = self.live_window(window)?;
        let id = GContext(self.new_id()?);

        self.submit(Request::CreateGC(CreateGCRequest {
            cid: id,
            drawable,
            foreground: None,
            background: None,
        }))?;
        self.tracker.track_context(id, drawable)?;

        Ok(ContextHandle {
            id,
            window: drawable,
            session: self.id,
        })
    }

    /// Foreground used by later drawing requests on this context
    pub fn set_foreground(&mut self, gc: &ContextHandle, pixel: PixelValue) -> Result<()> {
        let id = self.live_context(gc)?;
        self.submit(Request::ChangeGC(ChangeGCRequest {
            gc: id,
            foreground: Some(pixel.get()),
            background: None,
        }))?;
        Ok(())
    }

    pub fn set_background(&mut self, gc: &ContextHandle, pixel: PixelValue) -> Result<()> {
        let id = self.live_context(gc)?;
        self.submit(Request::ChangeGC(ChangeGCRequest {
            gc: id,
            foreground: None,
            background: Some(pixel.get()),
        }))?;
        Ok(())
    }

    pub fn free_context(&mut self, gc: ContextHandle) -> Result<()> {
        let id = self.live_context(&gc)?;
        self.tracker.release_context(id)?;
        self.submit(Request::FreeGC(id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{NullServer, NullTransport};
    use crate::session::SessionOptions;

    fn open(server: &NullServer) -> Session<NullTransport> {
        Session::with_transport(server.connect(), SessionOptions::default()).unwrap()
    }

    #[test]
    fn test_context_colors_reach_the_server() {
        let server = NullServer::new();
        let mut session = open(&server);
        let window = session.create_window(0, 0, 10, 10).unwrap();
        let gc = session.create_context(&window).unwrap();
        assert_eq!(gc.window(), window.id());

        session.set_foreground(&gc, PixelValue(7)).unwrap();
        session.set_background(&gc, PixelValue(9)).unwrap();
        session.sync().unwrap();

        let state = server.context(gc.id()).unwrap();
        assert_eq!(state.foreground, 7);
        assert_eq!(state.background, 9);
        assert_eq!(state.drawable, window.id());
    }

    #[test]
    fn test_destroying_window_invalidates_its_contexts() {
        let server = NullServer::new();
        let mut session = open(&server);
        let window = session.create_window(0, 0, 10, 10).unwrap();
        let gc = session.create_context(&window).unwrap();
        session.destroy_window(window).unwrap();

        assert!(matches!(
            session.set_foreground(&gc, PixelValue(1)),
            Err(GraphicsError::InvalidResource(id)) if id == gc.id().id()
        ));
        session.sync().unwrap();
        assert_eq!(server.context_count(), 0);
    }

    #[test]
    fn test_contexts_from_another_session_are_rejected() {
        let server = NullServer::new();
        let mut first = open(&server);
        let mut second = open(&server);
        let window = first.create_window(0, 0, 10, 10).unwrap();
        let gc = first.create_context(&window).unwrap();
        assert!(second.set_background(&gc, PixelValue(0)).is_err());
        assert!(second.create_context(&window).is_err());
    }

    #[test]
    fn test_freed_context_is_gone() {
        let server = NullServer::new();
        let mut session = open(&server);
        let window = session.create_window(0, 0, 10, 10).unwrap();
        let gc = session.create_context(&window).unwrap();
        session.free_context(gc).unwrap();
        assert_eq!(session.resource_counts().contexts, 0);
        session.sync().unwrap();
        assert_eq!(server.context_count(), 0);
    }
}

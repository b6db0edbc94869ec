//! x11graphics - A rectangle-drawing graphics backend for X11
//!
//! This library opens a session to an X server, creates a window and a
//! graphics context, allocates colors through the server's default colormap
//! and draws filled, outlined and bordered rectangles. An in-process
//! [`server::NullServer`] speaks the same protocol for testing.

pub mod connection;
pub mod error;
pub mod geometry;
pub mod graphics;
pub mod listeners;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod session;

pub use error::{ConnectionFailure, GraphicsError, Result, RoundTripFailure};
pub use geometry::{Color, Dimension, PixelValue, Rectangle};
pub use graphics::{Graphics, X11Graphics};
pub use listeners::{InputListener, InputListenerRegistry, ListenerId};
pub use protocol::{GContext, InputEvent, Window};
pub use session::{AuthPolicy, ContextHandle, Session, SessionOptions, WindowHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

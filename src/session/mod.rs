//! Session
//!
//! A [`Session`] owns one connection to the display server. It performs the
//! setup handshake, numbers and buffers requests in program order, and runs
//! the blocking round trips (color allocation, geometry query, sync). Window,
//! context, color and drawing operations live in the submodules as further
//! `impl Session` blocks.

mod color;
mod context;
mod draw;
mod window;

pub use context::ContextHandle;
pub use window::WindowHandle;

use crate::connection::{auth, Connection, DisplayName, Transport};
use crate::error::{ConnectionFailure, GraphicsError, Result, RoundTripFailure};
use crate::protocol::*;
use crate::resources::{ResourceAllocator, ResourceCounts, ResourceTracker};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Buffered requests are written out once this many bytes are pending
const FLUSH_THRESHOLD: usize = 16 * 1024;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// How the setup request is authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPolicy {
    /// Send the MIT-MAGIC-COOKIE-1 from `.Xauthority` when one matches
    #[default]
    Xauthority,
    /// Send an empty authorization
    Anonymous,
}

/// Session tuning
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Upper bound on a blocking round trip; `None` waits forever
    pub reply_timeout: Option<Duration>,
    pub auth: AuthPolicy,
}

impl SessionOptions {
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    pub fn with_auth(mut self, auth: AuthPolicy) -> Self {
        self.auth = auth;
        self
    }
}

/// An open connection to the display server and its negotiated defaults
pub struct Session<T: Transport = Connection> {
    id: u64,
    transport: T,
    encoder: ProtocolEncoder,
    parser: ProtocolParser,
    setup: SetupSuccess,
    screen: usize,

    /// Sequence number of the last request sent
    sequence: u16,
    outgoing: Vec<u8>,

    allocator: ResourceAllocator,
    tracker: ResourceTracker,

    events: VecDeque<InputEvent>,
    async_errors: Vec<X11Error>,
}

impl Session<Connection> {
    /// Connect to the display named by `display_name` (the `DISPLAY` syntax)
    pub fn open(display_name: &str, options: SessionOptions) -> Result<Self> {
        let name: DisplayName = display_name.parse()?;
        let connection = Connection::open(&name).map_err(ConnectionFailure::Io)?;

        let cookie = match options.auth {
            AuthPolicy::Xauthority => auth::lookup(name.display),
            AuthPolicy::Anonymous => None,
        };

        let session = Self::handshake(connection, name.screen, cookie, options)?;
        log::info!(
            "Opened session {} on display {} ({})",
            session.id,
            name,
            session.setup.vendor
        );
        Ok(session)
    }
}

impl<T: Transport> Session<T> {
    /// Run the setup handshake over an already connected transport, using
    /// screen 0 and no authorization
    pub fn with_transport(transport: T, options: SessionOptions) -> Result<Self> {
        let session = Self::handshake(transport, 0, None, options)?;
        log::info!("Opened session {} ({})", session.id, session.setup.vendor);
        Ok(session)
    }

    fn handshake(
        mut transport: T,
        screen: usize,
        cookie: Option<(String, Vec<u8>)>,
        options: SessionOptions,
    ) -> Result<Self> {
        let byte_order = ByteOrder::native();
        let (auth_name, auth_data) = cookie.unwrap_or_default();

        transport.set_read_timeout(options.reply_timeout)?;
        let request = SetupRequest::new(byte_order, &auth_name, &auth_data);
        transport.write_all(&request.encode())?;
        transport.flush()?;
        log::debug!("Sent setup request (auth {:?})", auth_name);

        let setup = match SetupResponse::read(&mut transport, byte_order)? {
            SetupResponse::Success(setup) => setup,
            SetupResponse::Failed(failed) => {
                return Err(ConnectionFailure::Refused(failed.reason).into())
            }
            SetupResponse::Authenticate(reason) => {
                return Err(ConnectionFailure::Refused(reason).into())
            }
        };

        log::debug!("Setup successful:");
        log::debug!("  Resource ID base: 0x{:08x}", setup.resource_id_base);
        log::debug!("  Resource ID mask: 0x{:08x}", setup.resource_id_mask);
        log::debug!("  Vendor: {}", setup.vendor);
        log::debug!("  Screens: {}", setup.roots.len());

        if screen >= setup.roots.len() {
            return Err(ConnectionFailure::BadDisplay(format!(
                "screen {} not offered (server has {})",
                screen,
                setup.roots.len()
            ))
            .into());
        }

        Ok(Session {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            transport,
            encoder: ProtocolEncoder::new(byte_order),
            parser: ProtocolParser::new(byte_order),
            allocator: ResourceAllocator::new(setup.resource_id_base, setup.resource_id_mask),
            setup,
            screen,
            sequence: 0,
            outgoing: Vec::new(),
            tracker: ResourceTracker::new(),
            events: VecDeque::new(),
            async_errors: Vec::new(),
        })
    }

    /// Process-unique identity of this session
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn setup(&self) -> &SetupSuccess {
        &self.setup
    }

    /// The default screen; its index was validated during the handshake
    pub fn screen(&self) -> &Screen {
        &self.setup.roots[self.screen]
    }

    pub fn root(&self) -> Window {
        self.screen().root
    }

    pub fn default_colormap(&self) -> Colormap {
        self.screen().default_colormap
    }

    /// Live windows and contexts created through this session
    pub fn resource_counts(&self) -> ResourceCounts {
        self.tracker.counts()
    }

    /// A fresh resource id from the server-assigned range
    pub fn new_id(&mut self) -> Result<XID> {
        self.allocator.new_id()
    }

    /// Queue a request; returns its sequence number.
    ///
    /// A request too long for the length field is refused before it takes a
    /// sequence number.
    fn submit(&mut self, request: Request) -> Result<u16> {
        let bytes = self.encoder.encode_request(&request);
        if bytes.len() > MAX_REQUEST_LEN {
            return Err(GraphicsError::RequestTooLong {
                opcode: request.opcode(),
                len: bytes.len(),
            });
        }
        Ok(self.queue(&request, bytes)?)
    }

    fn queue(
        &mut self,
        request: &Request,
        bytes: Vec<u8>,
    ) -> std::result::Result<u16, ConnectionFailure> {
        self.sequence = self.sequence.wrapping_add(1);
        log::debug!(
            "Request #{} {:?} ({} bytes)",
            self.sequence,
            request.opcode(),
            bytes.len()
        );
        self.outgoing.extend_from_slice(&bytes);
        if self.outgoing.len() >= FLUSH_THRESHOLD {
            self.flush_outgoing()?;
        }
        Ok(self.sequence)
    }

    /// Write every buffered request to the server
    pub fn flush(&mut self) -> Result<()> {
        self.flush_outgoing().map_err(GraphicsError::from)
    }

    fn flush_outgoing(&mut self) -> std::result::Result<(), ConnectionFailure> {
        if !self.outgoing.is_empty() {
            self.transport
                .write_all(&self.outgoing)
                .map_err(ConnectionFailure::Io)?;
            self.outgoing.clear();
        }
        self.transport.flush().map_err(ConnectionFailure::Io)
    }

    /// Send a request that has a reply and block until that reply arrives.
    ///
    /// Events read while waiting are queued, and errors belonging to earlier
    /// requests are logged and kept for [`Session::take_async_errors`].
    fn round_trip(&mut self, request: Request) -> std::result::Result<Vec<u8>, RoundTripFailure> {
        // Every request with a reply is fixed size
        let bytes = self.encoder.encode_request(&request);
        let sequence = self
            .queue(&request, bytes)
            .map_err(RoundTripFailure::Connection)?;
        self.flush_outgoing().map_err(RoundTripFailure::Connection)?;

        loop {
            let packet = self
                .parser
                .read_packet(&mut self.transport)
                .map_err(|e| RoundTripFailure::Connection(ConnectionFailure::Io(e)))?;
            match packet {
                ServerPacket::Reply { sequence: s, bytes } if s == sequence => {
                    log::debug!("Reply #{} ({} bytes)", s, bytes.len());
                    return Ok(bytes);
                }
                ServerPacket::Reply { sequence: s, .. } => {
                    log::warn!("Ignoring reply #{} while waiting for #{}", s, sequence);
                }
                ServerPacket::Error(error) if error.sequence == sequence => {
                    log::debug!("Error reply #{}: {}", sequence, error);
                    return Err(RoundTripFailure::Server(error));
                }
                ServerPacket::Error(error) => self.record_async_error(error),
                ServerPacket::Event(event) => self.events.push_back(event),
            }
        }
    }

    fn record_async_error(&mut self, error: X11Error) {
        log::warn!("Asynchronous error: {}", error);
        self.async_errors.push(error);
    }

    /// Block until the server has processed every request sent so far
    pub fn sync(&mut self) -> Result<()> {
        let bytes = self
            .round_trip(Request::GetInputFocus)
            .map_err(|cause| match cause {
                RoundTripFailure::Server(e) => GraphicsError::Protocol(e),
                RoundTripFailure::Connection(e) => GraphicsError::Connection(e),
            })?;
        self.parser.decode_input_focus_reply(&bytes)?;
        Ok(())
    }

    /// Events received so far, oldest first
    pub fn take_events(&mut self) -> Vec<InputEvent> {
        self.events.drain(..).collect()
    }

    /// Errors the server reported for fire-and-forget requests
    pub fn take_async_errors(&mut self) -> Vec<X11Error> {
        std::mem::take(&mut self.async_errors)
    }

    /// Free every resource still tracked, flush, and shut the connection down
    pub fn close(mut self) -> Result<()> {
        let cleanup = self.tracker.drain();
        log::info!(
            "Closing session {} ({} cleanup requests)",
            self.id,
            cleanup.len()
        );
        for request in cleanup {
            self.submit(request)?;
        }
        self.flush()?;
        self.transport.shutdown()?;
        Ok(())
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("screen", &self.screen)
            .field("sequence", &self.sequence)
            .field("pending_bytes", &self.outgoing.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::NullServer;

    #[test]
    fn test_handshake_uses_server_defaults() {
        let server = NullServer::new();
        let session = Session::with_transport(server.connect(), SessionOptions::default()).unwrap();
        assert_eq!(session.root(), server.root());
        assert_eq!(session.default_colormap(), server.default_colormap());
        assert_eq!(session.resource_counts(), ResourceCounts::default());
    }

    #[test]
    fn test_sessions_get_distinct_ids_and_id_ranges() {
        let server = NullServer::new();
        let mut a = Session::with_transport(server.connect(), SessionOptions::default()).unwrap();
        let mut b = Session::with_transport(server.connect(), SessionOptions::default()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(
            a.new_id().unwrap().get() & !0x001fffff,
            b.new_id().unwrap().get() & !0x001fffff
        );
    }

    #[test]
    fn test_requests_are_buffered_until_flush() {
        let server = NullServer::new();
        let mut session =
            Session::with_transport(server.connect(), SessionOptions::default()).unwrap();
        let window = session.create_window(0, 0, 10, 10).unwrap();
        session.show_window(&window).unwrap();
        assert!(server.requests().is_empty());
        assert_eq!(server.window_count(), 0);

        session.flush().unwrap();
        let opcodes: Vec<_> = server.requests().iter().map(|r| r.opcode()).collect();
        assert_eq!(
            opcodes,
            vec![RequestOpcode::CreateWindow, RequestOpcode::MapWindow]
        );
    }

    #[test]
    fn test_sync_collects_async_errors() {
        let server = NullServer::new();
        let mut session =
            Session::with_transport(server.connect(), SessionOptions::default()).unwrap();
        // Zero-sized windows are rejected by the server, not locally
        let _window = session.create_window(0, 0, 0, 10).unwrap();
        session.sync().unwrap();

        let errors = session.take_async_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::Value);
        assert!(session.take_async_errors().is_empty());
    }

    #[test]
    fn test_close_frees_tracked_resources() {
        let server = NullServer::new();
        let mut session =
            Session::with_transport(server.connect(), SessionOptions::default()).unwrap();
        let window = session.create_window(0, 0, 10, 10).unwrap();
        let gc = session.create_context(&window).unwrap();
        session.close().unwrap();

        let requests = server.requests();
        let tail = &requests[requests.len() - 2..];
        assert_eq!(tail[0], Request::FreeGC(gc.id()));
        assert_eq!(tail[1], Request::DestroyWindow(window.id()));
        assert_eq!(server.window_count(), 0);
    }

    #[test]
    fn test_reply_timeout_fails_the_round_trip() {
        let server = NullServer::new();
        let timeout = Duration::from_millis(20);
        let options = SessionOptions::default().with_reply_timeout(timeout);
        let mut session = Session::with_transport(server.connect(), options).unwrap();
        assert_eq!(session.transport().read_timeout(), Some(timeout));

        let window = session.create_window(0, 0, 10, 10).unwrap();
        server.stall();

        match session.window_size(&window) {
            Err(GraphicsError::GeometryQuery {
                cause: RoundTripFailure::Connection(ConnectionFailure::Io(e)),
                ..
            }) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
            other => panic!("expected a timed out geometry query, got {:?}", other),
        }
        assert!(matches!(
            session.alloc_color(crate::geometry::Color::WHITE),
            Err(GraphicsError::Allocation {
                cause: RoundTripFailure::Connection(ConnectionFailure::Io(_)),
                ..
            })
        ));
    }

    #[test]
    fn test_refused_setup_is_a_connection_error() {
        let server = NullServer::new();
        server.refuse_connections("no clients today");
        let err = Session::with_transport(server.connect(), SessionOptions::default()).unwrap_err();
        match err {
            GraphicsError::Connection(ConnectionFailure::Refused(reason)) => {
                assert_eq!(reason, "no clients today")
            }
            other => panic!("expected refusal, got {:?}", other),
        }
    }
}

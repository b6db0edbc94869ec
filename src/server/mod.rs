//! In-process display server
//!
//! [`NullServer`] speaks the same wire protocol as a real X server for the
//! requests this crate sends. Every connection is a [`NullTransport`] that
//! parses what the client writes, applies it to a shared window/GC table and
//! queues the replies, errors and events for the client to read back. Nothing
//! is rendered; the tables and the request log are there to be inspected.

use crate::connection::Transport;
use crate::protocol::*;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::time::Duration;

const ROOT_WINDOW: u32 = 0x100;
const DEFAULT_COLORMAP: u32 = 0x20;
const ROOT_VISUAL: u32 = 0x21;
const ROOT_DEPTH: u8 = 24;
const SCREEN_WIDTH: u16 = 1920;
const SCREEN_HEIGHT: u16 = 1080;

/// Client ids occupy the bits above the resource id mask
const CLIENT_ID_SHIFT: u32 = 21;
const RESOURCE_ID_MASK: u32 = 0x001fffff;

/// How AllocColor is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPolicy {
    /// 24-bit TrueColor: pixel = 0xRRGGBB from the high byte of each channel
    #[default]
    TrueColor,
    /// Pixel = the 16-bit red value as sent
    EchoRed,
    /// Every allocation fails with BadAlloc
    Exhausted,
}

/// Server-side window state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    pub owner: u32,
    pub parent: Window,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub mapped: bool,
    pub background_pixel: Option<u32>,
    pub event_mask: u32,
    /// WM_NAME as a string
    pub title: String,
}

/// Server-side graphics context state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextState {
    pub owner: u32,
    pub drawable: Window,
    pub foreground: u32,
    pub background: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Fill,
    Outline,
}

/// One rectangle drawn, with the foreground it was drawn in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOp {
    pub kind: DrawKind,
    pub drawable: Window,
    pub foreground: u32,
    pub rect: Rectangle,
}

struct ClientState {
    byte_order: ByteOrder,
    sequence: u16,
    outbound: VecDeque<u8>,
}

#[derive(Default)]
struct ServerState {
    next_client: u32,
    clients: HashMap<u32, ClientState>,
    windows: HashMap<Window, WindowState>,
    contexts: HashMap<GContext, ContextState>,
    requests: Vec<Request>,
    raw_requests: Vec<Vec<u8>>,
    drawings: Vec<DrawOp>,
    color_policy: ColorPolicy,
    refusal: Option<String>,
    disconnected: bool,
    stalled: bool,
}

/// Shared handle to an in-process server; clones see the same state
#[derive(Clone, Default)]
pub struct NullServer {
    state: Rc<RefCell<ServerState>>,
}

impl NullServer {
    pub fn new() -> Self {
        NullServer::default()
    }

    /// Open a new client connection
    pub fn connect(&self) -> NullTransport {
        let mut state = self.state.borrow_mut();
        state.next_client += 1;
        let client = state.next_client;
        log::debug!("Null server accepted client {}", client);
        NullTransport {
            state: Rc::clone(&self.state),
            client,
            inbound: Vec::new(),
            setup_done: false,
            shut_down: false,
            read_timeout: None,
        }
    }

    pub fn root(&self) -> Window {
        Window::new(ROOT_WINDOW)
    }

    pub fn default_colormap(&self) -> Colormap {
        Colormap::new(DEFAULT_COLORMAP)
    }

    pub fn set_color_policy(&self, policy: ColorPolicy) {
        self.state.borrow_mut().color_policy = policy;
    }

    /// Answer every later setup request with Failed
    pub fn refuse_connections(&self, reason: &str) {
        self.state.borrow_mut().refusal = Some(reason.to_string());
    }

    /// Break every connection: reads and writes fail from now on
    pub fn disconnect(&self) {
        log::debug!("Null server disconnecting all clients");
        self.state.borrow_mut().disconnected = true;
    }

    /// Keep processing requests but stop sending replies, errors and events
    pub fn stall(&self) {
        log::debug!("Null server stops answering");
        self.state.borrow_mut().stalled = true;
    }

    /// Every request received, in arrival order
    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    /// The bytes of every request received, in arrival order
    pub fn raw_requests(&self) -> Vec<Vec<u8>> {
        self.state.borrow().raw_requests.clone()
    }

    pub fn clear_requests(&self) {
        let mut state = self.state.borrow_mut();
        state.requests.clear();
        state.raw_requests.clear();
    }

    pub fn drawings(&self) -> Vec<DrawOp> {
        self.state.borrow().drawings.clone()
    }

    pub fn window(&self, window: Window) -> Option<WindowState> {
        self.state.borrow().windows.get(&window).cloned()
    }

    pub fn context(&self, gc: GContext) -> Option<ContextState> {
        self.state.borrow().contexts.get(&gc).copied()
    }

    pub fn window_count(&self) -> usize {
        self.state.borrow().windows.len()
    }

    pub fn context_count(&self) -> usize {
        self.state.borrow().contexts.len()
    }

    /// Change a window's size behind the client's back
    pub fn resize_window(&self, window: Window, width: u16, height: u16) -> bool {
        match self.state.borrow_mut().windows.get_mut(&window) {
            Some(info) => {
                info.width = width;
                info.height = height;
                true
            }
            None => false,
        }
    }

    /// Destroy a window without telling its owner
    pub fn remove_window(&self, window: Window) -> bool {
        self.state.borrow_mut().windows.remove(&window).is_some()
    }

    /// Queue `event` for the client owning `window`, if the window selected it
    pub fn inject_event(&self, window: Window, event: InputEvent) -> bool {
        let mut state = self.state.borrow_mut();
        if state.stalled {
            return false;
        }
        let owner = match state.windows.get(&window) {
            Some(info) if info.event_mask & event.mask() != 0 => info.owner,
            _ => return false,
        };
        match state.clients.get_mut(&owner) {
            Some(client) => {
                let bytes = event.encode(client.sequence, client.byte_order);
                client.outbound.extend(bytes);
                true
            }
            None => false,
        }
    }
}

impl ServerState {
    fn setup_success(&self, client: u32) -> SetupSuccess {
        SetupSuccess {
            protocol_major_version: PROTOCOL_MAJOR_VERSION,
            protocol_minor_version: PROTOCOL_MINOR_VERSION,
            release_number: 1,
            resource_id_base: client << CLIENT_ID_SHIFT,
            resource_id_mask: RESOURCE_ID_MASK,
            motion_buffer_size: 256,
            maximum_request_length: 65535,
            image_byte_order: ByteOrder::LSBFirst,
            bitmap_format_bit_order: ByteOrder::LSBFirst,
            bitmap_format_scanline_unit: 32,
            bitmap_format_scanline_pad: 32,
            min_keycode: 8,
            max_keycode: 255,
            vendor: "x11graphics null server".to_string(),
            pixmap_formats: vec![Format {
                depth: ROOT_DEPTH,
                bits_per_pixel: 32,
                scanline_pad: 32,
            }],
            roots: vec![Screen {
                root: Window::new(ROOT_WINDOW),
                default_colormap: Colormap::new(DEFAULT_COLORMAP),
                white_pixel: 0xffffff,
                black_pixel: 0x000000,
                current_input_masks: 0,
                width_in_pixels: SCREEN_WIDTH,
                height_in_pixels: SCREEN_HEIGHT,
                width_in_millimeters: 508,
                height_in_millimeters: 285,
                min_installed_maps: 1,
                max_installed_maps: 1,
                root_visual: VisualID::new(ROOT_VISUAL),
                backing_stores: 0,
                save_unders: false,
                root_depth: ROOT_DEPTH,
                allowed_depths: vec![Depth {
                    depth: ROOT_DEPTH,
                    visuals: vec![VisualType {
                        visual_id: VisualID::new(ROOT_VISUAL),
                        class: 4, // TrueColor
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

    fn is_drawable(&self, window: Window) -> bool {
        window.id().get() == ROOT_WINDOW || self.windows.contains_key(&window)
    }

    /// Apply one request; returns the reply or error bytes, empty if none
    fn handle(&mut self, client: u32, sequence: u16, byte_order: ByteOrder, request: Request) -> Vec<u8> {
        let encoder = ProtocolEncoder::new(byte_order);
        match self.apply(client, sequence, &encoder, &request) {
            Ok(reply) => reply,
            Err(error) => {
                log::debug!("Null server rejected {:?}: {}", request.opcode(), error);
                error.encode(byte_order)
            }
        }
    }

    fn apply(
        &mut self,
        client: u32,
        seq: u16,
        encoder: &ProtocolEncoder,
        request: &Request,
    ) -> X11Result<Vec<u8>> {
        let op = request.opcode() as u8;
        match request {
            Request::CreateWindow(req) => {
                if req.width == 0 || req.height == 0 {
                    return Err(X11Error::bad_value(seq, 0, op));
                }
                self.check_id_choice(client, req.wid.id(), seq, op)?;
                if !self.is_drawable(req.parent) {
                    return Err(X11Error::bad_window(seq, req.parent, op));
                }
                self.windows.insert(
                    req.wid,
                    WindowState {
                        owner: client,
                        parent: req.parent,
                        x: req.x,
                        y: req.y,
                        width: req.width,
                        height: req.height,
                        mapped: false,
                        background_pixel: req.background_pixel,
                        event_mask: req.event_mask.unwrap_or(0),
                        title: String::new(),
                    },
                );
            }
            Request::ChangeWindowAttributes(req) => {
                let info = self.window_mut(req.window, seq, op)?;
                if let Some(pixel) = req.background_pixel {
                    info.background_pixel = Some(pixel);
                }
                if let Some(mask) = req.event_mask {
                    info.event_mask = mask;
                }
            }
            Request::DestroyWindow(window) => {
                self.windows
                    .remove(window)
                    .ok_or_else(|| X11Error::bad_window(seq, *window, op))?;
                self.windows.retain(|_, info| info.parent != *window);
            }
            Request::MapWindow(window) => self.window_mut(*window, seq, op)?.mapped = true,
            Request::UnmapWindow(window) => self.window_mut(*window, seq, op)?.mapped = false,
            Request::GetGeometry(drawable) => {
                if drawable.id().get() == ROOT_WINDOW {
                    return Ok(encoder.encode_get_geometry_reply(
                        seq,
                        ROOT_DEPTH,
                        *drawable,
                        0,
                        0,
                        SCREEN_WIDTH,
                        SCREEN_HEIGHT,
                        0,
                    ));
                }
                let info = self
                    .windows
                    .get(drawable)
                    .ok_or_else(|| X11Error::bad_drawable(seq, drawable.id(), op))?;
                return Ok(encoder.encode_get_geometry_reply(
                    seq,
                    ROOT_DEPTH,
                    Window::new(ROOT_WINDOW),
                    info.x,
                    info.y,
                    info.width,
                    info.height,
                    0,
                ));
            }
            Request::ChangeProperty(req) => {
                let info = self.window_mut(req.window, seq, op)?;
                if req.property == Atom::WM_NAME {
                    let text = String::from_utf8_lossy(&req.data);
                    match req.mode {
                        PropMode::Replace => info.title = text.to_string(),
                        PropMode::Prepend => info.title.insert_str(0, &text),
                        PropMode::Append => info.title.push_str(&text),
                    }
                }
            }
            Request::GetInputFocus => {
                return Ok(encoder.encode_get_input_focus_reply(seq, Window::new(ROOT_WINDOW), 1));
            }
            Request::CreateGC(req) => {
                self.check_id_choice(client, req.cid.id(), seq, op)?;
                if !self.is_drawable(req.drawable) {
                    return Err(X11Error::bad_drawable(seq, req.drawable.id(), op));
                }
                self.contexts.insert(
                    req.cid,
                    ContextState {
                        owner: client,
                        drawable: req.drawable,
                        foreground: req.foreground.unwrap_or(0),
                        background: req.background.unwrap_or(1),
                    },
                );
            }
            Request::ChangeGC(req) => {
                let gc = self
                    .contexts
                    .get_mut(&req.gc)
                    .ok_or_else(|| X11Error::bad_gc(seq, req.gc, op))?;
                if let Some(pixel) = req.foreground {
                    gc.foreground = pixel;
                }
                if let Some(pixel) = req.background {
                    gc.background = pixel;
                }
            }
            Request::FreeGC(gc) => {
                self.contexts
                    .remove(gc)
                    .ok_or_else(|| X11Error::bad_gc(seq, *gc, op))?;
            }
            Request::PolyRectangle(req) | Request::PolyFillRectangle(req) => {
                if !self.is_drawable(req.drawable) {
                    return Err(X11Error::bad_drawable(seq, req.drawable.id(), op));
                }
                let gc = self
                    .contexts
                    .get(&req.gc)
                    .ok_or_else(|| X11Error::bad_gc(seq, req.gc, op))?;
                let kind = match request {
                    Request::PolyFillRectangle(_) => DrawKind::Fill,
                    _ => DrawKind::Outline,
                };
                let foreground = gc.foreground;
                self.drawings.extend(req.rectangles.iter().map(|rect| DrawOp {
                    kind,
                    drawable: req.drawable,
                    foreground,
                    rect: *rect,
                }));
            }
            Request::AllocColor(req) => {
                if req.colormap.id().get() != DEFAULT_COLORMAP {
                    return Err(X11Error::bad_colormap(seq, req.colormap, op));
                }
                let pixel = match self.color_policy {
                    ColorPolicy::TrueColor => {
                        ((req.red as u32 >> 8) << 16)
                            | ((req.green as u32 >> 8) << 8)
                            | (req.blue as u32 >> 8)
                    }
                    ColorPolicy::EchoRed => req.red as u32,
                    ColorPolicy::Exhausted => return Err(X11Error::bad_alloc(seq, op)),
                };
                return Ok(encoder.encode_alloc_color_reply(seq, req.red, req.green, req.blue, pixel));
            }
            Request::NoOperation => {}
        }
        Ok(Vec::new())
    }

    fn window_mut(&mut self, window: Window, seq: u16, op: u8) -> X11Result<&mut WindowState> {
        self.windows
            .get_mut(&window)
            .ok_or_else(|| X11Error::bad_window(seq, window, op))
    }

    /// Ids must come from the client's range and be unused
    fn check_id_choice(&self, client: u32, id: XID, seq: u16, op: u8) -> X11Result<()> {
        let raw = id.get();
        let in_range = raw & !RESOURCE_ID_MASK == client << CLIENT_ID_SHIFT;
        let in_use = self.windows.contains_key(&Window(id)) || self.contexts.contains_key(&GContext(id));
        if !in_range || in_use {
            return Err(X11Error::bad_id_choice(seq, raw, op));
        }
        Ok(())
    }

    /// Free whatever a departing client left behind
    fn release_client(&mut self, client: u32) {
        self.clients.remove(&client);
        self.windows.retain(|_, info| info.owner != client);
        self.contexts.retain(|_, gc| gc.owner != client);
    }
}

/// One client connection to a [`NullServer`]
pub struct NullTransport {
    state: Rc<RefCell<ServerState>>,
    client: u32,
    inbound: Vec<u8>,
    setup_done: bool,
    shut_down: bool,
    read_timeout: Option<Duration>,
}

impl NullTransport {
    pub fn client_id(&self) -> u32 {
        self.client
    }

    /// Timeout last requested by the session
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    fn check_open(&self) -> io::Result<()> {
        if self.shut_down {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport shut down"));
        }
        if self.state.borrow().disconnected {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "null server disconnected",
            ));
        }
        Ok(())
    }

    fn process_setup(&mut self) -> io::Result<()> {
        let total = match SetupRequest::encoded_len(&self.inbound) {
            Some(total) if self.inbound.len() >= total => total,
            Some(_) => return Ok(()),
            None if self.inbound.len() >= 12 => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "bad setup request"))
            }
            None => return Ok(()),
        };
        let request = SetupRequest::parse(&self.inbound[..total])?;
        self.inbound.drain(..total);
        self.setup_done = true;

        let mut state = self.state.borrow_mut();
        let response = match &state.refusal {
            Some(reason) => SetupResponse::Failed(SetupFailed {
                protocol_major_version: PROTOCOL_MAJOR_VERSION,
                protocol_minor_version: PROTOCOL_MINOR_VERSION,
                reason: reason.clone(),
            }),
            None => SetupResponse::Success(state.setup_success(self.client)),
        };
        log::debug!(
            "Null server setup for client {} ({:?})",
            self.client,
            request.byte_order
        );
        state.clients.insert(
            self.client,
            ClientState {
                byte_order: request.byte_order,
                sequence: 0,
                outbound: response.encode(request.byte_order).into(),
            },
        );
        Ok(())
    }

    fn process_requests(&mut self) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let (byte_order, mut sequence) = match state.clients.get(&self.client) {
            Some(client) => (client.byte_order, client.sequence),
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "setup refused")),
        };
        let parser = ProtocolParser::new(byte_order);

        let mut replies = Vec::new();
        while let Some(len) = parser.request_len(&self.inbound) {
            if len < 4 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "zero-length request"));
            }
            if self.inbound.len() < len {
                break;
            }
            let bytes: Vec<u8> = self.inbound.drain(..len).collect();
            sequence = sequence.wrapping_add(1);

            match parser.parse_request(&bytes, sequence) {
                Ok(request) => {
                    state.requests.push(request.clone());
                    state.raw_requests.push(bytes);
                    let reply = state.handle(self.client, sequence, byte_order, request);
                    replies.extend(reply);
                }
                Err(error) => replies.extend(error.encode(byte_order)),
            }
        }

        if state.stalled {
            replies.clear();
        }
        if let Some(client) = state.clients.get_mut(&self.client) {
            client.sequence = sequence;
            client.outbound.extend(replies);
        }
        Ok(())
    }
}

impl Read for NullTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_open()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let n = match self.state.borrow_mut().clients.get_mut(&self.client) {
            Some(client) => {
                let n = buf.len().min(client.outbound.len());
                for (slot, byte) in buf.iter_mut().zip(client.outbound.drain(..n)) {
                    *slot = byte;
                }
                n
            }
            None => 0,
        };
        if n > 0 {
            return Ok(n);
        }

        // Nothing can arrive while the only client is blocked in read
        match self.read_timeout {
            Some(timeout) => {
                std::thread::sleep(timeout);
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "null server reply timed out",
                ))
            }
            None => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "null server has nothing to send",
            )),
        }
    }
}

impl Write for NullTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        self.inbound.extend_from_slice(buf);
        if !self.setup_done {
            self.process_setup()?;
        }
        if self.setup_done {
            self.process_requests()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()
    }
}

impl Transport for NullTransport {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.shut_down = true;
        self.state.borrow_mut().release_client(self.client);
        log::debug!("Null server client {} disconnected", self.client);
        Ok(())
    }
}

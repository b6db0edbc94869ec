//! X11 protocol requests
//!
//! Request opcodes and the structured form of every request the backend
//! issues. The encoder turns these into bytes; the parser turns bytes back
//! into these (used by the in-process server).

use super::types::*;

/// X11 request opcodes used by the graphics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestOpcode {
    CreateWindow = 1,
    ChangeWindowAttributes = 2,
    DestroyWindow = 4,
    MapWindow = 8,
    UnmapWindow = 10,
    GetGeometry = 14,
    ChangeProperty = 18,
    GetInputFocus = 43,
    CreateGC = 55,
    ChangeGC = 56,
    FreeGC = 60,
    PolyRectangle = 67,
    PolyFillRectangle = 70,
    AllocColor = 84,
    NoOperation = 127,
}

impl RequestOpcode {
    pub fn from_u8(opcode: u8) -> Option<Self> {
        match opcode {
            1 => Some(RequestOpcode::CreateWindow),
            2 => Some(RequestOpcode::ChangeWindowAttributes),
            4 => Some(RequestOpcode::DestroyWindow),
            8 => Some(RequestOpcode::MapWindow),
            10 => Some(RequestOpcode::UnmapWindow),
            14 => Some(RequestOpcode::GetGeometry),
            18 => Some(RequestOpcode::ChangeProperty),
            43 => Some(RequestOpcode::GetInputFocus),
            55 => Some(RequestOpcode::CreateGC),
            56 => Some(RequestOpcode::ChangeGC),
            60 => Some(RequestOpcode::FreeGC),
            67 => Some(RequestOpcode::PolyRectangle),
            70 => Some(RequestOpcode::PolyFillRectangle),
            84 => Some(RequestOpcode::AllocColor),
            127 => Some(RequestOpcode::NoOperation),
            _ => None,
        }
    }

    /// Whether the server answers this request with a reply
    pub fn has_reply(&self) -> bool {
        matches!(
            self,
            RequestOpcode::GetGeometry | RequestOpcode::GetInputFocus | RequestOpcode::AllocColor
        )
    }
}

/// Structured X11 request
#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CreateWindow(CreateWindowRequest),
    ChangeWindowAttributes(ChangeWindowAttributesRequest),
    DestroyWindow(Window),
    MapWindow(Window),
    UnmapWindow(Window),
    GetGeometry(Window),
    ChangeProperty(ChangePropertyRequest),
    GetInputFocus,
    CreateGC(CreateGCRequest),
    ChangeGC(ChangeGCRequest),
    FreeGC(GContext),
    PolyRectangle(PolyRectangleRequest),
    PolyFillRectangle(PolyRectangleRequest),
    AllocColor(AllocColorRequest),
    NoOperation,
}

impl Request {
    pub fn opcode(&self) -> RequestOpcode {
        match self {
            Request::CreateWindow(_) => RequestOpcode::CreateWindow,
            Request::ChangeWindowAttributes(_) => RequestOpcode::ChangeWindowAttributes,
            Request::DestroyWindow(_) => RequestOpcode::DestroyWindow,
            Request::MapWindow(_) => RequestOpcode::MapWindow,
            Request::UnmapWindow(_) => RequestOpcode::UnmapWindow,
            Request::GetGeometry(_) => RequestOpcode::GetGeometry,
            Request::ChangeProperty(_) => RequestOpcode::ChangeProperty,
            Request::GetInputFocus => RequestOpcode::GetInputFocus,
            Request::CreateGC(_) => RequestOpcode::CreateGC,
            Request::ChangeGC(_) => RequestOpcode::ChangeGC,
            Request::FreeGC(_) => RequestOpcode::FreeGC,
            Request::PolyRectangle(_) => RequestOpcode::PolyRectangle,
            Request::PolyFillRectangle(_) => RequestOpcode::PolyFillRectangle,
            Request::AllocColor(_) => RequestOpcode::AllocColor,
            Request::NoOperation => RequestOpcode::NoOperation,
        }
    }
}

/// Create window request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWindowRequest {
    pub depth: u8,
    pub wid: Window,
    pub parent: Window,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub class: WindowClass,
    pub visual: VisualID,
    pub background_pixel: Option<u32>,
    pub event_mask: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeWindowAttributesRequest {
    pub window: Window,
    pub background_pixel: Option<u32>,
    pub event_mask: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePropertyRequest {
    pub mode: PropMode,
    pub window: Window,
    pub property: Atom,
    pub type_: Atom,
    pub format: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGCRequest {
    pub cid: GContext,
    pub drawable: Window,
    pub foreground: Option<u32>,
    pub background: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeGCRequest {
    pub gc: GContext,
    pub foreground: Option<u32>,
    pub background: Option<u32>,
}

/// Shared by PolyRectangle and PolyFillRectangle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyRectangleRequest {
    pub drawable: Window,
    pub gc: GContext,
    pub rectangles: Vec<Rectangle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocColorRequest {
    pub colormap: Colormap,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

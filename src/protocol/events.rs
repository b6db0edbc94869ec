//! X11 protocol events
//!
//! Events are sent from the server to clients to notify them of user input
//! and window state changes. Only the event kinds an input listener can ask
//! for are decoded; everything else is kept as its raw code.

use super::types::*;
use super::wire::{WireReader, WireWriter};
use std::io;

/// Event type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    KeyPress = 2,
    KeyRelease = 3,
    ButtonPress = 4,
    ButtonRelease = 5,
    MotionNotify = 6,
    Expose = 12,
    ConfigureNotify = 22,
}

impl EventType {
    pub fn from_u8(code: u8) -> Option<Self> {
        // Bit 7 flags events generated by SendEvent
        match code & 0x7f {
            2 => Some(EventType::KeyPress),
            3 => Some(EventType::KeyRelease),
            4 => Some(EventType::ButtonPress),
            5 => Some(EventType::ButtonRelease),
            6 => Some(EventType::MotionNotify),
            12 => Some(EventType::Expose),
            22 => Some(EventType::ConfigureNotify),
            _ => None,
        }
    }
}

/// Pointer or keyboard input sharing the KeyPress/ButtonPress layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerInput {
    /// Keycode for key events, button number for button events
    pub detail: u8,
    pub time: u32,
    pub window: Window,
    pub x: i16,
    pub y: i16,
    pub state: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposeEvent {
    pub window: Window,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureNotifyEvent {
    pub window: Window,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// Decoded server event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyPress(PointerInput),
    KeyRelease(PointerInput),
    ButtonPress(PointerInput),
    ButtonRelease(PointerInput),
    Motion(PointerInput),
    Expose(ExposeEvent),
    Configure(ConfigureNotifyEvent),
    Other { code: u8 },
}

impl InputEvent {
    pub fn event_type(&self) -> Option<EventType> {
        match self {
            InputEvent::KeyPress(_) => Some(EventType::KeyPress),
            InputEvent::KeyRelease(_) => Some(EventType::KeyRelease),
            InputEvent::ButtonPress(_) => Some(EventType::ButtonPress),
            InputEvent::ButtonRelease(_) => Some(EventType::ButtonRelease),
            InputEvent::Motion(_) => Some(EventType::MotionNotify),
            InputEvent::Expose(_) => Some(EventType::Expose),
            InputEvent::Configure(_) => Some(EventType::ConfigureNotify),
            InputEvent::Other { .. } => None,
        }
    }

    /// The event-mask bit a window must select to receive this event
    pub fn mask(&self) -> u32 {
        match self {
            InputEvent::KeyPress(_) => event_mask::KEY_PRESS,
            InputEvent::KeyRelease(_) => event_mask::KEY_RELEASE,
            InputEvent::ButtonPress(_) => event_mask::BUTTON_PRESS,
            InputEvent::ButtonRelease(_) => event_mask::BUTTON_RELEASE,
            InputEvent::Motion(_) => event_mask::POINTER_MOTION,
            InputEvent::Expose(_) => event_mask::EXPOSURE,
            InputEvent::Configure(_) => event_mask::STRUCTURE_NOTIFY,
            InputEvent::Other { .. } => event_mask::NO_EVENT,
        }
    }

    /// Decode a 32-byte event packet
    pub fn decode(packet: &[u8], byte_order: ByteOrder) -> io::Result<Self> {
        let mut r = WireReader::new(byte_order, packet);
        let code = r.u8()?;
        let detail = r.u8()?;
        let _sequence = r.u16()?;

        let kind = match EventType::from_u8(code) {
            Some(kind) => kind,
            None => return Ok(InputEvent::Other { code: code & 0x7f }),
        };

        let event = match kind {
            EventType::KeyPress
            | EventType::KeyRelease
            | EventType::ButtonPress
            | EventType::ButtonRelease
            | EventType::MotionNotify => {
                let time = r.u32()?;
                let _root = r.u32()?;
                let window = Window::new(r.u32()?);
                let _child = r.u32()?;
                let _root_x = r.i16()?;
                let _root_y = r.i16()?;
                let x = r.i16()?;
                let y = r.i16()?;
                let state = r.u16()?;
                let input = PointerInput {
                    detail,
                    time,
                    window,
                    x,
                    y,
                    state,
                };
                match kind {
                    EventType::KeyPress => InputEvent::KeyPress(input),
                    EventType::KeyRelease => InputEvent::KeyRelease(input),
                    EventType::ButtonPress => InputEvent::ButtonPress(input),
                    EventType::ButtonRelease => InputEvent::ButtonRelease(input),
                    _ => InputEvent::Motion(input),
                }
            }
            EventType::Expose => InputEvent::Expose(ExposeEvent {
                window: Window::new(r.u32()?),
                x: r.u16()?,
                y: r.u16()?,
                width: r.u16()?,
                height: r.u16()?,
                count: r.u16()?,
            }),
            EventType::ConfigureNotify => {
                let _event = r.u32()?;
                let window = Window::new(r.u32()?);
                let _above_sibling = r.u32()?;
                InputEvent::Configure(ConfigureNotifyEvent {
                    window,
                    x: r.i16()?,
                    y: r.i16()?,
                    width: r.u16()?,
                    height: r.u16()?,
                })
            }
        };
        Ok(event)
    }

    /// Encode event to wire format (32 bytes)
    pub fn encode(&self, sequence: u16, byte_order: ByteOrder) -> Vec<u8> {
        let mut w = WireWriter::new(byte_order);
        match self {
            InputEvent::KeyPress(input)
            | InputEvent::KeyRelease(input)
            | InputEvent::ButtonPress(input)
            | InputEvent::ButtonRelease(input)
            | InputEvent::Motion(input) => {
                let code = self.event_type().map(|t| t as u8).unwrap_or(0);
                w.u8(code)
                    .u8(input.detail)
                    .u16(sequence)
                    .u32(input.time)
                    .u32(0) // root
                    .u32(input.window.id().get())
                    .u32(0) // child
                    .i16(input.x)
                    .i16(input.y)
                    .i16(input.x)
                    .i16(input.y)
                    .u16(input.state)
                    .u8(1); // same_screen
            }
            InputEvent::Expose(e) => {
                w.u8(EventType::Expose as u8)
                    .u8(0)
                    .u16(sequence)
                    .u32(e.window.id().get())
                    .u16(e.x)
                    .u16(e.y)
                    .u16(e.width)
                    .u16(e.height)
                    .u16(e.count);
            }
            InputEvent::Configure(e) => {
                w.u8(EventType::ConfigureNotify as u8)
                    .u8(0)
                    .u16(sequence)
                    .u32(e.window.id().get())
                    .u32(e.window.id().get())
                    .u32(0) // above sibling
                    .i16(e.x)
                    .i16(e.y)
                    .u16(e.width)
                    .u16(e.height);
            }
            InputEvent::Other { code } => {
                w.u8(*code).u8(0).u16(sequence);
            }
        }
        let missing = 32usize.saturating_sub(w.len());
        w.zeros(missing);
        w.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_press_fields() {
        let event = InputEvent::ButtonPress(PointerInput {
            detail: 1,
            time: 1000,
            window: Window::new(0x00200001),
            x: 12,
            y: -4,
            state: 0,
        });
        let packet = event.encode(9, ByteOrder::LSBFirst);
        assert_eq!(packet.len(), 32);
        assert_eq!(packet[0], 4);
        assert_eq!(InputEvent::decode(&packet, ByteOrder::LSBFirst).unwrap(), event);
    }

    #[test]
    fn test_send_event_flag_is_ignored() {
        let event = InputEvent::Expose(ExposeEvent {
            window: Window::new(5),
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            count: 0,
        });
        let mut packet = event.encode(1, ByteOrder::MSBFirst);
        packet[0] |= 0x80;
        assert_eq!(InputEvent::decode(&packet, ByteOrder::MSBFirst).unwrap(), event);
    }

    #[test]
    fn test_unknown_events_keep_code() {
        let mut packet = vec![0u8; 32];
        packet[0] = 28; // PropertyNotify
        assert_eq!(
            InputEvent::decode(&packet, ByteOrder::LSBFirst).unwrap(),
            InputEvent::Other { code: 28 }
        );
    }
}

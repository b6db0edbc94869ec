/// End-to-end scenarios against the in-process null server
///
/// Each test opens a real session over a NullTransport, so every request goes
/// through the encoder, the server-side parser and back.

use std::cell::RefCell;
use std::rc::Rc;

use x11graphics::error::{ConnectionFailure, RoundTripFailure};
use x11graphics::geometry::{wire_channel, DEFAULT_HEIGHT, DEFAULT_WIDTH, DEFAULT_X, DEFAULT_Y};
use x11graphics::protocol::{event_mask, ErrorCode, ExposeEvent, PointerInput};
use x11graphics::server::{ColorPolicy, DrawKind, NullServer, NullTransport};
use x11graphics::{
    Color, Dimension, Graphics, GraphicsError, InputEvent, InputListener, PixelValue, Rectangle,
    Session, SessionOptions, X11Graphics,
};

fn open(server: &NullServer) -> Session<NullTransport> {
    Session::with_transport(server.connect(), SessionOptions::default()).unwrap()
}

fn default_graphics(server: &NullServer) -> X11Graphics<NullTransport> {
    X11Graphics::with_session(open(server), DEFAULT_X, DEFAULT_Y, DEFAULT_WIDTH, DEFAULT_HEIGHT)
        .unwrap()
}

#[test]
fn fresh_default_window_reports_its_size() {
    let server = NullServer::new();
    let mut graphics = default_graphics(&server);
    assert_eq!(
        graphics.window_size().unwrap(),
        Dimension {
            width: 400,
            height: 350
        }
    );
    let state = server.window(graphics.window().id()).unwrap();
    assert_eq!((state.x, state.y), (50, 50));
}

#[test]
fn red_allocation_echoes_widened_channel() {
    let server = NullServer::new();
    server.set_color_policy(ColorPolicy::EchoRed);
    let mut session = open(&server);
    let pixel = session.alloc_color(Color::new(255, 0, 0)).unwrap();
    assert_eq!(pixel, PixelValue(0xFF00));
    assert_eq!(pixel.get(), 65280);
}

#[test]
fn channel_widening_is_reversible() {
    for channel in 0..=255u8 {
        let wire = wire_channel(channel);
        assert_eq!(wire, (channel as u16) << 8);
        assert_eq!((wire >> 8) as u8, channel);
    }
}

#[test]
fn bordered_rect_leaves_foreground_black() {
    let server = NullServer::new();
    let mut graphics = default_graphics(&server);

    for start in [Color::new(250, 220, 60), Color::WHITE, Color::BLACK] {
        graphics.set_fg_color(start).unwrap();
        graphics.draw_bordered_rect(10, 10, 50, 40).unwrap();
        graphics.session_mut().sync().unwrap();

        let gc = server.context(graphics.context().id()).unwrap();
        assert_eq!(gc.foreground, graphics.session().screen().black_pixel);
    }

    let drawings = server.drawings();
    assert_eq!(drawings[0].kind, DrawKind::Fill);
    assert_eq!(drawings[0].foreground, 0xfadc3c);
    assert_eq!(drawings[1].kind, DrawKind::Outline);
    assert_eq!(drawings[1].foreground, 0x000000);
}

/// Bytes of every request `draw` sends
fn capture(
    server: &NullServer,
    graphics: &mut X11Graphics<NullTransport>,
    draw: impl FnOnce(&mut X11Graphics<NullTransport>),
) -> Vec<Vec<u8>> {
    graphics.session_mut().flush().unwrap();
    server.clear_requests();
    draw(graphics);
    graphics.session_mut().flush().unwrap();
    server.raw_requests()
}

#[test]
fn rectangle_overloads_send_identical_bytes() {
    let server = NullServer::new();
    let mut graphics = default_graphics(&server);
    let rect = Rectangle::new(-5, 7, 30, 20);

    let by_fields = capture(&server, &mut graphics, |g| g.draw_rect(-5, 7, 30, 20).unwrap());
    let by_rect = capture(&server, &mut graphics, |g| g.draw_rect_from(&rect).unwrap());
    assert_eq!(by_fields.len(), 1);
    assert_eq!(by_fields, by_rect);

    let by_fields = capture(&server, &mut graphics, |g| g.draw_border(-5, 7, 30, 20).unwrap());
    let by_rect = capture(&server, &mut graphics, |g| g.draw_border_from(&rect).unwrap());
    assert_eq!(by_fields.len(), 1);
    assert_eq!(by_fields, by_rect);

    let by_fields = capture(&server, &mut graphics, |g| {
        g.draw_bordered_rect(-5, 7, 30, 20).unwrap()
    });
    let by_rect = capture(&server, &mut graphics, |g| {
        g.draw_bordered_rect_from(&rect).unwrap()
    });
    assert_eq!(by_fields.len(), 4);
    assert_eq!(by_fields, by_rect);
}

#[test]
fn resource_ids_strictly_increase() {
    let server = NullServer::new();
    let mut session = open(&server);
    let mut previous = session.new_id().unwrap();
    for _ in 0..10_000 {
        let id = session.new_id().unwrap();
        assert!(id > previous);
        previous = id;
    }
}

#[test]
fn handles_from_a_closed_session_are_rejected() {
    let server = NullServer::new();
    let mut first = open(&server);
    let window = first.create_window(0, 0, 100, 100).unwrap();
    let gc = first.create_context(&window).unwrap();
    first.close().unwrap();

    let mut second = open(&server);
    match second.outline_rect(&window, &gc, 0, 0, 10, 10) {
        Err(GraphicsError::InvalidResource(id)) => assert_eq!(id, window.id().id()),
        other => panic!("expected InvalidResource, got {:?}", other),
    }
    second.flush().unwrap();
    assert!(server.drawings().is_empty());
}

#[test]
fn exhausted_colormap_is_an_allocation_error() {
    let server = NullServer::new();
    let mut graphics = default_graphics(&server);
    graphics.session_mut().flush().unwrap();
    server.set_color_policy(ColorPolicy::Exhausted);
    server.clear_requests();

    match graphics.set_fg_color(Color::new(1, 2, 3)) {
        Err(GraphicsError::Allocation {
            color,
            cause: RoundTripFailure::Server(e),
        }) => {
            assert_eq!(color, Color::new(1, 2, 3));
            assert_eq!(e.code, ErrorCode::Alloc);
        }
        other => panic!("expected allocation error, got {:?}", other),
    }

    // Nothing is drawn with an undefined pixel
    graphics.session_mut().flush().unwrap();
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn dropped_connection_fails_the_size_query() {
    let server = NullServer::new();
    let mut graphics = default_graphics(&server);
    graphics.session_mut().flush().unwrap();
    server.disconnect();

    match graphics.window_size() {
        Err(GraphicsError::GeometryQuery {
            resource,
            cause: RoundTripFailure::Connection(ConnectionFailure::Io(_)),
        }) => assert_eq!(resource, graphics.window().id().id()),
        other => panic!("expected geometry query error, got {:?}", other),
    }
}

#[test]
fn vanished_window_fails_the_size_query() {
    let server = NullServer::new();
    let mut session = open(&server);
    let window = session.create_window(0, 0, 10, 10).unwrap();
    session.flush().unwrap();
    assert!(server.remove_window(window.id()));

    match session.window_size(&window) {
        Err(GraphicsError::GeometryQuery {
            cause: RoundTripFailure::Server(e),
            ..
        }) => assert_eq!(e.code, ErrorCode::Drawable),
        other => panic!("expected geometry query error, got {:?}", other),
    }
}

struct Recorder {
    mask: u32,
    seen: Rc<RefCell<Vec<InputEvent>>>,
}

impl InputListener for Recorder {
    fn on_event(&mut self, event: &InputEvent) {
        self.seen.borrow_mut().push(*event);
    }

    fn event_mask(&self) -> u32 {
        self.mask
    }
}

#[test]
fn listeners_receive_selected_events_in_order() {
    let server = NullServer::new();
    let mut graphics = default_graphics(&server);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let clicks = graphics
        .add_input_listener(Box::new(Recorder {
            mask: event_mask::BUTTON_PRESS,
            seen: Rc::clone(&seen),
        }))
        .unwrap();
    graphics
        .add_input_listener(Box::new(Recorder {
            mask: event_mask::BUTTON_PRESS | event_mask::EXPOSURE,
            seen: Rc::clone(&seen),
        }))
        .unwrap();
    graphics.start_listening().unwrap();

    let window = graphics.window().id();
    let press = InputEvent::ButtonPress(PointerInput {
        detail: 1,
        time: 42,
        window,
        x: 12,
        y: 34,
        state: 0,
    });
    let expose = InputEvent::Expose(ExposeEvent {
        window,
        x: 0,
        y: 0,
        width: 400,
        height: 350,
        count: 0,
    });
    assert!(server.inject_event(window, press));
    assert!(server.inject_event(window, expose));

    assert_eq!(graphics.pump_events().unwrap(), 3);
    assert_eq!(*seen.borrow(), vec![press, press, expose]);

    seen.borrow_mut().clear();
    assert!(graphics.remove_input_listener(clicks).unwrap().is_some());
    assert!(server.inject_event(window, press));
    assert_eq!(graphics.pump_events().unwrap(), 1);
    assert_eq!(*seen.borrow(), vec![press]);
}

#[test]
fn unselected_events_are_not_delivered() {
    let server = NullServer::new();
    let mut graphics = default_graphics(&server);
    graphics.start_listening().unwrap();
    let window = graphics.window().id();
    let key = InputEvent::KeyPress(PointerInput {
        detail: 38,
        time: 1,
        window,
        x: 0,
        y: 0,
        state: 0,
    });
    assert!(!server.inject_event(window, key));
    assert_eq!(graphics.pump_events().unwrap(), 0);
}

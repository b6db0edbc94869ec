/// A real socket to a server that completes setup and then goes silent
///
/// The server thread relays the handshake through a NullServer and then
/// swallows every request without answering.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use x11graphics::connection::Connection;
use x11graphics::protocol::SetupRequest;
use x11graphics::server::NullServer;
use x11graphics::{
    Color, ConnectionFailure, GraphicsError, RoundTripFailure, Session, SessionOptions,
};

fn silent_server(listener: TcpListener) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let server = NullServer::new();
        let mut transport = server.connect();
        let mut chunk = [0u8; 256];

        let mut setup = Vec::new();
        while !SetupRequest::encoded_len(&setup).is_some_and(|len| setup.len() >= len) {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "client hung up during setup");
            setup.extend_from_slice(&chunk[..n]);
        }
        transport.write_all(&setup).unwrap();

        let mut response = Vec::new();
        loop {
            match transport.read(&mut chunk) {
                Ok(n) => response.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => panic!("null server failed: {}", e),
            }
        }
        stream.write_all(&response).unwrap();

        while let Ok(n) = stream.read(&mut chunk) {
            if n == 0 {
                break;
            }
        }
    })
}

#[test]
fn silent_server_times_out_color_allocation() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = silent_server(listener);

    let stream = TcpStream::connect(addr).unwrap();
    let options = SessionOptions::default().with_reply_timeout(Duration::from_millis(100));
    let mut session = Session::with_transport(Connection::Tcp(stream), options).unwrap();

    let started = Instant::now();
    match session.alloc_color(Color::new(1, 2, 3)) {
        Err(GraphicsError::Allocation {
            cause: RoundTripFailure::Connection(ConnectionFailure::Io(e)),
            ..
        }) => assert!(matches!(
            e.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        )),
        other => panic!("expected a timed out allocation, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(5));

    drop(session);
    server.join().unwrap();
}

//! x11graphics - Demo entry point
//!
//! Opens a window on the X server named by `-display` or `$DISPLAY` and
//! draws a few rectangles.

use std::env;
use std::process;
use std::time::Duration;

use x11graphics::connection::Transport;
use x11graphics::geometry::{DEFAULT_HEIGHT, DEFAULT_WIDTH, DEFAULT_X, DEFAULT_Y};
use x11graphics::server::NullServer;
use x11graphics::{Color, Graphics, Rectangle, Session, SessionOptions, X11Graphics, VERSION};

fn print_usage() {
    println!("x11graphics v{}", VERSION);
    println!("Draws rectangles in an X11 window");
    println!();
    println!("Usage: x11graphics [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -display <name>       X display (default: $DISPLAY)");
    println!("  -geometry <WxH+X+Y>   Window geometry (default: 400x350+50+50)");
    println!("  -title <text>         Window title");
    println!("  -timeout <ms>         Give up on a server reply after this long");
    println!("  -null                 Draw against the built-in null server");
    println!("  -h, --help            Show this help message");
    println!();
}

#[derive(Debug)]
struct Config {
    display: Option<String>,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    title: String,
    timeout: Option<Duration>,
    null_server: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            display: None,
            x: DEFAULT_X,
            y: DEFAULT_Y,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            title: "x11graphics".to_string(),
            timeout: None,
            null_server: false,
        }
    }
}

/// `WxH`, optionally followed by `+X+Y`
fn parse_geometry(spec: &str) -> Option<(u16, u16, Option<(i16, i16)>)> {
    let (size, position) = match spec.find('+') {
        Some(at) => (&spec[..at], Some(&spec[at + 1..])),
        None => (spec, None),
    };
    let (width, height) = size.split_once('x')?;
    let width = width.parse().ok()?;
    let height = height.parse().ok()?;
    let position = match position {
        Some(position) => {
            let (x, y) = position.split_once('+')?;
            Some((x.parse().ok()?, y.parse().ok()?))
        }
        None => None,
    };
    Some((width, height, position))
}

fn parse_args() -> Result<Config, String> {
    let mut config = Config::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-display" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for -display".to_string());
                }
                config.display = Some(args[i].clone());
            }
            "-geometry" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for -geometry".to_string());
                }
                let (width, height, position) = parse_geometry(&args[i])
                    .ok_or_else(|| format!("Invalid geometry: {}", args[i]))?;
                config.width = width;
                config.height = height;
                if let Some((x, y)) = position {
                    config.x = x;
                    config.y = y;
                }
            }
            "-title" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for -title".to_string());
                }
                config.title = args[i].clone();
            }
            "-timeout" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for -timeout".to_string());
                }
                let ms: u64 = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid timeout: {}", args[i]))?;
                config.timeout = Some(Duration::from_millis(ms));
            }
            "-null" => {
                config.null_server = true;
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

fn draw_demo<T: Transport>(graphics: &mut X11Graphics<T>, title: &str) -> x11graphics::Result<()> {
    graphics.set_window_title(title)?;
    graphics.set_window_background(Color::WHITE)?;
    graphics.show_window()?;

    graphics.set_fg_color(Color::new(200, 40, 40))?;
    graphics.draw_rect(20, 20, 120, 80)?;
    graphics.set_fg_color(Color::new(40, 120, 200))?;
    graphics.draw_border(160, 20, 120, 80)?;
    graphics.set_fg_color(Color::new(250, 220, 60))?;
    graphics.draw_bordered_rect_from(&Rectangle::new(20, 120, 260, 100))?;

    let size = graphics.window_size()?;
    log::info!("Window size: {}x{}", size.width, size.height);
    Ok(())
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    let mut options = SessionOptions::default();
    if let Some(timeout) = config.timeout {
        options = options.with_reply_timeout(timeout);
    }

    log::info!("x11graphics v{}", VERSION);

    if config.null_server {
        let server = NullServer::new();
        let result = Session::with_transport(server.connect(), options).and_then(|session| {
            let mut graphics =
                X11Graphics::with_session(session, config.x, config.y, config.width, config.height)?;
            draw_demo(&mut graphics, &config.title)?;
            graphics.close()
        });
        if let Err(e) = result {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        log::info!(
            "Null server received {} requests, drew {} rectangles",
            server.requests().len(),
            server.drawings().len()
        );
        return;
    }

    let display = match config
        .display
        .clone()
        .or_else(|| env::var("DISPLAY").ok())
        .filter(|d| !d.trim().is_empty())
    {
        Some(display) => display,
        None => {
            eprintln!("Error: cannot connect: no display given and DISPLAY is not set");
            process::exit(1);
        }
    };

    log::info!("Display: {}", display);
    let mut graphics = match X11Graphics::connect(
        &display,
        options,
        config.x,
        config.y,
        config.width,
        config.height,
    ) {
        Ok(graphics) => graphics,
        Err(e) => {
            eprintln!("Error: cannot connect to {}: {}", display, e);
            process::exit(1);
        }
    };

    if let Err(e) = draw_demo(&mut graphics, &config.title) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    // Leave the window up long enough to be seen
    std::thread::sleep(Duration::from_secs(3));

    if let Err(e) = graphics.close() {
        log::warn!("Error while closing: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geometry() {
        assert_eq!(parse_geometry("640x480"), Some((640, 480, None)));
        assert_eq!(
            parse_geometry("400x350+50+60"),
            Some((400, 350, Some((50, 60))))
        );
        assert_eq!(parse_geometry("640"), None);
        assert_eq!(parse_geometry("640x480+5"), None);
        assert_eq!(parse_geometry("axb"), None);
    }
}

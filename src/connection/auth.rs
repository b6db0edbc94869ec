//! `.Xauthority` lookup
//!
//! Finds the MIT-MAGIC-COOKIE-1 entry for a display number so the setup
//! request can carry it.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

pub const MIT_MAGIC_COOKIE: &str = "MIT-MAGIC-COOKIE-1";

const FAMILY_INTERNET: u16 = 0x0000;
const FAMILY_LOCAL: u16 = 0x0100;
const FAMILY_WILD: u16 = 0xffff;

/// One authorization entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEntry {
    pub family: u16,
    pub address: Vec<u8>,
    pub display: String,
    pub name: String,
    pub data: Vec<u8>,
}

/// Path of the authority file: `$XAUTHORITY`, else `$HOME/.Xauthority`
pub fn authority_path() -> Option<PathBuf> {
    std::env::var_os("XAUTHORITY")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".Xauthority")))
}

fn read_counted(cursor: &mut Cursor<&[u8]>) -> io::Result<Vec<u8>> {
    let len = cursor.read_u16::<BigEndian>()? as usize;
    let mut out = vec![0u8; len];
    cursor.read_exact(&mut out)?;
    Ok(out)
}

/// Parse every entry in an authority file; a truncated tail is dropped
pub fn parse_entries(data: &[u8]) -> Vec<AuthEntry> {
    let mut cursor = Cursor::new(data);
    let mut entries = Vec::new();

    while (cursor.position() as usize) < data.len() {
        let entry = (|| -> io::Result<AuthEntry> {
            let family = cursor.read_u16::<BigEndian>()?;
            let address = read_counted(&mut cursor)?;
            let display = String::from_utf8_lossy(&read_counted(&mut cursor)?).to_string();
            let name = String::from_utf8_lossy(&read_counted(&mut cursor)?).to_string();
            let cookie = read_counted(&mut cursor)?;
            Ok(AuthEntry {
                family,
                address,
                display,
                name,
                data: cookie,
            })
        })();

        match entry {
            Ok(entry) => entries.push(entry),
            Err(_) => break,
        }
    }

    entries
}

/// Pick the cookie for a display number from parsed entries
pub fn find_cookie(entries: &[AuthEntry], display: u16) -> Option<(String, Vec<u8>)> {
    let wanted = display.to_string();
    entries
        .iter()
        .filter(|e| matches!(e.family, FAMILY_LOCAL | FAMILY_INTERNET | FAMILY_WILD))
        .filter(|e| e.display.is_empty() || e.display == wanted)
        .find(|e| e.name == MIT_MAGIC_COOKIE)
        .map(|e| (e.name.clone(), e.data.clone()))
}

/// Read the authority file and return the cookie for `display`, if any
pub fn lookup(display: u16) -> Option<(String, Vec<u8>)> {
    let path = authority_path()?;
    log::debug!("Reading auth from: {:?}", path);

    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("Could not read auth: {}", e);
            return None;
        }
    };

    let found = find_cookie(&parse_entries(&data), display);
    match &found {
        Some((name, data)) => log::debug!("Found auth: {} ({} bytes)", name, data.len()),
        None => log::debug!("No auth entry found for display {}", display),
    }
    found
}

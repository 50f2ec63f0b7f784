use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Splits `name(3).ext` into stem, counter and extension.
static NUMBERED_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)(?:\(([0-9]+)\))?(\.[^.]*)?$").unwrap());

/// Return a filename that doesn't collide with an existing file in `dir`.
///
/// Returns `desired` unchanged when it is free. Otherwise a parenthesised
/// counter is inserted before the extension (`foo.txt` -> `foo(1).txt`),
/// continuing from any counter already present (`foo(1).txt` -> `foo(2).txt`),
/// until an unused name is found.
///
/// Not atomic: another process may create the returned name before the caller
/// does.
pub fn unique_filename(dir: &Path, desired: &str) -> String {
    if !dir.join(desired).exists() {
        return desired.to_string();
    }

    let (mut stem, mut counter, ext) = split_numbered(desired);
    loop {
        counter = match counter.checked_add(1) {
            Some(next) => next,
            // Counter exhausted: keep it as part of the stem and start over.
            None => {
                stem = &desired[..desired.len() - ext.len()];
                1
            }
        };
        let candidate = format!("{}({}){}", stem, counter, ext);
        if !dir.join(&candidate).exists() {
            return candidate;
        }
    }
}

/// Split a filename into (stem, counter, extension). The counter is 0 when
/// the name carries none.
fn split_numbered(name: &str) -> (&str, u64, &str) {
    // The pattern matches every string.
    let Some(caps) = NUMBERED_NAME_RE.captures(name) else {
        return (name, 0, "");
    };
    let ext = caps.get(3).map_or("", |m| m.as_str());
    let stem_end = name.len() - ext.len();
    match caps.get(2).map(|m| m.as_str().parse::<u64>()) {
        Some(Ok(n)) => (caps.get(1).map_or("", |m| m.as_str()), n, ext),
        // No counter, or one that overflows u64 and so stays in the stem.
        _ => (&name[..stem_end], 0, ext),
    }
}

/// 32-bit FNV-1a over a sequence of byte strings, as if concatenated.
pub fn fnv1a_32<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let mut hash = OFFSET_BASIS;
    for part in parts {
        for &byte in part {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

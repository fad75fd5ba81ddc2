//! Name-collision resolution at the destination.

use tidefile_core::{FsError, LinkOption, Name, Path, fs};

/// Split a name into the part that gets numbered and the part kept after
/// the number.
///
/// Directories are numbered after the full name. Files are numbered before
/// the extension, where the extension starts at the last dot unless the
/// dot is the final byte: `b.txt -> (b, .txt)`, `.mp4 -> ("", .mp4)`.
fn split(name: &Name, is_dir: bool) -> (Vec<u8>, Vec<u8>) {
    let bytes = name.as_bytes();
    if is_dir {
        return (bytes.to_vec(), Vec::new());
    }
    match bytes.iter().rposition(|&b| b == b'.') {
        Some(i) if i + 1 < bytes.len() => (bytes[..i].to_vec(), bytes[i..].to_vec()),
        _ => (bytes.to_vec(), Vec::new()),
    }
}

/// The next candidate base after `base` collided.
///
/// `"a" -> "a 2"`, `"a 2" -> "a 3"`, `"" -> "2"`. A number that cannot be
/// incremented without overflow starts over with ` 2` appended to the full
/// base.
pub fn increment(base: &[u8]) -> Vec<u8> {
    if base.is_empty() {
        return b"2".to_vec();
    }
    if let Some((prefix, number)) = numbered(base)
        && let Some(next) = number.checked_add(1)
    {
        let mut out = prefix.to_vec();
        out.extend_from_slice(next.to_string().as_bytes());
        return out;
    }
    let mut out = base.to_vec();
    out.extend_from_slice(b" 2");
    out
}

/// Matches `<anything><whitespace><digits>`, returning the part up to and
/// including the whitespace and the parsed number.
fn numbered(base: &[u8]) -> Option<(&[u8], u64)> {
    let digits = base.iter().rev().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let split = base.len() - digits;
    let prefix = &base[..split];
    if !prefix.last().is_some_and(u8::is_ascii_whitespace) {
        return None;
    }
    // Digits are ASCII, so this is valid UTF-8.
    let number = std::str::from_utf8(&base[split..]).ok()?.parse().ok()?;
    Some((prefix, number))
}

/// The first name derived from `name` for which `taken` returns `false`.
/// `name` itself is tried first.
pub fn fresh_name(
    name: &Name,
    is_dir: bool,
    mut taken: impl FnMut(&[u8]) -> Result<bool, FsError>,
) -> Result<Vec<u8>, FsError> {
    let (mut base, last) = split(name, is_dir);
    loop {
        let mut candidate = base.clone();
        candidate.extend_from_slice(&last);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        base = increment(&base);
    }
}

/// A path in `dir` for an entry named `name` that does not exist yet.
///
/// Dangling symlinks count as existing.
pub fn fresh_destination(dir: &Path, name: &Name, is_dir: bool) -> Result<Path, FsError> {
    let fresh = fresh_name(name, is_dir, |candidate| {
        fs::exists(&dir.child(candidate), LinkOption::NoFollow)
    })?;
    Ok(dir.child(fresh))
}

//! Hex dump helper for raw characteristic payloads.

use core::fmt::Write;

/// Format bytes as space-separated `0x`-prefixed lowercase hex.
///
/// ```
/// use heartlink_types::hex::hex_dump;
///
/// assert_eq!(hex_dump(&[0x00, 0x48]), "0x00 0x48");
/// assert_eq!(hex_dump(&[]), "");
/// ```
#[must_use]
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 5);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "0x{:02x}", byte);
    }
    out
}

//! Fixed-capacity UTF-16 text fields.
//!
//! The server marshals every name as a raw buffer of [`TEXT_UNITS`] UTF-16LE
//! code units, null padded and not length prefixed. Names are additionally
//! terminated by a `'%'` marker followed by garbage, which [`sanitize_text`]
//! strips before the value reaches a snapshot.

/// Capacity of every text field, in UTF-16 code units.
pub const TEXT_UNITS: usize = 50;

/// Wire size of every text field, in bytes.
pub const TEXT_BYTES: usize = TEXT_UNITS * 2;

/// Decode a UTF-16LE buffer up to the first null code unit.
///
/// An odd trailing byte is ignored; unpaired surrogates are replaced with
/// `U+FFFD`.
pub fn decode_utf16_fixed(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .filter_map(|pair| <[u8; 2]>::try_from(pair).ok())
        .map(u16::from_le_bytes)
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Encode `text` into `out` as null-padded UTF-16LE.
///
/// Characters that do not fit in `out` are dropped whole, so a surrogate pair
/// is never split.
pub fn encode_utf16_fixed(text: &str, out: &mut [u8]) {
    out.fill(0);
    let capacity = out.len() / 2;
    let mut written = 0usize;
    let mut units = [0u16; 2];

    for ch in text.chars() {
        let encoded = ch.encode_utf16(&mut units);
        if written + encoded.len() > capacity {
            break;
        }
        for unit in encoded.iter() {
            if let Some(slot) = out.get_mut(written * 2..written * 2 + 2) {
                slot.copy_from_slice(&unit.to_le_bytes());
            }
            written += 1;
        }
    }
}

/// Strip the server's `'%'` terminator and everything after it.
///
/// Text without a marker is returned unchanged.
pub fn sanitize_text(text: &str) -> &str {
    text.split_once('%').map_or(text, |(head, _)| head)
}

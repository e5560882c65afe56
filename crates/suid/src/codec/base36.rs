use crate::{codec::EncodingError, id::MAX_SAFE};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const NO_VALUE: u8 = 255;
const RADIX: u64 = 36;

/// Number of base-36 digits needed for `MAX_SAFE` (`"2gosa7pa2gv"`).
const MAX_LEN: usize = 11;

/// Largest leading digit an 11 character string may start with.
const MAX_LEADING: u8 = 2;

/// Lookup table for base-36 decoding. Only lowercase is canonical.
const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    while i < 36 {
        lut[ALPHABET[i as usize] as usize] = i;
        i += 1;
    }
    lut
};

/// Renders `value` in lowercase base-36 without padding.
///
/// Zero renders as `"0"`.
pub fn encode(mut value: u64) -> String {
    // u64::MAX needs 13 digits; anything this crate produces needs at most 11.
    let mut buf = [0_u8; 13];
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = ALPHABET[(value % RADIX) as usize];
        value /= RADIX;
        if value == 0 {
            break;
        }
    }
    buf[pos..].iter().map(|&b| char::from(b)).collect()
}

/// Parses a lowercase base-36 string.
///
/// # Errors
///
/// - [`EncodingError::DecodeEmpty`] for an empty string
/// - [`EncodingError::DecodeInvalidAscii`] for any byte outside `[0-9a-z]`
/// - [`EncodingError::DecodeOverflow`] if the value exceeds `MAX_SAFE`
pub fn decode(text: &str) -> Result<u64, EncodingError> {
    if text.is_empty() {
        return Err(EncodingError::DecodeEmpty);
    }
    let mut acc = 0_u64;
    for (index, byte) in text.bytes().enumerate() {
        let val = LOOKUP[byte as usize];
        if val == NO_VALUE {
            return Err(EncodingError::DecodeInvalidAscii { byte, index });
        }
        acc = acc
            .checked_mul(RADIX)
            .and_then(|acc| acc.checked_add(u64::from(val)))
            .filter(|&acc| acc <= MAX_SAFE)
            .ok_or(EncodingError::DecodeOverflow)?;
    }
    Ok(acc)
}

/// Fast admissibility check for canonical text.
///
/// Accepts 1 to 11 characters from the base-36 alphabet, and for exactly 11
/// characters requires a leading digit no larger than that of `MAX_SAFE`.
/// This is a heuristic: some 11 character strings it accepts still overflow,
/// so a `true` result is not a guarantee that [`decode`] succeeds.
pub fn looks_valid(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_LEN {
        return false;
    }
    if bytes.iter().any(|&b| LOOKUP[b as usize] == NO_VALUE) {
        return false;
    }
    bytes.len() < MAX_LEN || LOOKUP[bytes[0] as usize] <= MAX_LEADING
}

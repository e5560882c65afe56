//! Compressed base-32, as written by deployments predating the base-36 form.
//!
//! The alphabet drops the ambiguous glyphs `b`, `l`, `o` and `q`, then reuses
//! them as escapes for the digit pairs `00`, `01`, `02` and `03`. Older
//! encoders also rendered zero as the empty string. Nothing in this crate
//! produces this format any more; it is decoded for compatibility only.

use crate::{codec::EncodingError, id::MAX_SAFE};

const ALPHABET: &[u8; 32] = b"0123456789acdefghijkmnprstuvwxyz";
const NO_VALUE: u8 = 255;
const BITS_PER_CHAR: u32 = 5;

/// `MAX_SAFE` spans 11 digits once escapes are expanded.
const MAX_LEN: usize = 11;

/// 53 bits leave 3 bits for the leading digit of an 11 digit value.
const MAX_LEADING: u8 = 7;

const ESCAPES: [(u8, [u8; 2]); 4] = [(b'b', [0, 0]), (b'l', [0, 1]), (b'o', [0, 2]), (b'q', [0, 3])];

const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    while i < 32 {
        lut[ALPHABET[i as usize] as usize] = i;
        i += 1;
    }
    lut
};

/// Expands one input byte into its digit values: two for an escape, one for
/// any other glyph. Only the first `len` entries of the array are meaningful.
fn expand(byte: u8) -> Option<([u8; 2], usize)> {
    if let Some((_, pair)) = ESCAPES.iter().find(|(glyph, _)| *glyph == byte) {
        return Some((*pair, 2));
    }
    match LOOKUP[byte as usize] {
        NO_VALUE => None,
        val => Some(([val, 0], 1)),
    }
}

/// Parses a compressed legacy base-32 string.
///
/// The empty string decodes to zero, matching what older encoders produced.
///
/// # Errors
///
/// - [`EncodingError::DecodeInvalidAscii`] for bytes outside the alphabet and
///   its escapes
/// - [`EncodingError::DecodeOverflow`] if the value exceeds `MAX_SAFE`
pub fn decode_legacy(text: &str) -> Result<u64, EncodingError> {
    let mut acc = 0_u64;
    for (index, byte) in text.bytes().enumerate() {
        let (digits, len) =
            expand(byte).ok_or(EncodingError::DecodeInvalidAscii { byte, index })?;
        for &digit in &digits[..len] {
            if acc > MAX_SAFE >> BITS_PER_CHAR {
                return Err(EncodingError::DecodeOverflow);
            }
            acc = (acc << BITS_PER_CHAR) | u64::from(digit);
        }
    }
    Ok(acc)
}

/// Fast admissibility check for legacy text.
///
/// Mirrors [`crate::codec::looks_valid`]: 1 to 11 digits after expanding
/// escapes, all within the alphabet, and a small enough leading digit when all
/// 11 are used. It does not prove that [`decode_legacy`] will succeed.
pub fn looks_valid_legacy(text: &str) -> bool {
    let mut len = 0;
    let mut leading = None;
    for byte in text.bytes() {
        let Some((digits, count)) = expand(byte) else {
            return false;
        };
        leading.get_or_insert(digits[0]);
        len += count;
    }
    match leading {
        Some(leading) => len < MAX_LEN || (len == MAX_LEN && leading <= MAX_LEADING),
        None => false,
    }
}

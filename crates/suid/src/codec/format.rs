use crate::codec::{EncodingError, base36, legacy};

/// Selects which codec a piece of text is decoded with.
///
/// Both variants are permanent decode paths. New text is only ever written in
/// [`Format::Base36`]; [`Format::Legacy`] exists so values written by older
/// deployments keep decoding to the same integers. The format is always chosen
/// explicitly from a tag, never guessed by trying one codec after the other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// Lowercase base-36, the canonical form.
    #[default]
    Base36,
    /// Compressed base-32 with `b`/`l`/`o`/`q` escapes.
    Legacy,
}

impl Format {
    /// Decodes `text` in this format.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodingError`] if `text` is not valid in this format.
    pub fn decode(self, text: &str) -> Result<u64, EncodingError> {
        match self {
            Self::Base36 => base36::decode(text),
            Self::Legacy => legacy::decode_legacy(text),
        }
    }

    /// Heuristic length and alphabet check for this format.
    ///
    /// See [`crate::codec::looks_valid`] and
    /// [`crate::codec::looks_valid_legacy`].
    pub fn looks_valid(self, text: &str) -> bool {
        match self {
            Self::Base36 => base36::looks_valid(text),
            Self::Legacy => legacy::looks_valid_legacy(text),
        }
    }
}

/// Errors produced while decoding the textual form of an identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum EncodingError {
    /// The input was empty.
    #[error("cannot decode an empty string")]
    DecodeEmpty,

    /// The input contains a byte outside the codec's alphabet.
    #[error("invalid ascii byte {byte:#04x} at index {index}")]
    DecodeInvalidAscii {
        /// The offending byte.
        byte: u8,
        /// Its position in the input.
        index: usize,
    },

    /// The decoded value does not fit below `MAX_SAFE`.
    #[error("decoded value exceeds the safe integer range")]
    DecodeOverflow,
}

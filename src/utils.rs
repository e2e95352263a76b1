//! Small helpers shared across the crate.
use fixedbitset::FixedBitSet;

/// A set of bytes, used for character-class bitmaps, FIRST/FOLLOW maps and
/// scanner token masks.
pub type ByteSet = FixedBitSet;

/// Creates an empty 256-wide [`ByteSet`].
pub fn byte_set() -> ByteSet {
    FixedBitSet::with_capacity(256)
}

/// Renders a byte for diagnostics: printable ASCII as-is, otherwise hex.
pub(crate) fn display_byte(byte: u8) -> String {
    if byte.is_ascii_graphic() || byte == b' ' {
        (byte as char).to_string()
    } else {
        format!("0x{byte:02x}")
    }
}

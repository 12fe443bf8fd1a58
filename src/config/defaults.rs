//! Named defaults shared by the library config and the CLI surface.

pub const DEFAULT_BITWIDTH: u32 = 16;
pub const DEFAULT_RATE: u32 = 16_000;
pub const DEFAULT_CHANNELS: u32 = 1;
pub const DEFAULT_DEVICE: &str = "plughw:1,0";
pub const DEFAULT_FILE_TYPE: &str = "raw";
pub const DEFAULT_EXIT_ON_SILENCE: u32 = 0;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Characters never allowed in a capture device id. The id travels straight
/// into the recorder's argument vector, so keep it boring.
pub(crate) const FORBIDDEN_DEVICE_CHARS: &[char] =
    &[';', '|', '&', '$', '`', '(', ')', '<', '>', '"', '\'', '\\'];

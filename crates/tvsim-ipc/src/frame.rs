//! Wire format of the control channel.
//!
//! One command per frame: a 4-byte little-endian unsigned integer. Stream
//! transports read exactly [`FRAME_LEN`] bytes per command; message-mode
//! transports receive one frame per message and drop any message whose
//! length differs.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of one encoded command.
pub const FRAME_LEN: usize = 4;

/// Encode a command code as a single frame.
pub fn encode(code: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_LEN);
    buf.put_u32_le(code);
    buf.freeze()
}

/// Decode a single frame. Returns `None` unless `frame` is exactly
/// [`FRAME_LEN`] bytes long.
pub fn decode(frame: &[u8]) -> Option<u32> {
    if frame.len() != FRAME_LEN {
        return None;
    }
    let mut cursor = frame;
    Some(cursor.get_u32_le())
}

//! Core types shared by the frame source, the stream session and the server.
//!
//! - [`Frame`] is one encoded image lent out by a frame source
//! - [`PixelFormat`] tags how the payload is encoded
//! - [`FrameToken`] records which buffer must be handed back on release

mod frame;

pub use frame::{Frame, FrameToken, PixelFormat};

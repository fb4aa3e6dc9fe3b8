//! MJPEG stream pipeline: multipart encoding, frame pacing and the
//! per-viewer session state machine.

pub mod multipart;
pub mod pacer;
pub mod session;

pub use multipart::{MultipartChunk, PART_BOUNDARY, STREAM_BOUNDARY, STREAM_CONTENT_TYPE};
pub use pacer::{FramePacer, frame_delay_ms};
pub use session::{SessionReport, SessionState, StreamSession};

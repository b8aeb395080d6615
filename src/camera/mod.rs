mod link;
#[cfg(test)]
pub(crate) mod mock;
mod protocol;
mod session;
#[cfg(test)]
mod tests;

pub use link::{CameraLink, LinkEvent, TcpCameraLink};
pub use protocol::{is_trailer_byte, CameraCodec, CameraCommand, CR, EOT, GS, LF, RS};
pub use session::{CameraSession, CaptureRequest, SessionState, SessionStats};

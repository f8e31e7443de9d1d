mod media_peer;
mod webrtc_peer;

pub use media_peer::*;
pub use webrtc_peer::*;

pub use vaarta_core::{ErrorKind, ParticipantId, RoomId, SignalError};

pub mod model {
    pub use vaarta_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use vaarta_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use vaarta_client::*;
}

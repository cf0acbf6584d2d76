pub mod codec;
pub mod protocol;
pub mod relay;
pub mod session;

pub use codec::LineCodec;
pub use protocol::{Handshake, SharedState, StateRecord};
pub use relay::Relay;
pub use session::{Session, SessionOutcome};

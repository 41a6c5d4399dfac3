pub mod model;
pub mod presence;
pub mod session;

pub use model::*;
pub use presence::{presence_status, PresenceStatus};
pub use session::{can_propose, SessionParticipant, SessionState, SignatureOutcome, SigningSession};

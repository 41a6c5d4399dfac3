mod mock;
mod traits;

pub use mock::MockBroadcast;
pub use traits::ProposalBroadcast;

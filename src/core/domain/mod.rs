//! Domain types.

mod credential;
pub mod identity;
mod outcome;

pub use credential::ProtectedCredential;
pub use identity::{PeerConnection, PeerIdentity};
pub use outcome::Outcome;

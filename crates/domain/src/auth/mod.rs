//! Authentication domain types

mod pending;
mod session;
pub mod token;

pub use pending::{AuthContextKind, PendingAuthContext};
pub use session::{LogoutReason, Session, SessionPhase, User};
pub use token::{Claims, Token, TokenPair};

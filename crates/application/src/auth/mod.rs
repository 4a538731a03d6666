//! Session lifecycle.
//!
//! [`SessionStore`] owns the token pair and the login state machine.
//! [`RenewalScheduler`] and [`ConsistencyWatcher`] are background tasks
//! that only read the session or call its operations.

mod error;
mod pending;
mod persistence;
mod renewal;
mod session_store;
mod single_flight;
mod watcher;

pub use error::AuthError;
pub use pending::{CONTEXT_KEY, EMAIL_KEY, PendingAuthStore, TICKET_KEY};
pub use persistence::{ACCESS_COOKIE, PersistedTokens, REFRESH_COOKIE, TokenPersistence};
pub use renewal::RenewalScheduler;
pub use session_store::{PasswordChangeOutcome, RenewOutcome, SecondFactorOutcome, SessionStore};
pub use single_flight::SingleFlight;
pub use watcher::{ConsistencyWatcher, WatchState};

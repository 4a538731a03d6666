//! Pending login context kept in session-scoped storage.

use std::sync::Arc;

use tessera_domain::{AuthContextKind, PendingAuthContext};

use crate::ports::SessionStorage;

/// Key of the email entered in the first login step.
pub const EMAIL_KEY: &str = "auth_email";

/// Key of the password change ticket.
pub const TICKET_KEY: &str = "auth_change_ticket";

/// Key of the flow tag.
pub const CONTEXT_KEY: &str = "auth_context";

/// Reads and writes [`PendingAuthContext`] under fixed keys.
#[derive(Clone)]
pub struct PendingAuthStore {
    storage: Arc<dyn SessionStorage>,
}

impl PendingAuthStore {
    /// Wrap a session-scoped storage.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Store a new context, replacing any previous one.
    pub fn save(&self, context: &PendingAuthContext) {
        self.storage.set(EMAIL_KEY, &context.email);
        self.storage.set(CONTEXT_KEY, context.kind.as_str());
        match &context.change_ticket {
            Some(ticket) => self.storage.set(TICKET_KEY, ticket),
            None => self.storage.remove(TICKET_KEY),
        }
    }

    /// Load the current context.
    ///
    /// A missing or unknown flow tag defaults to [`AuthContextKind::Login`].
    #[must_use]
    pub fn load(&self) -> Option<PendingAuthContext> {
        let email = self.storage.get(EMAIL_KEY)?;
        let kind = self
            .storage
            .get(CONTEXT_KEY)
            .and_then(|tag| tag.parse().ok())
            .unwrap_or_default();
        Some(PendingAuthContext::new(email, kind).with_ticket(self.storage.get(TICKET_KEY)))
    }

    /// Remove every pending key.
    pub fn clear(&self) {
        self.storage.remove(EMAIL_KEY);
        self.storage.remove(CONTEXT_KEY);
        self.storage.remove(TICKET_KEY);
    }
}

impl std::fmt::Debug for PendingAuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuthStore").finish_non_exhaustive()
    }
}

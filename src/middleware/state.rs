use crate::manager::SessionManager;

/// Shared state for the auth route handlers and the [`AuthSession`](super::AuthSession) extractor.
pub struct AuthState<G, D, B, S> {
    pub(super) manager: SessionManager<G, D, B, S>,
}

impl<G, D, B, S> AuthState<G, D, B, S> {
    #[must_use]
    pub fn new(manager: SessionManager<G, D, B, S>) -> Self {
        Self { manager }
    }

    #[must_use]
    pub fn manager(&self) -> &SessionManager<G, D, B, S> {
        &self.manager
    }
}

// Manual Clone: avoid derive adding `G: Clone, ...` bounds.
impl<G, D, B, S> Clone for AuthState<G, D, B, S> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}

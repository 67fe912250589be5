/// Route layout for [`auth_routes`](super::auth_routes).
#[derive(Debug, Clone)]
pub struct DeviceAuthConfig {
    pub(super) auth_path: String,
    pub(super) user_path: String,
}

impl Default for DeviceAuthConfig {
    fn default() -> Self {
        Self {
            auth_path: "/v1/auth".into(),
            user_path: "/v1/user".into(),
        }
    }
}

impl DeviceAuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix for the login, callback, link and logout routes.
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.auth_path = path.into();
        self
    }

    /// Route that returns the caller's session view.
    #[must_use]
    pub fn with_user_path(mut self, path: impl Into<String>) -> Self {
        self.user_path = path.into();
        self
    }
}

use time::Duration;

use crate::error::Error;

/// Upper bound for any configured session lifetime.
pub const MAX_TTL: Duration = Duration::days(3650);

/// Session lifecycle policy, passed to [`SessionManager::new`](crate::SessionManager::new).
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub(crate) linked_ttl: Duration,
    pub(crate) pending_ttl: Duration,
    pub(crate) link_code_attempts: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            linked_ttl: Duration::days(30),
            pending_ttl: Duration::hours(1),
            link_code_attempts: 5,
        }
    }
}

impl SessionSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings from environment variables, falling back to defaults.
    ///
    /// # Optional env vars
    /// - `SESSION_LINKED_TTL_DAYS`: lifetime of a linked session and of each refresh
    /// - `SESSION_PENDING_TTL_SECS`: pending lifetime when the provider reports none
    /// - `SESSION_LINK_CODE_ATTEMPTS`: link-code generation attempts per login
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but not a positive integer,
    /// or if a lifetime exceeds [`MAX_TTL`].
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut settings = Self::default();
        if let Some(days) = positive_var(&lookup, "SESSION_LINKED_TTL_DAYS")? {
            let ttl = ttl_from("SESSION_LINKED_TTL_DAYS", days, 86_400)?;
            settings = settings.with_linked_ttl(ttl);
        }
        if let Some(secs) = positive_var(&lookup, "SESSION_PENDING_TTL_SECS")? {
            let ttl = ttl_from("SESSION_PENDING_TTL_SECS", secs, 1)?;
            settings = settings.with_pending_ttl(ttl);
        }
        if let Some(attempts) = positive_var(&lookup, "SESSION_LINK_CODE_ATTEMPTS")? {
            let attempts = u32::try_from(attempts)
                .map_err(|_| Error::Config("SESSION_LINK_CODE_ATTEMPTS is too large".into()))?;
            settings = settings.with_link_code_attempts(attempts);
        }
        Ok(settings)
    }

    /// Lifetime granted on redemption and on every successful refresh.
    ///
    /// Clamped to between one second and [`MAX_TTL`].
    #[must_use]
    pub fn with_linked_ttl(mut self, ttl: Duration) -> Self {
        self.linked_ttl = clamp_ttl(ttl);
        self
    }

    /// Clamped like [`with_linked_ttl`](Self::with_linked_ttl).
    #[must_use]
    pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = clamp_ttl(ttl);
        self
    }

    #[must_use]
    pub fn with_link_code_attempts(mut self, attempts: u32) -> Self {
        self.link_code_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn linked_ttl(&self) -> Duration {
        self.linked_ttl
    }

    #[must_use]
    pub fn pending_ttl(&self) -> Duration {
        self.pending_ttl
    }

    #[must_use]
    pub fn link_code_attempts(&self) -> u32 {
        self.link_code_attempts
    }
}

fn clamp_ttl(ttl: Duration) -> Duration {
    ttl.clamp(Duration::SECOND, MAX_TTL)
}

fn positive_var(lookup: impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<i64>, Error> {
    let Some(s) = lookup(var) else {
        return Ok(None);
    };
    match s.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(Error::Config(format!("{var} must be a positive integer, got {s:?}"))),
    }
}

fn ttl_from(var: &str, count: i64, unit_secs: i64) -> Result<Duration, Error> {
    count
        .checked_mul(unit_secs)
        .map(Duration::seconds)
        .filter(|ttl| *ttl <= MAX_TTL)
        .ok_or_else(|| {
            Error::Config(format!("{var} exceeds the {} day maximum", MAX_TTL.whole_days()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = SessionSettings::new();
        assert_eq!(settings.linked_ttl(), Duration::days(30));
        assert_eq!(settings.pending_ttl(), Duration::hours(1));
        assert_eq!(settings.link_code_attempts(), 5);
    }

    #[test]
    fn overrides() {
        let settings = SessionSettings::new()
            .with_linked_ttl(Duration::days(7))
            .with_link_code_attempts(0);
        assert_eq!(settings.linked_ttl(), Duration::days(7));
        assert_eq!(settings.link_code_attempts(), 1);
    }

    #[test]
    fn builders_clamp_lifetimes() {
        let settings = SessionSettings::new()
            .with_linked_ttl(Duration::days(4_000_000))
            .with_pending_ttl(Duration::ZERO);
        assert_eq!(settings.linked_ttl(), MAX_TTL);
        assert_eq!(settings.pending_ttl(), Duration::SECOND);
    }

    fn lookup(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let pairs = pairs.to_vec();
        move |var| {
            pairs
                .iter()
                .find(|(name, _)| *name == var)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn env_values_are_parsed() {
        let settings = SessionSettings::from_lookup(lookup(&[
            ("SESSION_LINKED_TTL_DAYS", "7"),
            ("SESSION_PENDING_TTL_SECS", " 600 "),
            ("SESSION_LINK_CODE_ATTEMPTS", "3"),
        ]))
        .unwrap();
        assert_eq!(settings.linked_ttl(), Duration::days(7));
        assert_eq!(settings.pending_ttl(), Duration::minutes(10));
        assert_eq!(settings.link_code_attempts(), 3);

        let settings = SessionSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.linked_ttl(), Duration::days(30));
    }

    #[test]
    fn oversized_env_lifetimes_are_config_errors() {
        for (var, value) in [
            ("SESSION_LINKED_TTL_DAYS", "9223372036854775807"),
            ("SESSION_LINKED_TTL_DAYS", "4000000"),
            ("SESSION_PENDING_TTL_SECS", "9223372036854775807"),
        ] {
            let err = SessionSettings::from_lookup(lookup(&[(var, value)])).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{var}={value}: {err}");
        }
    }

    #[test]
    fn non_positive_env_values_are_config_errors() {
        for value in ["0", "-3", "soon"] {
            let vars = [("SESSION_LINK_CODE_ATTEMPTS", value)];
            let err = SessionSettings::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }
    }
}

//! Identity provider seam with a guest-id fallback.

use std::sync::Mutex;

use uuid::Uuid;

/// Prefix of locally generated guest identities.
pub const GUEST_ID_PREFIX: &str = "guest_";

/// Opaque identity provider: an authenticated backend returns a stable user
/// id, an anonymous client returns `None` and falls back to a guest id.
pub trait IdentityProvider: Send + Sync {
    /// Stable id of the signed-in user, if any.
    fn current_user_id(&self) -> Option<String>;
}

/// Provider for a client that is never signed in.
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn current_user_id(&self) -> Option<String> {
        None
    }
}

/// Provider with a fixed authenticated user id, handy for tests and demos.
pub struct FixedIdentity(pub String);

impl IdentityProvider for FixedIdentity {
    fn current_user_id(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Session-scoped identity resolution.
///
/// Wraps a provider and caches a generated guest id for the lifetime of the
/// client session, so one anonymous client keeps one identity across all
/// room operations.
pub struct SessionIdentity {
    provider: Box<dyn IdentityProvider>,
    guest_id: Mutex<Option<String>>,
}

impl SessionIdentity {
    /// Wrap an identity provider for one client session.
    pub fn new(provider: Box<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            guest_id: Mutex::new(None),
        }
    }

    /// Anonymous session that will mint a guest id on first use.
    pub fn anonymous() -> Self {
        Self::new(Box::new(AnonymousIdentity))
    }

    /// The authenticated user id, or a session-stable guest id.
    pub fn user_id_or_guest(&self) -> String {
        if let Some(user_id) = self.provider.current_user_id() {
            return user_id;
        }
        let mut cached = self.guest_id.lock().expect("guest id lock poisoned");
        cached
            .get_or_insert_with(|| format!("{GUEST_ID_PREFIX}{}", Uuid::new_v4().simple()))
            .clone()
    }
}

use std::sync::Arc;

/// Boundary to the application's session state. The engine never reads
/// global session state ad hoc; an implementation of this trait is injected
/// at construction time.
pub trait SessionResolver: Send + Sync {
    /// Whether the current user is an anonymous/guest session.
    fn is_guest(&self) -> bool;

    /// Stable identity key used for storage partitioning: the guest session
    /// id for anonymous users, or the bearer credential for authenticated
    /// ones.
    fn identity_key(&self) -> String;
}

/// Fixed session values, for embedders with an already-resolved session and
/// for tests.
#[derive(Debug, Clone)]
pub struct StaticSession {
    guest: bool,
    identity: String,
}

impl StaticSession {
    pub fn guest(session_id: impl Into<String>) -> Self {
        Self { guest: true, identity: session_id.into() }
    }

    pub fn authenticated(credential: impl Into<String>) -> Self {
        Self { guest: false, identity: credential.into() }
    }
}

impl SessionResolver for StaticSession {
    fn is_guest(&self) -> bool {
        self.guest
    }

    fn identity_key(&self) -> String {
        self.identity.clone()
    }
}

pub type SharedSession = Arc<dyn SessionResolver>;

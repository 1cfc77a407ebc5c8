use portal_auth::Identity;

/// Authenticated request context.
///
/// The identity is the store's current record, re-fetched by the auth
/// middleware on every request; token claims are never carried past
/// verification. Present for all protected routes.
#[derive(Debug, Clone)]
pub struct AuthContext {
    identity: Identity,
    ip: Option<String>,
    user_agent: Option<String>,
}

impl AuthContext {
    pub fn new(identity: Identity, ip: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            identity,
            ip,
            user_agent,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// `(ip, user_agent)` clones for audit event construction.
    pub fn source(&self) -> (Option<String>, Option<String>) {
        (self.ip.clone(), self.user_agent.clone())
    }
}

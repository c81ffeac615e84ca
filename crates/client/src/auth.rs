use parking_lot::RwLock;

/// Where the bearer credential for authenticated endpoints comes from.
///
/// Returning `None` means there is no live session; callers treat that
/// as a precondition failure rather than attempting the request.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// In-memory session token holder, fed by the login flow and cleared on
/// logout.
#[derive(Debug, Default)]
pub struct SessionTokens {
    token: RwLock<Option<String>>,
}

impl SessionTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }
}

impl TokenSource for SessionTokens {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

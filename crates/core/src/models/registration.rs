//! Per-peer registration state

/// Username binding for one client session.
///
/// Starts unset and is bound exactly once, by the first non-blank line the
/// client sends. Later bind attempts are refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationState {
    username: Option<String>,
}

impl RegistrationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_registered(&self) -> bool {
        self.username.is_some()
    }

    /// Bind the username. Returns false if one is already bound.
    pub fn bind(&mut self, username: impl Into<String>) -> bool {
        if self.username.is_some() {
            return false;
        }
        self.username = Some(username.into());
        true
    }
}

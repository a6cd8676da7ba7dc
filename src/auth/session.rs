use std::collections::HashSet;
use std::sync::Mutex;

use tokio::sync::watch;

/// Observable auth state of the process. `Unknown` only exists before the
/// first sign-in or sign-out event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// Process-wide session registry: the set of active session ids plus one
/// shared observable of the aggregate auth state. Components subscribe to
/// the same channel instead of registering their own listeners; dropping a
/// receiver unsubscribes it.
pub struct SessionState {
    active: Mutex<HashSet<String>>,
    state: watch::Sender<AuthState>,
}

impl SessionState {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            active: Mutex::new(HashSet::new()),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        *self.state.borrow()
    }

    pub fn sign_in(&self, session_id: &str) {
        let mut active = self.active.lock().unwrap();
        active.insert(session_id.to_string());
        self.state.send_replace(AuthState::Authenticated);
    }

    /// Revokes the session. Idempotent: revoking an unknown id is harmless.
    pub fn sign_out(&self, session_id: &str) {
        let mut active = self.active.lock().unwrap();
        active.remove(session_id);
        let next = if active.is_empty() {
            AuthState::Unauthenticated
        } else {
            AuthState::Authenticated
        };
        self.state.send_replace(next);
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.active.lock().unwrap().contains(session_id)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

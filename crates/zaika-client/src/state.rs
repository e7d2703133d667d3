//! Mutable application state shared behind one lock.

use zaika_store::AuthSession;

/// State that changes over the life of the app.
#[derive(Default)]
pub(crate) struct AppState {
    /// The signed-in session, mirroring what the local store holds.
    pub auth: Option<AuthSession>,
}

impl AppState {
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}

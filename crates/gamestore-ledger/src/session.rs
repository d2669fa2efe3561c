//! Session identity.
//!
//! The ledger does not own sign-in state; it asks a [`SessionProvider`] who is
//! signed in and watches for changes.

use tokio::sync::watch;
use tracing::info;

/// Supplies the currently signed-in account.
pub trait SessionProvider: Send + Sync + std::fmt::Debug {
    fn current_account_id(&self) -> Option<String>;

    /// Observes sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<String>>;
}

/// In-process session held in a watch channel.
#[derive(Debug)]
pub struct LocalSession {
    current: watch::Sender<Option<String>>,
}

impl LocalSession {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        LocalSession { current }
    }

    pub fn sign_in(&self, account_id: impl Into<String>) {
        let account_id = account_id.into();
        info!(account_id = %account_id, "Signed in");
        self.current.send_replace(Some(account_id));
    }

    pub fn sign_out(&self) {
        if self.current.send_replace(None).is_some() {
            info!("Signed out");
        }
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for LocalSession {
    fn current_account_id(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_and_out_notify() {
        let session = LocalSession::new();
        let mut changes = session.subscribe();
        assert_eq!(session.current_account_id(), None);

        session.sign_in("user_demo");
        changes.changed().await.unwrap();
        assert_eq!(changes.borrow_and_update().as_deref(), Some("user_demo"));

        session.sign_out();
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow(), None);
        assert_eq!(session.current_account_id(), None);
    }
}

//! Authenticated-session signal.
//!
//! The authentication subsystem owns the truth; the engine only observes a
//! boolean. The signal is injected rather than global so tests can drive it.

use std::sync::Arc;

use tokio::sync::watch;

/// Observable "is the user authenticated" flag.
///
/// Cheap to clone; all clones share one channel.
#[derive(Debug, Clone)]
pub struct SessionSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl SessionSignal {
    /// Create a signal with an initial value.
    #[must_use]
    pub fn new(authenticated: bool) -> Self {
        let (tx, _rx) = watch::channel(authenticated);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new value. Observers are only woken on an actual flip.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.tx.send_if_modified(|current| {
            if *current == authenticated {
                false
            } else {
                *current = authenticated;
                true
            }
        });
    }

    /// Current value.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that wakes whenever the value flips.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

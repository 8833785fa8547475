use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::store::DocumentStore;

const DISCONNECTED: u8 = 0;
const CONNECTING: u8 = 1;
const CONNECTED: u8 = 2;

/// Owns the document-store client handle. The handle is passed in explicitly
/// and never held in global state; everything that needs a live client goes
/// through [`Connection::handle`].
pub struct Connection {
    store: Arc<dyn DocumentStore>,
    state: AtomicU8,
}

impl Connection {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            state: AtomicU8::new(DISCONNECTED),
        }
    }

    /// Idempotent connect. Returns false on any failure, never panics.
    /// Calling connect while already connected is a no-op returning true.
    pub fn connect(&self) -> bool {
        if self.state.load(Ordering::SeqCst) == CONNECTED {
            return true;
        }
        self.state.store(CONNECTING, Ordering::SeqCst);
        if self.store.ping() {
            self.state.store(CONNECTED, Ordering::SeqCst);
            debug!("document store connected");
            true
        } else {
            self.state.store(DISCONNECTED, Ordering::SeqCst);
            warn!("document store unreachable");
            false
        }
    }

    /// Idempotent close; safe to call repeatedly or when never connected.
    pub fn close(&self) {
        if self.state.swap(DISCONNECTED, Ordering::SeqCst) == CONNECTED {
            debug!("document store connection closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CONNECTED && self.store.ping()
    }

    /// The live client handle, or None while disconnected or unhealthy.
    pub fn handle(&self) -> Option<Arc<dyn DocumentStore>> {
        if self.is_connected() {
            Some(self.store.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn connect_and_close_are_idempotent() {
        let conn = Connection::new(Arc::new(InMemoryStore::new()));
        assert!(!conn.is_connected());
        assert!(conn.connect());
        assert!(conn.connect());
        assert!(conn.is_connected());
        conn.close();
        conn.close();
        assert!(!conn.is_connected());
        assert!(conn.handle().is_none());
        assert!(conn.connect());
        assert!(conn.handle().is_some());
    }
}

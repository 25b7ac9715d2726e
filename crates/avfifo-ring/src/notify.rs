//! Activity notifications.
//!
//! The ring never blocks, so backpressure travels out of band: whenever a
//! side publishes a new external offset it fires its registered observer,
//! and the peer re-polls. The observer is a message-passing seam rather
//! than a borrowed closure: an `mpsc` sender implements it directly, and a
//! cross-process host can wire it to whatever doorbell primitive it has.

use std::sync::mpsc::{Sender, SyncSender};

/// Fired with no payload when an external offset advances. Receivers must
/// re-poll the ring; the signal carries no state of its own.
pub trait ActivityObserver: Send + Sync {
    fn on_activity(&self);
}

impl ActivityObserver for Sender<()> {
    fn on_activity(&self) {
        // A disconnected peer simply stops listening.
        let _ = self.send(());
    }
}

impl ActivityObserver for SyncSender<()> {
    fn on_activity(&self) {
        // A full channel already has a wakeup pending; coalesce.
        let _ = self.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn sender_delivers_signal() {
        let (tx, rx) = mpsc::channel();
        let observer: &dyn ActivityObserver = &tx;
        observer.on_activity();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn full_sync_channel_coalesces() {
        let (tx, rx) = mpsc::sync_channel(1);
        let observer: &dyn ActivityObserver = &tx;
        observer.on_activity();
        observer.on_activity();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel::<()>();
        drop(rx);
        let observer: &dyn ActivityObserver = &tx;
        observer.on_activity();
    }
}

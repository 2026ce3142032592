//! Cooperative cancellation for in-flight scans.
//!
//! The signal is a `watch` channel carrying a single `bool`. The scanner
//! consults it before each read from the source and before opening each
//! body part. A read already in progress is allowed to complete.

use std::sync::Arc;

use tokio::sync::watch;

/// Receiving side of a cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    signal: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { signal: None }
    }

    /// Wrap an existing shutdown channel (`true` means stop).
    pub fn from_receiver(signal: watch::Receiver<bool>) -> Self {
        Self {
            signal: Some(signal),
        }
    }

    /// Create a linked handle/signal pair.
    pub fn pair() -> (CancelHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        (
            CancelHandle {
                sender: Arc::new(sender),
            },
            Self::from_receiver(receiver),
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

/// Sending side of a cancellation signal. Clones share the same signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Trip the signal. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// A new receiver observing this handle.
    pub fn subscribe(&self) -> Cancellation {
        Cancellation::from_receiver(self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_is_not_cancelled() {
        assert!(!Cancellation::never().is_cancelled());
        assert!(!Cancellation::default().is_cancelled());
    }

    #[test]
    fn test_pair_propagates_cancel() {
        let (handle, signal) = Cancellation::pair();
        let other = handle.subscribe();
        assert!(!signal.is_cancelled());
        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(other.is_cancelled());
        handle.cancel();
        assert!(signal.clone().is_cancelled());
    }
}

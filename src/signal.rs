//! Cooperative pause/cancel signal checked at every suspension point.
//!
//! Scans never get preempted. Instead, each remote call is preceded by
//! [`ScanSignal::checkpoint`], which reports an [`Interrupt`] when the
//! consumer has gone invisible (pause) or has been torn down (cancel). The
//! worst-case latency to honour either is one remote round trip.

use std::sync::Arc;

use slidequeue_common::Interrupt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Shared pause/cancel state for one consumer.
///
/// Cancellation is permanent; pause can be toggled any number of times.
/// Clones observe the same state.
#[derive(Debug, Clone)]
pub struct ScanSignal {
    cancel: CancellationToken,
    paused: Arc<watch::Sender<bool>>,
}

impl ScanSignal {
    /// Create a signal in the running (not paused, not cancelled) state.
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            cancel: CancellationToken::new(),
            paused: Arc::new(paused),
        }
    }

    /// Set the pause flag. Returns `true` if the state changed.
    pub fn set_paused(&self, paused: bool) -> bool {
        let previous = self.paused.send_replace(paused);
        previous != paused
    }

    /// Request a pause.
    pub fn pause(&self) {
        self.set_paused(true);
    }

    /// Clear the pause flag.
    pub fn resume(&self) {
        self.set_paused(false);
    }

    /// Cancel permanently. Also wakes anyone waiting in [`Self::resumed`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Check the signal before a remote call.
    ///
    /// Cancellation wins over pause.
    pub fn checkpoint(&self) -> Result<(), Interrupt> {
        if self.is_cancelled() {
            Err(Interrupt::Cancelled)
        } else if self.is_paused() {
            Err(Interrupt::Paused)
        } else {
            Ok(())
        }
    }

    /// Wait until the signal is no longer paused.
    ///
    /// Returns `Err(Interrupt::Cancelled)` if cancelled while waiting.
    pub async fn resumed(&self) -> Result<(), Interrupt> {
        let mut rx = self.paused.subscribe();
        loop {
            if self.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
            if !*rx.borrow_and_update() {
                return Ok(());
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(Interrupt::Cancelled),
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(Interrupt::Cancelled);
                    }
                }
            }
        }
    }
}

impl Default for ScanSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_running() {
        let signal = ScanSignal::new();
        assert!(signal.checkpoint().is_ok());
        assert!(!signal.is_paused());
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn pause_and_resume() {
        let signal = ScanSignal::new();
        assert!(signal.set_paused(true));
        assert!(!signal.set_paused(true));
        assert_eq!(signal.checkpoint(), Err(Interrupt::Paused));
        signal.resume();
        assert!(signal.checkpoint().is_ok());
    }

    #[test]
    fn cancel_wins_over_pause() {
        let signal = ScanSignal::new();
        signal.pause();
        signal.cancel();
        assert_eq!(signal.checkpoint(), Err(Interrupt::Cancelled));
    }

    #[test]
    fn clones_share_state() {
        let signal = ScanSignal::new();
        let other = signal.clone();
        other.pause();
        assert!(signal.is_paused());
    }

    #[tokio::test]
    async fn resumed_waits_for_unpause() {
        let signal = ScanSignal::new();
        signal.pause();

        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.resumed().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        signal.resume();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should finish")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn resumed_reports_cancel() {
        let signal = ScanSignal::new();
        signal.pause();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.resumed().await });
        signal.cancel();
        let result = handle.await.unwrap();
        assert_eq!(result, Err(Interrupt::Cancelled));
    }

    #[test]
    fn resumed_is_pending_while_paused() {
        let signal = ScanSignal::new();
        signal.pause();
        let mut waiter = tokio_test::task::spawn(signal.resumed());
        tokio_test::assert_pending!(waiter.poll());

        signal.cancel();
        assert!(waiter.is_woken());
        assert_eq!(tokio_test::assert_ready!(waiter.poll()), Err(Interrupt::Cancelled));
    }
}

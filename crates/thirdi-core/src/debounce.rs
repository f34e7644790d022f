//! Coalesce-last-value debouncing for configuration writes.
//!
//! Settings forms fire a value per keystroke or slider tick; sending a
//! device write for each would hammer the config endpoint. A
//! [`Debouncer`] keeps only the most recent value and releases it once no
//! new value has arrived for a quiet period. Generic over the value type,
//! independent of any particular form field.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

/// Handle for feeding values into a debounce window.
///
/// Dropping the handle flushes any pending value and ends the stream.
pub struct Debouncer<T> {
    input_tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer with the given inactivity window. The receiver
    /// yields one value per quiet period: the latest one seen.
    pub fn new(window: Duration) -> (Self, mpsc::Receiver<T>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::channel(8);

        tokio::spawn(run(window, input_rx, output_tx));

        (Self { input_tx }, output_rx)
    }

    /// Feed a new value, superseding any value still waiting to flush.
    pub fn update(&self, value: T) {
        // Send only fails when the task is gone, i.e. the output side
        // was dropped; nothing left to coalesce for.
        let _ = self.input_tx.send(value);
    }
}

async fn run<T>(window: Duration, mut input_rx: mpsc::UnboundedReceiver<T>, output_tx: mpsc::Sender<T>) {
    loop {
        // Idle: wait for the first value of a burst.
        let Some(mut pending) = input_rx.recv().await else {
            return;
        };

        // Armed: every newer value supersedes and re-arms the window.
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                () = &mut deadline => {
                    if output_tx.send(pending).await.is_err() {
                        return;
                    }
                    break;
                }
                next = input_rx.recv() => match next {
                    Some(value) => {
                        pending = value;
                        deadline.as_mut().reset(Instant::now() + window);
                    }
                    None => {
                        // Handle dropped: flush what we have and end.
                        let _ = output_tx.send(pending).await;
                        return;
                    }
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_value() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);

        debouncer.update("50");
        debouncer.update("55");
        debouncer.update("60");

        let flushed = rx.recv().await.expect("flush");
        assert_eq!(flushed, "60");

        // Nothing else queued.
        tokio::time::advance(WINDOW * 4).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn updates_inside_the_window_postpone_the_flush() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);

        debouncer.update(1);
        tokio::time::sleep(WINDOW / 2).await;
        debouncer.update(2);
        tokio::time::sleep(WINDOW / 2).await;
        // Still within the re-armed window: nothing flushed yet.
        assert!(rx.try_recv().is_err());

        let flushed = rx.recv().await.expect("flush");
        assert_eq!(flushed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_flush_separately() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);

        debouncer.update("a");
        assert_eq!(rx.recv().await.expect("flush"), "a");

        debouncer.update("b");
        assert_eq!(rx.recv().await.expect("flush"), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn drop_flushes_pending_value() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);

        debouncer.update(42);
        drop(debouncer);

        assert_eq!(rx.recv().await, Some(42));
        assert_eq!(rx.recv().await, None);
    }
}

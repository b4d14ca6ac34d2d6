//! Bridges an external event bus into an in-process channel.
//!
//! Delivery from the bus is at-least-once; duplicates are tolerated
//! downstream via identity dedup (I1), so the listener makes no attempt
//! to deduplicate itself. The bus subscription itself lives outside this
//! crate (it is an external collaborator, §1); this type only owns the
//! receiving half of the channel the subscription forwards onto.
use tokio::sync::mpsc;

/// One subscribed bus queue feeding events of type `E` into a bounded
/// channel that a scheduler drains from on its populate tick.
pub struct Listener<E> {
    name: &'static str,
    receiver: mpsc::Receiver<E>,
}

impl<E> Listener<E> {
    /// `sender` is handed to whatever task forwards the real bus
    /// subscription; this constructs the scheduler-facing half.
    pub fn channel(name: &'static str, buffer: usize) -> (mpsc::Sender<E>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { name, receiver: rx })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Drain every event currently buffered, without blocking (the
    /// populate loop's event-driven source, §4.5 step 1).
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

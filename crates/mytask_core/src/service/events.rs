//! Change notification fan-out for state objects.
//!
//! Subscribers receive events over `std::sync::mpsc` channels. Dropping the
//! receiver unsubscribes; dead senders are pruned on the next emit.

use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug)]
pub struct EventHub<E> {
    senders: Vec<Sender<E>>,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<E: Clone> EventHub<E> {
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    pub fn emit(&mut self, event: E) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::EventHub;

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut hub = EventHub::default();
        let kept = hub.subscribe();
        let dropped = hub.subscribe();
        drop(dropped);

        hub.emit(7_u32);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(kept.try_recv().ok(), Some(7));
    }
}

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Timing record for one vertex execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub processor: String,
    pub duration: Duration,
}

/// Bounded, non-blocking event channel.
///
/// Sends never wait: once the buffer is full, new events are dropped. The
/// receiving half can be taken exactly once.
#[derive(Debug)]
pub struct EventSink {
    sender: mpsc::Sender<Event>,
    receiver: Mutex<Option<mpsc::Receiver<Event>>>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Returns whether the event was buffered.
    pub fn add_event(&self, event: Event) -> bool {
        self.sender.try_send(event).is_ok()
    }

    pub fn take_receiver(&self) -> Option<mpsc::Receiver<Event>> {
        self.receiver.lock().take()
    }
}

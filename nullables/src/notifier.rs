//! Nullable notifier: records events instead of delivering them.

use guild_types::{GroupEvent, Notifier};
use std::sync::Mutex;

/// Records every event it is handed, in order.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<GroupEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far (for assertions).
    pub fn events(&self) -> Vec<GroupEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event names, in delivery order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(GroupEvent::kind).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &GroupEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

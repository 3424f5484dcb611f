use std::sync::{Arc, Mutex};

use ferry_client::{Observer, Subscription};

/// Observer that records every event it receives, in order
pub struct ChangeRecorder<Ev> {
    events: Mutex<Vec<Ev>>,
}

impl<Ev: Clone + Send + 'static> ChangeRecorder<Ev> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    /// Subscribes a new recorder through `subscribe` and returns it with the
    /// subscription that keeps it registered
    pub fn attach(
        subscribe: impl FnOnce(&Arc<Self>) -> Subscription,
    ) -> (Arc<Self>, Subscription) {
        let recorder = Self::new();
        let subscription = subscribe(&recorder);
        (recorder, subscription)
    }

    pub fn events(&self) -> Vec<Ev> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl<Ev: Clone + Send + 'static> Observer<Ev> for ChangeRecorder<Ev> {
    fn notify(&self, event: &Ev) {
        self.events.lock().unwrap().push(event.clone());
    }
}

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock, Weak,
};

/// Receives events from a [`Notifier`].
pub trait Observer<Ev>: Send + Sync {
    fn notify(&self, event: &Ev);
}

impl<Ev, F> Observer<Ev> for F
where
    F: Fn(&Ev) + Send + Sync,
{
    fn notify(&self, event: &Ev) {
        self(event)
    }
}

type ObserverList<Ev> = Vec<(u64, Weak<dyn Observer<Ev>>)>;

struct NotifierInner<Ev> {
    next_id: AtomicU64,
    observers: RwLock<ObserverList<Ev>>,
}

/// Fan-out point for change events.
///
/// Observers are held weakly, so registering never keeps an observer alive.
/// Events are delivered on the thread that raises them, with no lock held,
/// so an observer is free to call back into whatever raised the event.
pub struct Notifier<Ev> {
    inner: Arc<NotifierInner<Ev>>,
}

impl<Ev: 'static> Notifier<Ev> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                next_id: AtomicU64::new(0),
                observers: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn subscribe<O: Observer<Ev> + 'static>(&self, observer: &Arc<O>) -> Subscription {
        let weak: Weak<dyn Observer<Ev>> = Arc::downgrade(observer) as Weak<dyn Observer<Ev>>;
        self.subscribe_weak(weak)
    }

    pub fn subscribe_weak(&self, observer: Weak<dyn Observer<Ev>>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, observer));

        let inner = Arc::downgrade(&self.inner);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner
                        .observers
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .retain(|(observer_id, _)| *observer_id != id);
                }
            })),
        }
    }

    pub fn notify(&self, event: &Ev) {
        let live: Vec<Arc<dyn Observer<Ev>>> = {
            let mut observers = self
                .inner
                .observers
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            observers.retain(|(_, observer)| observer.strong_count() > 0);
            observers
                .iter()
                .filter_map(|(_, observer)| observer.upgrade())
                .collect()
        };

        for observer in live {
            observer.notify(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(_, observer)| observer.strong_count() > 0)
            .count()
    }

    /// Registrations still held, whether or not their observer is alive.
    #[cfg(test)]
    pub(crate) fn subscription_count(&self) -> usize {
        self.inner
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl<Ev: 'static> Default for Notifier<Ev> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ev> Clone for Notifier<Ev> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Keeps an observer registered. Dropping it unregisters the observer.
#[must_use = "dropping a Subscription unregisters the observer immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback<S, E> = Arc<dyn Fn(&S, &E) + Send + Sync>;

/// Notification channel owned by a service `S` that emits events `E`.
///
/// Callbacks run synchronously in registration order and see the owning
/// service by shared reference, so they may query it (or anything else they
/// captured) but never mutate it mid-dispatch.
pub struct Observers<S: ?Sized, E: ?Sized> {
    next_id: u64,
    subscribers: Vec<(ObserverId, Callback<S, E>)>,
}

impl<S: ?Sized, E: ?Sized> Default for Observers<S, E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }
}

impl<S: ?Sized, E: ?Sized> fmt::Debug for Observers<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<S: ?Sized, E: ?Sized> Observers<S, E> {
    pub fn subscribe(&mut self, callback: impl Fn(&S, &E) + Send + Sync + 'static) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.subscribers.push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        before != self.subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn emit(&self, source: &S, event: &E) {
        for (_, callback) in &self.subscribers {
            callback(source, event);
        }
    }
}

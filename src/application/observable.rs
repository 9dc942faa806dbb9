use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies a subscription so it can be released later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A value that notifies subscribers whenever it changes.
///
/// Subscribers receive the current value immediately on subscribe and then
/// every subsequent value, synchronously, before `set` returns. Callbacks run
/// after the internal lock is released, so they may read the observable.
pub struct Observable<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T: Clone> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value,
                next_id: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().value)
    }

    /// Replace the value and notify every subscriber in subscription order.
    pub fn set(&self, value: T) {
        let (snapshot, subscribers) = {
            let mut inner = self.lock();
            inner.value = value;
            let subscribers: Vec<Callback<T>> =
                inner.subscribers.iter().map(|(_, cb)| cb.clone()).collect();
            (inner.value.clone(), subscribers)
        };

        for callback in subscribers {
            callback(&snapshot);
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let callback: Callback<T> = Arc::new(callback);
        let (id, current) = {
            let mut inner = self.lock();
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.subscribers.push((id, callback.clone()));
            (id, inner.value.clone())
        };
        callback(&current);
        id
    }

    /// Returns false if the subscription was already released.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub, _)| *sub != id);
        inner.subscribers.len() != before
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_receives_current_value() {
        let observable = Observable::new(7);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        observable.subscribe(move |v| sink.lock().unwrap().push(*v));

        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn test_set_notifies_in_order() {
        let observable = Observable::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        observable.subscribe(move |v| sink.lock().unwrap().push(*v));

        observable.set(1);
        observable.set(2);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(observable.get(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let observable = Observable::new(String::new());
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();
        let id = observable.subscribe(move |_| *counter.lock().unwrap() += 1);

        assert!(observable.unsubscribe(id));
        assert!(!observable.unsubscribe(id));
        observable.set("ignored".into());

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(observable.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_may_read_observable() {
        let observable = Arc::new(Observable::new(1));
        let reader = observable.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        observable.subscribe(move |_| sink.lock().unwrap().push(reader.get()));

        observable.set(5);
        assert_eq!(*seen.lock().unwrap(), vec![1, 5]);
    }
}

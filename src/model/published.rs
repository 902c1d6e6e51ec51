use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::trace;

pub type Listener<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A value shared between one writer and any number of readers.
///
/// Readers clone the current `Arc` under a read lock held only for the
/// clone, so a snapshot is never torn and stays alive after a later publish.
/// Listeners run on the writer's thread after every change.
pub struct Published<T> {
    current: RwLock<Arc<T>>,
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_listener: AtomicU64,
}

impl<T> Published<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn load(&self) -> Arc<T> { self.current.read().clone() }

    fn store(&self, value: Arc<T>) {
        let old = std::mem::replace(&mut *self.current.write(), value);
        // The previous value may be the last reference; free it outside the lock.
        drop(old);
    }

    /// Registers `listener`. Registering the same listener twice returns the
    /// id it already has.
    pub fn subscribe(&self, listener: Listener<T>) -> ListenerId {
        let mut listeners = self.listeners.lock();
        if let Some((id, _)) = listeners.iter().find(|(_, l)| Arc::ptr_eq(l, &listener)) {
            return *id;
        }
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        listeners.push((id, listener));
        id
    }

    /// Drops a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) { self.listeners.lock().retain(|(l, _)| *l != id); }

    pub fn listener_count(&self) -> usize { self.listeners.lock().len() }
}

impl<T: PartialEq> Published<T> {
    /// Replaces the value and notifies listeners, unless it is unchanged.
    /// Returns whether anything was published.
    pub fn publish(&self, value: T) -> bool {
        if *self.load() == value {
            return false;
        }
        let value = Arc::new(value);
        self.store(value.clone());
        // Listeners may subscribe or unsubscribe, so they run without the lock held.
        let listeners: Vec<Listener<T>> =
            self.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
        trace!(listeners = listeners.len(), "publishing");
        for listener in listeners {
            listener(&value);
        }
        true
    }
}

static_assertions::assert_impl_all!(Published<String>: Send, Sync);

impl<T: std::fmt::Debug> std::fmt::Debug for Published<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Published")
            .field("current", &self.load())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, Listener<String>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let listener: Listener<String> = Arc::new(move |_: &Arc<String>| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hits, listener)
    }

    #[test]
    fn notifies_only_on_change() {
        let published = Published::new(String::from("1"));
        let (hits, listener) = counter();
        published.subscribe(listener);
        assert!(!published.publish("1".into()));
        assert!(published.publish("2".into()));
        assert!(!published.publish("2".into()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(*published.load(), "2");
    }

    #[test]
    fn subscribe_is_idempotent_and_unsubscribe_tolerant() {
        let published = Published::new(String::new());
        let (hits, listener) = counter();
        let a = published.subscribe(listener.clone());
        let b = published.subscribe(listener);
        assert_eq!(a, b);
        assert_eq!(published.listener_count(), 1);
        published.unsubscribe(a);
        published.unsubscribe(a);
        assert_eq!(published.listener_count(), 0);
        published.publish("x".into());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn snapshots_outlive_later_publishes() {
        let published = Published::new(String::from("a"));
        let before = published.load();
        assert!(published.publish("b".into()));
        assert_eq!(*before, "a");
        assert_eq!(Arc::strong_count(&before), 1);
        assert_eq!(*published.load(), "b");
    }

    #[test]
    fn readers_on_other_threads_see_whole_values() {
        let published = Arc::new(Published::new(vec![0u32; 16]));
        let reader = {
            let published = published.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let v = published.load();
                    assert!(v.iter().all(|x| *x == v[0]));
                }
            })
        };
        for i in 1..200 {
            published.publish(vec![i; 16]);
        }
        reader.join().unwrap();
    }
}

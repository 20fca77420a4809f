//! Minimal reactive values
//!
//! The animation engine does not depend on any particular reactivity
//! implementation. It only needs the pull/push capabilities in
//! [`Observable`]: read the current value, or subscribe to changes.
//! [`Signal`] is a small single-threaded implementation of that contract.

use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::Rc;

new_key_type! {
    /// Handle to a change subscription
    pub struct SubscriptionKey;
}

/// A readable, subscribable value
pub trait Observable<T> {
    /// Pull the current value
    fn get(&self) -> T;

    /// Push: invoke `callback` with every new value after it is set
    fn subscribe(&self, callback: Box<dyn FnMut(&T)>) -> SubscriptionKey;

    /// Remove a subscription; unknown keys are ignored
    fn unsubscribe(&self, key: SubscriptionKey);
}

type Subscriber<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct SignalInner<T> {
    value: T,
    subscribers: SlotMap<SubscriptionKey, Subscriber<T>>,
}

/// A shared, single-threaded reactive cell
pub struct Signal<T> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                value,
                subscribers: SlotMap::with_key(),
            })),
        }
    }

    /// Replace the value and notify subscribers
    ///
    /// Subscribers may read or write signals (including this one) from their
    /// callback. A subscriber that is already running is not re-entered.
    pub fn set(&self, value: T) {
        let (snapshot, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            inner.value = value;
            let subscribers: Vec<Subscriber<T>> =
                inner.subscribers.values().cloned().collect();
            (inner.value.clone(), subscribers)
        };

        for subscriber in subscribers {
            if let Ok(mut callback) = subscriber.try_borrow_mut() {
                (*callback)(&snapshot);
            }
        }
    }

    /// Update the value in place
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.borrow().value);
        self.set(next);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl<T: Clone + 'static> Observable<T> for Signal<T> {
    fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    fn subscribe(&self, callback: Box<dyn FnMut(&T)>) -> SubscriptionKey {
        let subscriber: Subscriber<T> = Rc::new(RefCell::new(callback));
        self.inner.borrow_mut().subscribers.insert(subscriber)
    }

    fn unsubscribe(&self, key: SubscriptionKey) {
        self.inner.borrow_mut().subscribers.remove(key);
    }
}

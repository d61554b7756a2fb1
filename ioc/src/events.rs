//! Change notifications for registration tables.
//!
//! Every container owns a [`Subject`]. Children subscribe to their parent's
//! subject and forward the event to their own subscribers, so a change
//! anywhere up the chain reaches every descendant. Resolver caches are reset
//! by the registering container itself before any event goes out.

use std::fmt;

use crate::dispose::Disposable;
use crate::key::Key;
use crate::runtime::{Shared, Store, WeakShared, next_id};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Registration,
    Unregistration,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Registration => write!(f, "Registration"),
            EventKind::Unregistration => write!(f, "Unregistration"),
        }
    }
}

/// A change in the registration table of `container`.
#[derive(Clone, Debug)]
pub struct ContainerEvent {
    pub container_id: u64,
    pub container: String,
    pub kind: EventKind,
    pub key: Key,
}

pub(crate) type Observer = dyn Fn(&ContainerEvent) + Send + Sync;

#[derive(Default)]
pub(crate) struct Subject {
    observers: Store<Vec<(u64, Shared<Observer>)>>,
}

impl Subject {
    pub(crate) fn subscribe(self: &Shared<Self>, observer: Shared<Observer>) -> Subscription {
        let id = next_id();
        self.observers.write().push((id, observer));
        Subscription {
            subject: Shared::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.observers.write().retain(|(observer, _)| *observer != id);
    }

    /// Notifies a snapshot of the current observers, outside the lock.
    pub(crate) fn emit(&self, event: &ContainerEvent) {
        let observers: Vec<Shared<Observer>> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(event);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.observers.read().len()
    }
}

/// Keeps an observer registered. Disposing or dropping it stops the
/// observer.
pub struct Subscription {
    subject: WeakShared<Subject>,
    id: u64,
}

impl Disposable for Subscription {
    fn dispose(&self) {
        if let Some(subject) = self.subject.upgrade() {
            subject.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Gate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(kind: EventKind) -> ContainerEvent {
        ContainerEvent {
            container_id: 1,
            container: String::from("root"),
            kind,
            key: Key::of::<u8>(),
        }
    }

    #[test]
    fn subscribers_receive_events_until_disposed() {
        let subject = Shared::new(Subject::default());
        let seen = Shared::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let subscription = subject.subscribe(Shared::new(move |e: &ContainerEvent| {
            if e.kind == EventKind::Registration {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        subject.emit(&event(EventKind::Registration));
        subject.emit(&event(EventKind::Unregistration));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(subject.len(), 1);

        subscription.dispose();
        subject.emit(&event(EventKind::Registration));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(subject.len(), 0);
    }

    #[test]
    fn observers_may_subscribe_while_notified() {
        let subject = Shared::new(Subject::default());
        let inner = subject.clone();
        let nested = Shared::new(Gate::new(Vec::new()));
        let kept = nested.clone();
        let _subscription = subject.subscribe(Shared::new(move |_: &ContainerEvent| {
            kept.lock().push(inner.subscribe(Shared::new(|_: &ContainerEvent| {})));
        }));

        subject.emit(&event(EventKind::Registration));
        assert_eq!(subject.len(), 2);
        assert_eq!(nested.lock().len(), 1);
    }

    #[test]
    fn dropping_a_subscription_stops_its_observer() {
        let subject = Shared::new(Subject::default());
        let seen = Shared::new(AtomicUsize::new(0));
        let counter = seen.clone();
        {
            let _subscription = subject.subscribe(Shared::new(move |_: &ContainerEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
            subject.emit(&event(EventKind::Registration));
        }
        subject.emit(&event(EventKind::Registration));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(subject.len(), 0);
    }
}

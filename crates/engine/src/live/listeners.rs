//! Listener registry and panic-isolated dispatch

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tourney_core::{EventKind, EventPayload, UpdateEvent};
use tracing::{error, trace};

/// A registered callback. Identity (for `off`) is the `Arc` pointer.
pub type Listener = Arc<dyn Fn(&UpdateEvent) + Send + Sync>;

/// Wrap a closure as a [`Listener`]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&UpdateEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure over one payload type; other events are ignored
pub fn typed_listener<P, F>(f: F) -> Listener
where
    P: EventPayload,
    F: Fn(&P) + Send + Sync + 'static,
{
    Arc::new(move |event: &UpdateEvent| {
        if let Some(payload) = P::from_event(event) {
            f(payload);
        }
    })
}

/// Event kind -> listeners, in registration order
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns false if it was already registered for `kind`.
    pub fn on(&mut self, kind: EventKind, listener: Listener) -> bool {
        let entries = self.listeners.entry(kind).or_default();
        if entries.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        entries.push(listener);
        true
    }

    /// Remove the first registration of `listener` for `kind`
    pub fn off(&mut self, kind: EventKind, listener: &Listener) -> bool {
        let Some(entries) = self.listeners.get_mut(&kind) else {
            return false;
        };

        let Some(pos) = entries.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return false;
        };

        entries.remove(pos);
        if entries.is_empty() {
            self.listeners.remove(&kind);
        }
        true
    }

    pub fn len(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map(Vec::len).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Copy of the listeners for `kind`, safe to invoke without holding the registry
    pub fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        self.listeners.get(&kind).cloned().unwrap_or_default()
    }
}

/// Registry shared between the connection handle and its session task
#[derive(Clone, Default)]
pub struct SharedListeners {
    inner: Arc<Mutex<ListenerRegistry>>,
}

impl SharedListeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ListenerRegistry> {
        // Listeners never run under the lock, so a poisoned registry is still consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn on(&self, kind: EventKind, listener: Listener) -> bool {
        self.lock().on(kind, listener)
    }

    pub fn off(&self, kind: EventKind, listener: &Listener) -> bool {
        self.lock().off(kind, listener)
    }

    pub fn len(&self, kind: EventKind) -> usize {
        self.lock().len(kind)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Invoke every listener registered for the event's kind.
    ///
    /// Works on a snapshot, so listeners may subscribe or unsubscribe while
    /// being called. A panicking listener is logged and skipped.
    /// Returns how many listeners completed normally.
    pub fn dispatch(&self, event: &UpdateEvent) -> usize {
        let kind = event.kind();
        let snapshot = self.lock().snapshot(kind);

        if snapshot.is_empty() {
            trace!("No listeners for {}", kind);
            return 0;
        }

        invoke_all(&snapshot, event)
    }
}

fn invoke_all(listeners: &[Listener], event: &UpdateEvent) -> usize {
    let mut completed = 0;

    for (index, listener) in listeners.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| listener(event))) {
            Ok(()) => completed += 1,
            Err(panic) => {
                error!(
                    "Listener #{} for {} panicked: {}",
                    index,
                    event.kind(),
                    panic_message(panic.as_ref())
                );
            }
        }
    }

    completed
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_core::{MatchSummary, StatusUpdate, LinkStatus};

    fn match_update(id: &str) -> UpdateEvent {
        serde_json::from_value(serde_json::json!({
            "type": "match_update",
            "data": { "id": id, "round": 1 }
        }))
        .unwrap()
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Listener {
        let log = log.clone();
        listener(move |_| log.lock().unwrap().push(tag.to_string()))
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = SharedListeners::new();
        shared.on(EventKind::MatchUpdate, recorder(&log, "a"));
        shared.on(EventKind::MatchUpdate, recorder(&log, "b"));
        shared.on(EventKind::MatchUpdate, recorder(&log, "c"));

        assert_eq!(shared.dispatch(&match_update("1")), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_siblings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = SharedListeners::new();
        shared.on(EventKind::MatchUpdate, recorder(&log, "first"));
        shared.on(EventKind::MatchUpdate, listener(|_| panic!("listener exploded")));
        shared.on(EventKind::MatchUpdate, recorder(&log, "third"));

        assert_eq!(shared.dispatch(&match_update("1")), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first", "third"]);

        // Registry still usable afterwards
        assert_eq!(shared.dispatch(&match_update("2")), 2);
    }

    #[test]
    fn test_off_after_on_leaves_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = SharedListeners::new();
        let cb = recorder(&log, "x");

        shared.on(EventKind::MatchUpdate, cb.clone());
        assert!(shared.off(EventKind::MatchUpdate, &cb));
        assert_eq!(shared.len(EventKind::MatchUpdate), 0);

        assert_eq!(shared.dispatch(&match_update("1")), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_on_is_idempotent_and_off_unknown_is_noop() {
        let mut registry = ListenerRegistry::new();
        let cb = listener(|_| {});
        let other = listener(|_| {});

        assert!(registry.on(EventKind::FullUpdate, cb.clone()));
        assert!(!registry.on(EventKind::FullUpdate, cb.clone()));
        assert_eq!(registry.len(EventKind::FullUpdate), 1);

        assert!(!registry.off(EventKind::FullUpdate, &other));
        assert!(!registry.off(EventKind::MatchUpdate, &cb));
        assert_eq!(registry.len(EventKind::FullUpdate), 1);
    }

    #[test]
    fn test_listener_removing_itself_mid_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = SharedListeners::new();
        let slot: Arc<Mutex<Option<Listener>>> = Arc::new(Mutex::new(None));

        let self_removing = {
            let shared = shared.clone();
            let slot = slot.clone();
            let log = log.clone();
            listener(move |_| {
                log.lock().unwrap().push("once".to_string());
                if let Some(me) = slot.lock().unwrap().as_ref() {
                    shared.off(EventKind::MatchUpdate, me);
                }
            })
        };
        *slot.lock().unwrap() = Some(self_removing.clone());

        shared.on(EventKind::MatchUpdate, self_removing);
        shared.on(EventKind::MatchUpdate, recorder(&log, "sibling"));

        shared.dispatch(&match_update("1"));
        shared.dispatch(&match_update("2"));

        assert_eq!(*log.lock().unwrap(), vec!["once", "sibling", "sibling"]);
    }

    #[test]
    fn test_unsubscribed_kind_is_noop() {
        let shared = SharedListeners::new();
        shared.on(EventKind::MatchUpdate, listener(|_| panic!("wrong kind")));

        let status = UpdateEvent::ConnectionStatus(StatusUpdate::new(LinkStatus::Connected));
        assert_eq!(shared.dispatch(&status), 0);
    }

    #[test]
    fn test_typed_listener_receives_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let shared = SharedListeners::new();
        let sink = seen.clone();
        shared.on(
            EventKind::MatchUpdate,
            typed_listener(move |m: &MatchSummary| sink.lock().unwrap().push(m.id.clone())),
        );

        shared.dispatch(&match_update("77"));
        assert_eq!(*seen.lock().unwrap(), vec!["77".to_string()]);
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use super::{ConfigError, Settings};

pub type SettingsPatch = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Settings)>;

struct BridgeState {
    settings: Settings,
    revision: u64,
    /// The closure slot is empty while that subscriber is being notified.
    subscribers: Vec<(SubscriptionId, Option<Subscriber>)>,
    next_id: u64,
    notifying: bool,
    renotify: bool,
}

/// Shared, single-threaded settings store. Clones observe the same settings.
#[derive(Clone)]
pub struct ConfigBridge {
    inner: Rc<RefCell<BridgeState>>,
}

impl Default for ConfigBridge {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl ConfigBridge {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BridgeState {
                settings,
                revision: 0,
                subscribers: Vec::new(),
                next_id: 0,
                notifying: false,
                renotify: false,
            })),
        }
    }

    pub fn settings(&self) -> Settings {
        self.inner.borrow().settings.clone()
    }

    pub fn read<R>(&self, read: impl FnOnce(&Settings) -> R) -> R {
        read(&self.inner.borrow().settings)
    }

    pub fn revision(&self) -> u64 {
        self.inner.borrow().revision
    }

    pub fn publish(&self, patch: &SettingsPatch) -> Result<(), ConfigError> {
        let applied = self.inner.borrow_mut().settings.merge(patch)?;
        if applied.is_empty() {
            return Ok(());
        }

        tracing::debug!(keys = ?applied, "settings patch published");
        self.notify();
        Ok(())
    }

    pub fn replace(&self, settings: Settings) {
        self.inner.borrow_mut().settings = settings;
        self.notify();
    }

    pub fn subscribe(&self, subscriber: impl FnMut(&Settings) + 'static) -> SubscriptionId {
        let mut state = self.inner.borrow_mut();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.subscribers.push((id, Some(Box::new(subscriber))));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.inner.borrow_mut();
        let before = state.subscribers.len();
        state.subscribers.retain(|(existing, _)| *existing != id);
        state.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .any(|(existing, _)| *existing == id)
    }

    /// Subscribers may call back into the bridge. A nested publish reruns
    /// the round with the newest settings once the current one finishes, so
    /// a subscriber that changes settings on every call never lets it end.
    fn notify(&self) {
        {
            let mut state = self.inner.borrow_mut();
            state.revision += 1;
            if state.notifying {
                state.renotify = true;
                return;
            }
            state.notifying = true;
        }

        loop {
            let (snapshot, mut taken) = {
                let mut state = self.inner.borrow_mut();
                state.renotify = false;
                let taken = state
                    .subscribers
                    .iter_mut()
                    .filter_map(|(id, slot)| slot.take().map(|subscriber| (*id, subscriber)))
                    .collect::<Vec<_>>();
                (state.settings.clone(), taken)
            };

            for (id, subscriber) in &mut taken {
                if self.is_subscribed(*id) {
                    subscriber(&snapshot);
                }
            }

            let mut unsubscribed = Vec::new();
            let finished = {
                let mut state = self.inner.borrow_mut();
                for (id, subscriber) in taken {
                    match state.subscribers.iter_mut().find(|(existing, _)| *existing == id) {
                        Some((_, slot)) => *slot = Some(subscriber),
                        None => unsubscribed.push(subscriber),
                    }
                }
                if !state.renotify {
                    state.notifying = false;
                }
                !state.notifying
            };
            drop(unsubscribed);

            if finished {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> SettingsPatch {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_publish_notifies_subscribers_with_merged_settings() {
        let bridge = ConfigBridge::default();
        let seen = Rc::new(Cell::new(0.0_f32));
        let sink = Rc::clone(&seen);
        bridge.subscribe(move |settings| sink.set(settings.node_size));

        bridge.publish(&patch(json!({"node_size": 11.0}))).unwrap();

        assert_eq!(seen.get(), 11.0);
        assert_eq!(bridge.revision(), 1);
        assert_eq!(bridge.read(|settings| settings.node_size), 11.0);
    }

    #[test]
    fn test_clones_share_state() {
        let bridge = ConfigBridge::default();
        let surface = bridge.clone();
        surface.publish(&patch(json!({"show_islands": false}))).unwrap();
        assert!(!bridge.settings().show_islands);
    }

    #[test]
    fn test_unknown_only_patch_does_not_notify() {
        let bridge = ConfigBridge::default();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        bridge.subscribe(move |_| counter.set(counter.get() + 1));

        bridge.publish(&patch(json!({"bogus": true}))).unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(bridge.revision(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let bridge = ConfigBridge::default();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let id = bridge.subscribe(move |_| counter.set(counter.get() + 1));

        bridge.replace(Settings::default());
        assert!(bridge.unsubscribe(id));
        bridge.replace(Settings::default());

        assert_eq!(calls.get(), 1);
        assert_eq!(bridge.subscriber_count(), 0);
        assert!(!bridge.unsubscribe(id));
    }

    #[test]
    fn test_unsubscribe_inside_callback_sticks() {
        let bridge = ConfigBridge::default();
        let handle = bridge.clone();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let own_id = Rc::new(Cell::new(None));
        let slot = Rc::clone(&own_id);
        let id = bridge.subscribe(move |_| {
            counter.set(counter.get() + 1);
            if let Some(id) = slot.get() {
                handle.unsubscribe(id);
            }
        });
        own_id.set(Some(id));

        bridge.replace(Settings::default());
        bridge.replace(Settings::default());

        assert_eq!(calls.get(), 1);
        assert_eq!(bridge.subscriber_count(), 0);
    }

    #[test]
    fn test_nested_publish_reaches_every_subscriber() {
        let bridge = ConfigBridge::default();
        let writer = bridge.clone();
        bridge.subscribe(move |settings| {
            if settings.node_size < 12.0 {
                writer.publish(&patch(json!({"node_size": 12.0}))).unwrap();
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bridge.subscribe(move |settings| sink.borrow_mut().push(settings.node_size));

        bridge.publish(&patch(json!({"node_size": 9.0}))).unwrap();

        assert_eq!(bridge.revision(), 2);
        assert_eq!(seen.borrow().last(), Some(&12.0));
        assert_eq!(bridge.subscriber_count(), 2);
    }

    #[test]
    fn test_subscriber_may_read_bridge_during_notification() {
        let bridge = ConfigBridge::default();
        let reader = bridge.clone();
        let seen = Rc::new(Cell::new(0_u64));
        let sink = Rc::clone(&seen);
        bridge.subscribe(move |_| sink.set(reader.revision()));

        bridge.replace(Settings::default());
        assert_eq!(seen.get(), 1);
    }
}

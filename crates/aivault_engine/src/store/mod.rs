//! Path-addressable state tree with change notification.
//!
//! [`PathStore`] holds a JSON tree. Every field is addressable by a dotted
//! path; writes create missing intermediate objects and publish, in order,
//! a generic mutation event, a path event, and (for nested paths) a section
//! event for the top-level key.
//!
//! Dispatch is synchronous and ordered by subscription order. A listener
//! that returns an error or panics is logged and skipped; the remaining
//! listeners still run. Events raised while a dispatch is in progress are
//! queued and delivered once the current event is finished, so every public
//! operation runs to completion before the next event is observed.

mod events;
mod merge;
mod path;

pub use events::{EventFilter, Listener, StoreEvent, SubscriptionId};
pub use merge::deep_merge;
pub use path::StatePath;

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::{ListenerError, StoreError};
use events::Subscription;

#[derive(Default)]
struct EventBus {
    subscriptions: Vec<Subscription>,
    pending: VecDeque<StoreEvent>,
    dispatching: bool,
    // Listeners taken out of `subscriptions` by the running dispatch.
    parked: Vec<SubscriptionId>,
    detached: Vec<SubscriptionId>,
    next_id: u64,
}

/// Mutable state tree with publish/subscribe notifications.
pub struct PathStore {
    root: Value,
    bus: EventBus,
}

impl std::fmt::Debug for PathStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathStore")
            .field("root", &self.root)
            .field("listeners", &self.bus.subscriptions.len())
            .finish()
    }
}

impl Default for PathStore {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl PathStore {
    /// Creates a store over `root`.
    #[instrument(skip(root))]
    pub fn new(root: Value) -> Self {
        Self {
            root,
            bus: EventBus::default(),
        }
    }

    /// Returns the whole tree.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Returns a deep copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.root.clone()
    }

    /// Reads the value at `path`, or `None` if any segment is missing.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = StatePath::parse(path).ok()?;
        path.segments()
            .iter()
            .try_fold(&self.root, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Reads and deserializes the value at `path`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Reads a boolean, treating anything else as `false`.
    pub fn get_bool(&self, path: &str) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Reads a non-negative integer.
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(Value::as_u64)
    }

    /// Writes `value` at `path`, creating intermediate objects as needed.
    ///
    /// Missing or `null` intermediates become empty objects. Array elements
    /// may be addressed by index but arrays never grow through `set`.
    #[instrument(skip(self, value), fields(path = %path))]
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), StoreError> {
        let path = StatePath::parse(path)?;
        let segments = path.segments();
        let (last, parents) = segments
            .split_last()
            .ok_or(StoreError::EmptyPath)?;

        if self.root.is_null() {
            self.root = Value::Object(Map::new());
        }

        let mut node = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            node = child_or_create(node, segment, &path, depth)?;
        }

        let old_value = match node {
            Value::Object(map) => map.insert(last.clone(), value.clone()),
            Value::Array(items) => {
                let slot = last
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| StoreError::BadIndex {
                        path: path.prefix(parents.len()),
                        index: last.clone(),
                    })?;
                Some(std::mem::replace(slot, value.clone()))
            }
            _ => return Err(StoreError::NotAContainer(path.prefix(parents.len()))),
        };

        debug!("State updated");
        self.emit(StoreEvent::StateChanged {
            path: path.to_string(),
            value: value.clone(),
            old_value: old_value.clone(),
        });
        self.emit(StoreEvent::PathChanged {
            path: path.to_string(),
            value: value.clone(),
            old_value,
        });
        if path.is_nested() {
            self.emit(StoreEvent::SectionChanged {
                section: path.section().to_string(),
                path: path.to_string(),
                value,
            });
        }
        Ok(())
    }

    /// Replaces the whole tree with `root` and emits [`StoreEvent::StateReset`].
    #[instrument(skip(self, root))]
    pub fn reset(&mut self, root: Value) {
        self.root = root;
        self.emit(StoreEvent::StateReset);
    }

    /// Replaces the whole tree with `root` and emits [`StoreEvent::StateLoaded`].
    #[instrument(skip(self, root))]
    pub fn restore(&mut self, root: Value) {
        self.root = root;
        self.emit(StoreEvent::StateLoaded);
    }

    /// Registers a closure for events passing `filter`.
    pub fn subscribe<F>(&mut self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent, &mut PathStore) -> Result<(), ListenerError> + 'static,
    {
        self.subscribe_listener(filter, Box::new(handler))
    }

    /// Registers a boxed [`Listener`] for events passing `filter`.
    #[instrument(skip(self, listener))]
    pub fn subscribe_listener(
        &mut self,
        filter: EventFilter,
        listener: Box<dyn Listener>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.bus.next_id);
        self.bus.next_id += 1;
        self.bus.subscriptions.push(Subscription {
            id,
            filter,
            listener,
        });
        debug!(subscription = id.0, "Listener subscribed");
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    #[instrument(skip(self))]
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.bus.subscriptions.len();
        self.bus.subscriptions.retain(|s| s.id != id);
        if self.bus.subscriptions.len() != before {
            return true;
        }
        if self.bus.parked.contains(&id) && !self.bus.detached.contains(&id) {
            self.bus.detached.push(id);
            return true;
        }
        false
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.bus.subscriptions.len()
    }

    /// Publishes `event` to every matching listener.
    pub fn emit(&mut self, event: StoreEvent) {
        self.bus.pending.push_back(event);
        if self.bus.dispatching {
            return;
        }
        self.bus.dispatching = true;
        while let Some(event) = self.bus.pending.pop_front() {
            self.dispatch(&event);
        }
        self.bus.dispatching = false;
    }

    fn dispatch(&mut self, event: &StoreEvent) {
        let mut active = std::mem::take(&mut self.bus.subscriptions);
        self.bus.parked = active.iter().map(|s| s.id).collect();

        for subscription in active.iter_mut() {
            if self.bus.detached.contains(&subscription.id) || !subscription.filter.matches(event) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                subscription.listener.on_event(event, self)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    event = event.name(),
                    subscription = subscription.id.0,
                    error = %e,
                    "Listener failed"
                ),
                Err(_) => warn!(
                    event = event.name(),
                    subscription = subscription.id.0,
                    "Listener panicked"
                ),
            }
        }

        // Listeners added during dispatch land in the (emptied) live list.
        active.append(&mut self.bus.subscriptions);
        self.bus.parked.clear();
        let detached = std::mem::take(&mut self.bus.detached);
        active.retain(|s| !detached.contains(&s.id));
        self.bus.subscriptions = active;
    }
}

fn child_or_create<'a>(
    node: &'a mut Value,
    segment: &str,
    path: &StatePath,
    depth: usize,
) -> Result<&'a mut Value, StoreError> {
    let child = match node {
        Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get_mut(i))
            .ok_or_else(|| StoreError::BadIndex {
                path: path.prefix(depth),
                index: segment.to_string(),
            })?,
        _ => return Err(StoreError::NotAContainer(path.prefix(depth))),
    };
    if child.is_null() {
        *child = Value::Object(Map::new());
    }
    Ok(child)
}

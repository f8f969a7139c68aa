//! Publish/subscribe channel that keeps facet state consistent across forms.
//!
//! Every result table on a page renders its own facet form. When a facet
//! changes in one form the change is published on the facet's topic and
//! replayed into every other form that exposes the same facet. Replayed
//! changes carry [`ChangeOrigin::Sync`] and are never published again, which
//! is what keeps N forms from echoing a change back and forth forever.
//!
//! Dispatch is synchronous: `publish` returns once every subscriber has
//! applied (or ignored) the message.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// Where a state change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A genuine user gesture in this form.
    User,
    /// A replay of a change that happened in another form.
    Sync,
}

impl ChangeOrigin {
    /// Only user-initiated changes are broadcast to sibling forms.
    pub fn should_publish(self) -> bool {
        matches!(self, Self::User)
    }
}

/// The value a sync message refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetValue {
    /// A node of a hierarchical facet, identified by its lineage path.
    Term(String),
    /// The committed bounds of a range facet.
    Range { min: f64, max: f64 },
}

/// A single facet change travelling between forms.
///
/// For term facets `checked` is the new checkbox value. For range facets it
/// carries the facet's enabled flag.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetSyncMessage {
    pub facet_name: String,
    pub facet_value: FacetValue,
    pub checked: bool,
    pub origin_form_id: String,
}

/// Something that materialises facet state and can replay sync messages.
pub trait FacetSubscriber: Send + Sync {
    fn form_id(&self) -> &str;

    /// Applies a message tagged [`ChangeOrigin::Sync`].
    ///
    /// Returns `true` when local state changed. Targets the subscriber does not
    /// expose must be ignored and reported as unchanged.
    fn apply_sync(&self, message: &FacetSyncMessage) -> bool;
}

struct Subscription {
    form_id: String,
    subscriber: Weak<dyn FacetSubscriber>,
}

/// Process-wide facet sync channel with one topic per facet name.
///
/// Cloning the bus yields another handle to the same topics.
#[derive(Clone, Default)]
pub struct FacetSyncBus {
    topics: Arc<RwLock<HashMap<String, Vec<Subscription>>>>,
}

impl std::fmt::Debug for FacetSyncBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let topics = self.topics.read();
        f.debug_struct("FacetSyncBus")
            .field("topics", &topics.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FacetSyncBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `subscriber` to the topic for `facet_name`.
    ///
    /// The bus only keeps a weak reference; dropped subscribers are pruned on
    /// the next publish. Subscribing the same form twice replaces the earlier
    /// subscription.
    pub fn subscribe<S>(&self, facet_name: &str, subscriber: &Arc<S>)
    where
        S: FacetSubscriber + 'static,
    {
        let form_id = subscriber.form_id().to_string();
        let weak: Weak<S> = Arc::downgrade(subscriber);
        let weak: Weak<dyn FacetSubscriber> = weak;

        let mut topics = self.topics.write();
        let subscriptions = topics.entry(facet_name.to_string()).or_default();
        subscriptions.retain(|subscription| subscription.form_id != form_id);
        subscriptions.push(Subscription {
            form_id,
            subscriber: weak,
        });
    }

    /// Removes a form from every topic.
    pub fn unsubscribe_form(&self, form_id: &str) {
        let mut topics = self.topics.write();
        for subscriptions in topics.values_mut() {
            subscriptions.retain(|subscription| subscription.form_id != form_id);
        }
        topics.retain(|_, subscriptions| !subscriptions.is_empty());
    }

    /// Number of live subscribers on a topic.
    pub fn subscriber_count(&self, facet_name: &str) -> usize {
        self.topics
            .read()
            .get(facet_name)
            .map(|subscriptions| {
                subscriptions
                    .iter()
                    .filter(|subscription| subscription.subscriber.strong_count() > 0)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Replays `message` into every subscriber of its topic except the origin.
    ///
    /// Returns how many forms changed state as a result.
    pub fn publish(&self, message: &FacetSyncMessage) -> usize {
        // Snapshot the targets so no lock is held while subscribers run; a
        // subscriber may subscribe or unsubscribe from inside `apply_sync`.
        let (targets, has_dead) = {
            let topics = self.topics.read();
            let Some(subscriptions) = topics.get(&message.facet_name) else {
                log::debug!(
                    "facet sync: no subscribers for facet={} origin={}",
                    message.facet_name,
                    message.origin_form_id
                );
                return 0;
            };
            let mut has_dead = false;
            let mut targets = Vec::with_capacity(subscriptions.len());
            for subscription in subscriptions {
                if subscription.form_id == message.origin_form_id {
                    continue;
                }
                match subscription.subscriber.upgrade() {
                    Some(subscriber) => targets.push(subscriber),
                    None => has_dead = true,
                }
            }
            (targets, has_dead)
        };

        if has_dead {
            self.prune(&message.facet_name);
        }

        let mut changed = 0;
        for target in &targets {
            if target.apply_sync(message) {
                changed += 1;
            }
        }

        log::debug!(
            "facet sync: facet={} value={:?} checked={} origin={} targets={} changed={}",
            message.facet_name,
            message.facet_value,
            message.checked,
            message.origin_form_id,
            targets.len(),
            changed
        );
        changed
    }

    fn prune(&self, facet_name: &str) {
        let mut topics = self.topics.write();
        if let Some(subscriptions) = topics.get_mut(facet_name) {
            subscriptions.retain(|subscription| subscription.subscriber.strong_count() > 0);
            if subscriptions.is_empty() {
                topics.remove(facet_name);
            }
        }
    }
}

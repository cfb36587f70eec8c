//! Named-channel frame router
//!
//! Producers publish decoded frames on a channel name; every subscription
//! whose channel set contains that name gets a synchronous callback.
//! Channels are implicit: a channel exists while someone subscribes to it.
//!
//! `publish` copies the matching subscriptions out of the registry and
//! releases the lock before calling anyone. Callbacks may therefore
//! subscribe or unsubscribe (themselves included) without deadlocking; a
//! removal made during a fan-out takes effect on the next publish.

use crate::frame::MediaFrame;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Handle of a subscription. Never reused by the pipe that issued it.
pub type SubscriptionId = u64;

/// Frame callback: `(channel, subscription id, frame or end-of-stream)`
pub type FrameCallback = dyn Fn(&str, SubscriptionId, Option<&MediaFrame>) + Send + Sync;

/// Callback run once when a subscription is removed
pub type CleanupCallback = Box<dyn FnOnce() + Send>;

struct Subscription {
    id: SubscriptionId,
    channels: HashSet<String>,
    on_frame: Box<FrameCallback>,
    on_cleanup: Mutex<Option<CleanupCallback>>,
}

struct Registry {
    next_id: SubscriptionId,
    subscriptions: BTreeMap<SubscriptionId, Arc<Subscription>>,
}

/// Publish/subscribe router for decoded frames
pub struct FramePipe {
    registry: Mutex<Registry>,
}

impl FramePipe {
    /// Create an empty router
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 1,
                subscriptions: BTreeMap::new(),
            }),
        }
    }

    /// Subscribe to `channels` without a cleanup callback
    pub fn subscribe<I, S, F>(&self, channels: I, on_frame: F) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, SubscriptionId, Option<&MediaFrame>) + Send + Sync + 'static,
    {
        self.register(channels, Box::new(on_frame), None)
    }

    /// Subscribe to `channels`; `on_cleanup` runs once on unsubscribe
    pub fn subscribe_with_cleanup<I, S, F, C>(
        &self,
        channels: I,
        on_frame: F,
        on_cleanup: C,
    ) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, SubscriptionId, Option<&MediaFrame>) + Send + Sync + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.register(channels, Box::new(on_frame), Some(Box::new(on_cleanup)))
    }

    fn register<I, S>(
        &self,
        channels: I,
        on_frame: Box<FrameCallback>,
        on_cleanup: Option<CleanupCallback>,
    ) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: HashSet<String> = channels.into_iter().map(Into::into).collect();
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;

        debug!("Subscription {} on channels {:?}", id, channels);
        registry.subscriptions.insert(
            id,
            Arc::new(Subscription {
                id,
                channels,
                on_frame,
                on_cleanup: Mutex::new(on_cleanup),
            }),
        );
        id
    }

    /// Remove a subscription and run its cleanup.
    ///
    /// Unknown or already removed ids are ignored. Returns whether a
    /// subscription was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.lock().subscriptions.remove(&id);
        match removed {
            Some(subscription) => {
                debug!("Unsubscribed {}", id);
                let cleanup = subscription.on_cleanup.lock().take();
                if let Some(cleanup) = cleanup {
                    cleanup();
                }
                true
            }
            None => false,
        }
    }

    /// Deliver `frame` to every subscription of `channel`, in id order.
    ///
    /// `None` is an end-of-stream marker. Returns the number of callbacks made.
    pub fn publish(&self, channel: &str, frame: Option<&MediaFrame>) -> usize {
        let targets: Vec<Arc<Subscription>> = self
            .registry
            .lock()
            .subscriptions
            .values()
            .filter(|s| s.channels.contains(channel))
            .cloned()
            .collect();

        trace!("Publishing on {} to {} subscribers", channel, targets.len());
        for subscription in &targets {
            (subscription.on_frame)(channel, subscription.id, frame);
        }
        targets.len()
    }

    /// Live subscription count
    pub fn subscription_count(&self) -> usize {
        self.registry.lock().subscriptions.len()
    }

    /// Whether `id` is still subscribed
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.registry.lock().subscriptions.contains_key(&id)
    }

    /// Ids subscribed to `channel`, ascending
    pub fn channel_subscribers(&self, channel: &str) -> Vec<SubscriptionId> {
        self.registry
            .lock()
            .subscriptions
            .values()
            .filter(|s| s.channels.contains(channel))
            .map(|s| s.id)
            .collect()
    }
}

impl Default for FramePipe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FramePipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePipe")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_ids_never_reused() {
        let pipe = FramePipe::new();
        let a = pipe.subscribe(["x"], |_, _, _| {});
        assert!(pipe.unsubscribe(a));
        let b = pipe.subscribe(["x"], |_, _, _| {});
        assert!(b > a);
        assert!(!pipe.is_subscribed(a));
    }

    #[test]
    fn test_cleanup_runs_once() {
        let pipe = FramePipe::new();
        let cleanups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cleanups);
        let id = pipe.subscribe_with_cleanup(["x"], |_, _, _| {}, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(pipe.unsubscribe(id));
        assert!(!pipe.unsubscribe(id));
        assert!(!pipe.unsubscribe(9999));
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_end_of_stream_delivered() {
        let pipe = FramePipe::new();
        let eos = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&eos);
        pipe.subscribe(["v"], move |_, _, frame| {
            if frame.is_none() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(pipe.publish("v", None), 1);
        assert_eq!(eos.load(Ordering::SeqCst), 1);
    }
}

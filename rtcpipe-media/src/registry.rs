//! Track arena
//!
//! Tracks are addressed by a [`TrackId`]. Attaching a track to a channel
//! subscribes a writer on the frame pipe that pushes every published frame
//! into the track's buffer; detaching (or erasing) unsubscribes it and the
//! subscription's cleanup clears the buffer.
//!
//! Consumers that need to react once a frame has reached a buffer register a
//! hook with [`TrackRegistry::on_buffered`]. Hooks are keyed by channel, so
//! they fire for whichever track is attached there, regardless of the order
//! in which the track and the hook were set up.

use crate::buffer::{AudioBufferConfig, VideoBufferConfig};
use crate::error::{MediaError, MediaResult};
use crate::frame::MediaFrame;
use crate::framepipe::{FramePipe, SubscriptionId};
use crate::track::MediaTrack;
use dashmap::DashMap;
use rtcpipe_core::MediaKind;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of a track in a [`TrackRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(Uuid);

impl TrackId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying uuid
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a hook registered with [`TrackRegistry::on_buffered`]
pub type HookId = u64;

/// Called after a published frame (or end of stream) reached the track
/// attached to a channel
pub type BufferedCallback = dyn Fn(&str, &MediaTrack, Option<&MediaFrame>) + Send + Sync;

struct BufferedHook {
    channel: String,
    callback: Arc<BufferedCallback>,
}

#[derive(Default)]
struct Hooks {
    next_id: AtomicU64,
    hooks: DashMap<HookId, BufferedHook>,
}

impl Hooks {
    /// Callbacks for `channel` in registration order, cloned out of the map
    fn for_channel(&self, channel: &str) -> Vec<Arc<BufferedCallback>> {
        let mut matching: Vec<(HookId, Arc<BufferedCallback>)> = self
            .hooks
            .iter()
            .filter(|hook| hook.channel == channel)
            .map(|hook| (*hook.key(), Arc::clone(&hook.callback)))
            .collect();
        matching.sort_by_key(|(id, _)| *id);
        matching.into_iter().map(|(_, callback)| callback).collect()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").field("count", &self.hooks.len()).finish()
    }
}

#[derive(Debug)]
struct TrackEntry {
    track: MediaTrack,
    channel: Option<String>,
    subscription: Option<SubscriptionId>,
}

/// Owns the tracks of one engine and their channel attachments
#[derive(Debug)]
pub struct TrackRegistry {
    pipe: Arc<FramePipe>,
    video: VideoBufferConfig,
    audio: AudioBufferConfig,
    tracks: DashMap<TrackId, TrackEntry>,
    hooks: Arc<Hooks>,
}

impl TrackRegistry {
    /// Registry writing through `pipe`, default buffer settings
    pub fn new(pipe: Arc<FramePipe>) -> Self {
        Self::with_config(pipe, VideoBufferConfig::default(), AudioBufferConfig::default())
    }

    /// Registry whose tracks use the given buffer settings
    pub fn with_config(
        pipe: Arc<FramePipe>,
        video: VideoBufferConfig,
        audio: AudioBufferConfig,
    ) -> Self {
        Self {
            pipe,
            video,
            audio,
            tracks: DashMap::new(),
            hooks: Arc::new(Hooks::default()),
        }
    }

    /// Frame pipe the registry subscribes on
    pub fn pipe(&self) -> &Arc<FramePipe> {
        &self.pipe
    }

    /// Create an unattached track of `kind`
    pub fn create(&self, kind: MediaKind) -> MediaResult<TrackId> {
        let track = MediaTrack::with_config(kind, self.video, self.audio)?;
        let id = TrackId::new();
        self.tracks.insert(
            id,
            TrackEntry {
                track,
                channel: None,
                subscription: None,
            },
        );
        debug!("Created {} track {}", kind, id);
        Ok(id)
    }

    /// Shared handle to a track's buffer
    pub fn get(&self, id: TrackId) -> Option<MediaTrack> {
        self.tracks.get(&id).map(|entry| entry.track.clone())
    }

    /// Feed frames published on `channel` into the track.
    ///
    /// A track feeds from one channel at a time; attaching again moves it.
    pub fn attach(&self, id: TrackId, channel: &str) -> MediaResult<()> {
        let track = self.get(id).ok_or_else(|| unknown_track(id))?;
        self.detach(id);

        let writer = track.clone();
        let cleared = track.clone();
        let hooks = Arc::clone(&self.hooks);
        let subscription = self.pipe.subscribe_with_cleanup(
            [channel],
            move |channel, _, frame| {
                if let Err(e) = writer.push(frame) {
                    warn!("Dropping frame on {}: {}", channel, e);
                    return;
                }
                for callback in hooks.for_channel(channel) {
                    callback(channel, &writer, frame);
                }
            },
            move || cleared.clear(),
        );

        match self.tracks.get_mut(&id) {
            Some(mut entry) => {
                entry.channel = Some(channel.to_string());
                entry.subscription = Some(subscription);
            }
            None => {
                // Erased while we were subscribing
                self.pipe.unsubscribe(subscription);
                return Err(unknown_track(id));
            }
        }
        info!("Track {} attached to channel {}", id, channel);
        Ok(())
    }

    /// Stop feeding the track; its buffer is cleared. Returns whether it was attached.
    pub fn detach(&self, id: TrackId) -> bool {
        let subscription = match self.tracks.get_mut(&id) {
            Some(mut entry) => {
                entry.channel = None;
                entry.subscription.take()
            }
            None => None,
        };
        match subscription {
            Some(subscription) => self.pipe.unsubscribe(subscription),
            None => false,
        }
    }

    /// Channel the track is attached to
    pub fn channel(&self, id: TrackId) -> Option<String> {
        self.tracks.get(&id).and_then(|entry| entry.channel.clone())
    }

    /// Track attached to `channel`, if any
    pub fn channel_track(&self, channel: &str) -> Option<MediaTrack> {
        self.tracks
            .iter()
            .find(|entry| entry.channel.as_deref() == Some(channel))
            .map(|entry| entry.track.clone())
    }

    /// Call `callback` each time a frame published on `channel` has been
    /// pushed into the track attached there.
    ///
    /// Callbacks run on the publishing thread, after the push, in
    /// registration order. Nothing fires while no track is attached.
    pub fn on_buffered<F>(&self, channel: &str, callback: F) -> HookId
    where
        F: Fn(&str, &MediaTrack, Option<&MediaFrame>) + Send + Sync + 'static,
    {
        let id = self.hooks.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.hooks.hooks.insert(
            id,
            BufferedHook {
                channel: channel.to_string(),
                callback: Arc::new(callback),
            },
        );
        debug!("Buffered hook {} registered on {}", id, channel);
        id
    }

    /// Remove a hook. Returns whether it was registered.
    pub fn remove_hook(&self, id: HookId) -> bool {
        self.hooks.hooks.remove(&id).is_some()
    }

    /// Remove a track, detaching and clearing it
    pub fn erase(&self, id: TrackId) -> bool {
        let entry = match self.tracks.remove(&id) {
            Some((_, entry)) => entry,
            None => return false,
        };
        if let Some(subscription) = entry.subscription {
            self.pipe.unsubscribe(subscription);
        }
        entry.track.clear();
        debug!("Erased track {}", id);
        true
    }

    /// Number of live tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the registry holds no tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

fn unknown_track(id: TrackId) -> MediaError {
    MediaError::InvalidConfiguration {
        message: format!("unknown track {}", id),
    }
}

//! Hold-to-talk shortcut matcher.
//!
//! Tracks the set of held keys and turns raw downs/ups into at most one
//! press-start and one press-end per hold episode. OS hooks repeat downs
//! while a key is held and occasionally lose ups, so the matcher debounces
//! the former and heals from the latter.

use crate::{
    clock::Timestamp,
    keys::{KeyDirection, KeyId, RawKeyEvent, ShortcutCombo},
};

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};
use uuid::Uuid;

/// Edge produced by the matcher for the lifecycle bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherTransition {
    /// The combination just became fully held.
    PressStart {
        /// Fresh identifier for the hold episode.
        request_id: Uuid,
        /// When the completing key went down.
        timestamp: Timestamp,
    },
    /// A required key was released, or the episode was found stale.
    PressEnd {
        /// Identifier of the episode being closed.
        request_id: Uuid,
        /// Earliest known release time.
        timestamp: Timestamp,
    },
}

#[derive(Debug, Clone, Copy)]
struct HeldKey {
    last_seen: Instant,
    /// Set when an episode ended while this key was still held.
    carried_since: Option<Instant>,
}

impl HeldKey {
    fn fresh(at: Instant) -> Self {
        Self {
            last_seen: at,
            carried_since: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Episode {
    request_id: Uuid,
    started_at: Instant,
}

/// Stateful matcher for a single [`ShortcutCombo`].
#[derive(Debug)]
pub struct ShortcutMatcher {
    combo: ShortcutCombo,
    grace: Duration,
    held: HashMap<KeyId, HeldKey>,
    last_down: Option<KeyId>,
    episode: Option<Episode>,
}

impl ShortcutMatcher {
    /// Create a matcher. `grace` bounds key-repeat spacing, how old a held
    /// key may be before an unmatched down discards it, and how long a key
    /// held across an episode end may still complete the next chord.
    pub fn new(combo: ShortcutCombo, grace: Duration) -> Self {
        Self {
            combo,
            grace,
            held: HashMap::new(),
            last_down: None,
            episode: None,
        }
    }

    /// The combination being matched.
    pub fn combo(&self) -> &ShortcutCombo {
        &self.combo
    }

    /// Whether a hold episode is currently open.
    pub fn is_active(&self) -> bool {
        self.episode.is_some()
    }

    /// Number of keys currently believed held.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Feed one raw event; returns the transitions it caused, in order.
    pub fn on_event(&mut self, event: &RawKeyEvent) -> Vec<MatcherTransition> {
        match event.direction {
            KeyDirection::Down => self.on_down(&event.key, event.at),
            KeyDirection::Up => self.on_up(&event.key, event.at),
        }
    }

    fn on_down(&mut self, key: &KeyId, at: Instant) -> Vec<MatcherTransition> {
        let mut transitions = Vec::new();
        self.expire_carried(at);

        if let Some(held) = self.held.get(key).copied() {
            let is_repeat = self.last_down.as_ref() == Some(key)
                && at.saturating_duration_since(held.last_seen) <= self.grace;

            if is_repeat {
                self.held.insert(key.clone(), HeldKey::fresh(at));
                return transitions;
            }

            // A second down without an up: this key's release was lost.
            warn!(
                key = %key,
                stale_ms = at.saturating_duration_since(held.last_seen).as_millis(),
                "Unmatched key-down, healing stale held state"
            );
            if let Some(episode) = self.episode.take() {
                info!(request_id = %episode.request_id, "Stale hold episode closed");
                transitions.push(MatcherTransition::PressEnd {
                    request_id: episode.request_id,
                    timestamp: Timestamp::from_instant(held.last_seen.max(episode.started_at)),
                });
            }
            let grace = self.grace;
            self.held
                .retain(|_, k| at.saturating_duration_since(k.last_seen) <= grace);
        }

        self.held.insert(key.clone(), HeldKey::fresh(at));
        self.last_down = Some(key.clone());

        if self.episode.is_none() && self.combo.is_satisfied(|k| self.held.contains_key(k)) {
            let episode = Episode {
                request_id: Uuid::new_v4(),
                started_at: at,
            };
            self.episode = Some(episode);
            debug!(request_id = %episode.request_id, combo = %self.combo, "Hold episode started");
            transitions.push(MatcherTransition::PressStart {
                request_id: episode.request_id,
                timestamp: Timestamp::from_instant(at),
            });
        }

        transitions
    }

    /// Forget keys that outlived an episode end by more than the grace
    /// period without being seen again. Their ups were most likely lost.
    fn expire_carried(&mut self, at: Instant) {
        let grace = self.grace;
        self.held.retain(|key, held| match held.carried_since {
            Some(since) if at.saturating_duration_since(since) > grace => {
                debug!(key = %key, "Dropping key carried over from an ended episode");
                false
            }
            _ => true,
        });
    }

    fn on_up(&mut self, key: &KeyId, at: Instant) -> Vec<MatcherTransition> {
        if self.held.remove(key).is_none() {
            debug!(key = %key, "Key-up without matching down ignored");
            return Vec::new();
        }

        if self.last_down.as_ref() == Some(key) {
            self.last_down = None;
        }

        if !self.combo.contains(key) {
            return Vec::new();
        }

        match self.episode.take() {
            Some(episode) => {
                debug!(
                    request_id = %episode.request_id,
                    held_ms = at.saturating_duration_since(episode.started_at).as_millis(),
                    "Hold episode ended"
                );
                for held in self.held.values_mut() {
                    held.carried_since.get_or_insert(at);
                }
                vec![MatcherTransition::PressEnd {
                    request_id: episode.request_id,
                    timestamp: Timestamp::from_instant(at),
                }]
            }
            None => Vec::new(),
        }
    }
}

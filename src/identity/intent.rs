use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Identifies one browser/client across requests before and after sign-in
/// (what a pre-auth cookie would carry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(Uuid);

impl VisitorId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for VisitorId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

struct Intent {
    target: String,
    recorded_at: DateTime<Utc>,
}

#[derive(Default)]
struct Pending {
    by_visitor: HashMap<VisitorId, Intent>,
    next_sweep: Option<DateTime<Utc>>,
}

/// Remembers the protected page a visitor asked for before being sent to sign-in.
/// At most one pending target per visitor; the newest wins. Targets older than
/// the TTL are never handed out and are swept while new ones are recorded.
pub struct IntentTracker {
    ttl: TimeDelta,
    pending: RwLock<Pending>,
}

impl IntentTracker {
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = TimeDelta::try_seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX);
        Self { ttl, pending: RwLock::new(Pending::default()) }
    }

    fn is_stale(&self, intent: &Intent, now: DateTime<Utc>) -> bool {
        match intent.recorded_at.checked_add_signed(self.ttl) {
            Some(deadline) => deadline <= now,
            None => false,
        }
    }

    pub fn record_intent(&self, visitor: VisitorId, target: &str) {
        let now = Utc::now();
        let mut pending = self.pending.write();
        if pending.next_sweep.map_or(true, |at| at <= now) {
            let before = pending.by_visitor.len();
            pending.by_visitor.retain(|_, i| !self.is_stale(i, now));
            let swept = before - pending.by_visitor.len();
            if swept > 0 {
                debug!(target: "micropost_auth::intent", "intent.sweep removed={}", swept);
            }
            pending.next_sweep = now.checked_add_signed(self.ttl.min(TimeDelta::seconds(60)));
        }
        debug!(target: "micropost_auth::intent", "intent.record visitor={} target={}", visitor, target);
        pending.by_visitor.insert(visitor, Intent { target: target.to_string(), recorded_at: now });
    }

    /// Pending target (cleared) or `default`. Call once per successful sign-in
    /// and never on a failed one.
    pub fn consume_intent(&self, visitor: VisitorId, default: &str) -> String {
        let now = Utc::now();
        match self.pending.write().by_visitor.remove(&visitor) {
            Some(intent) if !self.is_stale(&intent, now) => {
                debug!(target: "micropost_auth::intent", "intent.consume visitor={} target={}", visitor, intent.target);
                intent.target
            }
            _ => default.to_string(),
        }
    }

    pub fn peek_intent(&self, visitor: VisitorId) -> Option<String> {
        let now = Utc::now();
        let pending = self.pending.read();
        let intent = pending.by_visitor.get(&visitor)?;
        (!self.is_stale(intent, now)).then(|| intent.target.clone())
    }

    /// Entries held, stale ones not yet swept included.
    pub fn pending_count(&self) -> usize {
        self.pending.read().by_visitor.len()
    }
}

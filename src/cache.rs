// src/cache.rs
//! Per-source cache with TTL and request coalescing.
//!
//! At most one fetch per source is in flight. Later callers attach to it
//! through a `watch` channel instead of starting their own. The fetch runs on
//! its own task, so a caller that goes away does not cancel it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::fallback;
use crate::model::{SourceId, TrendItem};
use crate::resilience::{Invocation, Outcome, Resilience};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Fresh,
    Stale,
    Fetching,
    Fallback,
}

impl EntryState {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryState::Fresh => "fresh",
            EntryState::Stale => "stale",
            EntryState::Fetching => "fetching",
            EntryState::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub source_id: SourceId,
    pub items: Vec<TrendItem>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub state: EntryState,
}

/// What a caller of `get_trends` receives.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub items: Vec<TrendItem>,
    /// `Fresh` or `Fallback`; never `Fetching`.
    pub state: EntryState,
    pub fetched_at: Option<DateTime<Utc>>,
}

type Flight = watch::Receiver<Option<Snapshot>>;

struct Slot {
    entry: CacheEntry,
    fetched: Option<Instant>,
    in_flight: Option<Flight>,
}

impl Slot {
    fn empty(source_id: SourceId) -> Self {
        Self {
            entry: CacheEntry {
                source_id,
                items: Vec::new(),
                fetched_at: None,
                state: EntryState::Stale,
            },
            fetched: None,
            in_flight: None,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            items: self.entry.items.clone(),
            state: self.entry.state,
            fetched_at: self.entry.fetched_at,
        }
    }

    /// Fresh entries past their TTL turn stale.
    fn expire(&mut self, ttl: Option<Duration>) {
        if self.entry.state != EntryState::Fresh {
            return;
        }
        let expired = match (ttl, self.fetched) {
            (Some(ttl), Some(at)) => at.elapsed() >= ttl,
            (None, Some(_)) => false,
            (_, None) => true,
        };
        if expired {
            self.entry.state = EntryState::Stale;
        }
    }
}

enum Plan {
    Cached(Snapshot),
    Join(Flight),
    Lead(watch::Sender<Option<Snapshot>>, Flight),
}

struct Inner {
    resilience: Resilience,
    ttl: Option<Duration>,
    slots: [Mutex<Slot>; SourceId::COUNT],
}

impl Inner {
    fn slot(&self, source: SourceId) -> MutexGuard<'_, Slot> {
        // Slot updates are single assignments; a poisoned lock still holds a usable entry.
        self.slots[source as usize]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn plan(&self, source: SourceId, force_refresh: bool) -> Plan {
        let mut slot = self.slot(source);
        slot.expire(self.ttl);

        if let Some(rx) = &slot.in_flight {
            return Plan::Join(rx.clone());
        }
        if !force_refresh && slot.entry.state == EntryState::Fresh {
            return Plan::Cached(slot.snapshot());
        }

        let (tx, rx) = watch::channel(None);
        slot.entry.state = EntryState::Fetching;
        slot.in_flight = Some(rx.clone());
        Plan::Lead(tx, rx)
    }

    fn complete(&self, source: SourceId, inv: Invocation) -> Snapshot {
        let mut slot = self.slot(source);
        slot.entry.items = inv.items;
        slot.entry.state = match inv.outcome {
            Outcome::Fresh => EntryState::Fresh,
            Outcome::Fallback => EntryState::Fallback,
        };
        slot.entry.fetched_at = Some(Utc::now());
        slot.fetched = Some(Instant::now());
        slot.in_flight = None;
        slot.snapshot()
    }

    /// The fetch task ended without publishing (it panicked). Clear the flight
    /// and serve the bundled sample.
    fn abandon(&self, source: SourceId, rx: &Flight) -> Snapshot {
        let mut slot = self.slot(source);
        if slot.in_flight.as_ref().is_some_and(|f| f.same_channel(rx)) {
            slot.in_flight = None;
            slot.entry.items = fallback::sample(source);
            slot.entry.state = EntryState::Fallback;
            slot.entry.fetched_at = Some(Utc::now());
            slot.fetched = Some(Instant::now());
            return slot.snapshot();
        }
        Snapshot {
            items: fallback::sample(source),
            state: EntryState::Fallback,
            fetched_at: slot.entry.fetched_at,
        }
    }
}

/// Owns every `CacheEntry`. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<Inner>,
}

impl Aggregator {
    /// `ttl = None` keeps results until an explicit refresh.
    pub fn new(resilience: Resilience, ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                resilience,
                ttl,
                slots: SourceId::ALL.map(|id| Mutex::new(Slot::empty(id))),
            }),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.inner.ttl
    }

    pub async fn get_trends(&self, source: SourceId, force_refresh: bool) -> Snapshot {
        let rx = match self.inner.plan(source, force_refresh) {
            Plan::Cached(snapshot) => {
                counter!("trends_cache_hit_total", "source" => source.as_str()).increment(1);
                return snapshot;
            }
            Plan::Join(rx) => {
                debug!(target: "trends", source = %source, "joining in-flight fetch");
                counter!("trends_coalesced_total", "source" => source.as_str()).increment(1);
                rx
            }
            Plan::Lead(tx, rx) => {
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    let inv = inner.resilience.invoke(source).await;
                    let snapshot = inner.complete(source, inv);
                    tx.send_replace(Some(snapshot));
                });
                rx
            }
        };
        self.wait(source, rx).await
    }

    async fn wait(&self, source: SourceId, mut rx: Flight) -> Snapshot {
        loop {
            let published = rx.borrow_and_update().clone();
            if let Some(snapshot) = published {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                let published = rx.borrow().clone();
                if let Some(snapshot) = published {
                    return snapshot;
                }
                warn!(target: "trends", source = %source, "fetch task ended without a result");
                return self.inner.abandon(source, &rx);
            }
        }
    }

    /// Current entry for `source`, without triggering a fetch.
    pub fn entry(&self, source: SourceId) -> CacheEntry {
        let mut slot = self.inner.slot(source);
        slot.expire(self.inner.ttl);
        slot.entry.clone()
    }

    pub fn entries(&self) -> Vec<CacheEntry> {
        SourceId::ALL.into_iter().map(|id| self.entry(id)).collect()
    }
}

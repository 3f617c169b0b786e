//! Single-flight coordination for background work.
//!
//! A [`TaskSupervisor`] holds at most one in-flight run. New triggers either
//! join the running one, defer a single rerun until it finishes, or replace
//! it outright. Replaced runs still complete, but their results are refused
//! at publish time. A [`Debouncer`] collapses bursts of triggers (such as
//! keystrokes in the parser-config editor) into one trailing call.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// What to do with a trigger that arrives while a run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Coalesce into the in-flight run; the trigger is a no-op
    Join,
    /// Record one pending rerun, executed after the in-flight run finishes
    Defer,
    /// Start a new run now; the in-flight run can no longer publish
    Replace,
}

/// Proof of admission for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunToken {
    generation: u64,
}

impl RunToken {
    /// Monotonic generation of this run.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of [`TaskSupervisor::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The caller owns a new run and must call [`TaskSupervisor::finish`]
    Started(RunToken),
    /// Coalesced into the in-flight run
    Joined,
    /// A rerun was queued behind the in-flight run
    Deferred,
}

impl Admission {
    /// The run token, when the caller was admitted.
    pub fn token(self) -> Option<RunToken> {
        match self {
            Admission::Started(token) => Some(token),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    in_flight: Option<u64>,
    pending: bool,
}

/// A single-slot supervisor for one kind of background run.
#[derive(Debug)]
pub struct TaskSupervisor {
    name: &'static str,
    slot: Mutex<Slot>,
}

impl TaskSupervisor {
    /// Create an idle supervisor; `name` is used in log output only.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Request admission for a new run.
    pub fn begin(&self, policy: TriggerPolicy) -> Admission {
        let mut slot = self.slot.lock();

        if slot.in_flight.is_some() {
            match policy {
                TriggerPolicy::Join => {
                    trace!(supervisor = self.name, "trigger joined in-flight run");
                    return Admission::Joined;
                }
                TriggerPolicy::Defer => {
                    slot.pending = true;
                    debug!(supervisor = self.name, "rerun deferred");
                    return Admission::Deferred;
                }
                TriggerPolicy::Replace => {
                    debug!(
                        supervisor = self.name,
                        superseded = slot.in_flight,
                        "in-flight run replaced"
                    );
                }
            }
        }

        slot.generation += 1;
        slot.in_flight = Some(slot.generation);
        Admission::Started(RunToken {
            generation: slot.generation,
        })
    }

    /// Whether `token` still belongs to the current run.
    pub fn is_current(&self, token: RunToken) -> bool {
        self.slot.lock().in_flight == Some(token.generation)
    }

    /// Hand a result to `sink` if `token` is still current.
    ///
    /// The slot stays locked while `sink` runs, so a concurrent replace
    /// cannot interleave with the publish. Returns whether `sink` ran.
    pub fn publish<T>(&self, token: RunToken, value: T, sink: impl FnOnce(T)) -> bool {
        let slot = self.slot.lock();
        if slot.in_flight != Some(token.generation) {
            debug!(
                supervisor = self.name,
                generation = token.generation,
                "stale result discarded"
            );
            return false;
        }
        sink(value);
        true
    }

    /// Release the slot held by `token`.
    ///
    /// Returns `true` when a deferred rerun is due; the caller should
    /// start it with a fresh [`begin`](Self::begin).
    pub fn finish(&self, token: RunToken) -> bool {
        let mut slot = self.slot.lock();
        if slot.in_flight != Some(token.generation) {
            return false;
        }
        slot.in_flight = None;
        std::mem::take(&mut slot.pending)
    }

    /// Whether a run is in flight.
    pub fn is_busy(&self) -> bool {
        self.slot.lock().in_flight.is_some()
    }
}

/// Trailing-edge debouncer on the tokio runtime.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule `action` after the quiet period.
    ///
    /// A later trigger within the period supersedes this one. The handle
    /// resolves to `true` if `action` ran. Must be called within a tokio
    /// runtime.
    pub fn trigger<F, Fut>(&self, action: F) -> JoinHandle<bool>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.latest);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != ticket {
                return false;
            }
            action().await;
            true
        })
    }
}

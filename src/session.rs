use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use facematch_core::{find_match, Embedding, MatchError, MatchResult, Reference, Threshold};
use log::{debug, info, warn};

use crate::source::{Frame, FrameSource};

/// Immutable reference set shared between in-flight matches
pub type Snapshot = Arc<[Reference]>;

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub result: MatchResult,
    /// Display confidence in percent
    pub confidence: f32,
}

/// Holds the current reference snapshot and threshold for a matching session.
///
/// `refresh` swaps the whole snapshot; a match already running keeps the
/// snapshot it started with.
#[derive(Debug)]
pub struct Session {
    references: RwLock<Snapshot>,
    threshold: Threshold,
}

impl Session {
    pub fn new(references: Vec<Reference>, threshold: Threshold) -> Self {
        Self {
            references: RwLock::new(references.into()),
            threshold,
        }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn snapshot(&self) -> Snapshot {
        match self.references.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn refresh(&self, references: Vec<Reference>) {
        let snapshot: Snapshot = references.into();
        info!("Reference set refreshed: {} reference(s)", snapshot.len());
        match self.references.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    pub fn observe(&self, query: &Embedding) -> Result<Observation, MatchError> {
        let snapshot = self.snapshot();
        let result = find_match(query, &snapshot, self.threshold)?;
        Ok(Observation {
            confidence: result.confidence(),
            result,
        })
    }
}

/// What one watch cycle produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Matched(Observation),
    NoFace,
    Rejected(MatchError),
}

/// Requests a running [`Watcher`] to stop issuing new matches
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed-cadence loop driving a [`Session`] from a [`FrameSource`]
#[derive(Debug, Clone)]
pub struct Watcher {
    pub interval: Duration,
    pub max_cycles: Option<usize>,
    stop: StopHandle,
}

impl Watcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_cycles: None,
            stop: StopHandle::default(),
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until the source is exhausted, `max_cycles` is reached or a stop
    /// is requested. Returns the number of completed cycles.
    pub fn run<S, F>(&self, session: &Session, source: &mut S, mut on_outcome: F) -> usize
    where
        S: FrameSource + ?Sized,
        F: FnMut(usize, &Outcome),
    {
        let mut cycles = 0;

        loop {
            if self.stop.is_stopped() {
                debug!("Stop requested after {} cycle(s)", cycles);
                break;
            }
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            let started = Instant::now();
            let Some(frame) = source.next_frame() else {
                debug!("Frame source exhausted after {} cycle(s)", cycles);
                break;
            };

            let outcome = match frame {
                Frame::NoFace => Outcome::NoFace,
                Frame::Face(query) => match session.observe(&query) {
                    Ok(observation) => Outcome::Matched(observation),
                    Err(e) => {
                        warn!("Cycle {}: {}", cycles + 1, e);
                        Outcome::Rejected(e)
                    }
                },
            };
            cycles += 1;
            on_outcome(cycles, &outcome);

            // Sleep out the rest of the period, waking early on stop
            let deadline = started + self.interval;
            while !self.stop.is_stopped() {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                std::thread::sleep((deadline - now).min(Duration::from_millis(50)));
            }
        }

        cycles
    }
}

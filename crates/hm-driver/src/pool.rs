//! Candidate pool shared between the driver thread and evaluation workers.

use chrono::{DateTime, Utc};
use hm_optimizer::CandidateSink;
use hm_types::{InputType, Point, SpaceDescriptor};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::debug;
use uuid::Uuid;

/// A registered extended-poll candidate awaiting evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PooledCandidate {
    pub id: Uuid,
    pub point: Point,
    pub descriptor: SpaceDescriptor,
    pub registered_at: DateTime<Utc>,
}

/// Identity of a candidate: its coordinates plus the layout of the space they
/// live in. The same coordinates under different bounds or types are distinct.
#[derive(Debug, PartialEq, Eq, Hash)]
struct CandidateKey {
    point: Vec<u64>,
    input_types: Vec<InputType>,
    lower_bounds: Vec<u64>,
    upper_bounds: Vec<u64>,
    fixed: BTreeSet<usize>,
    groups: Vec<BTreeSet<usize>>,
}

impl CandidateKey {
    fn new(point: &Point, descriptor: &SpaceDescriptor) -> Self {
        let bits = |xs: &[f64]| xs.iter().map(|x| x.to_bits()).collect();
        Self {
            point: point.key(),
            input_types: descriptor.input_types.clone(),
            lower_bounds: bits(&descriptor.lower_bounds),
            upper_bounds: bits(&descriptor.upper_bounds),
            fixed: descriptor.fixed.clone(),
            groups: descriptor.groups.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct PoolState {
    queue: VecDeque<PooledCandidate>,
    seen: HashSet<CandidateKey>,
    duplicates: usize,
}

/// FIFO pool of candidates. A candidate is queued at most once per run.
#[derive(Debug, Default)]
pub struct CandidatePool {
    state: Mutex<PoolState>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a candidate; returns `false` if the same point in the same
    /// space layout was already seen.
    pub fn submit(&self, point: Point, descriptor: SpaceDescriptor) -> bool {
        let key = CandidateKey::new(&point, &descriptor);
        let mut state = self.state.lock();
        if !state.seen.insert(key) {
            state.duplicates += 1;
            debug!("Ignoring duplicate candidate {:?}", point.coordinates);
            return false;
        }
        state.queue.push_back(PooledCandidate {
            id: Uuid::new_v4(),
            point,
            descriptor,
            registered_at: Utc::now(),
        });
        true
    }

    /// Take up to `n` candidates for dispatch, oldest first.
    pub fn drain_batch(&self, n: usize) -> Vec<PooledCandidate> {
        let mut state = self.state.lock();
        let n = n.min(state.queue.len());
        state.queue.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.state.lock().duplicates
    }
}

impl CandidateSink for CandidatePool {
    fn register(&mut self, point: Point, descriptor: SpaceDescriptor) -> bool {
        self.submit(point, descriptor)
    }
}

impl CandidateSink for &CandidatePool {
    fn register(&mut self, point: Point, descriptor: SpaceDescriptor) -> bool {
        self.submit(point, descriptor)
    }
}

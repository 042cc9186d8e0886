//! Driver-side pieces for HyperMesh: the candidate pool the extended poll
//! registers into, and the trigger-gated poll driver.

pub mod driver;
pub mod pool;

pub use driver::PollDriver;
pub use pool::{CandidatePool, PooledCandidate};

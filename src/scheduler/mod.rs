/// Scheduler seam.
///
/// The back end does not schedule. It asks a `Scheduler` to turn one
/// kernel's flat gate sequence into time-bundled IR, immediately before
/// generating code for that kernel:
///
///   Circuit → Scheduler → Vec<Bundle> → bundle codegen
///
/// Any closure with the right signature is a scheduler, which keeps test
/// doubles one line long. `CycleBundler` is the stock implementation: it
/// bundles gates by the cycles assigned upstream.
pub mod bundler;

pub use bundler::CycleBundler;

use thiserror::Error;

use crate::compiler::{Bundle, Circuit};

/// Why a scheduler refused a circuit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("gate `{gate}` uses qubit {qubit}, platform has {qubit_count}")]
    QubitOutOfRange { gate: String, qubit: usize, qubit_count: usize },

    #[error("gate `{gate}` uses classical register {creg}, platform has {creg_count}")]
    CregOutOfRange { gate: String, creg: usize, creg_count: usize },

    #[error("gate `{gate}` starting at cycle {cycle} ends past the last representable cycle")]
    CycleOverflow { gate: String, cycle: u64 },

    /// Free-form failure from an external scheduler.
    #[error("{0}")]
    Failed(String),
}

/// Produces bundles for one kernel.
///
/// Bundles must come back sorted by ascending `start_cycle`; the code
/// generator relies on that and does not re-sort.
pub trait Scheduler {
    fn schedule(
        &self,
        circuit: &Circuit,
        qubit_count: usize,
        creg_count: usize,
    ) -> Result<Vec<Bundle>, ScheduleError>;
}

impl<F> Scheduler for F
where
    F: Fn(&Circuit, usize, usize) -> Result<Vec<Bundle>, ScheduleError>,
{
    fn schedule(
        &self,
        circuit: &Circuit,
        qubit_count: usize,
        creg_count: usize,
    ) -> Result<Vec<Bundle>, ScheduleError> {
        self(circuit, qubit_count, creg_count)
    }
}

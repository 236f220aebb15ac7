/// Central Controller code generation pipeline.
///
/// Pipeline, per kernel of a `Program`:
///   control-flow prologue → Scheduler → bundle codegen → control-flow epilogue
///
/// and once per program: header, footer, artifact materialization.
///
/// Each stage is a separate module with a clean boundary. Every failure is
/// fatal for the compile call and is reported as a `CcError` naming the
/// offending kernel, gate or opcode.
pub mod backend;
pub mod bundle;
pub mod classical;
pub mod codegen;
pub mod control_flow;
pub mod ir;

use std::path::PathBuf;

use thiserror::Error;

pub use backend::{compile, compile_circuit, compile_kernels, validate_nesting, CompiledProgram};
pub use bundle::{bundles_qasm, Bundle, ParallelSection};
pub use classical::ClassicalClass;
pub use codegen::Codegen;
pub use control_flow::{kernel_label, MAX_LOOP_DEPTH};
pub use ir::{BranchCondition, Circuit, CompareOp, Gate, GateKind, Kernel, KernelType, Program};

use crate::scheduler::ScheduleError;

/// Error type shared across all back-end stages.
#[derive(Debug, Error)]
pub enum CcError {
    /// Program with zero kernels.
    #[error("trying to compile empty kernel")]
    EmptyProgram,

    /// Plain circuit compilation bypasses kernel control flow and is not supported.
    #[error("circuit compilation not implemented, because it does not support classical kernel operations")]
    CircuitNotImplemented,

    // ── IR inconsistencies ──────────────────────────────────────────────
    #[error("inconsistency detected in bundle {bundle} contents: classical gate with parallel sections ({gates} gates in slot)")]
    ClassicalWithParallelSections { bundle: usize, gates: usize },

    #[error("inconsistency detected in bundle {bundle} contents: classical gate `{gate}` found after first section (which itself was non-classical)")]
    ClassicalAfterQuantum { bundle: usize, gate: String },

    #[error("inconsistency detected in bundle {bundle} contents: empty parallel section")]
    EmptyParallelSection { bundle: usize },

    #[error("kernel `{kernel}` of type {kernel_type} has no branch condition")]
    MissingBranchCondition { kernel: String, kernel_type: ir::KernelType },

    #[error("scheduler returned no bundles for non-empty kernel `{kernel}`")]
    NoBundles { kernel: String },

    #[error("unbalanced control flow at kernel `{kernel}`: {reason}")]
    UnbalancedControlFlow { kernel: String, reason: String },

    #[error("kernel name `{kernel}` yields no control-flow label")]
    EmptyLabel { kernel: String },

    #[error("kernel `{kernel}` nests loops deeper than {max} levels")]
    LoopNestingTooDeep { kernel: String, max: usize },

    #[error("inconsistency detected in bundle {bundle} contents: custom gate `{gate}` has no qubit operands")]
    CustomWithoutQubits { bundle: usize, gate: String },

    // ── Unsupported features ────────────────────────────────────────────
    /// Measurement and display gates have no Central Controller encoding.
    #[error("gate type {kind} not supported: `{gate}`")]
    GateNotSupported { kind: ir::GateKind, gate: String },

    #[error("unsupported gate type: {kind} (`{gate}`)")]
    UnsupportedGateType { kind: ir::GateKind, gate: String },

    #[error("classical instruction not implemented: `{opcode}` ({class})")]
    ClassicalNotImplemented { opcode: String, class: ClassicalClass },

    #[error("unknown classical operation `{opcode}` with `{operands}` operands")]
    UnknownClassical { opcode: String, operands: usize },

    // ── Collaborators ───────────────────────────────────────────────────
    #[error("scheduling kernel `{kernel}` failed: {source}")]
    Schedule {
        kernel: String,
        #[source]
        source: ScheduleError,
    },

    #[error("cannot read `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in `{}`: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

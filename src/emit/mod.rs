/// Emission seam between the code generator and the instruction encoder.
///
/// The code generator decides *what* to emit and in which order; an
/// `Emitter` decides how each instruction looks. One method per instruction
/// kind, none of them fallible: every check that can fail happens in the
/// code generator before the emitter is called.
///
/// Implementations:
///   - `CcEmitter` — Central Controller `.vq1asm` text plus instrument map
///   - `Trace`     — records every call as a typed `Emission`
pub mod cc;
pub mod trace;

pub use cc::CcEmitter;
pub use trace::{Emission, Trace};

use crate::compiler::BranchCondition;

/// Encoder for one compilation. Holds the output buffer; never reused.
pub trait Emitter {
    fn program_start(&mut self, prog_name: &str);
    fn program_finish(&mut self, prog_name: &str);

    /// Called before the first bundle of a non-empty kernel.
    fn kernel_start(&mut self);
    /// `duration_in_cycles` is the cycle at which the kernel's last bundle ends.
    fn kernel_finish(&mut self, kernel_name: &str, duration_in_cycles: u64);

    /// `index` counts bundles across the whole program.
    fn bundle_start(&mut self, index: usize, start_cycle: u64, duration_in_cycles: u64);
    /// `is_last` marks the final bundle of a kernel.
    fn bundle_finish(&mut self, start_cycle: u64, duration_in_cycles: u64, is_last: bool);

    fn nop_gate(&mut self);
    fn custom_gate(
        &mut self,
        name: &str,
        qubits: &[usize],
        cregs: &[usize],
        angle: Option<f64>,
        start_cycle: u64,
        duration: u64,
    );

    fn comment(&mut self, text: &str);

    fn if_start(&mut self, condition: &BranchCondition);
    fn else_start(&mut self, condition: &BranchCondition);
    fn for_start(&mut self, label: &str, iterations: u64);
    fn for_end(&mut self, label: &str);
    fn do_while_start(&mut self, label: &str);
    fn do_while_end(&mut self, label: &str, condition: &BranchCondition);

    /// The instruction stream emitted so far.
    fn code(&self) -> String;
    /// The instrument map document.
    fn map(&self) -> String;
}

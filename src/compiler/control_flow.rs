/// Kernel control flow: loop and conditional framing.
///
/// Conditionals and loops are not nested data structures in the IR. They
/// are flat runs of kernels bracketed by marker kernels (`ForStart` …
/// `ForEnd`), paired by the label derived from the kernel name. The code
/// generator therefore treats each kernel on its own:
///
/// | kernel type     | prologue                         | epilogue                          |
/// |-----------------|----------------------------------|-----------------------------------|
/// | `IfStart`       | if_start(cond)                   | —                                 |
/// | `ElseStart`     | else_start(cond)                 | —                                 |
/// | `ForStart`      | for_start(label, iterations)     | —                                 |
/// | `DoWhileStart`  | do_while_start(label)            | —                                 |
/// | `ForEnd`        | —                                | for_end(label)                    |
/// | `DoWhileEnd`    | —                                | do_while_end(label, cond)         |
/// | everything else | —                                | —                                 |
///
/// The only state carried from one kernel to the next is the loop depth,
/// bounded by the number of loop counter registers.
use tracing::trace;

use super::codegen::Codegen;
use super::ir::{BranchCondition, Kernel, KernelType};
use super::CcError;
use crate::emit::Emitter;

/// Highest loop nesting the counter registers (R63 down to R0) can hold.
pub const MAX_LOOP_DEPTH: usize = 64;

/// Control-flow label of a kernel: the first `_`-separated token of its name.
///
/// `sp1_for1_start` → `sp1`. Empty when the name has no token (`""`, `"___"`).
pub fn kernel_label(name: &str) -> &str {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .find(|token| !token.is_empty())
        .unwrap_or_default()
}

fn loop_label(kernel: &Kernel) -> Result<&str, CcError> {
    match kernel_label(&kernel.name) {
        "" => Err(CcError::EmptyLabel { kernel: kernel.name.clone() }),
        label => Ok(label),
    }
}

fn condition(kernel: &Kernel) -> Result<&BranchCondition, CcError> {
    kernel.br_condition.as_ref().ok_or_else(|| CcError::MissingBranchCondition {
        kernel: kernel.name.clone(),
        kernel_type: kernel.kernel_type,
    })
}

impl<E: Emitter> Codegen<'_, E> {
    /// Open the construct a kernel starts, before its bundles.
    pub fn kernel_prologue(&mut self, kernel: &Kernel) -> Result<(), CcError> {
        self.emitter().comment(&format!("### Kernel: '{}'", kernel.name));
        trace!(kernel = %kernel.name, kernel_type = %kernel.kernel_type, "kernel prologue");

        // TODO: insert waits here once latency compensation lands.
        match kernel.kernel_type {
            KernelType::IfStart => {
                let cond = condition(kernel)?;
                self.emitter().if_start(cond);
            }
            KernelType::ElseStart => {
                let cond = condition(kernel)?;
                self.emitter().else_start(cond);
            }
            KernelType::ForStart => {
                let label = loop_label(kernel)?;
                if self.loop_depth >= MAX_LOOP_DEPTH {
                    return Err(CcError::LoopNestingTooDeep { kernel: kernel.name.clone(), max: MAX_LOOP_DEPTH });
                }
                self.loop_depth += 1;
                self.emitter().for_start(label, kernel.iterations);
            }
            KernelType::DoWhileStart => {
                let label = loop_label(kernel)?;
                self.emitter().do_while_start(label);
            }
            KernelType::Static
            | KernelType::ForEnd
            | KernelType::DoWhileEnd
            | KernelType::IfEnd
            | KernelType::ElseEnd => {}
        }
        Ok(())
    }

    /// Close the construct a kernel ends, after its bundles.
    pub fn kernel_epilogue(&mut self, kernel: &Kernel) -> Result<(), CcError> {
        trace!(kernel = %kernel.name, kernel_type = %kernel.kernel_type, "kernel epilogue");

        match kernel.kernel_type {
            KernelType::ForEnd => {
                let label = loop_label(kernel)?;
                self.loop_depth = self.loop_depth.saturating_sub(1);
                self.emitter().for_end(label);
            }
            KernelType::DoWhileEnd => {
                let cond = condition(kernel)?;
                let label = loop_label(kernel)?;
                self.emitter().do_while_end(label, cond);
            }
            // Kernel duration alignment goes here once latency compensation lands.
            KernelType::IfEnd | KernelType::ElseEnd => {}
            KernelType::Static
            | KernelType::IfStart
            | KernelType::ElseStart
            | KernelType::ForStart
            | KernelType::DoWhileStart => {}
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::CompareOp;
    use crate::emit::{Emission, Trace};

    /// Prologue, empty body, epilogue, instructions only.
    fn frame(kernel: &Kernel) -> Vec<Emission> {
        let mut trace = Trace::new();
        let mut cg = Codegen::new(&mut trace);
        cg.kernel_prologue(kernel).unwrap();
        cg.kernel_epilogue(kernel).unwrap();
        trace.instructions().into_iter().cloned().collect()
    }

    fn cond() -> BranchCondition {
        BranchCondition::new(3, CompareOp::Eq, 5)
    }

    #[test]
    fn test_kernel_label() {
        assert_eq!(kernel_label("sp1_for1_start"), "sp1");
        assert_eq!(kernel_label("loop_body_2"), "loop");
        assert_eq!(kernel_label("main"), "main");
        assert_eq!(kernel_label("__lead_x"), "lead");
        assert_eq!(kernel_label("two words_x"), "two");
        assert_eq!(kernel_label("___"), "");
        assert_eq!(kernel_label(""), "");
    }

    #[test]
    fn test_tokenless_names_rejected() {
        let mut trace = Trace::new();
        let mut cg = Codegen::new(&mut trace);
        for name in ["", "___"] {
            let err = cg.kernel_prologue(&Kernel::for_start(name, 2)).unwrap_err();
            assert!(matches!(err, CcError::EmptyLabel { ref kernel } if kernel == name));
            let err = cg.kernel_epilogue(&Kernel::new(name, KernelType::ForEnd)).unwrap_err();
            assert!(matches!(err, CcError::EmptyLabel { .. }));
        }
        let dw = Kernel::new("_", KernelType::DoWhileStart);
        assert!(matches!(cg.kernel_prologue(&dw), Err(CcError::EmptyLabel { .. })));
        // names are only labels for loop kernels
        cg.kernel_prologue(&Kernel::new("___", KernelType::Static)).unwrap();
    }

    #[test]
    fn test_loop_depth_bounded_by_counter_registers() {
        let mut trace = Trace::new();
        let mut cg = Codegen::new(&mut trace);
        for d in 0..MAX_LOOP_DEPTH {
            cg.kernel_prologue(&Kernel::for_start(format!("sp{d}_for_start"), 2)).unwrap();
        }
        let err = cg.kernel_prologue(&Kernel::for_start("deep_for_start", 2)).unwrap_err();
        assert!(matches!(err, CcError::LoopNestingTooDeep { max: MAX_LOOP_DEPTH, .. }));

        // closing one loop frees its register
        cg.kernel_epilogue(&Kernel::new("sp63_for_end", KernelType::ForEnd)).unwrap();
        cg.kernel_prologue(&Kernel::for_start("again_for_start", 2)).unwrap();
    }

    #[test]
    fn test_kernel_label_idempotent() {
        let once = kernel_label("sp1_for1_start");
        assert_eq!(kernel_label(once), once);
    }

    #[test]
    fn test_for_start_emits_label_and_iterations() {
        let k = Kernel::for_start("L_for1_start", 7);
        assert_eq!(frame(&k), vec![Emission::ForStart { label: "L".into(), iterations: 7 }]);
    }

    #[test]
    fn test_for_end_emits_label() {
        let k = Kernel::new("L_for1_end", KernelType::ForEnd);
        assert_eq!(frame(&k), vec![Emission::ForEnd { label: "L".into() }]);
    }

    #[test]
    fn test_do_while_start_emits_label_only() {
        let k = Kernel::new("sp2_do_while_start", KernelType::DoWhileStart).with_condition(cond());
        assert_eq!(frame(&k), vec![Emission::DoWhileStart { label: "sp2".into() }]);
    }

    #[test]
    fn test_do_while_end_emits_label_and_condition() {
        let k = Kernel::new("sp2_do_while_end", KernelType::DoWhileEnd).with_condition(cond());
        assert_eq!(
            frame(&k),
            vec![Emission::DoWhileEnd { label: "sp2".into(), condition: cond() }]
        );
    }

    #[test]
    fn test_if_start_carries_condition_unmodified() {
        let k = Kernel::new("sp3_if", KernelType::IfStart)
            .with_condition(cond())
            .with_gates([crate::compiler::Gate::custom("x", [0], 1)]);
        assert_eq!(frame(&k), vec![Emission::IfStart(BranchCondition::new(3, CompareOp::Eq, 5))]);
    }

    #[test]
    fn test_else_start_reasserts_condition() {
        let k = Kernel::new("sp3_else", KernelType::ElseStart).with_condition(cond());
        assert_eq!(frame(&k), vec![Emission::ElseStart(cond())]);
    }

    #[test]
    fn test_silent_kernel_types() {
        for ty in [KernelType::Static, KernelType::IfEnd, KernelType::ElseEnd] {
            let k = Kernel::new("sp4_x", ty);
            assert!(frame(&k).is_empty(), "{ty} should emit no control-flow instruction");
        }
    }

    #[test]
    fn test_prologue_comments_kernel_name() {
        let mut trace = Trace::new();
        Codegen::new(&mut trace).kernel_prologue(&Kernel::new("k0", KernelType::Static)).unwrap();
        assert_eq!(trace.events(), &[Emission::Comment("### Kernel: 'k0'".into())]);
    }

    #[test]
    fn test_missing_condition_is_an_error() {
        let mut trace = Trace::new();
        let mut cg = Codegen::new(&mut trace);
        let err = cg.kernel_prologue(&Kernel::new("sp5_if", KernelType::IfStart)).unwrap_err();
        assert!(matches!(
            err,
            CcError::MissingBranchCondition { kernel_type: KernelType::IfStart, .. }
        ));
        let err = cg.kernel_epilogue(&Kernel::new("sp5_dw", KernelType::DoWhileEnd)).unwrap_err();
        assert!(matches!(err, CcError::MissingBranchCondition { .. }));
    }
}

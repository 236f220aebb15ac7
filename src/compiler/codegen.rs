/// Bundle code generation.
///
/// Flattens one kernel's bundles into the sequential instruction stream:
///
/// ```text
/// for bundle:
///     bundle_start(index, start_cycle, duration)
///     for section:
///         classical first gate → exactly one gate → classical dispatch
///         otherwise            → every gate: nop | custom | error
///     bundle_finish(start_cycle, duration, is_last)
/// ```
///
/// Gates inside a section need not share an opcode; their textual order is
/// the order of the section. The bundle index runs across the whole
/// program, so one `Codegen` must serve all kernels of a compilation.
use tracing::debug;

use super::bundle::{Bundle, ParallelSection};
use super::ir::GateKind;
use super::CcError;
use crate::emit::Emitter;

/// Per-compilation code generation state.
pub struct Codegen<'e, E: Emitter> {
    emitter: &'e mut E,
    bundle_idx: usize,
    /// Open `ForStart` kernels; each holds one loop counter register.
    pub(super) loop_depth: usize,
}

impl<'e, E: Emitter> Codegen<'e, E> {
    pub fn new(emitter: &'e mut E) -> Self {
        Self { emitter, bundle_idx: 0, loop_depth: 0 }
    }

    /// Index the next bundle will get.
    pub fn bundle_index(&self) -> usize {
        self.bundle_idx
    }

    pub fn emitter(&mut self) -> &mut E {
        self.emitter
    }

    /// Emit one kernel's bundles. Bundles must be sorted by start cycle.
    pub fn bundles(&mut self, bundles: &[Bundle]) -> Result<(), CcError> {
        debug!(bundles = bundles.len(), first_index = self.bundle_idx, "generating .vq1asm for bundles");

        let last = bundles.len().saturating_sub(1);
        for (i, bundle) in bundles.iter().enumerate() {
            let index = self.bundle_idx;
            self.bundle_idx += 1;

            self.emitter.bundle_start(index, bundle.start_cycle, bundle.duration_in_cycles);
            for section in &bundle.parallel_sections {
                self.section(index, bundle, section)?;
            }
            self.emitter.bundle_finish(bundle.start_cycle, bundle.duration_in_cycles, i == last);
        }

        debug!("generating .vq1asm for bundles [done]");
        Ok(())
    }

    fn section(&mut self, index: usize, bundle: &Bundle, section: &ParallelSection) -> Result<(), CcError> {
        let first = section.first().ok_or(CcError::EmptyParallelSection { bundle: index })?;

        if first.is_classical() {
            if section.len() != 1 {
                return Err(CcError::ClassicalWithParallelSections { bundle: index, gates: section.len() });
            }
            return self.classical_instruction(first);
        }

        for gate in section.iter() {
            match gate.kind {
                GateKind::Nop => self.emitter.nop_gate(),
                GateKind::Classical => {
                    return Err(CcError::ClassicalAfterQuantum { bundle: index, gate: gate.qasm() });
                }
                GateKind::Custom if gate.qubits.is_empty() => {
                    return Err(CcError::CustomWithoutQubits { bundle: index, gate: gate.qasm() });
                }
                GateKind::Custom => self.emitter.custom_gate(
                    &gate.name,
                    &gate.qubits,
                    &gate.cregs,
                    gate.angle,
                    bundle.start_cycle,
                    gate.duration,
                ),
                // no Central Controller encoding for these
                GateKind::Measure | GateKind::Display => {
                    return Err(CcError::GateNotSupported { kind: gate.kind, gate: gate.qasm() });
                }
                GateKind::Prepz => {
                    return Err(CcError::UnsupportedGateType { kind: gate.kind, gate: gate.qasm() });
                }
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::Gate;
    use crate::emit::{Emission, Trace};

    fn x(q: usize) -> Gate {
        Gate::custom("x", [q], 1)
    }

    fn bundle(start: u64, duration: u64, sections: Vec<Vec<Gate>>) -> Bundle {
        Bundle::new(start, duration, sections.into_iter().map(ParallelSection::new).collect())
    }

    fn run(bundles: &[Bundle]) -> (Result<(), CcError>, Vec<Emission>) {
        let mut trace = Trace::new();
        let result = Codegen::new(&mut trace).bundles(bundles);
        (result, trace.into_events())
    }

    #[test]
    fn test_bundle_framing_and_last_flag() {
        let (result, events) = run(&[
            bundle(1, 1, vec![vec![x(0)]]),
            bundle(3, 2, vec![vec![x(1)]]),
        ]);
        result.unwrap();
        assert_eq!(events[0], Emission::BundleStart { index: 0, start_cycle: 1, duration_in_cycles: 1 });
        assert_eq!(events[2], Emission::BundleFinish { start_cycle: 1, duration_in_cycles: 1, is_last: false });
        assert_eq!(events[3], Emission::BundleStart { index: 1, start_cycle: 3, duration_in_cycles: 2 });
        assert_eq!(events[5], Emission::BundleFinish { start_cycle: 3, duration_in_cycles: 2, is_last: true });
    }

    #[test]
    fn test_custom_gate_carries_bundle_cycle_and_gate_duration() {
        let rx = Gate::custom("rx", [2], 3).with_angle(1.5).with_cregs([4]);
        let (result, events) = run(&[bundle(9, 3, vec![vec![rx]])]);
        result.unwrap();
        assert_eq!(
            events[1],
            Emission::Custom {
                name: "rx".into(),
                qubits: vec![2],
                cregs: vec![4],
                angle: Some(1.5),
                start_cycle: 9,
                duration: 3,
            }
        );
    }

    #[test]
    fn test_mixed_quantum_section_in_order() {
        let (result, events) = run(&[bundle(1, 2, vec![vec![x(0), Gate::nop(), Gate::custom("y", [1], 2)]])]);
        result.unwrap();
        let kinds: Vec<String> = events.iter().map(ToString::to_string).collect();
        assert_eq!(kinds[1], "custom x q[0] @1+1");
        assert_eq!(kinds[2], "nop");
        assert_eq!(kinds[3], "custom y q[1] @1+2");
    }

    #[test]
    fn test_bundle_index_runs_across_calls() {
        let mut trace = Trace::new();
        let mut cg = Codegen::new(&mut trace);
        cg.bundles(&[bundle(1, 1, vec![vec![x(0)]])]).unwrap();
        cg.bundles(&[bundle(1, 1, vec![vec![x(0)]]), bundle(2, 1, vec![vec![x(0)]])]).unwrap();
        assert_eq!(cg.bundle_index(), 3);
        let indices: Vec<usize> = trace
            .events()
            .iter()
            .filter_map(|e| match e {
                Emission::BundleStart { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_classical_section_dispatches_to_classical() {
        let (result, _) = run(&[bundle(1, 1, vec![vec![Gate::classical("add", [0, 1, 2])]])]);
        assert!(matches!(
            result,
            Err(CcError::ClassicalNotImplemented { ref opcode, .. }) if opcode == "add"
        ));
    }

    #[test]
    fn test_classical_with_parallel_gates_rejected() {
        let (result, _) = run(&[bundle(1, 1, vec![vec![Gate::classical("add", [0, 1, 2]), x(0)]])]);
        assert!(matches!(result, Err(CcError::ClassicalWithParallelSections { bundle: 0, gates: 2 })));
    }

    #[test]
    fn test_classical_after_quantum_rejected() {
        let (result, _) = run(&[bundle(1, 1, vec![vec![x(0), Gate::classical("ldi", [1])]])]);
        assert!(matches!(result, Err(CcError::ClassicalAfterQuantum { bundle: 0, .. })));
    }

    #[test]
    fn test_measure_halts_before_later_sections() {
        let (result, events) = run(&[bundle(1, 1, vec![vec![x(0)], vec![Gate::measure(1)], vec![x(2)]])]);
        assert!(matches!(result, Err(CcError::GateNotSupported { kind: GateKind::Measure, .. })));
        let customs = events.iter().filter(|e| matches!(e, Emission::Custom { .. })).count();
        assert_eq!(customs, 1, "the section after the measurement must not be emitted");
        assert!(!events.iter().any(|e| matches!(e, Emission::BundleFinish { .. })));
    }

    #[test]
    fn test_display_not_supported() {
        let (result, _) = run(&[bundle(1, 1, vec![vec![Gate::display()]])]);
        assert!(matches!(result, Err(CcError::GateNotSupported { kind: GateKind::Display, .. })));
    }

    #[test]
    fn test_prepz_unsupported() {
        let (result, _) = run(&[bundle(1, 1, vec![vec![Gate::prepz(0)]])]);
        let err = result.unwrap_err();
        assert!(matches!(err, CcError::UnsupportedGateType { kind: GateKind::Prepz, .. }));
        assert_eq!(err.to_string(), "unsupported gate type: prepz (`prepz q[0]`)");
    }

    #[test]
    fn test_custom_gate_without_qubits_rejected() {
        let sync = Gate::custom("sync", Vec::<usize>::new(), 1).with_cregs([2]);
        let (result, events) = run(&[
            bundle(1, 1, vec![vec![x(0)]]),
            bundle(2, 1, vec![vec![sync]]),
        ]);
        let err = result.unwrap_err();
        assert!(matches!(err, CcError::CustomWithoutQubits { bundle: 1, ref gate } if gate == "sync r[2]"));
        assert!(!events.iter().any(|e| matches!(e, Emission::Custom { name, .. } if name == "sync")));
    }

    #[test]
    fn test_empty_section_rejected() {
        let (result, _) = run(&[bundle(1, 1, vec![vec![]])]);
        assert!(matches!(result, Err(CcError::EmptyParallelSection { bundle: 0 })));
    }

    #[test]
    fn test_no_bundles_emits_nothing() {
        let (result, events) = run(&[]);
        result.unwrap();
        assert!(events.is_empty());
    }
}

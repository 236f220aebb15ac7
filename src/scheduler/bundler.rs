/// Cycle bundler, the stock `Scheduler`.
///
/// Groups a kernel's gates into bundles by start cycle:
///   1. A gate with a pre-assigned `cycle` starts there
///   2. A gate without one starts when everything before it has finished
///   3. Gates of the same quantum opcode in one cycle share a parallel section
///   4. Classical gates always get a section of their own
///
/// No dependency analysis and no resource constraints: the cycles are
/// trusted as given. Operands are checked against the platform's qubit and
/// classical register counts.
use std::collections::BTreeMap;

use tracing::debug;

use super::{ScheduleError, Scheduler};
use crate::compiler::{Bundle, Circuit, Gate, GateKind, ParallelSection};

/// First cycle handed out to unpinned gates.
pub const FIRST_CYCLE: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBundler {
    first_cycle: u64,
}

impl Default for CycleBundler {
    fn default() -> Self {
        Self { first_cycle: FIRST_CYCLE }
    }
}

impl CycleBundler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the first unpinned gate at `cycle` instead of `FIRST_CYCLE`.
    pub fn starting_at(cycle: u64) -> Self {
        Self { first_cycle: cycle }
    }

    fn check_operands(gate: &Gate, qubit_count: usize, creg_count: usize) -> Result<(), ScheduleError> {
        if let Some(&qubit) = gate.qubits.iter().find(|&&q| q >= qubit_count) {
            return Err(ScheduleError::QubitOutOfRange { gate: gate.qasm(), qubit, qubit_count });
        }
        if let Some(&creg) = gate.cregs.iter().find(|&&r| r >= creg_count) {
            return Err(ScheduleError::CregOutOfRange { gate: gate.qasm(), creg, creg_count });
        }
        Ok(())
    }
}

/// Add `gate` to the sections of one cycle, merging same-opcode quantum gates.
fn place(sections: &mut Vec<ParallelSection>, gate: &Gate) {
    if gate.kind == GateKind::Custom {
        let same_op = sections.iter_mut().find(|s| {
            s.first().is_some_and(|g| g.kind == GateKind::Custom && g.name == gate.name)
        });
        if let Some(section) = same_op {
            section.push(gate.clone());
            return;
        }
    }
    sections.push(ParallelSection::single(gate.clone()));
}

impl Scheduler for CycleBundler {
    fn schedule(
        &self,
        circuit: &Circuit,
        qubit_count: usize,
        creg_count: usize,
    ) -> Result<Vec<Bundle>, ScheduleError> {
        // cycle → (duration, sections)
        let mut slots: BTreeMap<u64, (u64, Vec<ParallelSection>)> = BTreeMap::new();
        let mut next_free = self.first_cycle;

        for gate in circuit {
            Self::check_operands(gate, qubit_count, creg_count)?;

            let start = gate.cycle.unwrap_or(next_free);
            let end = start
                .checked_add(gate.duration.max(1))
                .ok_or_else(|| ScheduleError::CycleOverflow { gate: gate.qasm(), cycle: start })?;
            next_free = next_free.max(end);

            let (duration, sections) = slots.entry(start).or_default();
            *duration = (*duration).max(gate.duration);
            place(sections, gate);
        }

        let bundles: Vec<Bundle> = slots
            .into_iter()
            .map(|(start, (duration, sections))| Bundle::new(start, duration, sections))
            .collect();
        debug!(gates = circuit.len(), bundles = bundles.len(), "bundled circuit");
        Ok(bundles)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn circuit(gates: Vec<Gate>) -> Circuit {
        gates.into()
    }

    #[test]
    fn test_unpinned_gates_run_back_to_back() {
        let c = circuit(vec![
            Gate::custom("x", [0], 1),
            Gate::custom("cz", [0, 1], 2),
            Gate::custom("y", [1], 1),
        ]);
        let bundles = CycleBundler::new().schedule(&c, 2, 0).unwrap();
        let starts: Vec<u64> = bundles.iter().map(|b| b.start_cycle).collect();
        assert_eq!(starts, vec![1, 2, 4]);
        assert_eq!(bundles[1].duration_in_cycles, 2);
    }

    #[test]
    fn test_pinned_gates_share_a_bundle() {
        let c = circuit(vec![
            Gate::custom("x", [0], 1).at_cycle(3),
            Gate::custom("x", [1], 1).at_cycle(3),
            Gate::custom("y", [2], 2).at_cycle(3),
        ]);
        let bundles = CycleBundler::new().schedule(&c, 3, 0).unwrap();
        assert_eq!(bundles.len(), 1);
        let b = &bundles[0];
        assert_eq!(b.start_cycle, 3);
        assert_eq!(b.duration_in_cycles, 2, "bundle lasts as long as its longest gate");
        assert_eq!(b.parallel_sections.len(), 2, "x gates merge, y gets its own section");
        assert_eq!(b.parallel_sections[0].len(), 2);
        assert_eq!(b.gate_count(), 3);
    }

    #[test]
    fn test_bundles_sorted_by_start_cycle() {
        let c = circuit(vec![
            Gate::custom("x", [0], 1).at_cycle(10),
            Gate::custom("x", [1], 1).at_cycle(2),
        ]);
        let bundles = CycleBundler::new().schedule(&c, 2, 0).unwrap();
        let starts: Vec<u64> = bundles.iter().map(|b| b.start_cycle).collect();
        assert_eq!(starts, vec![2, 10]);
    }

    #[test]
    fn test_classical_gates_never_merge() {
        let c = circuit(vec![
            Gate::classical("add", [0, 1, 2]).at_cycle(1),
            Gate::classical("add", [3, 1, 2]).at_cycle(1),
        ]);
        let bundles = CycleBundler::new().schedule(&c, 1, 4).unwrap();
        assert_eq!(bundles[0].parallel_sections.len(), 2);
        assert!(bundles[0].parallel_sections.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn test_starting_at() {
        let c = circuit(vec![Gate::custom("x", [0], 1)]);
        let bundles = CycleBundler::starting_at(0).schedule(&c, 1, 0).unwrap();
        assert_eq!(bundles[0].start_cycle, 0);
    }

    #[test]
    fn test_qubit_out_of_range() {
        let c = circuit(vec![Gate::custom("cz", [0, 5], 2)]);
        let err = CycleBundler::new().schedule(&c, 2, 0).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::QubitOutOfRange { gate: "cz q[0],q[5]".into(), qubit: 5, qubit_count: 2 }
        );
    }

    #[test]
    fn test_creg_out_of_range() {
        let c = circuit(vec![Gate::classical("ldi", [7])]);
        let err = CycleBundler::new().schedule(&c, 1, 4).unwrap_err();
        assert!(matches!(err, ScheduleError::CregOutOfRange { creg: 7, creg_count: 4, .. }));
    }

    #[test]
    fn test_pinned_cycle_overflow() {
        let c = circuit(vec![Gate::custom("x", [0], 2).at_cycle(u64::MAX - 1)]);
        let err = CycleBundler::new().schedule(&c, 1, 0).unwrap_err();
        assert_eq!(err, ScheduleError::CycleOverflow { gate: "x q[0]".into(), cycle: u64::MAX - 1 });

        let fits = circuit(vec![Gate::custom("x", [0], 1).at_cycle(u64::MAX - 1)]);
        let bundles = CycleBundler::new().schedule(&fits, 1, 0).unwrap();
        assert_eq!(bundles[0].end_cycle(), u64::MAX);
    }

    #[test]
    fn test_closure_is_a_scheduler() {
        let fixed = |_: &Circuit, _: usize, _: usize| -> Result<Vec<Bundle>, ScheduleError> {
            Err(ScheduleError::Failed("no schedule".into()))
        };
        let err = fixed.schedule(&Circuit::new(), 1, 1).unwrap_err();
        assert_eq!(err.to_string(), "no schedule");
    }
}

/// Scheduler output: time-bundled gates.
///
/// A `Bundle` is everything that starts in one cycle. Its gates are grouped
/// into `ParallelSection`s; a section is issued as one slot. A section that
/// holds a classical gate must hold nothing else; the code generator
/// enforces that, the types do not.
use super::ir::Gate;

/// Gates issued together in one slot of a bundle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParallelSection {
    gates: Vec<Gate>,
}

impl ParallelSection {
    pub fn new(gates: Vec<Gate>) -> Self {
        Self { gates }
    }

    /// A section holding a single gate.
    pub fn single(gate: Gate) -> Self {
        Self { gates: vec![gate] }
    }

    pub fn push(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn first(&self) -> Option<&Gate> {
        self.gates.first()
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Gate> {
        self.gates.iter()
    }
}

/// All gates starting at `start_cycle`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub start_cycle: u64,
    /// Longest gate duration in the bundle.
    pub duration_in_cycles: u64,
    pub parallel_sections: Vec<ParallelSection>,
}

impl Bundle {
    pub fn new(start_cycle: u64, duration_in_cycles: u64, parallel_sections: Vec<ParallelSection>) -> Self {
        Self { start_cycle, duration_in_cycles, parallel_sections }
    }

    /// First cycle after the bundle has completed, clamped at `u64::MAX`.
    pub fn end_cycle(&self) -> u64 {
        self.start_cycle.saturating_add(self.duration_in_cycles)
    }

    pub fn gate_count(&self) -> usize {
        self.parallel_sections.iter().map(ParallelSection::len).sum()
    }
}

/// Render bundles as scheduled QASM.
///
/// One line per bundle; gates issued together are joined with ` | ` and
/// wrapped in braces when there is more than one. Idle cycles between
/// bundles become `qwait` lines.
pub fn bundles_qasm(bundles: &[Bundle]) -> String {
    let mut out = String::new();
    let mut curr_cycle: Option<u64> = None;

    for bundle in bundles {
        if let Some(curr) = curr_cycle {
            let delta = bundle.start_cycle.saturating_sub(curr);
            if delta > 1 {
                out.push_str(&format!("    qwait {}\n", delta - 1));
            }
        }

        let gates: Vec<String> = bundle
            .parallel_sections
            .iter()
            .flat_map(|s| s.iter().map(Gate::qasm))
            .collect();
        if gates.len() > 1 {
            out.push_str(&format!("    {{ {} }}\n", gates.join(" | ")));
        } else {
            out.push_str(&format!("    {}\n", gates.join("")));
        }
        curr_cycle = Some(bundle.start_cycle);
    }

    if let Some(last) = bundles.last() {
        if last.duration_in_cycles > 1 {
            out.push_str(&format!("    qwait {}\n", last.duration_in_cycles - 1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x(q: usize) -> Gate {
        Gate::custom("x", [q], 1)
    }

    #[test]
    fn test_bundle_end_cycle() {
        let b = Bundle::new(4, 3, vec![ParallelSection::single(x(0))]);
        assert_eq!(b.end_cycle(), 7);
        assert_eq!(b.gate_count(), 1);

        let late = Bundle::new(u64::MAX - 1, 5, vec![ParallelSection::single(x(0))]);
        assert_eq!(late.end_cycle(), u64::MAX);
    }

    #[test]
    fn test_section_accessors() {
        let mut s = ParallelSection::default();
        assert!(s.is_empty());
        assert!(s.first().is_none());
        s.push(x(0));
        s.push(x(1));
        assert_eq!(s.len(), 2);
        assert_eq!(s.first().map(|g| g.qubits[0]), Some(0));
    }

    #[test]
    fn test_bundles_qasm_parallel_and_waits() {
        let bundles = vec![
            Bundle::new(1, 1, vec![ParallelSection::new(vec![x(0), x(1)])]),
            Bundle::new(2, 2, vec![ParallelSection::single(Gate::custom("cz", [0, 1], 2))]),
            Bundle::new(6, 1, vec![ParallelSection::single(x(0))]),
        ];
        let qasm = bundles_qasm(&bundles);
        assert_eq!(
            qasm,
            "    { x q[0] | x q[1] }\n    cz q[0],q[1]\n    qwait 3\n    x q[0]\n"
        );
    }

    #[test]
    fn test_bundles_qasm_trailing_wait() {
        let bundles = vec![Bundle::new(1, 4, vec![ParallelSection::single(x(0))])];
        assert_eq!(bundles_qasm(&bundles), "    x q[0]\n    qwait 3\n");
        assert_eq!(bundles_qasm(&[]), "");
    }
}

/// Kernel IR consumed by the Central Controller back end.
///
/// A `Program` is an ordered list of `Kernel`s. Each kernel is either a basic
/// block of gates (`Static`) or a control-flow marker that opens or closes a
/// conditional or loop. Control-flow kernels may carry gates of their own,
/// but usually exist only for their classical semantics and are empty.
///
/// Design principles:
///   - The IR is immutable input; the back end never rewrites it
///   - Gate variants are a closed enum; dispatch is an exhaustive `match`
///   - Durations and cycles are in scheduler cycles, not nanoseconds
///   - Every type is serde-serializable so programs can be fed as JSON
use serde::{Deserialize, Serialize};
use tracing::debug;

// ── Gate ──────────────────────────────────────────────────────────────────

/// Gate variant. The back end can emit `Classical`, `Custom` and `Nop`;
/// everything else is rejected at emission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Classical register operation (add, ldi, eq, …).
    Classical,
    /// Quantum gate defined by the platform's instruction set.
    Custom,
    /// Quantum no-op.
    Nop,
    Measure,
    /// Simulator-only state dump.
    Display,
    /// Qubit preparation in |0⟩.
    Prepz,
}

impl GateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classical => "classical",
            Self::Custom    => "custom",
            Self::Nop       => "nop",
            Self::Measure   => "measure",
            Self::Display   => "display",
            Self::Prepz     => "prepz",
        }
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_duration() -> u64 {
    1
}

/// One quantum or classical operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub kind: GateKind,
    /// Opcode, e.g. `"x"`, `"cz"`, `"add"`.
    pub name: String,
    /// Qubit operands, in instruction order.
    #[serde(default)]
    pub qubits: Vec<usize>,
    /// Classical register operands, in instruction order.
    #[serde(default)]
    pub cregs: Vec<usize>,
    /// Rotation angle in radians, for parameterized gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    /// Duration in cycles.
    #[serde(default = "default_duration")]
    pub duration: u64,
    /// Start cycle assigned upstream, if any. Consumed by the bundler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
}

impl Gate {
    fn with_kind(kind: GateKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            qubits: Vec::new(),
            cregs: Vec::new(),
            angle: None,
            duration: default_duration(),
            cycle: None,
        }
    }

    /// Custom quantum gate on `qubits` lasting `duration` cycles.
    pub fn custom(name: impl Into<String>, qubits: impl Into<Vec<usize>>, duration: u64) -> Self {
        Self { qubits: qubits.into(), duration, ..Self::with_kind(GateKind::Custom, name) }
    }

    /// Classical instruction on classical registers `cregs`.
    pub fn classical(name: impl Into<String>, cregs: impl Into<Vec<usize>>) -> Self {
        Self { cregs: cregs.into(), ..Self::with_kind(GateKind::Classical, name) }
    }

    pub fn nop() -> Self {
        Self::with_kind(GateKind::Nop, "nop")
    }

    pub fn measure(qubit: usize) -> Self {
        Self { qubits: vec![qubit], ..Self::with_kind(GateKind::Measure, "measure") }
    }

    pub fn display() -> Self {
        Self::with_kind(GateKind::Display, "display")
    }

    pub fn prepz(qubit: usize) -> Self {
        Self { qubits: vec![qubit], ..Self::with_kind(GateKind::Prepz, "prepz") }
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn with_cregs(mut self, cregs: impl Into<Vec<usize>>) -> Self {
        self.cregs = cregs.into();
        self
    }

    /// Pin the gate to a start cycle.
    pub fn at_cycle(mut self, cycle: u64) -> Self {
        self.cycle = Some(cycle);
        self
    }

    pub fn is_classical(&self) -> bool {
        self.kind == GateKind::Classical
    }

    /// True for gates that end a basic block (measurement or preparation).
    pub fn is_block_boundary(&self) -> bool {
        matches!(self.kind, GateKind::Measure | GateKind::Prepz)
    }

    /// QASM-like text form: `name q[0],q[1],r[2],0.500000`.
    pub fn qasm(&self) -> String {
        let mut operands: Vec<String> = self.qubits.iter().map(|q| format!("q[{q}]")).collect();
        operands.extend(self.cregs.iter().map(|r| format!("r[{r}]")));
        if let Some(angle) = self.angle {
            operands.push(format!("{angle:.6}"));
        }
        if operands.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, operands.join(","))
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qasm())
    }
}

// ── Circuit ───────────────────────────────────────────────────────────────

/// Ordered gate container for one kernel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Circuit {
    gates: Vec<Gate>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Gate> {
        self.gates.iter()
    }

    /// One gate per line, newline-terminated.
    pub fn qasm(&self) -> String {
        let mut out = String::new();
        for gate in &self.gates {
            out.push_str(&gate.qasm());
            out.push('\n');
        }
        out
    }

    /// Decompose into basic blocks.
    ///
    /// Every measurement or preparation lands in a block of its own,
    /// followed by a fresh (possibly empty) block for the gates after it.
    pub fn split(&self) -> Vec<Circuit> {
        let mut blocks = vec![Circuit::new()];
        for gate in &self.gates {
            if gate.is_block_boundary() {
                blocks.push(Circuit { gates: vec![gate.clone()] });
                blocks.push(Circuit::new());
            } else if let Some(last) = blocks.last_mut() {
                last.push(gate.clone());
            }
        }
        debug!(blocks = blocks.len(), "circuit decomposed into basic blocks");
        blocks
    }

    /// True if any gate is a measurement or qubit preparation.
    pub fn contains_measurements(&self) -> bool {
        self.gates.iter().any(Gate::is_block_boundary)
    }
}

impl From<Vec<Gate>> for Circuit {
    fn from(gates: Vec<Gate>) -> Self {
        Self { gates }
    }
}

impl FromIterator<Gate> for Circuit {
    fn from_iter<I: IntoIterator<Item = Gate>>(iter: I) -> Self {
        Self { gates: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a Circuit {
    type Item = &'a Gate;
    type IntoIter = std::slice::Iter<'a, Gate>;

    fn into_iter(self) -> Self::IntoIter {
        self.gates.iter()
    }
}

impl std::fmt::Display for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "-------------------")?;
        for gate in &self.gates {
            writeln!(f, "   {gate}")?;
        }
        write!(f, "\n-------------------")
    }
}

// ── Branch condition ──────────────────────────────────────────────────────

/// Comparison between two classical registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Ge => "ge",
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `R<lhs> <op> R<rhs>`: the test guarding a conditional or do-while loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCondition {
    pub lhs: usize,
    pub op:  CompareOp,
    pub rhs: usize,
}

impl BranchCondition {
    pub fn new(lhs: usize, op: CompareOp, rhs: usize) -> Self {
        Self { lhs, op, rhs }
    }
}

impl std::fmt::Display for BranchCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{} {} R{}", self.lhs, self.op, self.rhs)
    }
}

// ── Kernel ────────────────────────────────────────────────────────────────

/// Structural role of a kernel in the program's control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelType {
    Static,
    IfStart,
    IfEnd,
    ElseStart,
    ElseEnd,
    ForStart,
    ForEnd,
    DoWhileStart,
    DoWhileEnd,
}

impl KernelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static       => "static",
            Self::IfStart      => "if_start",
            Self::IfEnd        => "if_end",
            Self::ElseStart    => "else_start",
            Self::ElseEnd      => "else_end",
            Self::ForStart     => "for_start",
            Self::ForEnd       => "for_end",
            Self::DoWhileStart => "do_while_start",
            Self::DoWhileEnd   => "do_while_end",
        }
    }

    /// The kernel type that closes a construct opened by `self`.
    pub fn closing(self) -> Option<KernelType> {
        match self {
            Self::IfStart      => Some(Self::IfEnd),
            Self::ElseStart    => Some(Self::ElseEnd),
            Self::ForStart     => Some(Self::ForEnd),
            Self::DoWhileStart => Some(Self::DoWhileEnd),
            Self::Static | Self::IfEnd | Self::ElseEnd
            | Self::ForEnd | Self::DoWhileEnd => None,
        }
    }

    pub fn is_end(self) -> bool {
        matches!(self, Self::IfEnd | Self::ElseEnd | Self::ForEnd | Self::DoWhileEnd)
    }

    /// True if the kernel must carry a `BranchCondition`.
    pub fn requires_condition(self) -> bool {
        matches!(self, Self::IfStart | Self::ElseStart | Self::DoWhileEnd)
    }
}

impl std::fmt::Display for KernelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named basic block or control-flow marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kernel {
    /// Structured name, e.g. `sp1_for1_start`; the first `_`-separated
    /// token is the control-flow label.
    pub name: String,
    #[serde(rename = "type", default = "default_kernel_type")]
    pub kernel_type: KernelType,
    #[serde(rename = "gates", default)]
    pub circuit: Circuit,
    /// Loop trip count. Only meaningful for `ForStart`.
    #[serde(default)]
    pub iterations: u64,
    #[serde(rename = "condition", default, skip_serializing_if = "Option::is_none")]
    pub br_condition: Option<BranchCondition>,
}

fn default_kernel_type() -> KernelType {
    KernelType::Static
}

impl Kernel {
    pub fn new(name: impl Into<String>, kernel_type: KernelType) -> Self {
        Self {
            name: name.into(),
            kernel_type,
            circuit: Circuit::new(),
            iterations: 0,
            br_condition: None,
        }
    }

    /// A static basic block holding `gates`.
    pub fn basic(name: impl Into<String>, gates: impl IntoIterator<Item = Gate>) -> Self {
        Self::new(name, KernelType::Static).with_gates(gates)
    }

    pub fn for_start(name: impl Into<String>, iterations: u64) -> Self {
        Self::new(name, KernelType::ForStart).with_iterations(iterations)
    }

    pub fn with_gates(mut self, gates: impl IntoIterator<Item = Gate>) -> Self {
        self.circuit = gates.into_iter().collect();
        self
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_condition(mut self, condition: BranchCondition) -> Self {
        self.br_condition = Some(condition);
        self
    }
}

// ── Program ───────────────────────────────────────────────────────────────

/// A named, ordered sequence of kernels: one compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    #[serde(default)]
    pub kernels: Vec<Kernel>,
}

impl Program {
    pub fn new(name: impl Into<String>, kernels: Vec<Kernel>) -> Self {
        Self { name: name.into(), kernels }
    }

    /// Parse a program from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Total gates across all kernels.
    pub fn gate_count(&self) -> usize {
        self.kernels.iter().map(|k| k.circuit.len()).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

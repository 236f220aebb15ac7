/// Recording emitter.
///
/// Stores every emission call as an `Emission` value, in call order. Used
/// by `ccgen trace` to show what the code generator asked for, and by tests
/// to assert on instruction sequences without parsing assembly text.
use super::Emitter;
use crate::compiler::BranchCondition;

/// One call into the `Emitter` interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    ProgramStart { name: String },
    ProgramFinish { name: String },
    KernelStart,
    KernelFinish { name: String, duration_in_cycles: u64 },
    BundleStart { index: usize, start_cycle: u64, duration_in_cycles: u64 },
    BundleFinish { start_cycle: u64, duration_in_cycles: u64, is_last: bool },
    Nop,
    Custom {
        name: String,
        qubits: Vec<usize>,
        cregs: Vec<usize>,
        angle: Option<f64>,
        start_cycle: u64,
        duration: u64,
    },
    Comment(String),
    IfStart(BranchCondition),
    ElseStart(BranchCondition),
    ForStart { label: String, iterations: u64 },
    ForEnd { label: String },
    DoWhileStart { label: String },
    DoWhileEnd { label: String, condition: BranchCondition },
}

impl std::fmt::Display for Emission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProgramStart { name }  => write!(f, "program_start {name}"),
            Self::ProgramFinish { name } => write!(f, "program_finish {name}"),
            Self::KernelStart            => write!(f, "kernel_start"),
            Self::KernelFinish { name, duration_in_cycles } =>
                write!(f, "kernel_finish {name} end={duration_in_cycles}"),
            Self::BundleStart { index, start_cycle, duration_in_cycles } =>
                write!(f, "bundle_start #{index} start={start_cycle} duration={duration_in_cycles}"),
            Self::BundleFinish { start_cycle, duration_in_cycles, is_last } =>
                write!(f, "bundle_finish start={start_cycle} duration={duration_in_cycles} last={is_last}"),
            Self::Nop => write!(f, "nop"),
            Self::Custom { name, qubits, cregs, angle, start_cycle, duration } => {
                write!(f, "custom {name} q{qubits:?}")?;
                if !cregs.is_empty() {
                    write!(f, " r{cregs:?}")?;
                }
                if let Some(angle) = angle {
                    write!(f, " angle={angle}")?;
                }
                write!(f, " @{start_cycle}+{duration}")
            }
            Self::Comment(text)          => write!(f, "comment {text}"),
            Self::IfStart(cond)          => write!(f, "if_start {cond}"),
            Self::ElseStart(cond)        => write!(f, "else_start {cond}"),
            Self::ForStart { label, iterations } => write!(f, "for_start {label} x{iterations}"),
            Self::ForEnd { label }       => write!(f, "for_end {label}"),
            Self::DoWhileStart { label } => write!(f, "do_while_start {label}"),
            Self::DoWhileEnd { label, condition } => write!(f, "do_while_end {label} while {condition}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Vec<Emission>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Emission] {
        &self.events
    }

    /// Events with comments filtered out.
    pub fn instructions(&self) -> Vec<&Emission> {
        self.events.iter().filter(|e| !matches!(e, Emission::Comment(_))).collect()
    }

    pub fn into_events(self) -> Vec<Emission> {
        self.events
    }
}

impl Emitter for Trace {
    fn program_start(&mut self, prog_name: &str) {
        self.events.push(Emission::ProgramStart { name: prog_name.to_string() });
    }

    fn program_finish(&mut self, prog_name: &str) {
        self.events.push(Emission::ProgramFinish { name: prog_name.to_string() });
    }

    fn kernel_start(&mut self) {
        self.events.push(Emission::KernelStart);
    }

    fn kernel_finish(&mut self, kernel_name: &str, duration_in_cycles: u64) {
        self.events.push(Emission::KernelFinish { name: kernel_name.to_string(), duration_in_cycles });
    }

    fn bundle_start(&mut self, index: usize, start_cycle: u64, duration_in_cycles: u64) {
        self.events.push(Emission::BundleStart { index, start_cycle, duration_in_cycles });
    }

    fn bundle_finish(&mut self, start_cycle: u64, duration_in_cycles: u64, is_last: bool) {
        self.events.push(Emission::BundleFinish { start_cycle, duration_in_cycles, is_last });
    }

    fn nop_gate(&mut self) {
        self.events.push(Emission::Nop);
    }

    fn custom_gate(
        &mut self,
        name: &str,
        qubits: &[usize],
        cregs: &[usize],
        angle: Option<f64>,
        start_cycle: u64,
        duration: u64,
    ) {
        self.events.push(Emission::Custom {
            name: name.to_string(),
            qubits: qubits.to_vec(),
            cregs: cregs.to_vec(),
            angle,
            start_cycle,
            duration,
        });
    }

    fn comment(&mut self, text: &str) {
        self.events.push(Emission::Comment(text.to_string()));
    }

    fn if_start(&mut self, condition: &BranchCondition) {
        self.events.push(Emission::IfStart(*condition));
    }

    fn else_start(&mut self, condition: &BranchCondition) {
        self.events.push(Emission::ElseStart(*condition));
    }

    fn for_start(&mut self, label: &str, iterations: u64) {
        self.events.push(Emission::ForStart { label: label.to_string(), iterations });
    }

    fn for_end(&mut self, label: &str) {
        self.events.push(Emission::ForEnd { label: label.to_string() });
    }

    fn do_while_start(&mut self, label: &str) {
        self.events.push(Emission::DoWhileStart { label: label.to_string() });
    }

    fn do_while_end(&mut self, label: &str, condition: &BranchCondition) {
        self.events.push(Emission::DoWhileEnd { label: label.to_string(), condition: *condition });
    }

    fn code(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&event.to_string());
            out.push('\n');
        }
        out
    }

    fn map(&self) -> String {
        "{}\n".to_string()
    }
}

/// Central Controller `.vq1asm` encoder.
///
/// Layout of the generated program:
///
/// ```text
/// # Program: 'bell'
/// # Generated by ccgen 0.1.0 for platform 'cc' (2 qubits, cycle_time=20 ns)
/// .CODE
///                 seq_bar                                 # synchronize processors
/// mainLoop:
/// ### Kernel: 'k0'
/// ## Bundle 0: start_cycle=1, duration_in_cycles=1:
///                 seq_out         q0,0x01                 # h q[0]
/// ## Bundle 1: start_cycle=2, duration_in_cycles=2:
///                 seq_wait        1                       # idle until cycle 2
///                 seq_out         q0,0x02                 # cnot q[0],q[1]
///                 seq_out         q1,0x02                 # cnot q[0],q[1]
///                 seq_wait        2                       # end of kernel
/// # Kernel 'k0' finished, duration_in_cycles=4
///                 jmp             @mainLoop               # loop indefinitely
/// .END                                                    # end of program 'bell'
/// ```
///
/// Codewords are handed out per opcode in order of first use, starting at 1
/// (0 is the idle codeword). The instrument map records the codeword table
/// and which opcodes each qubit's instrument must be able to play.
///
/// Loop counters live in R63, R62, … by nesting depth; the code generator
/// stops at `MAX_LOOP_DEPTH` open loops, so R0 is the deepest counter.
use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use super::Emitter;
use crate::compiler::BranchCondition;
use crate::platform::Platform;

/// Highest register; loop counters are allocated downward from here.
const LOOP_REG_TOP: usize = 63;

pub struct CcEmitter {
    platform: Platform,
    program: String,
    code: String,
    codewords: BTreeMap<String, u32>,
    instruments: BTreeMap<usize, BTreeSet<String>>,
    /// Start cycle of the previous bundle in the current kernel.
    last_issue: Option<u64>,
    loop_regs: Vec<usize>,
}

impl CcEmitter {
    pub fn new(platform: &Platform) -> Self {
        Self {
            platform: platform.clone(),
            program: String::new(),
            code: String::new(),
            codewords: BTreeMap::new(),
            instruments: BTreeMap::new(),
            last_issue: None,
            loop_regs: Vec::new(),
        }
    }

    /// Codeword for `opcode`, assigning the next free one on first use.
    pub fn codeword(&mut self, opcode: &str) -> u32 {
        let next = self.codewords.len() as u32 + 1;
        *self.codewords.entry(opcode.to_string()).or_insert(next)
    }

    fn emit(&mut self, label: &str, instr: &str, operands: &str, comment: &str) {
        let line = if comment.is_empty() {
            format!("{label:<16}{instr:<16}{operands}")
        } else {
            format!("{label:<16}{instr:<16}{operands:<24}# {comment}")
        };
        self.code.push_str(line.trim_end());
        self.code.push('\n');
    }

    fn emit_label(&mut self, label: &str) {
        self.code.push_str(label);
        self.code.push_str(":\n");
    }

    fn emit_line(&mut self, text: &str) {
        self.code.push_str(text);
        self.code.push('\n');
    }
}

fn gate_text(name: &str, qubits: &[usize], cregs: &[usize], angle: Option<f64>) -> String {
    let mut operands: Vec<String> = qubits.iter().map(|q| format!("q[{q}]")).collect();
    operands.extend(cregs.iter().map(|r| format!("r[{r}]")));
    if let Some(angle) = angle {
        operands.push(format!("{angle:.6}"));
    }
    if operands.is_empty() {
        name.to_string()
    } else {
        format!("{name} {}", operands.join(","))
    }
}

impl Emitter for CcEmitter {
    fn program_start(&mut self, prog_name: &str) {
        self.program = prog_name.to_string();
        self.emit_line(&format!("# Program: '{prog_name}'"));
        self.emit_line(&format!(
            "# Generated by ccgen {} for platform '{}' ({} qubits, cycle_time={} ns)",
            env!("CARGO_PKG_VERSION"),
            self.platform.name,
            self.platform.qubit_count,
            self.platform.cycle_time,
        ));
        self.emit_line(".CODE");
        self.emit("", "seq_bar", "", "synchronize processors");
        self.emit_label("mainLoop");
    }

    fn program_finish(&mut self, prog_name: &str) {
        self.emit("", "jmp", "@mainLoop", "loop indefinitely");
        self.emit(".END", "", "", &format!("end of program '{prog_name}'"));
    }

    fn kernel_start(&mut self) {
        self.last_issue = None;
    }

    fn kernel_finish(&mut self, kernel_name: &str, duration_in_cycles: u64) {
        self.emit_line(&format!(
            "# Kernel '{kernel_name}' finished, duration_in_cycles={duration_in_cycles}"
        ));
    }

    fn bundle_start(&mut self, index: usize, start_cycle: u64, duration_in_cycles: u64) {
        self.emit_line(&format!(
            "## Bundle {index}: start_cycle={start_cycle}, duration_in_cycles={duration_in_cycles}:"
        ));
        if let Some(prev) = self.last_issue {
            let gap = start_cycle.saturating_sub(prev);
            if gap > 0 {
                self.emit("", "seq_wait", &gap.to_string(), &format!("idle until cycle {start_cycle}"));
            }
        }
        self.last_issue = Some(start_cycle);
    }

    fn bundle_finish(&mut self, _start_cycle: u64, duration_in_cycles: u64, is_last: bool) {
        if is_last && duration_in_cycles > 0 {
            self.emit("", "seq_wait", &duration_in_cycles.to_string(), "end of kernel");
        }
    }

    fn nop_gate(&mut self) {
        self.emit("", "nop", "", "quantum nop");
    }

    fn custom_gate(
        &mut self,
        name: &str,
        qubits: &[usize],
        cregs: &[usize],
        angle: Option<f64>,
        _start_cycle: u64,
        _duration: u64,
    ) {
        let cw = self.codeword(name);
        let text = gate_text(name, qubits, cregs, angle);
        for &q in qubits {
            self.instruments.entry(q).or_default().insert(name.to_string());
            self.emit("", "seq_out", &format!("q{q},{cw:#04x}"), &text);
        }
    }

    fn comment(&mut self, text: &str) {
        if text.starts_with('#') {
            self.emit_line(text);
        } else {
            self.emit_line(&format!("# {text}"));
        }
    }

    fn if_start(&mut self, condition: &BranchCondition) {
        self.emit_line(&format!("# IF_START({condition})"));
    }

    fn else_start(&mut self, condition: &BranchCondition) {
        self.emit_line(&format!("# ELSE_START({condition})"));
    }

    fn for_start(&mut self, label: &str, iterations: u64) {
        let reg = LOOP_REG_TOP.saturating_sub(self.loop_regs.len());
        self.loop_regs.push(reg);
        self.emit("", "move", &format!("{iterations},R{reg}"), &format!("R{reg} is loop counter for '{label}'"));
        self.emit_label(label);
    }

    fn for_end(&mut self, label: &str) {
        let reg = self.loop_regs.pop().unwrap_or(LOOP_REG_TOP);
        self.emit("", "loop", &format!("R{reg},@{label}"), &format!("end of loop '{label}'"));
    }

    fn do_while_start(&mut self, label: &str) {
        self.emit_label(label);
    }

    fn do_while_end(&mut self, label: &str, condition: &BranchCondition) {
        self.emit_line(&format!("# DO_WHILE_END({condition}), loop back to @{label}"));
    }

    fn code(&self) -> String {
        self.code.clone()
    }

    fn map(&self) -> String {
        let instruments: BTreeMap<String, Vec<&String>> = self
            .instruments
            .iter()
            .map(|(q, ops)| (format!("q{q}"), ops.iter().collect()))
            .collect();
        let map = json!({
            "program": self.program,
            "platform": self.platform.name,
            "qubits": self.platform.qubit_count,
            "codewords": self.codewords,
            "instruments": instruments,
        });
        format!("{map:#}\n")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

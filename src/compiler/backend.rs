/// Program orchestration: one full compilation.
///
///   1. Reject empty programs
///   2. Program header
///   3. Per kernel, in order:
///        prologue → (non-empty only) schedule, kernel_start, bundles,
///        kernel_finish(end cycle) → epilogue
///   4. Program footer
///   5. Hand back the emitted code and instrument map
///
/// Kernels without gates are normal: they exist for their control flow and
/// never reach the scheduler.
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::bundle::{bundles_qasm, Bundle};
use super::codegen::Codegen;
use super::control_flow::kernel_label;
use super::ir::{Circuit, Kernel, Program};
use super::CcError;
use crate::emit::{CcEmitter, Emitter};
use crate::platform::{Options, Platform};
use crate::scheduler::{CycleBundler, Scheduler};

// ── Result type ───────────────────────────────────────────────────────────

/// Output of a successful compilation, not yet on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub name: String,
    /// `.vq1asm` instruction stream.
    pub code: String,
    /// Instrument map document.
    pub map: String,
    /// Scheduled QASM of every non-empty kernel, when requested.
    pub scheduled_qasm: Option<String>,
}

impl CompiledProgram {
    pub fn code_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.vq1asm", self.name))
    }

    pub fn map_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.map", self.name))
    }

    pub fn scheduled_qasm_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_scheduled.qasm", self.name))
    }

    /// Write the artifacts into `options.output_dir`; returns the paths written.
    ///
    /// The instrument map is skipped when the user supplied one.
    pub fn write(&self, options: &Options) -> Result<Vec<PathBuf>, CcError> {
        let dir = options.output_dir.as_path();
        std::fs::create_dir_all(dir).map_err(|source| CcError::Write { path: dir.to_path_buf(), source })?;

        let mut written = Vec::new();

        let path = self.code_path(dir);
        info!(path = %path.display(), "writing Central Controller program");
        write_file(&path, &self.code)?;
        written.push(path);

        if options.writes_map() {
            let path = self.map_path(dir);
            info!(path = %path.display(), "writing instrument map");
            write_file(&path, &self.map)?;
            written.push(path);
        }

        if let Some(qasm) = &self.scheduled_qasm {
            let path = self.scheduled_qasm_path(dir);
            info!(path = %path.display(), "writing scheduled QASM");
            write_file(&path, qasm)?;
            written.push(path);
        }
        Ok(written)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CcError> {
    std::fs::write(path, contents).map_err(|source| CcError::Write { path: path.to_path_buf(), source })
}

// ── Compilation ───────────────────────────────────────────────────────────

/// Compile `program` with the stock bundler into `.vq1asm` text.
pub fn compile(program: &Program, platform: &Platform, options: &Options) -> Result<CompiledProgram, CcError> {
    if options.validate_nesting {
        validate_nesting(&program.kernels)?;
    }

    let mut emitter = CcEmitter::new(platform);
    let mut scheduled = options
        .write_scheduled_qasm
        .then(|| format!("qubits {}\n", platform.qubit_count));

    run(&program.name, &program.kernels, platform, &CycleBundler::new(), &mut emitter, |kernel, bundles| {
        if let Some(out) = scheduled.as_mut() {
            out.push_str(&format!("\n.{}\n", kernel.name));
            out.push_str(&bundles_qasm(bundles));
        }
    })?;

    Ok(CompiledProgram {
        name: program.name.clone(),
        code: emitter.code(),
        map: emitter.map(),
        scheduled_qasm: scheduled,
    })
}

/// Compile kernels with any scheduler into any emitter.
pub fn compile_kernels<S, E>(
    prog_name: &str,
    kernels: &[Kernel],
    platform: &Platform,
    scheduler: &S,
    emitter: &mut E,
) -> Result<(), CcError>
where
    S: Scheduler + ?Sized,
    E: Emitter,
{
    run(prog_name, kernels, platform, scheduler, emitter, |_, _| {})
}

/// Plain circuits carry no kernel structure for classical control.
pub fn compile_circuit(_prog_name: &str, _circuit: &Circuit, _platform: &Platform) -> Result<CompiledProgram, CcError> {
    Err(CcError::CircuitNotImplemented)
}

fn run<S, E, F>(
    prog_name: &str,
    kernels: &[Kernel],
    platform: &Platform,
    scheduler: &S,
    emitter: &mut E,
    mut on_bundles: F,
) -> Result<(), CcError>
where
    S: Scheduler + ?Sized,
    E: Emitter,
    F: FnMut(&Kernel, &[Bundle]),
{
    if kernels.is_empty() {
        return Err(CcError::EmptyProgram);
    }
    info!(program = prog_name, kernels = kernels.len(), "compiling kernels to generate Central Controller program");

    let mut codegen = Codegen::new(emitter);
    codegen.emitter().program_start(prog_name);

    for kernel in kernels {
        info!(kernel = %kernel.name, "compiling kernel");
        codegen.kernel_prologue(kernel)?;

        if kernel.circuit.is_empty() {
            debug!(kernel = %kernel.name, "empty kernel");
        } else {
            let bundles = scheduler
                .schedule(&kernel.circuit, platform.qubit_count, platform.creg_count)
                .map_err(|source| CcError::Schedule { kernel: kernel.name.clone(), source })?;
            let end_cycle = bundles
                .last()
                .map(Bundle::end_cycle)
                .ok_or_else(|| CcError::NoBundles { kernel: kernel.name.clone() })?;
            on_bundles(kernel, &bundles);

            codegen.emitter().kernel_start();
            codegen.bundles(&bundles)?;
            codegen.emitter().kernel_finish(&kernel.name, end_cycle);
        }

        codegen.kernel_epilogue(kernel)?;
    }

    codegen.emitter().program_finish(prog_name);
    debug!(program = prog_name, bundles = codegen.bundle_index(), "compiling Central Controller program [done]");
    Ok(())
}

// ── Nesting validation ────────────────────────────────────────────────────

/// Check that `*Start`/`*End` kernels nest properly and share labels.
pub fn validate_nesting(kernels: &[Kernel]) -> Result<(), CcError> {
    let mut open: Vec<&Kernel> = Vec::new();

    for kernel in kernels {
        let ty = kernel.kernel_type;
        if ty.closing().is_some() {
            open.push(kernel);
            continue;
        }
        if !ty.is_end() {
            continue;
        }

        let unbalanced = |reason: String| CcError::UnbalancedControlFlow { kernel: kernel.name.clone(), reason };
        let Some(start) = open.pop() else {
            return Err(unbalanced(format!("{ty} without a matching start")));
        };
        if start.kernel_type.closing() != Some(ty) {
            return Err(unbalanced(format!("{ty} closes {} kernel `{}`", start.kernel_type, start.name)));
        }
        let (open_label, close_label) = (kernel_label(&start.name), kernel_label(&kernel.name));
        if open_label != close_label {
            return Err(unbalanced(format!(
                "label `{close_label}` does not match `{open_label}` opened by `{}`",
                start.name
            )));
        }
    }

    match open.pop() {
        Some(unclosed) => Err(CcError::UnbalancedControlFlow {
            kernel: unclosed.name.clone(),
            reason: format!("{} is never closed", unclosed.kernel_type),
        }),
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

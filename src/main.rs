use std::path::PathBuf;

use ccgen::compiler::{self, bundles_qasm, CcError, Program};
use ccgen::emit::{Emitter, Trace};
use ccgen::platform::{load_json, Options, Platform};
use ccgen::scheduler::{CycleBundler, Scheduler};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let rest = args.get(2..).unwrap_or_default();

    let result = match args.get(1).map(String::as_str) {
        Some("compile")               => cli_compile(rest),
        Some("trace")                 => cli_trace(rest),
        Some("bundles")               => cli_bundles(rest),
        None | Some("help") | Some("--help") => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown command '{}'. Run 'ccgen help' for usage.", unknown);
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

// ── Argument handling ─────────────────────────────────────────────────────

/// Parsed command line: the program file plus flags.
struct Args {
    program: PathBuf,
    platform: Option<PathBuf>,
    options: Options,
}

fn parse_args(rest: &[String]) -> Args {
    let mut program = None;
    let mut platform = None;
    let mut options = Options::default();

    let mut it = rest.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--platform"       => platform = Some(PathBuf::from(value(&mut it, arg))),
            "--options"        => {
                options = match Options::from_file(value(&mut it, arg)) {
                    Ok(o) => o,
                    Err(e) => { eprintln!("error: {e}"); std::process::exit(1); }
                }
            }
            "--out"            => options.output_dir = PathBuf::from(value(&mut it, arg)),
            "--map-input"      => options.map_input_file = Some(PathBuf::from(value(&mut it, arg))),
            "--scheduled-qasm" => options.write_scheduled_qasm = true,
            "--validate"       => options.validate_nesting = true,
            flag if flag.starts_with("--") => {
                eprintln!("Unknown flag '{flag}'. Run 'ccgen help' for usage.");
                std::process::exit(1);
            }
            path => program = Some(PathBuf::from(path)),
        }
    }

    let program = match program {
        Some(p) => p,
        None => {
            eprintln!("Usage: ccgen <command> <program.json> [flags]");
            std::process::exit(1);
        }
    };
    Args { program, platform, options }
}

fn value<'a>(it: &mut std::slice::Iter<'a, String>, flag: &str) -> &'a str {
    match it.next() {
        Some(v) => v.as_str(),
        None => { eprintln!("Flag '{flag}' needs a value"); std::process::exit(1); }
    }
}

fn load(args: &Args) -> Result<(Program, Platform), CcError> {
    let program: Program = load_json(&args.program)?;
    let platform = match &args.platform {
        Some(path) => Platform::from_file(path)?,
        None => Platform::default(),
    };
    Ok((program, platform))
}

// ── Commands ──────────────────────────────────────────────────────────────

fn cli_compile(rest: &[String]) -> Result<(), CcError> {
    let args = parse_args(rest);
    let (program, platform) = load(&args)?;

    println!("━━━ ccgen: Central Controller back end ━━━━━━━━━━━━");
    println!("Program : {} ({} kernel(s), {} gate(s))", program.name, program.kernels.len(), program.gate_count());
    println!("Platform: {} ({} qubits, {} cregs)\n", platform.name, platform.qubit_count, platform.creg_count);

    let out = compiler::compile(&program, &platform, &args.options)?;
    for path in out.write(&args.options)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn cli_trace(rest: &[String]) -> Result<(), CcError> {
    let args = parse_args(rest);
    let (program, platform) = load(&args)?;
    if args.options.validate_nesting {
        compiler::validate_nesting(&program.kernels)?;
    }

    let mut trace = Trace::new();
    compiler::compile_kernels(&program.name, &program.kernels, &platform, &CycleBundler::new(), &mut trace)?;
    print!("{}", trace.code());
    Ok(())
}

fn cli_bundles(rest: &[String]) -> Result<(), CcError> {
    let args = parse_args(rest);
    let (program, platform) = load(&args)?;
    let bundler = CycleBundler::new();

    println!("qubits {}", platform.qubit_count);
    for kernel in program.kernels.iter().filter(|k| !k.circuit.is_empty()) {
        let bundles = bundler
            .schedule(&kernel.circuit, platform.qubit_count, platform.creg_count)
            .map_err(|source| CcError::Schedule { kernel: kernel.name.clone(), source })?;
        println!("\n.{}", kernel.name);
        print!("{}", bundles_qasm(&bundles));
    }
    Ok(())
}

fn print_help() {
    println!("Usage: ccgen <COMMAND> <program.json> [FLAGS]\n");
    println!("Commands:");
    println!("  compile   Generate <name>.vq1asm and <name>.map");
    println!("  trace     Print the emission sequence without writing files");
    println!("  bundles   Print the scheduled QASM of every kernel");
    println!("  help      Show this message\n");
    println!("Flags:");
    println!("  --platform <file.json>  Platform description (default: 7 qubits, 32 cregs)");
    println!("  --options <file.json>   Back-end options");
    println!("  --out <dir>             Output directory (default: test_output)");
    println!("  --map-input <file>      Use a supplied instrument map; skip writing .map");
    println!("  --scheduled-qasm        Also write <name>_scheduled.qasm");
    println!("  --validate              Check Start/End kernel pairing first\n");
    println!("Logging is controlled by RUST_LOG (default: info).");
}

//! # ccgen
//!
//! Central Controller back end for a quantum compiler: turns scheduled
//! program kernels into a `.vq1asm` instruction stream plus an instrument map.
//!
//! ## Quick Start
//!
//! ```rust
//! use ccgen::compiler::{compile, Gate, Kernel, KernelType, Program};
//! use ccgen::platform::{Options, Platform};
//!
//! let program = Program::new("bell", vec![
//!     Kernel::basic("k0", [Gate::custom("h", [0], 1), Gate::custom("cnot", [0, 1], 2)]),
//!     Kernel::for_start("sp1_for1_start", 100),
//!     Kernel::new("sp1_for1_end", KernelType::ForEnd),
//! ]);
//!
//! let out = compile(&program, &Platform::new("cc", 2, 8), &Options::default()).unwrap();
//! assert!(out.code.contains("## Bundle 0: start_cycle=1, duration_in_cycles=1:"));
//! assert!(out.code.contains("loop            R63,@sp1"));
//! ```

pub mod compiler;
pub mod emit;
pub mod platform;
pub mod scheduler;

pub use compiler::{compile, CcError, CompiledProgram};

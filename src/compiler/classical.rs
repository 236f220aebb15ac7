/// Classical instruction dispatch.
///
/// Opcodes are sorted into classes; each class has its own arm so emission
/// for a class can be filled in without touching the others. None of them
/// has a Central Controller encoding yet, so every recognized opcode
/// reports `ClassicalNotImplemented` and anything else `UnknownClassical`.
use super::codegen::Codegen;
use super::ir::Gate;
use super::CcError;
use crate::emit::Emitter;

/// Family of a classical opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassicalClass {
    /// `add`, `sub`
    Arithmetic,
    /// `and`, `or`, `xor`, `not`
    Logic,
    /// `mov`, `ldi`
    Move,
    Nop,
    /// `eq`, `ne`, `lt`, `gt`, `le`, `ge`
    Comparison,
}

impl ClassicalClass {
    /// Class of `opcode`, or `None` if it is not a classical opcode.
    pub fn of(opcode: &str) -> Option<Self> {
        match opcode {
            "add" | "sub"                              => Some(Self::Arithmetic),
            "and" | "or" | "xor" | "not"               => Some(Self::Logic),
            "mov" | "ldi"                              => Some(Self::Move),
            "nop"                                      => Some(Self::Nop),
            "eq" | "ne" | "lt" | "gt" | "le" | "ge"    => Some(Self::Comparison),
            _                                          => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arithmetic => "arithmetic",
            Self::Logic      => "logic",
            Self::Move       => "move",
            Self::Nop        => "nop",
            Self::Comparison => "comparison",
        }
    }
}

impl std::fmt::Display for ClassicalClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn not_implemented(gate: &Gate, class: ClassicalClass) -> CcError {
    CcError::ClassicalNotImplemented { opcode: gate.name.clone(), class }
}

impl<E: Emitter> Codegen<'_, E> {
    /// Emit a classical gate that occupies a parallel section on its own.
    pub fn classical_instruction(&mut self, gate: &Gate) -> Result<(), CcError> {
        let Some(class) = ClassicalClass::of(&gate.name) else {
            return Err(CcError::UnknownClassical {
                opcode: gate.name.clone(),
                operands: gate.cregs.len(),
            });
        };

        match class {
            ClassicalClass::Arithmetic => Err(not_implemented(gate, class)),
            ClassicalClass::Logic      => Err(not_implemented(gate, class)),
            ClassicalClass::Move       => Err(not_implemented(gate, class)),
            ClassicalClass::Nop        => Err(not_implemented(gate, class)),
            ClassicalClass::Comparison => Err(not_implemented(gate, class)),
        }
    }
}

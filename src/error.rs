use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a ROM could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ROM file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unable to read ROM file {}: {source}", .path.display())]
    NotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ROM is empty")]
    Empty,

    #[error("ROM size incorrect. Max size is {capacity} bytes but {size} bytes were provided")]
    TooLarge { size: usize, capacity: usize },
}

/// A fault raised while executing an instruction. A faulted VM refuses to step until reset.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("stack overflow calling from {pc:#05X}")]
    StackOverflow { pc: u16 },

    #[error("stack underflow returning from {pc:#05X}")]
    StackUnderflow { pc: u16 },

    #[error("unknown opcode {opcode:#06X} at {pc:#05X}")]
    UnknownOpcode { opcode: u16, pc: u16 },
}

impl Fault {
    /// True for call/return faults.
    pub fn is_stack_fault(&self) -> bool {
        matches!(self, Fault::StackOverflow { .. } | Fault::StackUnderflow { .. })
    }

    /// Address of the instruction that faulted.
    pub fn pc(&self) -> u16 {
        match *self {
            Fault::StackOverflow { pc } | Fault::StackUnderflow { pc } | Fault::UnknownOpcode { pc, .. } => pc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_classifies_stack_faults() {
        assert!(Fault::StackOverflow { pc: 0x200 }.is_stack_fault());
        assert!(Fault::StackUnderflow { pc: 0x200 }.is_stack_fault());
        assert!(!Fault::UnknownOpcode { opcode: 0xFFFF, pc: 0x200 }.is_stack_fault());
    }

    #[test]
    fn fault_messages_name_the_address() {
        let fault = Fault::UnknownOpcode { opcode: 0x5AB1, pc: 0x20C };
        assert_eq!(fault.to_string(), "unknown opcode 0x5AB1 at 0x20C");
        assert_eq!(fault.pc(), 0x20C);
    }

    #[test]
    fn too_large_reports_sizes() {
        let e = LoadError::TooLarge { size: 3585, capacity: 3584 };
        assert!(e.to_string().contains("3584"));
        assert!(e.to_string().contains("3585"));
    }
}

use std::io;
use thiserror::Error;

/// Everything that can go wrong, inside the VM or around it.
///
/// The first group are in-VM conditions: the interpreter sets the HALT flag
/// and hands one of these back instead of panicking. The rest come from the
/// host side (terminal, audio).
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("program is too large ({size} bytes), at most {max} bytes fit")]
    Load { size: usize, max: usize },

    #[error("stack overflow calling from {pc:#05x}")]
    StackOverflow { pc: u16 },

    #[error("return with empty stack at {pc:#05x}; halting program, restart required")]
    StackUnderflow { pc: u16 },

    #[error("invalid opcode {opcode:#06x} at {pc:#05x}")]
    InvalidOpcode { opcode: u16, pc: u16 },

    #[error("machine is halted")]
    Halted,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("audio device: {0}")]
    Audio(String),
}

impl Chip8Error {
    /// a return on an empty stack is how programs stop themselves
    pub fn is_normal_exit(&self) -> bool {
        matches!(self, Chip8Error::StackUnderflow { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_addresses() {
        let e = Chip8Error::InvalidOpcode {
            opcode: 0x5011,
            pc: 0x200,
        };
        assert_eq!(e.to_string(), "invalid opcode 0x5011 at 0x200");
        let e = Chip8Error::Load { size: 4000, max: 3584 };
        assert_eq!(
            e.to_string(),
            "program is too large (4000 bytes), at most 3584 bytes fit"
        );
    }

    #[test]
    fn test_normal_exit() {
        assert!(Chip8Error::StackUnderflow { pc: 0x200 }.is_normal_exit());
        assert!(!Chip8Error::StackOverflow { pc: 0x200 }.is_normal_exit());
        assert!(!Chip8Error::Halted.is_normal_exit());
    }
}

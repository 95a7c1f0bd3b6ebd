//! # instruction set
//!
//! Opcodes are 16 bits, big-endian in memory. The top nibble picks the family;
//! the rest is carved into fields whose meaning depends on the family:
//!
//! ```text
//!   GXYN
//!   |||`- n    low nibble
//!   ||`-- y    third nibble (register)
//!   |`--- x    second nibble (register)
//!   `---- group
//!     KK  kk   low byte (immediate)
//!    NNN  addr low 12 bits (address)
//! ```
use crate::error::Chip8Error;
use std::fmt;

/// Raw opcode with field accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    pub fn group(self) -> u8 {
        (self.0 >> 12) as u8
    }
    pub fn x(self) -> usize {
        ((self.0 & 0x0f00) >> 8) as usize
    }
    pub fn y(self) -> usize {
        ((self.0 & 0x00f0) >> 4) as usize
    }
    pub fn n(self) -> u8 {
        (self.0 & 0x000f) as u8
    }
    pub fn kk(self) -> u8 {
        (self.0 & 0x00ff) as u8
    }
    pub fn addr(self) -> u16 {
        self.0 & 0x0fff
    }
}

/// One decoded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 0000
    Nop,
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump { addr: u16 },
    /// 2NNN
    Call { addr: u16 },
    /// 3XKK
    SkipIfEqualImm { x: usize, kk: u8 },
    /// 4XKK
    SkipIfNotEqualImm { x: usize, kk: u8 },
    /// 5XYN; the low nibble is ignored
    SkipIfEqual { x: usize, y: usize },
    /// 6XKK
    LoadImm { x: usize, kk: u8 },
    /// 7XKK
    AddImm { x: usize, kk: u8 },
    /// 8XY0
    Move { x: usize, y: usize },
    /// 8XY1
    And { x: usize, y: usize },
    /// 8XY2
    Or { x: usize, y: usize },
    /// 8XY3
    Xor { x: usize, y: usize },
    /// 8XY4
    Add { x: usize, y: usize },
    /// 8XY5
    Sub { x: usize, y: usize },
    /// 8XY6
    ShiftRight { x: usize },
    /// 8XY7
    SubReverse { x: usize, y: usize },
    /// 8XYE
    ShiftLeft { x: usize },
    /// 9XYN; the low nibble is ignored
    SkipIfNotEqual { x: usize, y: usize },
    /// ANNN
    LoadIndex { addr: u16 },
    /// BNNN
    JumpOffset { addr: u16 },
    /// CXKK
    Random { x: usize, kk: u8 },
    /// DXYN
    Draw { x: usize, y: usize, n: u8 },
    /// EX9E
    SkipIfKey { x: usize },
    /// EXA1
    SkipIfNotKey { x: usize },
    /// FX07
    LoadDelay { x: usize },
    /// FX0A
    WaitKey { x: usize },
    /// FX15
    SetDelay { x: usize },
    /// FX18
    SetSound { x: usize },
    /// FX1E
    AddIndex { x: usize },
    /// FX29
    LoadGlyph { x: usize },
    /// FX33
    StoreBcd { x: usize },
    /// FX55
    StoreRegisters { x: usize },
    /// FX65
    LoadRegisters { x: usize },
}

impl Instruction {
    /// Decode an opcode. `pc` is only used to label the error.
    pub fn decode(opcode: u16, pc: u16) -> Result<Instruction, Chip8Error> {
        use Instruction::*;
        let op = Opcode(opcode);
        let (x, y, n, kk, addr) = (op.x(), op.y(), op.n(), op.kk(), op.addr());
        let instruction = match (op.group(), n) {
            (0x0, _) => match opcode {
                0x0000 => Nop,
                0x00e0 => ClearScreen,
                0x00ee => Return,
                _ => return Err(Chip8Error::InvalidOpcode { opcode, pc }),
            },
            (0x1, _) => Jump { addr },
            (0x2, _) => Call { addr },
            (0x3, _) => SkipIfEqualImm { x, kk },
            (0x4, _) => SkipIfNotEqualImm { x, kk },
            (0x5, _) => SkipIfEqual { x, y },
            (0x6, _) => LoadImm { x, kk },
            (0x7, _) => AddImm { x, kk },
            (0x8, 0x0) => Move { x, y },
            (0x8, 0x1) => And { x, y },
            (0x8, 0x2) => Or { x, y },
            (0x8, 0x3) => Xor { x, y },
            (0x8, 0x4) => Add { x, y },
            (0x8, 0x5) => Sub { x, y },
            (0x8, 0x6) => ShiftRight { x },
            (0x8, 0x7) => SubReverse { x, y },
            (0x8, 0xe) => ShiftLeft { x },
            (0x9, _) => SkipIfNotEqual { x, y },
            (0xa, _) => LoadIndex { addr },
            (0xb, _) => JumpOffset { addr },
            (0xc, _) => Random { x, kk },
            (0xd, _) => Draw { x, y, n },
            (0xe, _) => match kk {
                0x9e => SkipIfKey { x },
                0xa1 => SkipIfNotKey { x },
                _ => return Err(Chip8Error::InvalidOpcode { opcode, pc }),
            },
            (0xf, _) => match kk {
                0x07 => LoadDelay { x },
                0x0a => WaitKey { x },
                0x15 => SetDelay { x },
                0x18 => SetSound { x },
                0x1e => AddIndex { x },
                0x29 => LoadGlyph { x },
                0x33 => StoreBcd { x },
                0x55 => StoreRegisters { x },
                0x65 => LoadRegisters { x },
                _ => return Err(Chip8Error::InvalidOpcode { opcode, pc }),
            },
            _ => return Err(Chip8Error::InvalidOpcode { opcode, pc }),
        };
        Ok(instruction)
    }
}

/// mnemonics, for trace logs
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            Nop => write!(f, "NOP"),
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { addr } => write!(f, "JP {:#05x}", addr),
            Call { addr } => write!(f, "CALL {:#05x}", addr),
            SkipIfEqualImm { x, kk } => write!(f, "SE V{:X}, {:#04x}", x, kk),
            SkipIfNotEqualImm { x, kk } => write!(f, "SNE V{:X}, {:#04x}", x, kk),
            SkipIfEqual { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImm { x, kk } => write!(f, "LD V{:X}, {:#04x}", x, kk),
            AddImm { x, kk } => write!(f, "ADD V{:X}, {:#04x}", x, kk),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            Add { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x } => write!(f, "SHR V{:X}", x),
            SubReverse { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x } => write!(f, "SHL V{:X}", x),
            SkipIfNotEqual { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex { addr } => write!(f, "LD I, {:#05x}", addr),
            JumpOffset { addr } => write!(f, "JP V0, {:#05x}", addr),
            Random { x, kk } => write!(f, "RND V{:X}, {:#04x}", x, kk),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipIfKey { x } => write!(f, "SKP V{:X}", x),
            SkipIfNotKey { x } => write!(f, "SKNP V{:X}", x),
            LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            LoadGlyph { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    fn decode(opcode: u16) -> Instruction {
        Instruction::decode(opcode, 0x200).unwrap()
    }

    fn is_invalid(opcode: u16) -> bool {
        matches!(
            Instruction::decode(opcode, 0x200),
            Err(Chip8Error::InvalidOpcode { .. })
        )
    }

    #[test]
    fn test_fields() {
        let op = Opcode(0xd12f);
        assert_eq!(op.group(), 0xd);
        assert_eq!(op.x(), 0x1);
        assert_eq!(op.y(), 0x2);
        assert_eq!(op.n(), 0xf);
        assert_eq!(op.kk(), 0x2f);
        assert_eq!(op.addr(), 0x12f);
    }

    #[test]
    fn test_zero_group() {
        assert_eq!(decode(0x0000), Nop);
        assert_eq!(decode(0x00e0), ClearScreen);
        assert_eq!(decode(0x00ee), Return);
        assert!(is_invalid(0x0123));
        assert!(is_invalid(0x00e1));
    }

    #[test]
    fn test_flow_family() {
        assert_eq!(decode(0x1abc), Jump { addr: 0xabc });
        assert_eq!(decode(0x2abc), Call { addr: 0xabc });
        assert_eq!(decode(0xbcde), JumpOffset { addr: 0xcde });
        assert_eq!(decode(0x30ab), SkipIfEqualImm { x: 0, kk: 0xab });
        assert_eq!(decode(0x4cff), SkipIfNotEqualImm { x: 0xc, kk: 0xff });
        assert_eq!(decode(0x5010), SkipIfEqual { x: 0, y: 1 });
        assert_eq!(decode(0x9ab0), SkipIfNotEqual { x: 0xa, y: 0xb });
        // any low nibble will do
        assert_eq!(decode(0x5011), SkipIfEqual { x: 0, y: 1 });
        assert_eq!(decode(0x901f), SkipIfNotEqual { x: 0, y: 1 });
    }

    #[test]
    fn test_alu_family() {
        assert_eq!(decode(0x8010), Move { x: 0, y: 1 });
        assert_eq!(decode(0x8011), And { x: 0, y: 1 });
        assert_eq!(decode(0x8012), Or { x: 0, y: 1 });
        assert_eq!(decode(0x8013), Xor { x: 0, y: 1 });
        assert_eq!(decode(0x8014), Add { x: 0, y: 1 });
        assert_eq!(decode(0x8015), Sub { x: 0, y: 1 });
        assert_eq!(decode(0x8016), ShiftRight { x: 0 });
        assert_eq!(decode(0x8017), SubReverse { x: 0, y: 1 });
        assert_eq!(decode(0x801e), ShiftLeft { x: 0 });
        for n in [0x8u16, 0x9, 0xa, 0xb, 0xc, 0xd, 0xf] {
            assert!(is_invalid(0x8010 | n), "8XY{:X} should not decode", n);
        }
    }

    #[test]
    fn test_key_family() {
        assert_eq!(decode(0xe39e), SkipIfKey { x: 3 });
        assert_eq!(decode(0xe3a1), SkipIfNotKey { x: 3 });
        assert!(is_invalid(0xe300));
    }

    #[test]
    fn test_f_family() {
        assert_eq!(decode(0xf507), LoadDelay { x: 5 });
        assert_eq!(decode(0xf50a), WaitKey { x: 5 });
        assert_eq!(decode(0xf515), SetDelay { x: 5 });
        assert_eq!(decode(0xf518), SetSound { x: 5 });
        assert_eq!(decode(0xf51e), AddIndex { x: 5 });
        assert_eq!(decode(0xf529), LoadGlyph { x: 5 });
        assert_eq!(decode(0xf533), StoreBcd { x: 5 });
        assert_eq!(decode(0xf555), StoreRegisters { x: 5 });
        assert_eq!(decode(0xf565), LoadRegisters { x: 5 });
        assert!(is_invalid(0xf575));
    }

    #[test]
    fn test_error_carries_pc() {
        match Instruction::decode(0xf0ff, 0x2a4) {
            Err(Chip8Error::InvalidOpcode { opcode, pc }) => {
                assert_eq!(opcode, 0xf0ff);
                assert_eq!(pc, 0x2a4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(decode(0xd125).to_string(), "DRW V1, V2, 5");
        assert_eq!(decode(0x2abc).to_string(), "CALL 0xabc");
        assert_eq!(decode(0xf355).to_string(), "LD [I], V3");
    }
}

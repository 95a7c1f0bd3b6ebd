use crate::error::Chip8Error;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the addressable memory of the machine
pub trait MemoryMap {
    /// total addressable bytes
    fn size(&self) -> usize;

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];

    /// write a chunk of bytes into "RAM"; panics if it runs off the end
    fn write(&mut self, data: &[u8], addr: u16) {
        self.get_rw_slice(addr, data.len()).copy_from_slice(data);
    }

    /// read a byte, wrapping the address around the top of memory
    fn read_byte(&self, addr: u16) -> u8 {
        let a = addr as usize % self.size();
        self.get_ro_slice(a as u16, 1)[0]
    }

    /// write a byte, wrapping the address around the top of memory
    fn write_byte(&mut self, addr: u16, value: u8) {
        let a = addr as usize % self.size();
        self.get_rw_slice(a as u16, 1)[0] = value;
    }

    /// get a big-endian two-byte word (opcodes)
    fn get_word(&self, addr: u16) -> u16 {
        ((self.read_byte(addr) as u16) << 8) | self.read_byte(addr.wrapping_add(1)) as u16
    }
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: u16 = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// where the hex digit glyphs live; 0x050..0x0a0
pub const CHIP8_FONT_ADDR: u16 = 0x050;

/// bytes per glyph
pub const CHIP8_FONT_GLYPH_BYTES: u16 = 5;

/// Defines the CHIP-8 memory map
///
///   0x0000-0x004f  unused
///   0x0050-0x009f  hex digit glyphs
///   0x00a0-0x01ff  unused
///   0x0200-0x0fff  program
///
/// the reservations are convention only; programs may read and write anywhere
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
    pub font_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn size(&self) -> usize {
        self.bytes.len()
    }
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

impl Chip8MemoryMap {
    /// zeroed memory with the glyph set baked in
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES as usize].into_boxed_slice(),
            program_addr: CHIP8_PROGRAM_ADDR,
            font_addr: CHIP8_FONT_ADDR,
        };
        mm.write(&CHIP8_FONT, CHIP8_FONT_ADDR);
        mm
    }

    /// room left for a program
    pub fn max_program_size(&self) -> usize {
        self.size() - self.program_addr as usize
    }

    /// copy a program image in at 0x200; nothing is written if it doesn't fit
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        let max = self.max_program_size();
        if program.len() > max {
            return Err(Chip8Error::Load {
                size: program.len(),
                max,
            });
        }
        self.write(program, self.program_addr);
        Ok(())
    }

    /// address of the glyph for the low nibble of `digit`
    pub fn glyph_addr(&self, digit: u8) -> u16 {
        self.font_addr + (digit & 0x0f) as u16 * CHIP8_FONT_GLYPH_BYTES
    }

    /// raw image of the whole address space
    pub fn dump(&self, writer: &mut impl io::Write) -> Result<(), io::Error> {
        writer.write_all(&self.bytes)
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

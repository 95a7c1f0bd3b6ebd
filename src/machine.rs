//! All mutable VM state, with controlled access.
use crate::config::Quirks;
use crate::error::Chip8Error;
use crate::memory::{Chip8MemoryMap, CHIP8_RAM_SIZE_BYTES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::io;

pub const NUM_REGISTERS: usize = 16;
pub const NUM_KEYS: usize = 16;
pub const STACK_SIZE: usize = 16;
pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const SCREEN_CELLS: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// VF
pub const CARRY_REGISTER: usize = 0xf;

/// Status bits shared with whoever drives the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    /// execution must stop
    pub const HALT: Flags = Flags(0b01);
    /// framebuffer changed since the renderer last looked
    pub const DRAW: Flags = Flags(0b10);

    pub fn empty() -> Self {
        Flags(0)
    }

    pub fn contains(&self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Flags) {
        self.0 &= !other.0;
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

pub struct Machine {
    pub(crate) memory: Chip8MemoryMap,
    pub(crate) registers: [u8; NUM_REGISTERS],
    pub(crate) index: u16,
    pub(crate) program_counter: u16,
    pub(crate) stack: [u16; STACK_SIZE],
    pub(crate) stack_pointer: usize,
    pub(crate) delay_timer: u8,
    pub(crate) sound_timer: u8,
    pub(crate) keys: [bool; NUM_KEYS],
    pub(crate) framebuffer: Box<[u8]>,
    pub(crate) flags: Flags,
    /// last fetched opcode
    pub(crate) opcode: u16,
    pub(crate) quirks: Quirks,
    rng: StdRng,
}

impl Machine {
    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    pub fn with_quirks(quirks: Quirks) -> Self {
        let rng = match quirks.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let memory = Chip8MemoryMap::new();
        Machine {
            program_counter: memory.program_addr,
            memory,
            registers: [0; NUM_REGISTERS],
            index: 0,
            stack: [0; STACK_SIZE],
            stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; NUM_KEYS],
            framebuffer: vec![0u8; SCREEN_CELLS].into_boxed_slice(),
            flags: Flags::empty(),
            opcode: 0,
            quirks,
            rng,
        }
    }

    /// back to power-on state; the program has to be loaded again
    pub fn reset(&mut self) {
        *self = Self::with_quirks(self.quirks);
    }

    /// copy a program image in at the program start; state is untouched on error
    pub fn load(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.memory.load_program(program)?;
        log::info!(
            "loaded {} byte program at {:#05x}",
            program.len(),
            self.memory.program_addr
        );
        Ok(())
    }

    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Chip8MemoryMap {
        &mut self.memory
    }

    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn set_program_counter(&mut self, addr: u16) {
        self.program_counter = addr % CHIP8_RAM_SIZE_BYTES;
    }

    /// move on one instruction
    pub fn advance(&mut self) {
        self.set_program_counter(self.program_counter.wrapping_add(2));
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn set_index(&mut self, addr: u16) {
        self.index = addr % CHIP8_RAM_SIZE_BYTES;
    }

    pub fn register(&self, x: usize) -> u8 {
        self.registers[x & 0xf]
    }

    pub fn set_register(&mut self, x: usize, value: u8) {
        self.registers[x & 0xf] = value;
    }

    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }

    pub(crate) fn set_carry(&mut self, carry: bool) {
        self.registers[CARRY_REGISTER] = carry as u8;
    }

    /// live part of the stack, oldest first
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.stack_pointer]
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    /// push the current program counter; fails when the stack is full
    pub(crate) fn push_return(&mut self) -> Result<(), Chip8Error> {
        if self.stack_pointer == STACK_SIZE {
            return Err(Chip8Error::StackOverflow {
                pc: self.program_counter,
            });
        }
        self.stack[self.stack_pointer] = self.program_counter;
        self.stack_pointer += 1;
        Ok(())
    }

    pub(crate) fn pop_return(&mut self) -> Option<u16> {
        if self.stack_pointer == 0 {
            return None;
        }
        self.stack_pointer -= 1;
        Some(self.stack[self.stack_pointer])
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer = value;
    }

    /// latch a key up or down; only the low nibble of `key` is used
    pub fn set_key(&mut self, key: u8, pressed: bool) {
        self.keys[(key & 0xf) as usize] = pressed;
    }

    pub fn is_key_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0xf) as usize]
    }

    /// lowest key currently down
    pub fn first_pressed_key(&self) -> Option<u8> {
        self.keys.iter().position(|&k| k).map(|k| k as u8)
    }

    /// 64x32 cells, row-major, 1 = on
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    pub(crate) fn clear_framebuffer(&mut self) {
        self.framebuffer.iter_mut().for_each(|px| *px = 0);
    }

    /// flip one cell; returns true if it was on. cells past the end are dropped
    pub(crate) fn flip_cell(&mut self, cell: usize) -> bool {
        match self.framebuffer.get_mut(cell) {
            Some(px) => {
                let was_on = *px == 1;
                *px ^= 1;
                was_on
            }
            None => false,
        }
    }

    pub(crate) fn random_byte(&mut self) -> u8 {
        self.rng.gen()
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn is_halted(&self) -> bool {
        self.flags.contains(Flags::HALT)
    }

    pub(crate) fn halt(&mut self) {
        self.flags.insert(Flags::HALT);
    }

    pub fn needs_redraw(&self) -> bool {
        self.flags.contains(Flags::DRAW)
    }

    pub(crate) fn request_redraw(&mut self) {
        self.flags.insert(Flags::DRAW);
    }

    /// the renderer calls this once it has the frame
    pub fn clear_redraw(&mut self) {
        self.flags.remove(Flags::DRAW);
    }

    /// diagnostic dump; for humans, not parsers
    pub fn dump(&self) -> StateDump<'_> {
        StateDump(self)
    }

    /// write the raw 4096-byte memory image
    pub fn dump_memory(&self, writer: &mut impl io::Write) -> Result<(), io::Error> {
        self.memory.dump(writer)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

pub struct StateDump<'a>(&'a Machine);

impl fmt::Display for StateDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        writeln!(
            f,
            "op: {:#06x} pc: {:#05x} sp: {:#04x} I: {:#05x} DT: {:#04x} ST: {:#04x}",
            m.opcode, m.program_counter, m.stack_pointer, m.index, m.delay_timer, m.sound_timer
        )?;
        write!(f, "registers")?;
        for v in m.registers.iter() {
            write!(f, " {:02x}", v)?;
        }
        write!(f, "\nstack    ")?;
        if m.stack().is_empty() {
            write!(f, " empty")?;
        }
        for addr in m.stack() {
            write!(f, " {:03x}", addr)?;
        }
        write!(f, "\nkeys     ")?;
        for (key, _) in m.keys.iter().enumerate().filter(|&(_, &down)| down) {
            write!(f, " {:X}", key)?;
        }
        Ok(())
    }
}

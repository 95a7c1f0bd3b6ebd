//! # cpu
//!
//! One call to [`step`] is one fetch/decode/execute cycle. Every handler
//! advances the program counter by 2 itself, apart from jump, call and return
//! which set it outright. Timers are not touched here; the host calls
//! [`tick_timers`] on its own clock.
//!
//! Anything that goes wrong inside the VM sets HALT and comes back as an
//! `Err`; nothing in here panics on program input.
use crate::config::WaitForKey;
use crate::error::Chip8Error;
use crate::instruction::Instruction;
use crate::machine::{Machine, SCREEN_WIDTH};
use crate::memory::MemoryMap;

/// Fetch the opcode at the program counter and execute it
pub fn step(m: &mut Machine) -> Result<(), Chip8Error> {
    if m.is_halted() {
        return Err(Chip8Error::Halted);
    }
    let opcode = m.memory.get_word(m.program_counter);
    execute(m, opcode)
}

/// Execute a single opcode as if it had been fetched at the program counter.
/// Doesn't look at the HALT flag.
pub fn execute(m: &mut Machine, opcode: u16) -> Result<(), Chip8Error> {
    m.opcode = opcode;
    let pc = m.program_counter;
    let result = Instruction::decode(opcode, pc).and_then(|instruction| {
        log::trace!("{:#05x}: {:04x} {}", pc, opcode, instruction);
        run(m, instruction)
    });
    if let Err(e) = &result {
        m.halt();
        if e.is_normal_exit() {
            log::info!("{}", e);
        } else {
            log::error!("{}", e);
        }
    }
    result
}

/// Count both timers down by one. Returns true when the sound timer runs out
/// on this tick, i.e. when the host should make a noise.
pub fn tick_timers(m: &mut Machine) -> bool {
    if m.delay_timer > 0 {
        m.delay_timer -= 1;
    }
    let mut beep = false;
    if m.sound_timer > 0 {
        beep = m.sound_timer == 1;
        m.sound_timer -= 1;
    }
    beep
}

fn skip_if(m: &mut Machine, condition: bool) {
    if condition {
        m.advance();
    }
    m.advance();
}

// NB. handlers that write VF do so before computing the result, so a VF
//     operand sees the new flag and a VF destination keeps the result
fn run(m: &mut Machine, instruction: Instruction) -> Result<(), Chip8Error> {
    use Instruction::*;
    match instruction {
        Nop => m.advance(),
        ClearScreen => {
            // NB. no DRAW; the cleared screen shows up with the next sprite
            m.clear_framebuffer();
            m.advance();
        }
        Return => match m.pop_return() {
            Some(addr) => {
                m.set_program_counter(addr);
                if m.quirks.return_past_call {
                    m.advance();
                }
            }
            None => {
                return Err(Chip8Error::StackUnderflow {
                    pc: m.program_counter,
                })
            }
        },
        Jump { addr } => m.set_program_counter(addr),
        Call { addr } => {
            m.push_return()?;
            m.set_program_counter(addr);
        }
        SkipIfEqualImm { x, kk } => {
            let equal = m.register(x) == kk;
            skip_if(m, equal);
        }
        SkipIfNotEqualImm { x, kk } => {
            let equal = m.register(x) == kk;
            skip_if(m, !equal);
        }
        SkipIfEqual { x, y } => {
            let equal = m.register(x) == m.register(y);
            skip_if(m, equal);
        }
        SkipIfNotEqual { x, y } => {
            let equal = m.register(x) == m.register(y);
            skip_if(m, !equal);
        }
        LoadImm { x, kk } => {
            m.set_register(x, kk);
            m.advance();
        }
        AddImm { x, kk } => {
            m.set_carry(m.register(x) as u16 + kk as u16 > 0xff);
            m.set_register(x, m.register(x).wrapping_add(kk));
            m.advance();
        }
        Move { x, y } => {
            m.set_register(x, m.register(y));
            m.advance();
        }
        And { x, y } => {
            m.set_register(x, m.register(x) & m.register(y));
            m.advance();
        }
        Or { x, y } => {
            m.set_register(x, m.register(x) | m.register(y));
            m.advance();
        }
        Xor { x, y } => {
            m.set_register(x, m.register(x) ^ m.register(y));
            m.advance();
        }
        Add { x, y } => {
            m.set_carry(m.register(x) as u16 + m.register(y) as u16 > 0xff);
            m.set_register(x, m.register(x).wrapping_add(m.register(y)));
            m.advance();
        }
        Sub { x, y } => {
            m.set_carry(m.register(y) > m.register(x));
            m.set_register(x, m.register(x).wrapping_sub(m.register(y)));
            m.advance();
        }
        SubReverse { x, y } => {
            m.set_carry(m.register(x) > m.register(y));
            m.set_register(x, m.register(y).wrapping_sub(m.register(x)));
            m.advance();
        }
        // NB. the shifts only move VX when the bit shifted out is 0
        ShiftRight { x } => {
            let carry = m.register(x) & 0x01 != 0;
            m.set_carry(carry);
            if !carry {
                m.set_register(x, m.register(x) >> 1);
            }
            m.advance();
        }
        ShiftLeft { x } => {
            let carry = m.register(x) & 0x80 != 0;
            m.set_carry(carry);
            if !carry {
                m.set_register(x, m.register(x) << 1);
            }
            m.advance();
        }
        LoadIndex { addr } => {
            m.set_index(addr);
            m.advance();
        }
        JumpOffset { addr } => m.set_program_counter(addr + m.register(0) as u16),
        Random { x, kk } => {
            let r = m.random_byte();
            m.set_register(x, r & kk);
            m.advance();
        }
        Draw { x, y, n } => {
            draw_sprite(m, x, y, n);
            m.advance();
        }
        SkipIfKey { x } => {
            let pressed = m.is_key_pressed(m.register(x));
            skip_if(m, pressed);
        }
        SkipIfNotKey { x } => {
            let pressed = m.is_key_pressed(m.register(x));
            skip_if(m, !pressed);
        }
        LoadDelay { x } => {
            m.set_register(x, m.delay_timer);
            m.advance();
        }
        WaitKey { x } => match m.quirks.wait_for_key {
            WaitForKey::Skip => m.advance(),
            WaitForKey::Block => {
                // pc stays put until a key is down, so this re-executes
                if let Some(key) = m.first_pressed_key() {
                    m.set_register(x, key);
                    m.advance();
                }
            }
        },
        SetDelay { x } => {
            m.delay_timer = m.register(x);
            m.advance();
        }
        SetSound { x } => {
            m.sound_timer = m.register(x);
            m.advance();
        }
        AddIndex { x } => {
            m.set_index(m.index + m.register(x) as u16);
            m.advance();
        }
        LoadGlyph { x } => {
            let addr = m.memory.glyph_addr(m.register(x));
            m.set_index(addr);
            m.advance();
        }
        StoreBcd { x } => {
            let v = m.register(x);
            let i = m.index;
            m.memory.write_byte(i, v / 100);
            m.memory.write_byte(i + 1, (v % 100) / 10);
            m.memory.write_byte(i + 2, v % 10);
            m.advance();
        }
        StoreRegisters { x } => {
            let i = m.index;
            for r in 0..=x {
                let v = m.register(r);
                m.memory.write_byte(i + r as u16, v);
            }
            m.advance();
        }
        LoadRegisters { x } => {
            let i = m.index;
            for r in 0..=x {
                let v = m.memory.read_byte(i + r as u16);
                m.set_register(r, v);
            }
            m.advance();
        }
    }
    Ok(())
}

/// XOR an n-row sprite from memory[I..] onto the screen at (VX, VY). There is
/// no wrapping: cells are addressed linearly, so a sprite hanging off the
/// right edge spills onto the next row, and anything past the last cell is
/// lost.
fn draw_sprite(m: &mut Machine, x: usize, y: usize, n: u8) {
    let vx = m.register(x) as usize;
    let vy = m.register(y) as usize;
    let index = m.index;
    let mut collision = false;
    for row in 0..n as usize {
        let bits = m.memory.read_byte(index + row as u16);
        for col in 0..8 {
            if bits & (0x80 >> col) != 0 {
                collision |= m.flip_cell(vx + col + (vy + row) * SCREEN_WIDTH);
            }
        }
    }
    m.set_carry(collision);
    m.request_redraw();
}

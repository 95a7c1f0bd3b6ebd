//! A CHIP-8 virtual machine.
//!
//! ## Design
//!
//! * the core is a plain state machine: [`Machine`] holds the state and
//!   [`cpu::step`] runs one fetch/decode/execute cycle against it
//! * nothing in the core blocks, sleeps, draws or beeps; timers are ticked
//!   separately with [`cpu::tick_timers`] at whatever rate the host likes
//! * in-VM faults set the HALT flag and come back as [`Chip8Error`]; a halted
//!   machine refuses to step until it is reset
//! * display, input and sound sit behind traits so the host can plug
//!   alternatives; the terminal ones use TUI/Crossterm
//! * some config (quirks) for behaviour that differs between interpreters
//!
//! Model
//!
//! ```text
//! main
//!  |-- config, display, input, sound
//!  `-- Chip8Interpreter(config, display, input, sound)
//!       |-- Machine(quirks)
//!       |    |-- memory map + glyph set
//!       |    `-- registers, stack, timers, keys, framebuffer, flags
//!       `-- main loop, once per frame
//!            |-- input.poll() -> machine.set_key()
//!            |-- cpu::step() x cycles_per_frame
//!            |-- display.draw() if DRAW, then clear DRAW
//!            |-- cpu::tick_timers() -> sound.beep()
//!            `-- sleep out the rest of the frame
//! ```
pub mod config;
pub mod cpu;
pub mod display;
mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod sound;

pub use config::{Config, Quirks, WaitForKey};
pub use error::Chip8Error;
pub use machine::{Flags, Machine};

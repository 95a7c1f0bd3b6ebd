/// # interpreter
///
/// The host side of the machine: owns a [`Machine`] and wires it to a
/// display, an input device and a sound device.
///
/// Timing follows the usual trick of running a frame's worth of
/// instructions as fast as possible and then sleeping out the rest of the
/// frame. Timers tick once per frame, so the instruction rate is only right
/// on average, never cycle by cycle.
use crate::config::Config;
use crate::cpu;
use crate::display::Display;
use crate::error::Chip8Error;
use crate::input::{Input, KeyEvent};
use crate::machine::Machine;
use crate::sound::Sound;
use std::io;
use std::time::{Duration, Instant};

/// why the main loop stopped, when it wasn't an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// the program returned with nothing on the stack
    ProgramFinished,
    /// the user asked to stop
    Quit,
    /// ran the configured number of cycles
    CycleLimit,
}

pub struct Chip8Interpreter<'a> {
    machine: Machine,
    config: Config,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    cycles: u64,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        config: Config,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            machine: Machine::with_quirks(config.quirks),
            config,
            display,
            input,
            sound,
            cycles: 0,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// cycles executed so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<(), Chip8Error> {
        let mut program = Vec::new();
        reader.read_to_end(&mut program)?;
        self.machine.load(&program)
    }

    /// run until the program finishes, the user quits, the cycle budget runs
    /// out or the machine halts on an error
    pub fn main_loop(&mut self) -> Result<Exit, Chip8Error> {
        let timer_hz = self.config.timer_hz.max(1);
        let frame = Duration::from_secs_f64(1.0 / timer_hz as f64);
        let cycles_per_frame = (self.config.cycles_per_second / timer_hz).max(1);
        log::info!(
            "running at {} cycles/frame, {} frames/s",
            cycles_per_frame,
            timer_hz
        );

        loop {
            let start = Instant::now();
            if self.poll_input()? {
                return Ok(Exit::Quit);
            }
            for _ in 0..cycles_per_frame {
                if let Some(max) = self.config.max_cycles {
                    if self.cycles >= max {
                        self.present()?;
                        return Ok(Exit::CycleLimit);
                    }
                }
                let result = cpu::step(&mut self.machine);
                self.cycles += 1;
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("{}", self.machine.dump());
                }
                if let Err(e) = result {
                    self.present()?;
                    return if e.is_normal_exit() {
                        Ok(Exit::ProgramFinished)
                    } else {
                        Err(e)
                    };
                }
            }
            self.present()?;
            self.tick()?;
            spin_sleep::sleep(frame.saturating_sub(start.elapsed()));
        }
    }

    /// feed key events into the machine; true means quit
    fn poll_input(&mut self) -> Result<bool, Chip8Error> {
        for event in self.input.poll()? {
            match event {
                KeyEvent::Press(key) => self.machine.set_key(key, true),
                KeyEvent::Release(key) => self.machine.set_key(key, false),
                KeyEvent::Quit => return Ok(true),
            }
        }
        Ok(false)
    }

    /// hand the frame over if it changed
    fn present(&mut self) -> Result<(), Chip8Error> {
        if self.machine.needs_redraw() {
            self.display.draw(self.machine.framebuffer())?;
            self.machine.clear_redraw();
        }
        Ok(())
    }

    /// one timer period; the beep lasts until the next one
    fn tick(&mut self) -> Result<(), Chip8Error> {
        if self.sound.is_beeping() {
            self.sound
                .stop()
                .map_err(|e| Chip8Error::Audio(e.to_string()))?;
        }
        if cpu::tick_timers(&mut self.machine) {
            self.sound
                .beep()
                .map_err(|e| Chip8Error::Audio(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::ScriptedInput;
    use crate::memory::MemoryMap;
    use crate::sound::Mute;

    fn fast_config() -> Config {
        Config {
            cycles_per_second: 10_000,
            timer_hz: 1_000,
            max_cycles: Some(10_000),
            ..Config::default()
        }
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![]);
        let mut sound = Mute::new();
        let mut i = Chip8Interpreter::new(fast_config(), &mut display, &mut input, &mut sound);
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        i.load_program(&mut prog)?;
        assert_eq!(i.machine().memory().get_word(0x200), 0x00e0);
        Ok(())
    }

    #[test]
    fn test_program_load_too_big() {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![]);
        let mut sound = Mute::new();
        let mut i = Chip8Interpreter::new(fast_config(), &mut display, &mut input, &mut sound);
        let big = vec![0u8; 0xe01];
        let mut prog: &[u8] = &big;
        assert!(matches!(
            i.load_program(&mut prog),
            Err(Chip8Error::Load { .. })
        ));
    }

    #[test]
    fn test_draw_reaches_display() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![]);
        let mut sound = Mute::new();
        let exit = {
            let mut i =
                Chip8Interpreter::new(fast_config(), &mut display, &mut input, &mut sound);
            #[rustfmt::skip]
            let mut prog: &[u8] = &[
                0xa0, 0x50, // LD I, glyph 0
                0xd0, 0x05, // DRW V0, V0, 5
                0x00, 0xee, // RET
            ];
            i.load_program(&mut prog)?;
            let exit = i.main_loop()?;
            assert!(!i.machine().needs_redraw());
            assert_eq!(i.cycles(), 3);
            exit
        };
        assert_eq!(exit, Exit::ProgramFinished);
        assert_eq!(display.frames, 1);
        assert_eq!(display.last_frame.iter().filter(|&&px| px == 1).count(), 14);
        Ok(())
    }

    #[test]
    fn test_quit_before_running() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![vec![KeyEvent::Quit]]);
        let mut sound = Mute::new();
        let mut i = Chip8Interpreter::new(fast_config(), &mut display, &mut input, &mut sound);
        assert_eq!(i.main_loop()?, Exit::Quit);
        assert_eq!(i.cycles(), 0);
        assert_eq!(i.machine().program_counter(), 0x200);
        Ok(())
    }

    #[test]
    fn test_key_press_reaches_program() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![vec![], vec![KeyEvent::Press(5)]]);
        let mut sound = Mute::new();
        let mut i = Chip8Interpreter::new(fast_config(), &mut display, &mut input, &mut sound);
        #[rustfmt::skip]
        let mut prog: &[u8] = &[
            0x60, 0x05, // LD V0, 5
            0xe0, 0x9e, // SKP V0
            0x12, 0x02, // JP 0x202
            0x00, 0xee, // RET
        ];
        i.load_program(&mut prog)?;
        assert_eq!(i.main_loop()?, Exit::ProgramFinished);
        assert!(i.machine().is_key_pressed(5));
        // a whole frame went by spinning before the key arrived
        assert!(i.cycles() > 10);
        Ok(())
    }

    #[test]
    fn test_key_release() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![
            vec![KeyEvent::Press(7)],
            vec![KeyEvent::Release(7)],
        ]);
        let mut sound = Mute::new();
        let config = Config {
            max_cycles: Some(20),
            ..fast_config()
        };
        let mut i = Chip8Interpreter::new(config, &mut display, &mut input, &mut sound);
        let mut prog: &[u8] = &[0x12, 0x00]; // JP 0x200
        i.load_program(&mut prog)?;
        assert_eq!(i.main_loop()?, Exit::CycleLimit);
        assert!(!i.machine().is_key_pressed(7));
        Ok(())
    }

    #[test]
    fn test_cycle_limit() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![]);
        let mut sound = Mute::new();
        let config = Config {
            max_cycles: Some(25),
            ..fast_config()
        };
        let mut i = Chip8Interpreter::new(config, &mut display, &mut input, &mut sound);
        let mut prog: &[u8] = &[0x12, 0x00]; // JP 0x200
        i.load_program(&mut prog)?;
        assert_eq!(i.main_loop()?, Exit::CycleLimit);
        assert_eq!(i.cycles(), 25);
        Ok(())
    }

    #[test]
    fn test_sound_timer_beeps_once() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![]);
        let mut sound = Mute::new();
        {
            let config = Config {
                max_cycles: Some(30),
                ..fast_config()
            };
            let mut i = Chip8Interpreter::new(config, &mut display, &mut input, &mut sound);
            #[rustfmt::skip]
            let mut prog: &[u8] = &[
                0x60, 0x02, // LD V0, 2
                0xf0, 0x18, // LD ST, V0
                0x12, 0x04, // JP 0x204
            ];
            i.load_program(&mut prog)?;
            assert_eq!(i.main_loop()?, Exit::CycleLimit);
            assert_eq!(i.machine().sound_timer(), 0);
        }
        assert_eq!(sound.beeps, 1);
        assert!(!sound.is_beeping());
        Ok(())
    }

    #[test]
    fn test_invalid_opcode_stops_loop() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = ScriptedInput::new(vec![]);
        let mut sound = Mute::new();
        let mut i = Chip8Interpreter::new(fast_config(), &mut display, &mut input, &mut sound);
        let mut prog: &[u8] = &[0x60, 0x01, 0x80, 0x1f];
        i.load_program(&mut prog)?;
        match i.main_loop() {
            Err(Chip8Error::InvalidOpcode { opcode, pc }) => {
                assert_eq!(opcode, 0x801f);
                assert_eq!(pc, 0x202);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(i.machine().is_halted());
        // and it stays stopped
        assert!(matches!(i.main_loop(), Err(Chip8Error::Halted)));
        Ok(())
    }
}

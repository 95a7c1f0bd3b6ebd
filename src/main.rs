use clap::{ArgAction, Parser};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use chip8vm::display::MonoTermDisplay;
use chip8vm::input::TermInput;
use chip8vm::interpreter::{Chip8Interpreter, Exit};
use chip8vm::machine::{SCREEN_HEIGHT, SCREEN_WIDTH};
use chip8vm::sound::{Mute, SimpleBeep, Sound};
use chip8vm::{Config, Quirks, WaitForKey};

#[derive(Parser, Debug)]
#[command(name = "chip8vm")]
#[command(about = "Runs a CHIP-8 program in the terminal", long_about = None)]
struct Args {
    /// Path to the program image, loaded verbatim at 0x200
    rom: PathBuf,

    /// Log the machine state after every cycle
    #[arg(short, long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Also log every decoded instruction
    #[arg(long, action = ArgAction::SetTrue)]
    trace: bool,

    /// Write the memory image to this file after loading
    #[arg(short = 'm', long)]
    dump_memory: Option<PathBuf>,

    /// Instructions per second
    #[arg(long, default_value_t = 500)]
    hz: u32,

    /// Timer ticks per second
    #[arg(long, default_value_t = 60)]
    timer_hz: u32,

    /// Stop after this many instructions
    #[arg(long)]
    cycles: Option<u64>,

    /// Make FX0A actually wait for a key
    #[arg(long, action = ArgAction::SetTrue)]
    block_on_key: bool,

    /// Make 00EE resume after the calling instruction
    #[arg(long, action = ArgAction::SetTrue)]
    return_past_call: bool,

    /// Seed for CXKK
    #[arg(long)]
    seed: Option<u64>,

    /// No beeping
    #[arg(long, action = ArgAction::SetTrue)]
    mute: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            cycles_per_second: self.hz,
            timer_hz: self.timer_hz,
            max_cycles: self.cycles,
            quirks: Quirks {
                wait_for_key: if self.block_on_key {
                    WaitForKey::Block
                } else {
                    WaitForKey::Skip
                },
                return_past_call: self.return_past_call,
                seed: self.seed,
            },
        }
    }

    fn log_level(&self) -> LevelFilter {
        match (self.trace, self.debug) {
            (true, _) => LevelFilter::Trace,
            (false, true) => LevelFilter::Debug,
            _ => LevelFilter::Warn,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    SimpleLogger::new().with_level(args.log_level()).init()?;

    // initialise
    let mut display = MonoTermDisplay::new(SCREEN_WIDTH, SCREEN_HEIGHT)?;
    let mut input = TermInput::new()?;
    let mut beeper = SimpleBeep::new();
    let mut mute = Mute::new();
    let sound: &mut dyn Sound = if args.mute { &mut mute } else { &mut beeper };
    let mut interpreter = Chip8Interpreter::new(args.config(), &mut display, &mut input, sound);

    // load a program
    let mut f = File::open(&args.rom)?;
    interpreter.load_program(&mut f)?;

    if let Some(path) = &args.dump_memory {
        let mut out = File::create(path)?;
        interpreter.machine().dump_memory(&mut out)?;
    }

    let exit = interpreter.main_loop();

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..4 {
        println!();
    }
    match exit? {
        Exit::ProgramFinished => log::info!("program finished"),
        Exit::Quit => log::info!("quit"),
        Exit::CycleLimit => log::info!("cycle limit reached"),
    }
    Ok(())
}

use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

/// left-hand block of a qwerty keyboard onto the hex keypad:
///
///   1 2 3 4      1 2 3 C
///   q w e r  =>  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x0c),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('r', 0x0d),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('f', 0x0e),
    ('z', 0x0a),
    ('x', 0x00),
    ('c', 0x0b),
    ('v', 0x0f),
];

/// terminals only report presses (and auto-repeats), so a key counts as held
/// until it has gone this long without one
const KEY_HOLD: Duration = Duration::from_millis(150);

/// what the run loop needs to hear about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Press(u8),
    Release(u8),
    Quit,
}

/// reads keypresses
pub trait Input {
    /// everything that happened since the last poll; never blocks
    fn poll(&mut self) -> Result<Vec<KeyEvent>, io::Error>;
}

/// keyboard in a raw-mode terminal, using Crossterm
pub struct TermInput {
    keymap: HashMap<char, u8>,
    last_seen: [Option<Instant>; 16],
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            last_seen: [None; 16],
        })
    }

    fn map_char(&self, c: char) -> Option<u8> {
        self.keymap.get(&c.to_ascii_lowercase()).copied()
    }

    /// release anything that hasn't been seen for a while
    fn expire(&mut self, now: Instant, events: &mut Vec<KeyEvent>) {
        for (key, seen) in self.last_seen.iter_mut().enumerate() {
            if let Some(t) = *seen {
                if now.duration_since(t) >= KEY_HOLD {
                    *seen = None;
                    events.push(KeyEvent::Release(key as u8));
                }
            }
        }
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("couldn't leave raw mode: {}", e);
        }
    }
}

impl Input for TermInput {
    fn poll(&mut self) -> Result<Vec<KeyEvent>, io::Error> {
        let mut events = Vec::new();
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Esc => events.push(KeyEvent::Quit),
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        events.push(KeyEvent::Quit)
                    }
                    KeyCode::Char(c) => match self.map_char(c) {
                        Some(key) => {
                            if self.last_seen[key as usize].is_none() {
                                events.push(KeyEvent::Press(key));
                            }
                            self.last_seen[key as usize] = Some(Instant::now());
                        }
                        None => log::debug!("no keypad mapping for {:?}", c),
                    },
                    other => log::debug!("ignoring key {:?}", other),
                },
                _ => log::trace!("ignoring non-key event"),
            }
        }
        self.expire(Instant::now(), &mut events);
        Ok(events)
    }
}

/// Input implementation for testing: hands out one batch of events per poll
pub struct ScriptedInput {
    batches: VecDeque<Vec<KeyEvent>>,
}

impl ScriptedInput {
    pub fn new(batches: Vec<Vec<KeyEvent>>) -> Self {
        ScriptedInput {
            batches: VecDeque::from(batches),
        }
    }
}

impl Input for ScriptedInput {
    fn poll(&mut self) -> Result<Vec<KeyEvent>, io::Error> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term_input() -> TermInput {
        // skips raw mode, which needs a tty
        TermInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            last_seen: [None; 16],
        }
    }

    #[test]
    fn test_keymap_covers_keypad() {
        let mut keys: Vec<u8> = CHIP8_CONVENTIONAL_KEYMAP.iter().map(|&(_, k)| k).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_map_char() {
        let i = term_input();
        assert_eq!(i.map_char('x'), Some(0x0));
        assert_eq!(i.map_char('V'), Some(0xf));
        assert_eq!(i.map_char('4'), Some(0xc));
        assert_eq!(i.map_char('p'), None);
    }

    #[test]
    fn test_expire_releases_stale_keys() {
        let mut i = term_input();
        let then = Instant::now();
        i.last_seen[0x5] = Some(then);
        i.last_seen[0x9] = Some(then + KEY_HOLD);
        let mut events = Vec::new();
        i.expire(then + KEY_HOLD, &mut events);
        assert_eq!(events, vec![KeyEvent::Release(0x5)]);
        assert!(i.last_seen[0x5].is_none());
        assert!(i.last_seen[0x9].is_some());
    }

    #[test]
    fn test_scripted_input() -> Result<(), io::Error> {
        let mut i = ScriptedInput::new(vec![vec![KeyEvent::Press(3)], vec![KeyEvent::Quit]]);
        assert_eq!(i.poll()?, vec![KeyEvent::Press(3)]);
        assert_eq!(i.poll()?, vec![KeyEvent::Quit]);
        assert_eq!(i.poll()?, vec![]);
        Ok(())
    }
}

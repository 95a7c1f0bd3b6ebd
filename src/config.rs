/// How 0xFX0A (wait for key) behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitForKey {
    /// never waits: the instruction only advances the program counter
    #[default]
    Skip,
    /// holds the program counter until a key is down, then stores the lowest
    /// pressed key in VX
    Block,
}

/// Behaviour switches for the instruction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quirks {
    pub wait_for_key: WaitForKey,
    /// 00EE resumes after the 2NNN that made the call. Off, it resumes at
    /// the 2NNN itself
    pub return_past_call: bool,
    /// fixed seed for CXKK; None seeds from the OS
    pub seed: Option<u64>,
}

/// Run-loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// instruction rate
    pub cycles_per_second: u32,
    /// delay/sound timer rate
    pub timer_hz: u32,
    /// stop after this many cycles; None runs until halt or quit
    pub max_cycles: Option<u64>,
    pub quirks: Quirks,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cycles_per_second: 500,
            timer_hz: 60,
            max_cycles: None,
            quirks: Quirks::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.cycles_per_second, 500);
        assert_eq!(c.timer_hz, 60);
        assert_eq!(c.max_cycles, None);
        assert_eq!(c.quirks.wait_for_key, WaitForKey::Skip);
        assert_eq!(c.quirks.seed, None);
        assert!(!c.quirks.return_past_call);
    }
}

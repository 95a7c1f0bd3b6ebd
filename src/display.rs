use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is what the run loop hands finished frames to. It should abstract
/// the implementation details, so a variety of kinds of screen would work.
pub trait Display {
    /// draw one frame: one byte per cell, row-major, 1 = on
    fn draw(&mut self, framebuffer: &[u8]) -> Result<(), io::Error>;

    /// how many cells a frame should have
    fn get_display_size_cells(&self) -> usize;
}

// store useful metadata about the screen
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every cell with the given value
    fn cells_with_value<'a>(
        &self,
        framebuffer: &'a [u8],
        value: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let w = self.0;
        framebuffer
            .iter()
            .enumerate()
            .filter(move |&(_, &px)| px & 1 == value)
            .map(move |(cell, _)| {
                (
                    (cell % w) as f64,        // x
                    -1.0 * (cell / w) as f64, // y
                )
            })
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new(x: usize, y: usize) -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(x, y),
        })
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, framebuffer: &[u8]) -> Result<(), io::Error> {
        // make sure we're given exactly the right amount of data to draw
        assert_eq!(
            framebuffer.len(),
            self.resolution.pixel_count(),
            "MonoTermDisplay must have correct-sized data to draw"
        );

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        let resolution = &self.resolution;
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &resolution
                            .cells_with_value(framebuffer, 0)
                            .collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &resolution
                            .cells_with_value(framebuffer, 1)
                            .collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }

    fn get_display_size_cells(&self) -> usize {
        self.resolution.pixel_count()
    }
}

/// useful for testing the run loop; keeps the last frame
pub struct DummyDisplay {
    pub frames: usize,
    pub last_frame: Vec<u8>,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay {
            frames: 0,
            last_frame: Vec::new(),
        }
    }
}

impl Default for DummyDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, framebuffer: &[u8]) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_frame = framebuffer.to_vec();
        Ok(())
    }
    fn get_display_size_cells(&self) -> usize {
        64 * 32
    }
}

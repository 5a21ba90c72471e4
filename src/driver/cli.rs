use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use thiserror::Error;

use crate::error::FrameError;
use crate::host::{Host, SimulatedHost, settle};
use crate::model::{SLOTS_PER_ROW, ViewerId};
use crate::render::GridRenderer;
use crate::router::Engine;

pub type DriverResult<T> = std::result::Result<T, CliDriverError>;

#[derive(Debug, Error)]
pub enum CliDriverError {
    #[error("engine error: {0}")]
    Engine(#[from] FrameError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Terminal driver that plays a single viewer against an [`Engine`].
///
/// Arrow keys move the cursor, Enter clicks the highlighted slot and Esc or
/// `q` closes the container. The loop ends once the viewer has nothing open.
pub struct CliDriver {
    engine: Engine,
    host: SimulatedHost,
    viewer: ViewerId,
    renderer: GridRenderer,
    cursor: u16,
}

impl CliDriver {
    pub fn new(engine: Engine, viewer: impl Into<ViewerId>) -> Self {
        Self {
            engine,
            host: SimulatedHost::new(),
            viewer: viewer.into(),
            renderer: GridRenderer::default(),
            cursor: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn host(&self) -> &SimulatedHost {
        &self.host
    }

    pub fn cursor(&self) -> u16 {
        self.cursor
    }

    pub fn run(mut self) -> DriverResult<()> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.run_inner(&mut stdout);
        self.exit(&mut stdout);
        result
    }

    /// Opens the engine's default page for the viewer.
    pub fn start(&mut self) -> DriverResult<()> {
        let page = self.engine.default_page();
        self.engine.open(&self.viewer, page, &mut self.host)?;
        settle(&mut self.engine, &mut self.host);
        Ok(())
    }

    /// Applies one key press. Returns false once the viewer has left the GUI.
    pub fn step(&mut self, key: KeyCode) -> bool {
        self.clamp_cursor();
        match key {
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = self.cursor.saturating_add(1),
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(SLOTS_PER_ROW),
            KeyCode::Down => self.cursor = self.cursor.saturating_add(SLOTS_PER_ROW),
            KeyCode::Enter | KeyCode::Char(' ') => self.host.click(&self.viewer, self.cursor),
            KeyCode::Esc | KeyCode::Char('q') => self.host.close(&self.viewer),
            _ => {}
        }
        settle(&mut self.engine, &mut self.host);
        self.clamp_cursor();
        self.is_open()
    }

    pub fn is_open(&self) -> bool {
        self.host
            .open_container(&self.viewer)
            .is_some_and(|container| self.engine.owns(container))
    }

    /// Lines of the current frame: the page grid, then the latest notice.
    pub fn frame(&self) -> Vec<String> {
        let Some(page) = self
            .host
            .open_container(&self.viewer)
            .filter(|container| self.engine.owns(*container))
            .and_then(|container| self.engine.page(container.page))
        else {
            return Vec::new();
        };
        let mut lines = self.renderer.lines(page, Some(self.cursor));
        lines.push(String::new());
        if let Some(message) = self.host.messages_for(&self.viewer).last() {
            lines.push((*message).to_string());
        }
        lines
    }

    fn clamp_cursor(&mut self) {
        let capacity = self.open_capacity();
        if capacity > 0 {
            self.cursor = self.cursor.min(capacity - 1);
        }
    }

    fn open_capacity(&self) -> u16 {
        self.host
            .open_container(&self.viewer)
            .and_then(|container| self.engine.page(container.page))
            .map(|page| page.capacity())
            .unwrap_or(0)
    }

    fn run_inner(&mut self, stdout: &mut impl Write) -> DriverResult<()> {
        self.start()?;
        while self.is_open() {
            self.draw(stdout)?;
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !self.step(key.code) {
                break;
            }
        }
        self.engine.emit_metrics();
        Ok(())
    }

    fn draw(&self, stdout: &mut impl Write) -> DriverResult<()> {
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        for line in self.frame() {
            write!(stdout, "{line}\r\n")?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn enter(&self, stdout: &mut impl Write) -> DriverResult<()> {
        terminal::enable_raw_mode().map_err(|err| CliDriverError::Terminal(err.to_string()))?;
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(stdout, Show, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GuiBuilder, Navigation, PageSpec};
    use crate::model::{Item, PageId, Setting};

    fn driver() -> CliDriver {
        let mut gui = GuiBuilder::new(Setting::new(2, "Shop {page}"));
        gui.nav(Navigation::new());
        gui.add_page(PageSpec::auto(), |page| {
            for n in 0..12 {
                page.add_item(Item::new(format!("item-{n}")))?;
            }
            Ok(())
        });
        CliDriver::new(gui.build().unwrap(), "alice")
    }

    #[test]
    fn cursor_stays_inside_the_grid() {
        let mut driver = driver();
        driver.start().unwrap();
        assert!(driver.step(KeyCode::Up));
        assert_eq!(driver.cursor(), 0);
        for _ in 0..3 {
            driver.step(KeyCode::Down);
        }
        assert_eq!(driver.cursor(), 17);
    }

    #[test]
    fn enter_on_the_next_arrow_switches_pages() {
        let mut driver = driver();
        driver.start().unwrap();
        let viewer = ViewerId::new("alice");
        assert_eq!(driver.engine().current_page(&viewer), Some(PageId(1)));

        driver.step(KeyCode::Down);
        for _ in 0..8 {
            driver.step(KeyCode::Right);
        }
        assert!(driver.step(KeyCode::Enter));
        assert_eq!(driver.engine().current_page(&viewer), Some(PageId(2)));
        assert!(driver.frame()[0].starts_with("Shop 2"));

        assert!(!driver.step(KeyCode::Esc));
        assert!(driver.engine().sessions().is_empty());
        assert!(driver.frame().is_empty());
    }

    #[test]
    fn prev_arrow_returns_to_the_first_page() {
        let mut driver = driver();
        driver.start().unwrap();
        driver.step(KeyCode::Down);
        for _ in 0..8 {
            driver.step(KeyCode::Right);
        }
        driver.step(KeyCode::Enter);
        for _ in 0..8 {
            driver.step(KeyCode::Left);
        }
        driver.step(KeyCode::Enter);
        assert_eq!(
            driver.engine().current_page(&ViewerId::new("alice")),
            Some(PageId(1))
        );
        assert!(driver.host().messages().is_empty());
    }
}

use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::error::Result;
use crate::model::SLOTS_PER_ROW;
use crate::page::Page;

/// Display width of `text` once ANSI escape sequences are stripped.
pub fn display_width(text: &str) -> usize {
    strip_ansi_escapes::strip_str(text).width()
}

/// Renderer parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Columns per slot cell, brackets included.
    pub cell_width: u16,
    /// Terminal row the grid starts on.
    pub origin_row: u16,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cell_width: 12,
            origin_row: 0,
        }
    }
}

/// Draws a page as a title line followed by rows of nine fixed-width cells.
#[derive(Debug, Clone, Default)]
pub struct GridRenderer {
    options: RenderOptions,
}

impl GridRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    /// Text lines for `page`; `cursor` marks the highlighted slot.
    pub fn lines(&self, page: &Page, cursor: Option<u16>) -> Vec<String> {
        let inner = self.options.cell_width.saturating_sub(2);
        let mut lines = vec![format!("{} [{}]", page.title(), page.id())];
        let rows = page.capacity().div_ceil(SLOTS_PER_ROW);
        for row in 0..rows {
            let mut line = String::new();
            for column in 0..SLOTS_PER_ROW {
                let slot = row * SLOTS_PER_ROW + column;
                let label = page
                    .render(slot)
                    .map(|item| strip_ansi_escapes::strip_str(item.display_name()))
                    .unwrap_or_else(|| ".".to_string());
                let (open, close) = if cursor == Some(slot) {
                    ('>', '<')
                } else {
                    ('[', ']')
                };
                line.push(open);
                line.push_str(&fit_to_width(&label, inner));
                line.push(close);
            }
            lines.push(line);
        }
        lines
    }

    /// Writes the grid with absolute cursor positioning.
    pub fn render(&self, writer: &mut impl Write, page: &Page, cursor: Option<u16>) -> Result<()> {
        for (offset, line) in self.lines(page, cursor).iter().enumerate() {
            write!(
                writer,
                "\x1b[{};1H\x1b[2K{}",
                self.options.origin_row as usize + offset + 1,
                line
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Truncates or pads `text` to exactly `width` display columns.
fn fit_to_width(text: &str, width: u16) -> String {
    let width = width as usize;
    let mut fitted = String::new();
    for ch in text.chars() {
        fitted.push(ch);
        if fitted.width() > width {
            // Wide character straddling the edge.
            fitted.pop();
            break;
        }
    }
    let mut display = fitted.width();
    while display < width {
        fitted.push(' ');
        display += 1;
    }
    fitted
}

use super::{DisplaySink, Frame, PanelGeometry, RenderSinkError, TextMeasure};
use chrono::Local;
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame as TermFrame, Terminal,
};
use std::io::{self, Stdout};

/// Text rows inside the panel border: blank, scroll row, blank.
const PANEL_ROWS: u16 = 3;

/// Previews the panel in a terminal, one glyph cell per character cell.
pub struct TerminalSink {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    geometry: PanelGeometry,
    released: bool,
}

impl TerminalSink {
    /// Switches the terminal to raw mode on the alternate screen.
    ///
    /// Installs a panic hook that restores the terminal first, so a panic
    /// anywhere does not leave the shell in raw mode.
    pub fn acquire(geometry: PanelGeometry) -> io::Result<Self> {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
            original_hook(panic_info);
        }));

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        tracing::debug!(columns = geometry.columns(), "Terminal display acquired");

        Ok(Self {
            terminal,
            geometry,
            released: false,
        })
    }
}

impl TextMeasure for TerminalSink {
    fn measure_text_width(&self, text: &str) -> u32 {
        self.geometry.text_width(text)
    }
}

impl DisplaySink for TerminalSink {
    fn draw(&mut self, frame: &Frame) -> Result<(), RenderSinkError> {
        if self.released {
            return Err(RenderSinkError::Released);
        }
        let geometry = self.geometry;
        self.terminal.draw(|f| render_panel(f, frame, geometry))?;
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "Failed to disable raw mode");
        }
        if let Err(e) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, cursor::Show) {
            tracing::warn!(error = %e, "Failed to leave alternate screen");
        }
    }
}

fn panel_area(outer: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(outer.width);
    let height = height.min(outer.height);
    Rect::new(
        outer.x + (outer.width - width) / 2,
        outer.y + (outer.height - height) / 2,
        width,
        height,
    )
}

fn render_panel(f: &mut TermFrame, frame: &Frame, geometry: PanelGeometry) {
    let columns = u16::try_from(geometry.columns()).unwrap_or(u16::MAX);
    let area = panel_area(f.area(), columns.saturating_add(2), PANEL_ROWS + 2);
    f.render_widget(Clear, area);

    match frame {
        Frame::Scroll {
            header,
            text,
            offset_px,
        } => {
            let clock = Local::now().format("%H:%M").to_string();
            let block = Block::bordered()
                .title(Line::from(header.as_str()).style(Style::default().add_modifier(Modifier::BOLD)))
                .title(Line::from(clock).right_aligned());
            let row = geometry.visible_window(text, *offset_px);
            let body = Paragraph::new(vec![Line::default(), Line::from(row)]).block(block);
            f.render_widget(body, area);
        }
        Frame::Status(message) => {
            let body = Paragraph::new(vec![Line::default(), Line::from(message.as_str())])
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::bordered());
            f.render_widget(body, area);
        }
        Frame::Blank => {}
    }
}

//! Ratatui-based terminal UI.
//!
//! The TUI is a sample-table editor for one fan model at a time: pick a model,
//! edit the flow/pressure rows, watch the fitted curve update, then commit or
//! discard.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState},
};

use crate::app::pipeline::{self, Workspace};
use crate::cli::TuiArgs;
use crate::domain::{FanModel, FitResult, MAX_DEGREE, MIN_DEGREE};
use crate::error::AppError;
use crate::session::{Column, CurveSession, SampleRow};

mod plotters_chart;

use plotters_chart::{CurveChart, chart_series};

/// Start the TUI.
pub fn run(ws: &Workspace, args: TuiArgs) -> Result<(), AppError> {
    let mut app = App::new(ws, args.model.as_deref())?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Models,
    Table,
}

struct App<'w> {
    ws: &'w Workspace,
    models: Vec<FanModel>,
    model_cursor: usize,
    session: Option<CurveSession>,
    focus: Focus,
    row: usize,
    column: Column,
    /// Cell text being typed; `Some` while editing.
    editing: Option<String>,
    degree: usize,
    preview: Option<Result<FitResult, String>>,
    status: String,
}

impl<'w> App<'w> {
    fn new(ws: &'w Workspace, initial: Option<&str>) -> Result<Self, AppError> {
        let models = ws.registry().list_models()?;
        let mut app = Self {
            ws,
            models,
            model_cursor: 0,
            session: None,
            focus: Focus::Models,
            row: 0,
            column: Column::FlowRate,
            editing: None,
            degree: ws.config.default_degree,
            preview: None,
            status: String::new(),
        };

        if let Some(number) = initial {
            let model = ws.registry().resolve(number)?;
            app.model_cursor = app.models.iter().position(|m| m.id == model.id).unwrap_or(0);
            app.open_selected()?;
        } else if app.models.is_empty() {
            app.status = "No fan models. Add one with `fan model add`.".to_string();
        } else {
            app.status = "Select a model and press Enter.".to_string();
        }
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        if self.editing.is_some() {
            self.handle_cell_edit(code);
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Models if self.session.is_some() => Focus::Table,
                    _ => Focus::Models,
                };
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.set_degree(self.degree + 1),
            KeyCode::Char('-') => self.set_degree(self.degree.saturating_sub(1)),
            KeyCode::Char('c') => self.commit(),
            KeyCode::Char('x') => self.discard()?,
            _ => match self.focus {
                Focus::Models => self.handle_models_key(code)?,
                Focus::Table => self.handle_table_key(code),
            },
        }
        Ok(false)
    }

    fn handle_models_key(&mut self, code: KeyCode) -> Result<(), AppError> {
        match code {
            KeyCode::Up => self.model_cursor = self.model_cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.model_cursor + 1 < self.models.len() {
                    self.model_cursor += 1;
                }
            }
            KeyCode::Enter => self.open_selected()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_table_key(&mut self, code: KeyCode) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let len = session.rows().len();

        match code {
            KeyCode::Up => self.row = self.row.saturating_sub(1),
            KeyCode::Down => {
                if self.row + 1 < len {
                    self.row += 1;
                }
            }
            KeyCode::Left => self.column = Column::FlowRate,
            KeyCode::Right => self.column = Column::Pressure,
            KeyCode::Enter if len > 0 => {
                let current = session.rows()[self.row].get(self.column);
                self.editing = Some(current.map(|v| v.to_string()).unwrap_or_default());
                self.status = format!(
                    "Editing {} of row {}. Enter to apply, Esc to cancel.",
                    self.column.title(),
                    self.row
                );
            }
            KeyCode::Char('a') => {
                session.push_row(SampleRow::default());
                self.row = session.rows().len() - 1;
                self.column = Column::FlowRate;
                self.editing = Some(String::new());
                self.status = "New row: type the flow rate.".to_string();
            }
            KeyCode::Char('d') | KeyCode::Delete if len > 0 => {
                match session.delete_row(self.row) {
                    Ok(_) => {
                        self.status = format!("Deleted row {}.", self.row);
                        self.row = self.row.min(session.rows().len().saturating_sub(1));
                    }
                    Err(e) => self.status = e.to_string(),
                }
                self.refresh_preview();
            }
            _ => {}
        }
    }

    fn handle_cell_edit(&mut self, code: KeyCode) {
        let Some(buffer) = self.editing.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E') => {
                buffer.push(c);
            }
            KeyCode::Enter | KeyCode::Tab => {
                let text = std::mem::take(buffer);
                self.editing = None;
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if let Err(e) = session.set_cell(self.row, self.column, &text) {
                    self.status = e.to_string();
                    return;
                }
                let pressure_missing = session.rows()[self.row].pressure.is_none();
                self.status = if crate::session::parse_cell(&text).is_none() {
                    format!("{} of row {} is empty; the row is skipped.", self.column.title(), self.row)
                } else {
                    format!("Row {} updated.", self.row)
                };
                self.refresh_preview();

                // A new row moves on to its pressure cell.
                if self.column == Column::FlowRate && pressure_missing {
                    self.column = Column::Pressure;
                    self.editing = Some(String::new());
                }
            }
            _ => {}
        }
    }

    fn open_selected(&mut self) -> Result<(), AppError> {
        let Some(model) = self.models.get(self.model_cursor).cloned() else {
            return Ok(());
        };

        let discarded = self.session.as_ref().is_some_and(CurveSession::is_dirty);
        if let Some(session) = self.session.as_mut() {
            session.switch_to(&self.ws.db, model)?;
        } else {
            self.session = Some(CurveSession::open(&self.ws.db, model)?);
        }

        self.row = 0;
        self.column = Column::FlowRate;
        self.focus = Focus::Table;
        self.refresh_preview();

        let number = self.model_number();
        self.status = if discarded {
            format!("Opened {number}; unsaved edits were discarded.")
        } else {
            format!("Opened {number}.")
        };
        Ok(())
    }

    fn set_degree(&mut self, degree: usize) {
        self.degree = degree.clamp(MIN_DEGREE, MAX_DEGREE);
        self.refresh_preview();
        self.status = format!("Degree {}.", self.degree);
    }

    fn commit(&mut self) {
        let Some(session) = self.session.as_mut() else {
            self.status = "Open a model first.".to_string();
            return;
        };
        self.status = match session.commit_fit(&self.ws.db, self.degree) {
            Ok(fit) => format!(
                "Saved {} sample(s) and the degree {} fit: {}",
                fit.quality.n,
                fit.degree,
                fit.equation()
            ),
            Err(e) => format!("Commit failed: {e}"),
        };
    }

    fn discard(&mut self) -> Result<(), AppError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.discard(&self.ws.db)?;
        self.row = self.row.min(session.rows().len().saturating_sub(1));
        self.refresh_preview();
        self.status = "Reverted to the stored samples.".to_string();
        Ok(())
    }

    fn refresh_preview(&mut self) {
        self.preview = match &self.session {
            Some(session) => match pipeline::preview(session, self.degree) {
                Ok(result) => Some(result),
                Err(e) => Some(Err(e.to_string())),
            },
            None => None,
        };
    }

    fn model_number(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.model().model_number.clone())
            .unwrap_or_else(|| "-".to_string())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        let dirty = self.session.as_ref().is_some_and(CurveSession::is_dirty);
        lines.push(Line::from(vec![
            Span::styled("fan", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" {} | degree {}", self.model_number(), self.degree)),
            if dirty {
                Span::styled(" | unsaved", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("")
            },
        ]));

        let detail = match &self.preview {
            Some(Ok(fit)) => format!(
                "{} | n={} RMSE={:.3}Pa R²={:.5}",
                fit.equation(),
                fit.quality.n,
                fit.quality.rmse,
                fit.quality.r_squared
            ),
            Some(Err(message)) => message.clone(),
            None => "-".to_string(),
        };
        lines.push(Line::from(Span::styled(detail, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(40), Constraint::Min(0)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(35), Constraint::Min(0)])
            .split(columns[0]);

        self.draw_models(frame, left[0]);
        self.draw_table(frame, left[1]);
        self.draw_chart(frame, columns[1]);
    }

    fn focus_style(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    }

    fn draw_models(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .models
            .iter()
            .map(|m| ListItem::new(m.model_number.clone()))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title("Models")
                    .borders(Borders::ALL)
                    .border_style(self.focus_style(Focus::Models)),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !self.models.is_empty() {
            state.select(Some(self.model_cursor));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title("Samples")
            .borders(Borders::ALL)
            .border_style(self.focus_style(Focus::Table));

        let Some(session) = &self.session else {
            frame.render_widget(Paragraph::new("No model open.").block(block), area);
            return;
        };

        let selected = Style::default().fg(Color::Black).bg(Color::White);
        let rows: Vec<Row> = session
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cell = |column: Column| {
                    let text = match (&self.editing, i == self.row && column == self.column) {
                        (Some(buffer), true) => format!("{buffer}▏"),
                        _ => row.get(column).map_or_else(|| "-".to_string(), |v| format!("{v}")),
                    };
                    let style = if i == self.row && column == self.column && self.focus == Focus::Table {
                        selected
                    } else if row.sample().is_none() {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default()
                    };
                    Cell::from(text).style(style)
                };
                Row::new(vec![
                    Cell::from(i.to_string()),
                    cell(Column::FlowRate),
                    cell(Column::Pressure),
                ])
            })
            .collect();

        let header = Row::new(vec!["#", Column::FlowRate.title(), Column::Pressure.title()])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [Constraint::Length(4), Constraint::Length(17), Constraint::Min(0)],
        )
        .header(header)
        .block(block);

        let mut state = TableState::default();
        if !session.rows().is_empty() {
            state.select(Some(self.row));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Pump Curve").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(session) = &self.session else {
            let msg = Paragraph::new("Open a model to see its curve.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let samples: Vec<(f64, f64)> = session
            .samples()
            .iter()
            .map(|s| (s.flow_rate, s.pressure))
            .collect();
        let curve = match &self.preview {
            Some(Ok(fit)) => fit.curve(),
            _ => Vec::new(),
        };
        let selected = session
            .rows()
            .get(self.row)
            .and_then(SampleRow::sample)
            .map(|s| (s.flow_rate, s.pressure));
        let (x_bounds, y_bounds) = chart_series(&samples, &curve);

        let (chart_rect, insets) = chart_layout(inner);
        frame.render_widget(
            CurveChart {
                curve: &curve,
                samples: &samples,
                selected,
                x_bounds,
                y_bounds,
            },
            chart_rect,
        );
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = if self.editing.is_some() {
            "type a number  Enter apply  Esc cancel"
        } else {
            "Tab focus  ↑/↓ move  ←/→ column  Enter open/edit  a add  d delete  +/- degree  c commit  x discard  q quit"
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.2}");
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        let width = label.len() as u16;
        frame.render_widget(Paragraph::new(label).style(style), Rect { x: start, y, width, height: 1 });
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.0}");
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        let width = label.len() as u16;
        frame.render_widget(Paragraph::new(label).style(style), Rect { x: start, y, width, height: 1 });
    }

    let x_label = Paragraph::new("flow (m³/s)")
        .alignment(Alignment::Center)
        .style(style);
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("Pa").style(style.add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

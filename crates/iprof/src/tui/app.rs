use crate::aggregator::Aggregator;
use crate::error::{Error, Result};
use crate::stats::SectionStats;
use crate::workload::Workload;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::*};
use std::io::{self, stdout};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Section,
    Count,
    Mean,
    P99,
}

impl SortColumn {
    fn next(self) -> Self {
        match self {
            SortColumn::Section => SortColumn::Count,
            SortColumn::Count => SortColumn::Mean,
            SortColumn::Mean => SortColumn::P99,
            SortColumn::P99 => SortColumn::Section,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSort {
    pub column: SortColumn,
    pub descending: bool,
}

impl Default for TableSort {
    fn default() -> Self {
        TableSort {
            column: SortColumn::Section,
            descending: false,
        }
    }
}

pub struct App {
    aggregator: Aggregator,
    workload: Option<Workload>,
    refresh_interval: Duration,
    last_refresh: Instant,
    start_time: Instant,
    running: bool,
    paused: bool,
    pub(super) rows: Vec<(String, SectionStats)>,
    pub(super) selected: usize,
    pub(super) sort: TableSort,
    pub(super) chart_visible: bool,
}

impl App {
    pub fn new(aggregator: Aggregator, workload: Option<Workload>, refresh_interval: Duration) -> Self {
        let now = Instant::now();
        App {
            aggregator,
            workload,
            refresh_interval,
            last_refresh: now,
            start_time: now,
            running: true,
            paused: false,
            rows: Vec::new(),
            selected: 0,
            sort: TableSort::default(),
            chart_visible: true,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn submitted(&self) -> u64 {
        self.workload.as_ref().map_or(0, Workload::submitted)
    }

    pub fn processed(&self) -> u64 {
        self.aggregator.processed()
    }

    pub fn dropped(&self) -> u64 {
        self.aggregator.dropped()
    }

    pub fn selected_row(&self) -> Option<&(String, SectionStats)> {
        self.rows.get(self.selected)
    }

    /// Drive the live view until quit. The workload is stopped and the
    /// aggregator shut down even when the terminal fails.
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_terminal();
        self.finish();
        result
    }

    fn run_terminal(&mut self) -> Result<()> {
        enable_raw_mode()?;

        let result = execute!(stdout(), EnterAlternateScreen)
            .and_then(|()| Terminal::new(CrosstermBackend::new(stdout())))
            .map_err(Error::from)
            .and_then(|mut terminal| self.main_loop(&mut terminal));

        // Restore before reporting whichever error came first
        let restored = restore_terminal();
        result.and(restored)
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        self.refresh();
        terminal.draw(|f| super::ui::render(f, self))?;

        while self.running {
            let poll_duration = if self.paused {
                Duration::from_millis(80)
            } else {
                Duration::from_millis(20)
            };

            let mut needs_redraw = false;

            if event::poll(poll_duration)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code, key.modifiers);
                needs_redraw = true;
            }

            if !self.paused && self.last_refresh.elapsed() >= self.refresh_interval {
                self.refresh();
                needs_redraw = true;
            }

            if needs_redraw {
                terminal.draw(|f| super::ui::render(f, self))?;
            }
        }

        Ok(())
    }

    /// Pull a fresh snapshot of every section from the aggregator
    pub fn refresh(&mut self) {
        let selected_name = self.selected_row().map(|(name, _)| name.clone());
        self.rows = self.aggregator.stats().into_iter().collect();
        self.sort_rows();
        self.select_named(selected_name);
        self.last_refresh = Instant::now();
    }

    /// Keep the cursor on the same section when rows move
    fn select_named(&mut self, name: Option<String>) {
        if let Some(name) = name
            && let Some(idx) = self.rows.iter().position(|(n, _)| *n == name)
        {
            self.selected = idx;
        }
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    fn resort(&mut self) {
        let selected_name = self.selected_row().map(|(name, _)| name.clone());
        self.sort_rows();
        self.select_named(selected_name);
    }

    fn sort_rows(&mut self) {
        let sort = self.sort;
        self.rows.sort_by(|(an, a), (bn, b)| {
            let ord = match sort.column {
                SortColumn::Section => an.cmp(bn),
                SortColumn::Count => a.count.cmp(&b.count),
                SortColumn::Mean => a.mean.total_cmp(&b.mean),
                SortColumn::P99 => a.percentiles.p99().total_cmp(&b.percentiles.p99()),
            };
            if sort.descending { ord.reverse() } else { ord }
        });
    }

    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match key {
            KeyCode::Char('c') if ctrl => self.running = false,
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('p') => self.paused = !self.paused,
            KeyCode::Char('c') => self.chart_visible = !self.chart_visible,
            KeyCode::Char('s') => {
                self.sort.column = self.sort.column.next();
                self.sort.descending = self.sort.column != SortColumn::Section;
                self.resort();
            }
            KeyCode::Char('r') => {
                self.sort.descending = !self.sort.descending;
                self.resort();
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.rows.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.selected = self.rows.len().saturating_sub(1);
            }
            _ => {}
        }
    }

    fn finish(&mut self) {
        if let Some(workload) = self.workload.take() {
            workload.stop();
            match workload.join() {
                Ok(n) => tracing::debug!(submitted = n, "workload stopped"),
                Err(e) => tracing::warn!(error = %e, "workload ended with an error"),
            }
        }
        self.aggregator.shutdown();
    }
}

fn restore_terminal() -> Result<()> {
    let raw = disable_raw_mode();
    execute!(stdout(), LeaveAlternateScreen, Show)?;
    raw?;
    Ok(())
}

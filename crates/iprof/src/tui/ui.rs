use super::app::{App, SortColumn, TableSort};
use crate::commands::report::{format_count, format_ms};
use crate::stats::SectionStats;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
};

/// Points sampled along the percentile curve
const CURVE_POINTS: usize = 101;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(8),    // Table (+ chart)
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    if app.chart_visible {
        let main = Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);
        render_table(frame, app, main[0]);
        render_chart(frame, app, main[1]);
    } else {
        render_table(frame, app, chunks[1]);
    }

    render_footer(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let elapsed = app.elapsed();
    let hours = elapsed.as_secs() / 3600;
    let minutes = (elapsed.as_secs() % 3600) / 60;
    let seconds = elapsed.as_secs() % 60;

    let status = if app.is_paused() {
        Span::styled(
            " PAUSED ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        )
    } else {
        Span::styled(" LIVE ", Style::default().bg(Color::Green).fg(Color::Black))
    };

    let mut spans = vec![
        Span::styled(
            "iprof",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        status,
        Span::raw(format!(
            " {:02}:{:02}:{:02} │ {} submitted │ {} processed",
            hours,
            minutes,
            seconds,
            format_count(app.submitted()),
            format_count(app.processed()),
        )),
    ];
    let dropped = app.dropped();
    if dropped > 0 {
        spans.push(Span::styled(
            format!(" │ {} dropped", format_count(dropped)),
            Style::default().fg(Color::Red),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Sections ({}) ", app.rows.len()));

    if app.rows.is_empty() {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Waiting for readings...",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let sort = app.sort;
    let header_labels = [
        header_label("Section", Some(SortColumn::Section), sort),
        header_label("Count", Some(SortColumn::Count), sort),
        header_label("Total", None, sort),
        header_label("Mean", Some(SortColumn::Mean), sort),
        header_label("P50", None, sort),
        header_label("P95", None, sort),
        header_label("P99", Some(SortColumn::P99), sort),
        header_label("Max", None, sort),
    ];
    let header = Row::new(header_labels.iter().map(|h| {
        Cell::from(h.as_str()).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    }))
    .height(1);

    // Keep the selected row on screen
    let visible_height = (area.height.saturating_sub(3) as usize).max(1);
    let scroll_offset = app.selected.saturating_sub(visible_height - 1);

    let rows: Vec<Row> = app
        .rows
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_height)
        .map(|(i, (name, s))| {
            let style = if i == app.selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let p99 = s.percentiles.p99();
            Row::new(vec![
                Cell::from(name.clone()),
                Cell::from(format_count(s.count as u64)),
                Cell::from(format_count(s.total)),
                Cell::from(format_ms(s.mean)),
                Cell::from(format_ms(s.percentiles.p50())),
                Cell::from(format_ms(s.percentiles.p95())),
                Cell::from(format_ms(p99)).style(Style::default().fg(tail_color(s.mean, p99))),
                Cell::from(format_ms(s.percentiles.max())),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Fill(1),
        Constraint::Length(9),
        Constraint::Length(11),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let Some((name, stats)) = app.selected_row() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Percentiles ");
        frame.render_widget(block, area);
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(
            " {} │ percentile curve over {} samples ",
            name,
            stats.percentiles.len()
        ));

    let points = percentile_curve(stats);
    let y_max = (stats.percentiles.max() * 1.05).max(0.001);

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Magenta))
            .data(&points),
    ];

    let y_labels = vec![
        Span::raw(format_ms(0.0)),
        Span::raw(format_ms(y_max / 2.0)),
        Span::raw(format_ms(y_max)),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, 100.0])
                .labels(vec![
                    Span::raw("p0"),
                    Span::raw("p50"),
                    Span::raw("p100"),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("ms")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, y_max])
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

/// (percentile, milliseconds) pairs from p0 to p100
fn percentile_curve(stats: &SectionStats) -> Vec<(f64, f64)> {
    (0..CURVE_POINTS)
        .map(|i| {
            let p = i as f64 * 100.0 / (CURVE_POINTS - 1) as f64;
            (p, stats.percentile(p))
        })
        .collect()
}

fn header_label(label: &str, column: Option<SortColumn>, sort: TableSort) -> String {
    if column != Some(sort.column) {
        return label.to_string();
    }
    let indicator = if sort.descending { "v" } else { "^" };
    format!("{} {}", label, indicator)
}

/// Color p99 by how far the tail sits above the mean
fn tail_color(mean: f64, p99: f64) -> Color {
    if mean <= 0.0 {
        return Color::White;
    }
    let ratio = p99 / mean;
    if ratio >= 5.0 {
        Color::Red
    } else if ratio >= 2.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().bg(Color::DarkGray));
    let pause_label = if app.is_paused() { " resume " } else { " pause " };
    let chart_label = if app.chart_visible {
        " hide chart "
    } else {
        " show chart "
    };

    let spans = vec![
        key(" q "),
        Span::raw(" quit "),
        key(" p "),
        Span::raw(pause_label),
        key(" j/k "),
        Span::raw(" nav "),
        key(" s "),
        Span::raw(" sort "),
        key(" r "),
        Span::raw(" reverse "),
        key(" c "),
        Span::raw(chart_label),
    ];

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

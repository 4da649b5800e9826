use common::{AnalysisResult, Snapshot, SnapshotSlot};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::{error::Error, io, time::Duration};

/// How long the loop waits for a key before re-reading the snapshot slot.
const REFRESH: Duration = Duration::from_millis(250);

/// Runs the dashboard until `q` or `Esc`, re-reading `slot` on every tick so
/// a live watch loop shows up as it publishes.
pub fn draw_dashboard(slot: &SnapshotSlot) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, slot);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    slot: &SnapshotSlot,
) -> io::Result<()> {
    loop {
        let snapshot = slot.current();
        terminal.draw(|f| render(f, &snapshot))?;

        if event::poll(REFRESH)? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Ok(());
                }
            }
        }
    }
}

/// One frame: status line, counts chart, finding lists, footer.
pub fn render(f: &mut Frame, snapshot: &Snapshot) {
    let result = &snapshot.result;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.size());

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(chunks[1]);

    f.render_widget(status(snapshot), chunks[0]);

    let counts = counts(result);
    let barchart = BarChart::default()
        .block(Block::default().title("Findings").borders(Borders::ALL))
        .data(&counts)
        .bar_width(7)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));
    f.render_widget(barchart, main_chunks[0]);

    render_lists(f, main_chunks[1], result);

    let footer = Paragraph::new("Press 'q' to exit").style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, chunks[2]);
}

fn status(snapshot: &Snapshot) -> Paragraph<'static> {
    let result = &snapshot.result;
    let (text, color) = if snapshot.generation == 0 {
        ("WAITING FOR FIRST PASS", Color::DarkGray)
    } else if !result.js_errors.is_empty() {
        ("ERRORS", Color::Red)
    } else if result.is_clean() {
        ("CLEAN", Color::Green)
    } else {
        ("DEAD CODE FOUND", Color::Yellow)
    };

    let mut spans = vec![
        Span::raw("Status: "),
        Span::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("   pass #{}", snapshot.generation)),
    ];
    if !snapshot.stamp.is_empty() {
        spans.push(Span::raw(format!(" at {}", snapshot.stamp)));
    }
    if !result.skipped_files.is_empty() {
        spans.push(Span::styled(
            format!("   {} file(s) skipped", result.skipped_files.len()),
            Style::default().fg(Color::Red),
        ));
    }
    Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).title("deadwatcher"))
}

fn counts(result: &AnalysisResult) -> [(&'static str, u64); 5] {
    [
        ("Classes", result.unused_classes.len() as u64),
        ("Tags", result.deprecated_tags.len() as u64),
        ("Funcs", result.js_unused.len() as u64),
        ("Errors", result.js_errors.len() as u64),
        ("Warns", result.js_warnings.len() as u64),
    ]
}

fn render_lists(f: &mut Frame, area: Rect, result: &AnalysisResult) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ]
            .as_ref(),
        )
        .split(area);

    let classes = result.unused_classes.iter().map(|c| format!(".{c}"));
    f.render_widget(list("Unused CSS classes", classes), rows[0]);

    let tags = result.deprecated_tags.iter().map(|t| {
        match result.tag_suggestions.get(t).and_then(|s| s.as_deref()) {
            Some(advice) => format!("<{t}> - {advice}"),
            None => format!("<{t}>"),
        }
    });
    f.render_widget(list("Deprecated tags", tags), rows[1]);

    let functions = result
        .js_unused
        .iter()
        .map(|u| format!("{} - {}", u.name, u.file));
    f.render_widget(list("Unused JS functions", functions), rows[2]);

    let diagnostics = result
        .js_errors
        .iter()
        .chain(result.js_warnings.iter())
        .map(|d| format!("{}:{} [{}] {}", d.file, d.line, d.rule_id, d.message));
    f.render_widget(list("Lint", diagnostics), rows[3]);
}

fn list(title: &'static str, items: impl Iterator<Item = String>) -> List<'static> {
    let items: Vec<ListItem> = items.map(ListItem::new).collect();
    let title = format!("{title} ({})", items.len());
    List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
}

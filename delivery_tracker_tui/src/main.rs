use anyhow::{Context, Result, bail};
use clap::Parser;
use delivery_tracker_core::{
    AgentId, Position, Report, SimulationConfig, count_unique_houses,
    map::{BoundingBox, trail_grid},
    process_moves,
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, BufRead, Stdout, Write},
    num::NonZeroUsize,
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Colours cycled through when drawing each agent's trail.
const AGENT_COLORS: [Color; 6] = [
    Color::Red,
    Color::Blue,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Cyan,
];

/// Bounding boxes with more cells than this are not drawn.
const MAX_VIEW_CELLS: u64 = 1_000_000;

/// Tracks pizza deliveries from dispatcher inputs (^, v, <, >).
///
/// Reads moves from a file, from --moves, or from an interactive prompt.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Flat text file containing only valid dispatcher inputs
    #[arg(short = 'f', long, value_name = "MOVES_FILE", conflicts_with = "moves")]
    moves_file: Option<PathBuf>,

    /// Dispatcher inputs given inline
    #[arg(short, long)]
    moves: Option<String>,

    /// Number of delivery agents taking turns
    #[arg(short, long, default_value = "1")]
    agents: NonZeroUsize,

    /// Skip computing the grid diagonal
    #[arg(long)]
    no_grid: bool,

    /// Print the full report as JSON
    #[arg(long, conflicts_with = "view")]
    json: bool,

    /// Replay the deliveries in the terminal
    #[arg(long)]
    view: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig::default()
            .with_agents(self.agents)
            .with_bounding_box(!self.no_grid)
    }
}

struct App {
    /// Result of the full pipeline run.
    report: Report,
    /// Number of delivery records drawn so far.
    revealed: usize,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(report: Report) -> Self {
        App {
            report,
            revealed: 1,
            should_quit: false,
        }
    }

    /// Reveals the next delivery.
    fn tick(&mut self) {
        if self.revealed < self.report.simulation.records.len() {
            self.revealed += 1;
        }
    }

    fn reveal_all(&mut self) {
        self.revealed = self.report.simulation.records.len();
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let raw_moves = read_moves(&args)?;
    let report = process_moves(&raw_moves, &args.simulation_config())?;

    if args.json {
        println!("{}", format_json(&report)?);
        return Ok(());
    }

    print!("{}", format_report(&report));

    if args.view {
        let mut terminal = setup_terminal()?;
        let mut app = App::new(report);
        let result = run_app(&mut terminal, &mut app);
        restore_terminal(&mut terminal)?;
        result?;
    }

    Ok(())
}

/// Installs a stderr subscriber; `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Collects raw move text from whichever source the user picked.
fn read_moves(args: &Args) -> Result<String> {
    if let Some(path) = &args.moves_file {
        tracing::debug!(path = %path.display(), "reading moves file");
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read moves file: {}", path.display()));
    }
    if let Some(moves) = &args.moves {
        return Ok(moves.clone());
    }
    prompt_moves(&mut io::stdin().lock(), &mut io::stdout())
}

/// Asks for moves interactively and returns the line typed.
fn prompt_moves(input: &mut impl BufRead, output: &mut impl Write) -> Result<String> {
    write!(output, "Enter the list of moves: ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("No moves to process. Pass --moves-file or --moves, or type them at the prompt");
    }
    Ok(line)
}

/// Formats the summary printed after a run.
fn format_report(report: &Report) -> String {
    let mut text = format!(
        "Number of unique houses visited: {}\n",
        report.unique_houses
    );
    if let Some(bounds) = report.simulation.bounding_box {
        text.push_str(&format!(
            "Grid diagonal coordinates: {} {}\n",
            bounds.min, bounds.max
        ));
        text.push_str(&format!(
            "Grid diagonal length: {}\n",
            bounds.diagonal_length()
        ));
    }
    text
}

/// Serialises the full report for `--json`.
fn format_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the viewer.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Enter => app.reveal_all(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the map
            Constraint::Percentage(20), // Area for agents
            Constraint::Percentage(10), // Area for status/help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], app);
    render_agents(frame, main_layout[1], app);

    let help_text = Paragraph::new("Press 'Enter' to skip to the end, 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn agent_color(agent: AgentId) -> Color {
    AGENT_COLORS[agent % AGENT_COLORS.len()]
}

/// Each agent's position after the first `revealed` records.
fn positions_after(app: &App) -> Vec<Position> {
    let simulation = &app.report.simulation;
    let mut positions = vec![Position::ORIGIN; simulation.num_agents];
    for record in simulation.records.iter().take(app.revealed).skip(1) {
        positions[record.agent] = record.position;
    }
    positions
}

/// Lists every agent's position and delivery count.
fn render_agents(frame: &mut Frame, area: Rect, app: &App) {
    let records = &app.report.simulation.records[..app.revealed];
    let positions = positions_after(app);

    let agent_items: Vec<ListItem> = positions
        .iter()
        .enumerate()
        .map(|(id, position)| {
            let deliveries = records.iter().skip(1).filter(|r| r.agent == id).count();
            ListItem::from(Line::from(Span::styled(
                format!("Agent: {} Pos: {} Deliveries: {}", id, position, deliveries),
                Style::default().fg(agent_color(id)),
            )))
        })
        .collect();

    let title = format!(
        "Agents ({} unique houses, move {}/{})",
        count_unique_houses(records),
        app.revealed - 1,
        app.report.simulation.moves()
    );
    let agents_widget =
        List::new(agent_items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(agents_widget, area);
}

/// Renders the delivery trails onto the frame.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Deliveries").borders(Borders::ALL);
    let bounds = app.report.simulation.bounds();

    let lines = match map_lines(app, bounds) {
        Ok(lines) => lines,
        Err(message) => vec![Line::from(message)],
    };

    let map_paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(map_paragraph, area);
}

fn map_lines(app: &App, bounds: BoundingBox) -> Result<Vec<Line<'static>>, String> {
    if bounds.width().saturating_mul(bounds.height()) > MAX_VIEW_CELLS {
        return Err(format!(
            "Grid spanning {} to {} is too large to display",
            bounds.min, bounds.max
        ));
    }

    let records = &app.report.simulation.records[..app.revealed];
    let trail = trail_grid(records, bounds).map_err(|e| e.to_string())?;
    let positions = positions_after(app);

    let mut lines = Vec::with_capacity(trail.height());
    for (row, cells) in trail.rows().enumerate() {
        let y = bounds.max.y - row as i64;
        let spans: Vec<Span> = cells
            .iter()
            .enumerate()
            .map(|(column, cell)| {
                let position = Position::new(bounds.min.x + column as i64, y);
                // Agents standing on a cell take precedence over trails.
                if let Some(agent) = positions.iter().rposition(|p| *p == position) {
                    return Span::styled("@", Style::default().fg(agent_color(agent)).bold());
                }
                if position == Position::ORIGIN {
                    return Span::styled("■", Style::default().fg(Color::White).bold());
                }
                match cell {
                    Some(agent) => Span::styled("o", Style::default().fg(agent_color(*agent))),
                    None => Span::styled("·", Style::default().fg(Color::DarkGray)),
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn report(moves: &str, agents: usize) -> Report {
        let config = SimulationConfig::default().with_agents(NonZeroUsize::new(agents).unwrap());
        process_moves(moves, &config).unwrap()
    }

    #[test]
    fn args_default_to_one_agent_with_grid() {
        let args = Args::try_parse_from(["delivery_tracker_tui", "--moves", "^>"]).unwrap();
        let config = args.simulation_config();
        assert_eq!(config.num_agents.get(), 1);
        assert!(config.track_bounding_box);
    }

    #[test]
    fn zero_agents_is_rejected() {
        assert!(Args::try_parse_from(["delivery_tracker_tui", "--agents", "0"]).is_err());
    }

    #[test]
    fn moves_and_file_conflict() {
        let parsed =
            Args::try_parse_from(["delivery_tracker_tui", "--moves", "^", "--moves-file", "x"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn json_and_view_conflict() {
        let parsed = Args::try_parse_from(["delivery_tracker_tui", "--json", "--view"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn prompt_returns_typed_line() {
        let mut input = Cursor::new("^>v<\n");
        let mut output = Vec::new();
        let line = prompt_moves(&mut input, &mut output).unwrap();
        assert_eq!(line, "^>v<\n");
        assert_eq!(String::from_utf8(output).unwrap(), "Enter the list of moves: ");
    }

    #[test]
    fn prompt_without_input_fails() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let err = prompt_moves(&mut input, &mut output).unwrap_err();
        assert!(err.to_string().starts_with("No moves to process"));
    }

    #[test]
    fn moves_file_lines_are_joined() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "'^v'").unwrap();
        writeln!(file, "  ^v  ").unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let args = Args::try_parse_from(["delivery_tracker_tui", "--moves-file", &path]).unwrap();
        let raw = read_moves(&args).unwrap();
        let report = process_moves(&raw, &args.simulation_config()).unwrap();
        assert_eq!(report.simulation.moves(), 4);
        assert_eq!(report.unique_houses, 2);
    }

    #[test]
    fn moves_file_with_carriage_returns_is_accepted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "^^\r>>\r").unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let args = Args::try_parse_from(["delivery_tracker_tui", "--moves-file", &path]).unwrap();
        let raw = read_moves(&args).unwrap();
        let report = process_moves(&raw, &args.simulation_config()).unwrap();
        assert_eq!(report.simulation.moves(), 4);
        assert_eq!(report.unique_houses, 5);
    }

    #[test]
    fn missing_moves_file_is_reported() {
        let args =
            Args::try_parse_from(["delivery_tracker_tui", "--moves-file", "/no/such/moves.txt"])
                .unwrap();
        let err = read_moves(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to read moves file"));
    }

    #[test]
    fn report_lists_count_and_diagonal() {
        let text = format_report(&report("^^>>>", 1));
        assert_eq!(
            text,
            "Number of unique houses visited: 6\n\
             Grid diagonal coordinates: (0, 0) (3, 2)\n\
             Grid diagonal length: 4\n"
        );
    }

    #[test]
    fn report_without_grid_only_counts() {
        let config = SimulationConfig::default().with_bounding_box(false);
        let report = process_moves("<<", &config).unwrap();
        assert_eq!(format_report(&report), "Number of unique houses visited: 3\n");
    }

    #[test]
    fn json_report_serialises_records_and_box() {
        let json = format_json(&report("^>", 1)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["unique_houses"], 3);
        assert_eq!(
            value["simulation"]["records"][0],
            serde_json::json!({"position": {"x": 0, "y": 0}, "agent": 0})
        );
        assert_eq!(
            value["simulation"]["bounding_box"],
            serde_json::json!({"min": {"x": 0, "y": 0}, "max": {"x": 1, "y": 1}})
        );
    }

    #[test]
    fn json_report_without_grid_has_null_box() {
        let args =
            Args::try_parse_from(["delivery_tracker_tui", "--moves", "<<", "--no-grid", "--json"])
                .unwrap();
        let report = process_moves("<<", &args.simulation_config()).unwrap();
        let json = format_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["unique_houses"], 3);
        assert!(value["simulation"]["bounding_box"].is_null());
    }

    #[test]
    fn app_ticks_until_all_records_shown() {
        let mut app = App::new(report("^>", 2));
        assert_eq!(app.revealed, 1);
        app.tick();
        app.tick();
        app.tick();
        assert_eq!(app.revealed, 3);
        assert_eq!(
            positions_after(&app),
            vec![Position::new(0, 1), Position::new(1, 0)]
        );
    }

    #[test]
    fn map_marks_agents_and_origin() {
        let mut app = App::new(report("^>", 2));
        app.reveal_all();
        let lines = map_lines(&app, app.report.simulation.bounds()).unwrap();
        let rendered: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(rendered, vec!["@·", "■@"]);
    }
}

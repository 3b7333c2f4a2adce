use std::io::stdout;
use std::sync::Arc;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{error, info};

use inspecta::cli::{Cli, OutputFormat};
use inspecta::logging::{self, LogConfig};
use inspecta::tui::{app::App, input::handle_events, ui::draw};
use inspecta::{output, Console, Store, TableRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    let log_config = LogConfig::new(cli.log_level)
        .with_file(cli.log_file.clone());
    logging::init(&log_config)?;

    if !cli.path.is_file() {
        let message = format!("Database does not exist: {}", cli.path.display());
        return Err(message.into());
    }

    let store = Arc::new(Store::open(&cli.path)?);
    let console = Console::open(store, TableRegistry::default()).map_err(|e| {
        error!(error = %e, path = %cli.path.display(), "failed to open console");
        e
    })?;
    info!(path = %cli.path.display(), "database opened");

    if let Some(table) = &cli.read {
        // Non-interactive mode
        run_read(console, &cli, table, cli.format)?;
    } else {
        // Interactive TUI mode
        run_tui(console)?;
    }

    Ok(())
}

fn run_read(
    mut console: Console,
    cli: &Cli,
    table: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = cli.user.as_deref().ok_or("--read needs --user")?;
    let password = cli
        .password
        .as_deref()
        .ok_or("--read needs a password (--password or INSPECTA_PASSWORD)")?;

    console.login(user, password)?;
    let table = console.load(table)?;
    print!("{}", output::render(&table, format));
    console.logout();

    Ok(())
}

fn run_tui(console: Console) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(console);

    // Main loop
    let result = loop {
        if let Err(e) = terminal.draw(|frame| draw(frame, &app)) {
            break Err(e);
        }

        match handle_events(&mut app) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    Ok(())
}

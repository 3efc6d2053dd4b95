use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use ourclass::{
    api::{ClassroomApi, HttpClassroomApi},
    cli::{exit_status, Cli, Commands},
    config::Config,
    flow::{ClassInfoEntryFlow, Navigator},
    models::{strip_school_suffix, ClassInfoPayload, ClassroomReceipt, Grade},
    tui::App,
    SubmitError,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "ourclass=info");
    }

    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(suffix) = cli.suffix {
        config.school_suffix = suffix;
    }
    config.validate()?;

    let command = cli.command.unwrap_or(Commands::Tui { school: None });
    let tui_mode = matches!(command, Commands::Tui { .. });
    init_logging(&config.log_file, tui_mode);

    let api = HttpClassroomApi::new(&config).context("Failed to build HTTP client")?;

    let result = match command {
        Commands::Tui { school } => run_tui(config, Arc::new(api), school.as_deref()).await,
        Commands::Search { keyword } => search(&config, &api, &keyword).await,
        Commands::Register {
            school,
            grade,
            class_number,
        } => register(&config, &api, &school, grade, &class_number).await,
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:?}", e);
            Ok(ExitCode::from(exit_status(&e)))
        }
    }
}

/// Log to stderr and the log file; in TUI mode only to the file so the display stays intact
fn init_logging(log_file: &Path, tui_mode: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "ourclass.log".into());
    let file_appender = tracing_appender::rolling::never(directory, file_name);

    let stderr_layer = (!tui_mode).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env())
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();
}

async fn run_tui(config: Config, api: Arc<dyn ClassroomApi>, school: Option<&str>) -> Result<()> {
    info!("Starting class info form...");

    // Setup terminal for TUI mode
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, api, school);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    match result {
        Ok(_) => {
            info!("Class info form exited successfully");
            Ok(())
        }
        Err(e) => {
            error!("Class info form encountered an error: {}", e);
            Err(e)
        }
    }
}

/// Print suggestions for one keyword, as typing it in the form would show them
async fn search(config: &Config, api: &HttpClassroomApi, keyword: &str) -> Result<()> {
    let mut flow = ClassInfoEntryFlow::new(&config.school_suffix);
    let ticket = match flow.on_query_changed(keyword) {
        Some(ticket) => ticket,
        None => {
            println!("Nothing to search for");
            return Ok(());
        }
    };

    // Unlike the form, a failure here is worth reporting
    let result = api
        .search_schools(&ticket.query)
        .await
        .with_context(|| format!("School search for '{}' failed", keyword))?;
    flow.apply_search_result(ticket.seq, Ok(result));

    if !flow.suggestions_visible() {
        println!("No schools found for: {}", keyword);
        return Ok(());
    }

    println!("Found {} schools for: {}", flow.suggestions().len(), keyword);
    println!();
    println!("{:<40} {:<30}", "School", "Name to enter");
    println!("{}", "-".repeat(70));
    for school in flow.suggestions() {
        println!("{:<40} {:<30}", school, strip_school_suffix(school, flow.suffix()));
    }

    Ok(())
}

/// Prints the receipt where the form would move to the next screen
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn forward(&mut self, payload: &ClassInfoPayload, receipt: &ClassroomReceipt) {
        println!(
            "Registered {} grade {} class {} (status {})",
            payload.school_name, payload.grade, payload.class_number, receipt.status
        );
        if !receipt.body.is_null() {
            println!("{}", receipt.body);
        }
    }
}

async fn register(
    config: &Config,
    api: &HttpClassroomApi,
    school: &str,
    grade: Grade,
    class_number: &str,
) -> Result<()> {
    let mut flow = ClassInfoEntryFlow::initialize(Some(school), &config.school_suffix);
    flow.set_grade(Some(grade));
    flow.set_class_number(class_number);

    if let Err(e) = flow.submit(api, &mut PrintNavigator).await {
        if let Some(alert) = flow.alert() {
            eprintln!("{}: {}", alert.title, alert.message);
        }
        error!("Registration failed: {}", e);
        if let SubmitError::Validation(validation) = &e {
            let missing: Vec<&str> = validation.missing.iter().map(|f| f.as_str()).collect();
            eprintln!("Missing: {}", missing.join(", "));
        }
        return Err(e.into());
    }

    Ok(())
}

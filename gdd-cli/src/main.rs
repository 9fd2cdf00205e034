use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use gdd_cli::session::run_autosave;
use gdd_cli::{
    Command, EditingSession, GameFile, GatewayClient, SaveReport, SessionError, StreamOutcome,
};
use gdd_core::text::{paragraph_to_html, strip_html};
use gdd_core::{SECTIONS, Settings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

const DEFAULT_SECTION: &str = "overview";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let mut args = std::env::args().skip(1);
    let Some(game_path) = args.next() else {
        eprintln!("Usage: gdd-cli <game.toml> [section]");
        std::process::exit(2);
    };
    let section = args.next().unwrap_or_else(|| DEFAULT_SECTION.to_string());

    let game = GameFile::load(&PathBuf::from(game_path))?;
    let settings = Settings::load()?;
    let gateway_url = settings.gateway_url();
    let client = GatewayClient::new(&gateway_url)?;

    match client.health().await {
        Ok(health) => info!("Connected to gateway {} at {}", health.version, gateway_url),
        Err(e) => {
            eprintln!("Gateway at {} is not reachable: {}", gateway_url, e);
            eprintln!("Start it with `gdd-gateway` and try again.");
            std::process::exit(1);
        }
    }

    let session = EditingSession::open(
        Arc::new(client),
        game.id.clone(),
        game.context.clone(),
        &section,
        settings.editor.clone(),
    )
    .await?;

    let interrupts = Interrupts::default();
    tokio::spawn({
        let interrupts = interrupts.clone();
        async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                interrupts.interrupt();
            }
        }
    });

    let autosave_stop = CancellationToken::new();
    let autosave = tokio::spawn(run_autosave(session.clone(), autosave_stop.clone()));

    println!("Editing \"{}\" ({})", game.context.name, game.id);
    print_section(&session).await;
    println!("Type 'help' for commands.");

    run_repl(&session, &interrupts).await?;

    match session.save().await {
        Ok(SaveReport::Saved { version }) => println!("Saved (version {version})."),
        Ok(SaveReport::NothingToSave) => {}
        Err(e) => eprintln!("Final save failed: {e}"),
    }
    autosave_stop.cancel();
    let _ = autosave.await;
    if session.close().await {
        eprintln!("Exited with unsaved changes.");
    }
    // A pending blocking stdin read would keep the runtime from shutting down.
    std::process::exit(0);
}

/// Logs go nowhere unless `GDD_CLI_LOG` names a file; stdout belongs to the editor.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    match std::env::var_os("GDD_CLI_LOG") {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .init();
        }
    }
    Ok(())
}

/// Routes Ctrl-C to the running AI stream, or to the prompt when idle.
#[derive(Clone, Default)]
struct Interrupts {
    stream: Arc<Mutex<Option<CancellationToken>>>,
    shutdown: CancellationToken,
}

impl Interrupts {
    fn begin_stream(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.stream.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }

    fn end_stream(&self) {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn interrupt(&self) {
        let stream = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match stream {
            Some(token) => token.cancel(),
            None => self.shutdown.cancel(),
        }
    }
}

async fn run_repl(
    session: &Arc<EditingSession>,
    interrupts: &Interrupts,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}> ", session.section().await.slug);
        io::stdout().flush()?;

        let line = tokio::select! {
            _ = interrupts.shutdown.cancelled() => {
                println!();
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run_command(session, interrupts, command).await {
            println!("Error: {}", describe(&e));
        }
    }
    Ok(())
}

async fn run_command(
    session: &Arc<EditingSession>,
    interrupts: &Interrupts,
    command: Command,
) -> Result<(), SessionError> {
    match command {
        Command::Help => println!("{}", gdd_cli::command::HELP),
        Command::Show => print_section(session).await,
        Command::Sections => {
            let current = session.section().await.slug;
            for section in SECTIONS {
                let marker = if section.slug == current { "*" } else { " " };
                println!(
                    "{marker} {:>2}. {:<16} {}",
                    section.number, section.slug, section.title
                );
            }
        }
        Command::Models => {
            for model in session.models().await {
                let marker = if model.available { "+" } else { "-" };
                println!("{marker} {:<20} {} ({})", model.id, model.name, model.provider);
            }
            println!("(- = no API key configured)");
        }
        Command::Status => print_status(session).await,
        Command::Edit { sub_section, text } => {
            session.edit(&sub_section, paragraph_to_html(&text)).await?;
        }
        Command::Generate {
            sub_section,
            model_id,
        } => {
            let cancel = interrupts.begin_stream();
            let outcome = session
                .generate_draft(&sub_section, model_id, &cancel, print_chunk)
                .await;
            interrupts.end_stream();
            report_stream(outcome?, &format!("'accept {sub_section}' to keep it"));
        }
        Command::Accept { sub_section } => {
            session.accept_draft(&sub_section).await?;
            println!("Draft placed in {sub_section}.");
        }
        Command::Enhance(action) => {
            let cancel = interrupts.begin_stream();
            let outcome = session
                .enhance_section_draft(action, &cancel, print_chunk)
                .await;
            interrupts.end_stream();
            report_stream(outcome?, "'apply' to replace the section with it");
        }
        Command::Apply => {
            let draft = session.draft().await;
            if draft.trim().is_empty() {
                return Err(SessionError::NoDraft);
            }
            let written = session.set_all_content(&draft).await?;
            println!("Updated {written} subsection(s).");
        }
        Command::Save => report_save(session.save().await?),
        Command::Overwrite => report_save(session.save_overwrite().await?),
        Command::Reload => {
            session.reload().await?;
            print_section(session).await;
        }
        Command::Switch(slug) => {
            session.switch_section(&slug).await?;
            print_section(session).await;
        }
        Command::Quit => {}
    }
    Ok(())
}

fn print_chunk(chunk: &str) {
    print!("{chunk}");
    let _ = io::stdout().flush();
}

fn report_stream(outcome: StreamOutcome, next_step: &str) {
    match outcome {
        StreamOutcome::Completed(_) => println!("\n\nDraft ready; {next_step}."),
        StreamOutcome::Cancelled { partial } if partial.is_empty() => println!("\nCancelled."),
        StreamOutcome::Cancelled { .. } => {
            println!("\n\nStopped. The partial draft was kept; {next_step}.")
        }
    }
}

fn report_save(report: SaveReport) {
    match report {
        SaveReport::Saved { version } => println!("Saved (version {version})."),
        SaveReport::NothingToSave => println!("Nothing to save."),
    }
}

fn describe(error: &SessionError) -> String {
    match error {
        SessionError::Conflict(message) => format!(
            "{message}. Someone else saved this section; 'reload' to take their version or 'overwrite' to keep yours."
        ),
        other => other.to_string(),
    }
}

async fn print_section(session: &EditingSession) {
    let section = session.section().await;
    let content = session.content().await;
    println!("\n{}. {}", section.number, section.title);
    for sub in section.sub_sections {
        let text = content
            .get(sub.id)
            .map(|html| strip_html(html))
            .filter(|text| !text.is_empty());
        println!("\n[{}] {}", sub.id, sub.title);
        match text {
            Some(text) => println!("{text}"),
            None => println!("  ({})", sub.placeholder),
        }
    }
    println!();
    print_status(session).await;
}

async fn print_status(session: &EditingSession) {
    let editor = session
        .last_edited_by()
        .await
        .map(|user| format!(", last edited by {user}"))
        .unwrap_or_default();
    println!(
        "[{}] version {}{}",
        session.state().await,
        session.version().await,
        editor
    );

    match session.autosave_deadline().await {
        Some(deadline) => {
            let wait = deadline.saturating_duration_since(tokio::time::Instant::now());
            println!("Autosave in {}s.", wait.as_secs());
        }
        None if session.has_unsaved_changes().await => {
            println!("Autosave is paused; 'save', 'overwrite' or 'reload'.");
        }
        None => {}
    }
}

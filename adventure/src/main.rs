//! Solo text adventure in the terminal.
//!
//! A line-oriented game loop: the rules engine resolves each command, then a
//! GM narrates it and the companion offers a suggestion. Narration uses an
//! OpenAI-compatible model when `OPENAI_API_KEY` is set and canned lines
//! otherwise.
//!
//! ```bash
//! cargo run -p adventure -- --new --campaign lost_crypt --seed 7
//! ```

mod prompt;
mod setup;
mod ui;

use adventure_core::format::{combat_status_lines, format_exits, status_lines};
use adventure_core::persist::DEFAULT_SAVE_FILE;
use adventure_core::roster::DEFAULT_CHARACTERS_DIR;
use adventure_core::{
    GameSession, GearReply, Narrator, OfflineNarrator, RngRoller, Roller, Roster, SessionConfig,
    TurnReport,
};
use clap::Parser;
use llm::LlmClient;
use prompt::Console;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ui::{paint, print_lines, show_narration, Tone};

const EXPLORATION_PROMPT: &str =
    "Action (talk/search/loot/move/rest [N]/use/gear/inventory/help/quit): ";
const COMBAT_PROMPT: &str =
    "Combat action (attack/defend/special/cast/use/gear/inventory/help/quit): ";

#[derive(Parser, Debug)]
#[command(name = "adventure")]
#[command(about = "Solo text adventure with an optional AI game master")]
struct Cli {
    /// Save file to resume from and write to
    #[arg(long, default_value = DEFAULT_SAVE_FILE)]
    save: PathBuf,

    /// Directory of saved characters
    #[arg(long, default_value = DEFAULT_CHARACTERS_DIR)]
    characters_dir: PathBuf,

    /// Campaign id for a new game (skips the campaign prompt)
    #[arg(long)]
    campaign: Option<String>,

    /// Start a new game even if a save exists
    #[arg(long)]
    new: bool,

    /// Use canned narration even when an API key is configured
    #[arg(long)]
    offline: bool,

    /// Seed the dice for a reproducible session
    #[arg(long)]
    seed: Option<u64>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_narrator(offline: bool) -> Box<dyn Narrator> {
    if offline {
        println!("Offline mode. Running with stub GM/companion.");
        return Box::new(OfflineNarrator);
    }
    match LlmClient::from_env() {
        Ok(client) => {
            debug!(model = %client.config().model, "narration enabled");
            Box::new(client)
        }
        Err(e) => {
            debug!(error = %e, "no language model configured");
            println!("OpenAI API key not found. Running with stub GM/companion.");
            Box::new(OfflineNarrator)
        }
    }
}

fn build_roller(seed: Option<u64>) -> Box<dyn Roller + Send> {
    match seed {
        Some(seed) => Box::new(RngRoller::seeded(seed)),
        None => Box::new(RngRoller::from_entropy()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let config = SessionConfig::new()
        .with_save_path(cli.save)
        .with_characters_dir(cli.characters_dir);
    let mut console = Console::stdio();

    let wants_resume = !cli.new
        && GameSession::save_exists(&config).await
        && console.yes_no("Found a saved game. Resume?")?.unwrap_or(false);

    if wants_resume {
        let resumed = GameSession::resume(
            config.clone(),
            build_narrator(cli.offline),
            build_roller(cli.seed),
        )
        .await;
        match resumed {
            Ok(session) => return play(session, &mut console).await,
            Err(e) => {
                warn!(error = %e, "failed to resume");
                println!(
                    "{}",
                    paint(&format!("Could not load save ({e}). Starting a new game."), Tone::Warning)
                );
            }
        }
    }

    let mut roller = build_roller(cli.seed);
    let roster = Roster::new(config.characters_dir.clone());
    let Some(state) =
        setup::new_game(&mut console, &roster, cli.campaign.as_deref(), roller.as_mut()).await?
    else {
        return Ok(());
    };
    let session = GameSession::new(state, build_narrator(cli.offline), roller, config);
    session.save().await?;
    play(session, &mut console).await
}

async fn play<R: BufRead, W: Write>(
    mut session: GameSession,
    console: &mut Console<R, W>,
) -> anyhow::Result<()> {
    loop {
        if let Some(narration) = session.narrate_pending().await {
            show_narration(&narration);
        }
        if session.is_over() {
            for message in session.finish().await? {
                println!("{}", paint(&message, Tone::Good));
            }
            println!("Game over.");
            return Ok(());
        }

        println!();
        let state = session.state();
        if session.in_combat() {
            print_lines(&combat_status_lines(state));
        } else {
            print_lines(&status_lines(state));
            println!("{}", format_exits(state));
        }
        let companion = state.companion().map(|c| c.name.clone());
        if let (Some(name), Some(line)) = (companion, session.companion_suggestion().await) {
            println!("{}", paint(&format!("{name} suggests: {line}"), Tone::Companion));
        }

        let prompt = if session.in_combat() {
            COMBAT_PROMPT
        } else {
            EXPLORATION_PROMPT
        };
        let Some(raw) = console.ask(prompt)? else {
            session.save().await?;
            return Ok(());
        };

        match session.handle(&raw, console).await? {
            TurnReport::Info(lines) => print_lines(&lines),
            TurnReport::Rejected(message) => println!("{}", paint(&message, Tone::Warning)),
            TurnReport::Resolved(_) => {}
            TurnReport::OpenGear => gear_menu(&mut session, console).await?,
            TurnReport::Quit => return Ok(()),
        }
    }
}

async fn gear_menu<R: BufRead, W: Write>(
    session: &mut GameSession,
    console: &mut Console<R, W>,
) -> anyhow::Result<()> {
    println!();
    print_lines(&session.gear_overview());
    println!("Gear commands: show, equip <item>, unequip <slot>, back");
    while let Some(raw) = console.ask("Gear> ")? {
        match session.gear(&raw) {
            GearReply::Back => break,
            GearReply::Lines(lines) => print_lines(&lines),
            GearReply::Changed(message) => println!("{}", paint(&message, Tone::Good)),
            GearReply::Refused(message) => println!("{}", paint(&message, Tone::Warning)),
        }
    }
    if let Err(e) = session.close_gear().await {
        warn!(error = %e, "failed to save after gear changes");
    }
    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use matchup_helper_lib::config::{env_lookup, resolve_data_dir, AppConfig};
use matchup_helper_lib::display::{ConsoleView, MatchupCard, MatchupView, PortraitCache};
use matchup_helper_lib::error::AppError;
use matchup_helper_lib::lcu::LcuClient;
use matchup_helper_lib::logging::{export_logs, init_logging, LiveLog};
use matchup_helper_lib::sections;
use matchup_helper_lib::sheets::{
    Columns, CredentialStore, FileCredentialStore, GoogleSheetsClient, MatchupRepository,
    RetryPolicy, StaticCredentialStore,
};
use matchup_helper_lib::types::RenderableMatchup;
use matchup_helper_lib::watcher::{missing_matchup_message, ClientPoller, PollerCommand};

const CREDENTIALS_HINT: &str =
    "Set api_key in config.json or SHEETS_API_KEY, or provide a token file (--token for a one-off).";

#[derive(Parser)]
#[command(version, about = "Champion matchup notes during League of Legends champion select")]
struct Cli {
    /// Application data directory (config/, logs/, portraits/)
    #[arg(long, env = "MATCHUP_HELPER_HOME")]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    sheet_id: Option<String>,

    #[arg(long)]
    api_key: Option<String>,

    /// Bearer token to use instead of the token file
    #[arg(long)]
    token: Option<String>,

    #[arg(long)]
    league_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the League client and show matchups during champ select (default)
    Watch,
    /// Print every champion in the sheet
    List,
    /// Print the matchup card for one champion
    Show { champion: String },
    /// Split a text file into gameplay sections
    Parse { file: PathBuf },
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(id) = &self.sheet_id {
            config.sheet_id = id.clone();
        }
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(path) = &self.league_path {
            config.league_path = Some(path.clone());
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    if let Some(Commands::Parse { file }) = &cli.command {
        return parse_file(file);
    }

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| resolve_data_dir(env_lookup));
    let live_log = init_logging(&data_dir)?;
    let config_dir = data_dir.join("config");

    let mut config = AppConfig::load_from(&config_dir)?;
    config.apply_env(env_lookup);
    cli.apply_overrides(&mut config);
    let config = Arc::new(config);
    tracing::info!("Data directory: {}", data_dir.display());

    let repository = Arc::new(build_repository(&config, &config_dir, cli.token.clone())?);

    match cli.command {
        Some(Commands::List) => {
            let names = repository.get_all_champion_names().await;
            report_configuration_error(&repository);
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        Some(Commands::Show { champion }) => {
            if let Err(e) = repository.try_refresh().await {
                if e.is_configuration() {
                    eprintln!("Google Sheets configuration error: {}", e);
                    eprintln!("{}", CREDENTIALS_HINT);
                } else {
                    eprintln!("Failed to load the matchup sheet: {}", e);
                }
            }
            let item = match repository.get_matchup(&champion) {
                Some(matchup) => RenderableMatchup::Structured(matchup),
                None => RenderableMatchup::message(champion.trim(), missing_matchup_message(champion.trim())),
            };
            print!(
                "{}",
                MatchupCard::from_renderable(&item, &config.ddragon_version).render_text()
            );
            Ok(())
        }
        Some(Commands::Parse { .. }) => Ok(()),
        Some(Commands::Watch) | None => watch(config, repository, live_log, &data_dir).await,
    }
}

fn build_repository(
    config: &AppConfig,
    config_dir: &Path,
    token: Option<String>,
) -> Result<MatchupRepository, AppError> {
    let credentials: Arc<dyn CredentialStore> = match token {
        Some(token) => Arc::new(StaticCredentialStore(Some(token))),
        None => Arc::new(FileCredentialStore::new(config.token_path(config_dir))),
    };
    let policy = RetryPolicy {
        max_retries: config.max_retries,
        min_request_interval: config.min_request_interval(),
        ..RetryPolicy::default()
    };
    let client = GoogleSheetsClient::new(
        config.sheet_id.clone(),
        config.sheet_range.clone(),
        config.api_key.clone(),
        credentials,
        policy,
    )?;
    let columns = Columns {
        runes: config.runes_column,
        summoner_spell: config.summoner_spell_column,
        ..Columns::default()
    };
    Ok(MatchupRepository::new(Arc::new(client), columns))
}

fn report_configuration_error(repository: &MatchupRepository) {
    if let Some(err) = repository.take_configuration_error() {
        eprintln!("Google Sheets configuration error: {}", err);
        eprintln!("{}", CREDENTIALS_HINT);
    }
}

fn parse_file(file: &Path) -> Result<(), AppError> {
    let text = std::fs::read_to_string(file)?;
    let parsed = sections::parse(&text);
    for (heading, body) in [
        ("Early Game", &parsed.early_game),
        ("How to Trade", &parsed.how_to_trade),
        ("What to Watch Out For", &parsed.what_to_watch_out_for),
        ("Tips", &parsed.tips),
    ] {
        println!("## {}\n{}\n", heading, body);
    }
    Ok(())
}

async fn watch(
    config: Arc<AppConfig>,
    repository: Arc<MatchupRepository>,
    live_log: LiveLog,
    data_dir: &Path,
) -> Result<(), AppError> {
    let oracle = Arc::new(LcuClient::new(config.league_path.clone())?);

    let mut view = ConsoleView::new(config.ddragon_version.clone());
    if config.download_portraits {
        match PortraitCache::new(data_dir.join("portraits")) {
            Ok(cache) => view = view.with_portraits(Arc::new(cache)),
            Err(e) => tracing::warn!("[Portraits] Disabled: {}", e),
        }
    }
    let view_handle = view.handle();
    let view: Arc<dyn MatchupView> = Arc::new(view);

    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let poller = ClientPoller::new(oracle, repository, view.clone(), config);
    let task = poller.spawn(rx, cancel.clone());

    println!("Commands: <champion> to inspect, auto, refresh, logs, quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        let command = match input.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "auto" => PollerCommand::Resume,
            "refresh" => PollerCommand::Refresh,
            "logs" => {
                match export_logs(&live_log, &data_dir.join("logs").join("exports")) {
                    Ok(path) => println!("Logs saved to {} and copied to clipboard", path.display()),
                    Err(e) => eprintln!("Failed to export logs: {}", e),
                }
                continue;
            }
            _ => PollerCommand::Inspect(input.to_string()),
        };
        if tx.send(command).await.is_err() {
            break;
        }
    }

    let _ = tx.send(PollerCommand::Shutdown).await;
    cancel.cancel();
    view_handle.close();
    if let Err(e) = task.await {
        tracing::error!("[LCU Watcher] Poller task failed: {}", e);
    }
    Ok(())
}

//! `movetree` command line: import, inspect and annotate stored games.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use movetree::{collect_dirty, parse_pgn_games, AnnotationKey, Game};
use movetree_studio::config;
use movetree_studio::persistence::{generate_game_id, GameRepository, JsonGameStore};
use movetree_studio::session::{MovePath, SessionHandle, SessionManager};
use movetree_studio::sync::Synchronizer;

#[derive(Parser)]
#[command(name = "movetree", about = "Annotated chess move trees", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store every game of a PGN file.
    Import {
        file: PathBuf,
        /// Record id; only valid for a file holding a single game.
        #[arg(long)]
        id: Option<String>,
    },
    /// Print a stored game as PGN.
    Export { id: String },
    /// List stored games, most recently updated first.
    List,
    /// Parse a PGN file without storing it and summarize each game.
    Check { file: PathBuf },
    /// Delete a stored game.
    Delete { id: String },
    /// Set an annotation on a stored game and sync it.
    Annotate {
        id: String,
        /// Comma-separated SAN path of the move; omit for the start position.
        #[arg(long, value_delimiter = ',')]
        path: Vec<String>,
        /// Comma-separated child indices instead of SAN: 0 is the mainline
        /// move, 1 the first variation. Reaches branches repeating a move.
        #[arg(long, value_delimiter = ',', conflicts_with = "path")]
        at: Option<Vec<usize>>,
        /// Key name, e.g. commentAfter, csl, cal, eval or dojoComment.
        key: String,
        value: String,
    },
    /// Accept the suggested line starting at a move and sync it.
    Accept {
        id: String,
        #[arg(long, value_delimiter = ',')]
        path: Vec<String>,
        #[arg(long, value_delimiter = ',', conflicts_with = "path")]
        at: Option<Vec<usize>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with span durations
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = JsonGameStore::new(config::get_games_dir());
    tracing::debug!("Using games directory: {}", store.dir().display());
    let limits = config::parse_limits();
    let sync = Synchronizer::new(store, limits);

    match cli.command {
        Commands::Import { file, id } => {
            let text = read_file(&file)?;
            let games = parse_pgn_games(&text, limits)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            if id.is_some() && games.len() != 1 {
                bail!("--id needs a file with exactly one game, found {}", games.len());
            }
            for game in &games {
                let game_id = id.clone().unwrap_or_else(generate_game_id);
                sync.save(&game_id, game).await?;
                println!("{game_id}");
            }
        }
        Commands::Export { id } => {
            let game = sync.load(&id).await?;
            print!("{}", game.to_pgn());
        }
        Commands::List => {
            for record in sync.repository().list_games().await? {
                let title = ["White", "Black", "Event"]
                    .iter()
                    .filter_map(|tag| record.tags.get(tag))
                    .collect::<Vec<_>>()
                    .join(" / ");
                println!("{}\t{}\t{}", record.id, record.updated_at, title);
            }
        }
        Commands::Check { file } => {
            let text = read_file(&file)?;
            let games = parse_pgn_games(&text, limits)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            for (index, game) in games.iter().enumerate() {
                println!("{}", summarize(index + 1, game));
            }
        }
        Commands::Delete { id } => {
            if !sync.repository().delete_game(&id).await? {
                bail!("no game with id {id}");
            }
        }
        Commands::Annotate {
            id,
            path,
            at,
            key,
            value,
        } => {
            let manager = SessionManager::new();
            let handle = sync.open(&manager, &id).await?;
            let path = locate(&handle, path, at).await?;
            handle
                .set_annotation(path, AnnotationKey::parse(&key), &value)
                .await?;
            let report = sync.sync(&handle).await?;
            println!("{} annotation(s) synced", report.cleared);
            manager.close(&id).await;
        }
        Commands::Accept { id, path, at } => {
            let manager = SessionManager::new();
            let handle = sync.open(&manager, &id).await?;
            let path = locate(&handle, path, at).await?;
            let visited = handle.accept_suggestion(path).await?;
            sync.sync(&handle).await?;
            println!("{visited} move(s) accepted");
            manager.close(&id).await;
        }
    }

    Ok(())
}

fn read_file(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

/// `--path ""` yields a single empty segment.
fn clean_path(path: Vec<String>) -> Vec<String> {
    path.into_iter()
        .map(|san| san.trim().to_string())
        .filter(|san| !san.is_empty())
        .collect()
}

/// Child-index path for `--at`, or for the first line matching `--path`.
async fn locate(
    handle: &SessionHandle,
    path: Vec<String>,
    at: Option<Vec<usize>>,
) -> anyhow::Result<MovePath> {
    if let Some(at) = at {
        return Ok(at);
    }
    let sans = clean_path(path);
    let snapshot = handle.get_snapshot().await?;
    snapshot
        .locate(&sans)
        .with_context(|| format!("no move at path {}", sans.join(",")))
}

fn summarize(number: usize, game: &Game) -> String {
    let tree = game.tree();
    let mainline = tree.mainline().count();
    let variations: usize = tree
        .preorder()
        .map(|(_, node)| node.variations().len())
        .sum::<usize>()
        + tree
            .get(tree.root())
            .map_or(0, |root| root.variations().len());
    let result = game.result().map_or("*", |r| r.as_str());
    format!(
        "game {number}: {} moves, {mainline} on the mainline, {variations} variation(s), {} unsaved annotation(s), result {result}",
        tree.len(),
        collect_dirty(tree).len(),
    )
}

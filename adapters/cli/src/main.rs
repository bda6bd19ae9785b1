#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for Pipeline Defence: headless runs, online play
//! against the scoring service, and path or layout inspection.

mod autoplace;
mod config;
mod layout_transfer;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pipeline_defence_core::{CellCoord, GridSize, RunResult, RunTuning, Seed, TowerKind};
use pipeline_defence_scoring::{
    fetch_leaderboard, log_visit_best_effort, start_run, submit_result, HttpScoringClient,
    LeaderboardEntry, ScoringService, DEFAULT_BUILD_HASH,
};
use pipeline_defence_simulation::{
    Session, SessionConfig, DEFAULT_TILE_LENGTH, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
};
use pipeline_defence_system_path_generation::generate;
use pipeline_defence_system_run_controller::format_clock;
use pipeline_defence_world::query;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::layout_transfer::{LayoutTower, TowerLayout};

#[derive(Parser)]
#[command(name = "pipeline-defence")]
#[command(about = "Headless tower defence runs and scoring service client")]
struct Cli {
    /// TOML file overriding tuning knobs
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Raise log verbosity (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one offline game and print the result
    Simulate {
        /// Run seed
        #[arg(long)]
        seed: u32,
        #[command(flatten)]
        grid: GridArgs,
        /// Tower layout string; auto-placement is used when omitted
        #[arg(long)]
        layout: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a run on the scoring service, play it, and submit the result
    Play {
        /// Scoring service base URL
        #[arg(long)]
        api: String,
        /// Nickname shown on the leaderboard
        #[arg(long)]
        nickname: String,
        /// Device identifier; a random one is used when omitted
        #[arg(long)]
        device_id: Option<String>,
        /// Build identifier sent with the result
        #[arg(long, default_value = DEFAULT_BUILD_HASH)]
        build_hash: String,
        #[command(flatten)]
        grid: GridArgs,
        /// Tower layout string; auto-placement is used when omitted
        #[arg(long)]
        layout: Option<String>,
    },
    /// Draw the path generated for a seed
    Path {
        /// Run seed
        #[arg(long)]
        seed: u32,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Print the auto-placement layout for a seed as a transfer string
    Layout {
        /// Run seed
        #[arg(long)]
        seed: u32,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Show the best score per nickname
    Leaderboard {
        /// Scoring service base URL
        #[arg(long)]
        api: String,
        /// Number of rows, clamped to 1..=200
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show the active leaderboard season
    Season {
        /// Scoring service base URL
        #[arg(long)]
        api: String,
    },
}

/// Viewport the grid is cut from; partial tiles at the edges are dropped.
#[derive(Args, Clone, Copy)]
struct GridArgs {
    /// Viewport width in world units
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH)]
    viewport_width: f32,
    /// Viewport height in world units
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_HEIGHT)]
    viewport_height: f32,
    /// Tile edge length in world units
    #[arg(long, default_value_t = DEFAULT_TILE_LENGTH)]
    tile_length: f32,
}

impl Default for GridArgs {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            tile_length: DEFAULT_TILE_LENGTH,
        }
    }
}

impl GridArgs {
    fn grid(self) -> GridSize {
        GridSize::from_viewport(self.viewport_width, self.viewport_height, self.tile_length)
    }
}

/// Entry point for the Pipeline Defence command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let tuning = config::load_tuning(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            seed,
            grid,
            layout,
            json,
        } => {
            let result = play_offline(Seed::new(seed), grid, tuning, layout.as_deref())?;
            print_result(&result, json)
        }
        Commands::Play {
            api,
            nickname,
            device_id,
            build_hash,
            grid,
            layout,
        } => play_online(
            &api,
            &nickname,
            device_id,
            &build_hash,
            grid,
            tuning,
            layout.as_deref(),
        ),
        Commands::Path { seed, grid } => {
            let path = generate(Seed::new(seed), grid.grid(), &tuning.path)?;
            print!("{}", render_path(&path, grid.grid()));
            Ok(())
        }
        Commands::Layout { seed, grid } => {
            let path = generate(Seed::new(seed), grid.grid(), &tuning.path)?;
            let cells = autoplace::auto_layout(
                Seed::new(seed),
                &path,
                grid.grid(),
                tuning.run.starting_credits,
                tuning.towers.placement_cost,
            );
            let layout = TowerLayout {
                grid: grid.grid(),
                tile_length: grid.tile_length,
                towers: cells
                    .into_iter()
                    .map(|cell| LayoutTower {
                        kind: TowerKind::Prover,
                        cell,
                    })
                    .collect(),
            };
            println!("{}", layout.encode()?);
            Ok(())
        }
        Commands::Leaderboard { api, limit } => {
            let client = HttpScoringClient::new(&api);
            let rows = fetch_leaderboard(&client, limit).context("failed to fetch leaderboard")?;
            for (rank, row) in rows.iter().enumerate() {
                println!("{}", format_leaderboard_row(rank + 1, row));
            }
            Ok(())
        }
        Commands::Season { api } => {
            let season = HttpScoringClient::new(&api)
                .season()
                .context("failed to fetch the active season")?;
            println!(
                "season {}: {} .. {}",
                season.id, season.starts_at, season.ends_at
            );
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn play_online(
    api: &str,
    nickname: &str,
    device_id: Option<String>,
    build_hash: &str,
    grid: GridArgs,
    tuning: RunTuning,
    layout: Option<&str>,
) -> Result<()> {
    let client = HttpScoringClient::new(api);
    let device_id = device_id.unwrap_or_else(|| format!("cli-{:016x}", rand::random::<u64>()));

    let _ = log_visit_best_effort(&client, &device_id, None);
    let ticket = start_run(&client, &device_id, nickname).context("service unreachable")?;
    info!(run_id = %ticket.run_id, season = ticket.season, "run issued");

    let result = play_offline(ticket.seed, grid, tuning, layout)?;
    print_result(&result, false)?;

    if submit_result(&client, &ticket, result, build_hash) {
        println!("result recorded for run {}", ticket.run_id);
    } else {
        println!("result could not be recorded");
    }
    Ok(())
}

fn play_offline(
    seed: Seed,
    grid: GridArgs,
    tuning: RunTuning,
    layout: Option<&str>,
) -> Result<RunResult> {
    let layout = layout
        .map(TowerLayout::decode)
        .transpose()
        .context("invalid layout string")?;

    let mut config = SessionConfig::new(seed);
    config.grid = grid.grid();
    config.tile_length = grid.tile_length;
    if let Some(layout) = &layout {
        config.grid = layout.grid;
        config.tile_length = layout.tile_length;
    }
    let placement_cost = tuning.towers.placement_cost;
    config.tuning = tuning;

    let mut session = Session::new(config).context("failed to start the run")?;
    let cells: Vec<CellCoord> = match layout {
        Some(layout) => layout.towers.iter().map(|tower| tower.cell).collect(),
        None => {
            let Some(path) = query::path(session.world()) else {
                bail!("run started without a path");
            };
            autoplace::auto_layout(
                seed,
                path.cells(),
                query::grid(session.world()),
                session.snapshot().credits,
                placement_cost,
            )
        }
    };

    for cell in cells {
        if let Err(reason) = session.place_tower(TowerKind::Prover, cell) {
            warn!(
                column = cell.column(),
                row = cell.row(),
                ?reason,
                "tower placement refused"
            );
        }
    }

    debug!(phase = ?session.wave_phase(), "towers placed");
    Ok(session.run_to_completion())
}

fn print_result(result: &RunResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(result)?);
    } else {
        let duration = Duration::from_millis(result.duration_ms);
        println!(
            "score {} | wave {} | time {}",
            result.score,
            result.wave,
            format_clock(duration)
        );
    }
    Ok(())
}

/// One leaderboard line; wave and time show `-` when the service omits them.
fn format_leaderboard_row(rank: usize, entry: &LeaderboardEntry) -> String {
    let wave = entry
        .wave
        .map_or_else(|| "-".to_owned(), |wave| wave.to_string());
    let time = entry.duration_ms.map_or_else(
        || "-".to_owned(),
        |ms| format_clock(Duration::from_millis(ms)),
    );
    format!(
        "{rank:>3}. {:<24} {:>8}  wave {wave:>3}  {time:>5}",
        entry.nickname, entry.score
    )
}

/// Draws the grid with `S` at the entry, `E` at the exit and `#` on the path.
fn render_path(path: &[CellCoord], grid: GridSize) -> String {
    let mut rows: Vec<Vec<char>> = (0..grid.rows())
        .map(|_| vec!['.'; grid.columns() as usize])
        .collect();
    let last = path.len().saturating_sub(1);
    for (index, cell) in path.iter().enumerate() {
        let glyph = match index {
            0 => 'S',
            i if i == last => 'E',
            _ => '#',
        };
        if let Some(slot) = rows
            .get_mut(cell.row() as usize)
            .and_then(|row| row.get_mut(cell.column() as usize))
        {
            *slot = glyph;
        }
    }

    let mut out = String::with_capacity(rows.len() * (grid.columns() as usize + 1));
    for row in rows {
        out.extend(row);
        out.push('\n');
    }
    out
}

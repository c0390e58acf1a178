//! Touchline - Unified CLI
//!
//! Tactical-board match sessions with a host-free rasterizer, exercised
//! end to end from the command line.

#![warn(missing_docs)]

mod backend;
mod board;
mod capture;
mod cli;
mod events;
mod session;
mod share;
mod workflow;

use anyhow::Result;
use backend::{BufferBackend, FileSink};
use board::{BoardGeometry, Point};
use capture::CapturePipeline;
use clap::Parser;
use cli::{Cli, Command};
use session::MatchSession;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Demo {
            out_dir,
            players,
            ally,
            opponent,
        } => run_demo(out_dir, players, ally, opponent).await,
        Command::Share { players } => {
            println!("{}", share::encode_players(&players));
            Ok(())
        }
        Command::Roster { query } => {
            for name in share::decode_players(&query)? {
                println!("{name}");
            }
            Ok(())
        }
    }
}

/// Plays a short scripted match and exports the record.
#[instrument(skip_all, fields(players = players.len()))]
async fn run_demo(
    out_dir: std::path::PathBuf,
    players: Vec<String>,
    ally: String,
    opponent: String,
) -> Result<()> {
    info!("Starting demonstration match");

    let pipeline = CapturePipeline::new(
        Box::new(BufferBackend::new()),
        Box::new(FileSink::new(&out_dir)),
    );
    let mut session = MatchSession::new(pipeline);
    session.set_geometry(BoardGeometry {
        origin: Point::default(),
        court_width: 330.0,
        court_height: 480.0,
        bench_width: 330.0,
        bench_origin_y: 420.0,
    });

    let mut ids = Vec::with_capacity(players.len());
    for name in &players {
        session.open_add_player();
        ids.push(session.confirm_add_player(name)?);
    }
    info!(roster = session.roster().len(), "roster assembled");

    session.start_match()?;
    session.confirm_ally_name(&ally)?;
    session.confirm_opponent_name(&opponent).await?;

    if let Some(&scorer) = ids.first() {
        session.record_goal()?;
        session.select_goal_scorer(scorer)?;
    }
    session.record_lost_point()?;

    if ids.len() >= 2 {
        session.begin_substitution()?;
        session.select_substitution_player(ids[0])?;
        session.select_substitution_player(ids[1])?;
    }

    session.end_first_half().await?;
    session.confirm_second_half_start().await?;

    let (got, lost) = session.score();
    info!(got, lost, "entering full time");

    let filename = session.end_match().await?;
    println!("{}", out_dir.join(&filename).display());
    println!("share: {}", session.share_query());

    Ok(())
}

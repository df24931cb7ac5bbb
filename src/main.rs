mod board;
mod config;
mod game;
mod input;
mod play;
mod snake;
mod term;

use std::fs::File;
use std::io::{self, IsTerminal};
use std::sync::Mutex;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::game::Game;
use crate::input::{CrosstermKeys, ReaderKeys};
use crate::term::{TermGuard, TermRenderer};

// The terminal belongs to the game, so logs go to a file.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let writer = match File::create(config::log_file()) {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(_) => BoxMakeWriter::new(io::sink),
    };

    if config::json_logs() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let _ = term::restore();
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();

    let tick = config::tick_interval();
    info!(width = config::BOARD_WIDTH, height = config::BOARD_HEIGHT, ?tick, "starting");

    let (reason, score, length) = {
        let _term = TermGuard::acquire().context("failed to set up the terminal")?;
        // Keys piped into stdin are read as plain characters.
        let keys = if io::stdin().is_terminal() {
            input::spawn(CrosstermKeys, config::INPUT_QUEUE_CAPACITY)
        } else {
            input::spawn(ReaderKeys::new(io::stdin()), config::INPUT_QUEUE_CAPACITY)
        }
        .context("failed to start the input thread")?;

        let mut game = Game::new(config::BOARD);
        let mut renderer = TermRenderer::stdout();
        let reason = play::run(&mut game, keys, &mut renderer, tick).await;

        // Leave the summary up for a moment before handing the terminal back.
        tokio::time::sleep(config::summary_delay()).await;
        (reason, game.score(), game.snake().len())
    };

    // The input thread may still be blocked on a read; exiting ends it.
    info!(score, length, ?reason, "exiting");
    println!("Final score: {score}");
    Ok(())
}

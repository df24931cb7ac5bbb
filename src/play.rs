use std::io;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::game::{EndReason, Game, Snapshot};
use crate::input::{Command, Key};

/// Draws frames. The loop calls `draw` after every tick that leaves the game
/// running and `draw_summary` exactly once when it ends.
pub trait Renderer {
    fn draw(&mut self, frame: &Snapshot) -> io::Result<()>;
    fn draw_summary(&mut self, frame: &Snapshot) -> io::Result<()>;
}

/// The loop's clock: first tick one `tick` after now, missed ticks dropped.
fn ticker(tick: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Runs the game until it ends, merging keys from `keys` with a fixed `tick`.
///
/// Keys are applied between ticks, never during one, and every tick performs
/// exactly one step. Ticks missed while the loop was busy are skipped rather
/// than replayed. If the key queue closes the game carries on with ticks alone.
/// A frame that fails to draw is logged and the game goes on.
pub async fn run<R: Rng, D: Renderer>(
    game: &mut Game<R>,
    mut keys: mpsc::Receiver<Key>,
    renderer: &mut D,
    tick: Duration,
) -> EndReason {
    let mut interval = ticker(tick);
    let mut input_open = true;
    let mut ticks: u64 = 0;

    if let Err(e) = renderer.draw(&game.snapshot()) {
        warn!(error = %e, "failed to draw frame");
    }

    let reason = loop {
        if let Some(reason) = game.end_reason() {
            break reason;
        }

        tokio::select! {
            key = keys.recv(), if input_open => match key {
                Some(key) => match Command::from_key(key) {
                    Some(Command::Turn(dir)) => {
                        let accepted = game.turn(dir);
                        trace!(?dir, accepted, "turn");
                    }
                    Some(Command::Quit) => {
                        info!("quit requested");
                        game.quit();
                    }
                    None => trace!(?key, "ignored key"),
                },
                None => {
                    debug!("input queue closed, running on ticks alone");
                    input_open = false;
                }
            },
            _ = interval.tick() => {
                ticks += 1;
                game.step();
                if !game.is_over() {
                    if let Err(e) = renderer.draw(&game.snapshot()) {
                        warn!(error = %e, ticks, "failed to draw frame");
                    }
                }
            }
        }
    };

    info!(score = game.score(), ?reason, ticks, "game over");
    if let Err(e) = renderer.draw_summary(&game.snapshot()) {
        warn!(error = %e, "failed to draw summary");
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Direction, Point};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TICK: Duration = Duration::from_millis(150);

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Snapshot>,
        summary: Option<Snapshot>,
    }

    impl Renderer for Recorder {
        fn draw(&mut self, frame: &Snapshot) -> io::Result<()> {
            assert!(self.summary.is_none(), "frame drawn after the summary");
            self.frames.push(frame.clone());
            Ok(())
        }

        fn draw_summary(&mut self, frame: &Snapshot) -> io::Result<()> {
            assert!(self.summary.is_none(), "summary drawn twice");
            self.summary = Some(frame.clone());
            Ok(())
        }
    }

    fn new_game() -> Game<StdRng> {
        Game::with_rng(Board::new(40, 20), StdRng::seed_from_u64(5))
    }

    async fn play(keys: &[Key], keep_input_open: bool) -> (EndReason, Recorder, Duration) {
        let (tx, rx) = mpsc::channel(10);
        for key in keys {
            tx.send(*key).await.unwrap();
        }
        let _tx = if keep_input_open { Some(tx) } else { None };

        let mut game = new_game();
        let mut recorder = Recorder::default();
        let start = Instant::now();
        let reason = run(&mut game, rx, &mut recorder, TICK).await;
        (reason, recorder, start.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn quit_ends_without_stepping() {
        let (reason, recorder, elapsed) = play(&[Key::Char('Q')], true).await;

        assert_eq!(reason, EndReason::Quit);
        assert_eq!(recorder.frames.len(), 1);
        assert!(elapsed < TICK);

        let summary = recorder.summary.unwrap();
        assert!(summary.game_over);
        assert_eq!(summary.body, recorder.frames[0].body);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_into_the_right_wall_one_step_per_tick() {
        let (reason, recorder, elapsed) = play(&[], true).await;

        assert_eq!(reason, EndReason::Wall);
        // Initial frame plus the 19 moves from x=20 to x=39; the 20th tick crashes.
        assert_eq!(recorder.frames.len(), 20);
        for (i, frame) in recorder.frames.iter().enumerate() {
            assert_eq!(frame.head(), Some(Point::new(20 + i as i32, 10)));
        }
        assert!(elapsed >= TICK * 20 && elapsed < TICK * 21);

        let summary = recorder.summary.unwrap();
        assert_eq!(summary.head(), Some(Point::new(39, 10)));
        assert_eq!(summary.end, Some(EndReason::Wall));
    }

    #[tokio::test(start_paused = true)]
    async fn turn_applies_before_the_next_tick() {
        let (reason, recorder, _) = play(&[Key::Char('w')], true).await;

        assert_eq!(reason, EndReason::Wall);
        assert_eq!(recorder.frames[1].head(), Some(Point::new(20, 9)));
        assert_eq!(recorder.frames[1].direction, Direction::Up);
        assert_eq!(recorder.summary.unwrap().head(), Some(Point::new(20, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn reversal_and_unknown_keys_are_ignored() {
        let (reason, recorder, _) =
            play(&[Key::Char('a'), Key::Arrow(Direction::Left), Key::Char('x')], true).await;

        assert_eq!(reason, EndReason::Wall);
        assert_eq!(recorder.summary.unwrap().head(), Some(Point::new(39, 10)));
    }

    #[tokio::test(start_paused = true)]
    async fn every_pending_key_lands_before_the_step() {
        // Up then Left: the first step heads straight into the neck.
        let (reason, recorder, elapsed) = play(&[Key::Char('w'), Key::Char('a')], true).await;

        assert_eq!(reason, EndReason::SelfCollision);
        assert_eq!(recorder.frames.len(), 1);
        assert_eq!(elapsed, TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_input_keeps_the_clock_running() {
        let (reason, recorder, _) = play(&[Key::Arrow(Direction::Down)], false).await;

        assert_eq!(reason, EndReason::Wall);
        assert_eq!(recorder.summary.unwrap().head(), Some(Point::new(20, 19)));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_game_only_gets_a_summary() {
        let (tx, rx) = mpsc::channel(10);
        let mut game = new_game();
        game.quit();
        let mut recorder = Recorder::default();

        let reason = run(&mut game, rx, &mut recorder, TICK).await;
        drop(tx);

        assert_eq!(reason, EndReason::Quit);
        assert_eq!(recorder.frames.len(), 1);
        assert!(recorder.summary.is_some());
    }

    struct BrokenPipe {
        draws: usize,
        summaries: usize,
    }

    impl Renderer for BrokenPipe {
        fn draw(&mut self, _: &Snapshot) -> io::Result<()> {
            self.draws += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }

        fn draw_summary(&mut self, _: &Snapshot) -> io::Result<()> {
            self.summaries += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn draw_failures_do_not_stop_the_game() {
        let (_tx, rx) = mpsc::channel(10);
        let mut game = new_game();
        let mut renderer = BrokenPipe { draws: 0, summaries: 0 };

        let reason = run(&mut game, rx, &mut renderer, TICK).await;

        assert_eq!(reason, EndReason::Wall);
        assert_eq!(renderer.draws, 20);
        assert_eq!(renderer.summaries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_starts_one_tick_in_and_skips_missed_ticks() {
        let start = Instant::now();
        let mut interval = ticker(TICK);

        assert_eq!(interval.tick().await, start + TICK);
        assert_eq!(Instant::now(), start + TICK);

        // Stall past the second and third deadlines.
        time::advance(TICK * 5 / 2).await;

        // The overdue tick fires once, right away; the third is not replayed.
        assert_eq!(interval.tick().await, start + TICK * 2);
        assert_eq!(Instant::now(), start + TICK * 7 / 2);
        assert_eq!(interval.tick().await, start + TICK * 4);
        assert_eq!(Instant::now(), start + TICK * 4);
    }
}

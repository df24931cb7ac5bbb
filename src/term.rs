use std::io::{self, Stdout, Write};

use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, style, terminal};

use crate::board::Direction;
use crate::game::{EndReason, Snapshot};
use crate::play::Renderer;

const SNAKE_BODY_CHAR: char = '█';
const FOOD_CHAR: char = 'O';
const DEAD_SNAKE_CHAR: char = 'X';
const CONTROLS_HINT: &str = "Controls: W/A/S/D or arrows to move | Q to quit";

/// Raw mode, alternate screen and a hidden cursor for as long as it lives.
pub struct TermGuard {
    stdout: Stdout,
}

impl TermGuard {
    pub fn acquire() -> io::Result<Self> {
        let mut guard = TermGuard { stdout: io::stdout() };
        execute!(guard.stdout, EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        execute!(guard.stdout, cursor::Hide, cursor::DisableBlinking)?;
        Ok(guard)
    }
}

impl Drop for TermGuard {
    fn drop(&mut self) {
        let _ = restore();
    }
}

/// Undoes `TermGuard::acquire`. Safe to call more than once, and from a panic hook.
pub fn restore() -> io::Result<()> {
    let raw = terminal::disable_raw_mode();
    execute!(io::stdout(), cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)?;
    raw
}

/// Redraws the whole board on every frame.
pub struct TermRenderer<W: Write> {
    out: W,
    cleared: bool,
}

impl TermRenderer<Stdout> {
    pub fn stdout() -> Self {
        TermRenderer::new(io::stdout())
    }
}

impl<W: Write> TermRenderer<W> {
    pub fn new(out: W) -> Self {
        TermRenderer { out, cleared: false }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, lines: &[String]) -> io::Result<()> {
        if !self.cleared {
            queue!(self.out, terminal::Clear(ClearType::All))?;
            self.cleared = true;
        }

        // Raw mode does not turn '\n' into a carriage return, so position every row.
        for (y, line) in lines.iter().enumerate() {
            queue!(
                self.out,
                cursor::MoveTo(0, y as u16),
                style::Print(line),
                terminal::Clear(ClearType::UntilNewLine)
            )?;
        }
        self.out.flush()
    }
}

impl<W: Write> Renderer for TermRenderer<W> {
    fn draw(&mut self, frame: &Snapshot) -> io::Result<()> {
        self.emit(&compose(frame, false))
    }

    fn draw_summary(&mut self, frame: &Snapshot) -> io::Result<()> {
        self.emit(&compose(frame, true))
    }
}

fn head_char(direction: Direction) -> char {
    match direction {
        Direction::Up => '^',
        Direction::Down => 'v',
        Direction::Left => '<',
        Direction::Right => '>',
    }
}

fn compose(frame: &Snapshot, summary: bool) -> Vec<String> {
    let (width, height) = (frame.width.max(0) as usize, frame.height.max(0) as usize);
    let mut grid = vec![vec![' '; width]; height];
    let put = |grid: &mut Vec<Vec<char>>, x: i32, y: i32, ch: char| {
        if (0..frame.width).contains(&x) && (0..frame.height).contains(&y) {
            grid[y as usize][x as usize] = ch;
        }
    };

    let dead = summary && matches!(frame.end, Some(EndReason::Wall | EndReason::SelfCollision));

    put(&mut grid, frame.food.x, frame.food.y, FOOD_CHAR);
    // Tail first so the head wins if anything overlaps.
    let head = frame.head();
    for p in frame.body.iter().rev() {
        let ch = if dead {
            DEAD_SNAKE_CHAR
        } else if Some(*p) == head {
            head_char(frame.direction)
        } else {
            SNAKE_BODY_CHAR
        };
        put(&mut grid, p.x, p.y, ch);
    }

    if summary {
        let title = match frame.end {
            Some(EndReason::BoardFull) => "You won!",
            Some(EndReason::Quit) => "Bye!",
            _ => "Game over!",
        };
        let score = format!("Score: {}", frame.score);
        overlay_message(&mut grid, &[title, &score]);
    }

    let border = format!("+{}+", "-".repeat(width));
    let mut lines = Vec::with_capacity(height + 4);
    lines.push(border.clone());
    for row in grid {
        lines.push(format!("|{}|", row.into_iter().collect::<String>()));
    }
    lines.push(border);
    lines.push(format!("Score: {}", frame.score));
    lines.push(if summary { "Thanks for playing!".to_string() } else { CONTROLS_HINT.to_string() });
    lines
}

/// Writes `lines` centered on the grid inside a one-cell blank margin.
fn overlay_message(grid: &mut [Vec<char>], lines: &[&str]) {
    let height = grid.len() as i32;
    let width = grid.first().map_or(0, |row| row.len()) as i32;

    let msg_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
    let msg_height = lines.len() + 2;
    let left = (width / 2 - msg_width as i32 / 2).max(0);
    let top = (height / 2 - msg_height as i32 / 2).max(0);

    for row in 0..msg_height {
        let text = if row == 0 || row == msg_height - 1 {
            " ".repeat(msg_width)
        } else {
            format!("{line: ^width$}", line = lines[row - 1], width = msg_width)
        };

        let y = top + row as i32;
        if y >= height {
            break;
        }
        for (dx, ch) in text.chars().enumerate() {
            let x = left + dx as i32;
            if x < width {
                grid[y as usize][x as usize] = ch;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Point;

    fn snapshot() -> Snapshot {
        Snapshot {
            width: 40,
            height: 20,
            body: vec![Point::new(20, 10), Point::new(19, 10), Point::new(18, 10)],
            direction: Direction::Right,
            food: Point::new(5, 3),
            score: 2,
            game_over: false,
            end: None,
        }
    }

    fn cell(lines: &[String], x: usize, y: usize) -> char {
        // +1 for the border on each axis.
        lines[y + 1].chars().nth(x + 1).unwrap()
    }

    #[test]
    fn frame_has_border_glyphs_and_hud() {
        let lines = compose(&snapshot(), false);

        assert_eq!(lines.len(), 24);
        assert_eq!(lines[0], format!("+{}+", "-".repeat(40)));
        assert_eq!(lines[21], lines[0]);
        assert!(lines[1..21].iter().all(|l| l.chars().count() == 42 && l.starts_with('|') && l.ends_with('|')));

        assert_eq!(cell(&lines, 20, 10), '>');
        assert_eq!(cell(&lines, 19, 10), SNAKE_BODY_CHAR);
        assert_eq!(cell(&lines, 18, 10), SNAKE_BODY_CHAR);
        assert_eq!(cell(&lines, 5, 3), FOOD_CHAR);
        assert_eq!(cell(&lines, 0, 0), ' ');

        assert_eq!(lines[22], "Score: 2");
        assert_eq!(lines[23], CONTROLS_HINT);
    }

    #[test]
    fn summary_marks_the_dead_snake_and_shows_the_score() {
        let mut snap = snapshot();
        snap.body = vec![Point::new(39, 2), Point::new(38, 2), Point::new(37, 2)];
        snap.game_over = true;
        snap.end = Some(EndReason::Wall);
        let lines = compose(&snap, true);

        assert_eq!(cell(&lines, 39, 2), DEAD_SNAKE_CHAR);
        assert!(lines.iter().any(|l| l.contains("Game over!")));
        assert!(lines.iter().any(|l| l.contains("Score: 2")));
    }

    #[test]
    fn quitting_keeps_the_snake_glyphs() {
        let mut snap = snapshot();
        snap.game_over = true;
        snap.end = Some(EndReason::Quit);
        let lines = compose(&snap, true);

        assert!(lines.iter().any(|l| l.contains("Bye!")));
        assert!(!lines.iter().any(|l| l.contains(DEAD_SNAKE_CHAR)));
    }

    #[test]
    fn renderer_writes_every_row() {
        let mut renderer = TermRenderer::new(Vec::new());
        renderer.draw(&snapshot()).unwrap();
        let out = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(out.contains("Score: 2"));
        assert!(out.contains(CONTROLS_HINT));
        assert!(out.contains('>'));
    }
}

use std::io::{self, ErrorKind, Read};
use std::thread;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::debug;

use crate::board::Direction;

/// What a raw terminal sends for Ctrl+C.
pub const CTRL_C: char = '\u{3}';

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Arrow(Direction),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Turn(Direction),
    Quit,
}

impl Command {
    /// `None` for keys the game does not react to.
    pub fn from_key(key: Key) -> Option<Command> {
        let command = match key {
            Key::Arrow(dir) => Command::Turn(dir),
            Key::Char(c) => match c.to_ascii_lowercase() {
                'w' => Command::Turn(Direction::Up),
                'a' => Command::Turn(Direction::Left),
                's' => Command::Turn(Direction::Down),
                'd' => Command::Turn(Direction::Right),
                'q' | CTRL_C => Command::Quit,
                _ => return None,
            },
        };
        Some(command)
    }
}

/// A blocking producer of keystrokes. `Ok(None)` means the stream has ended.
pub trait KeySource: Send + 'static {
    fn next_key(&mut self) -> io::Result<Option<Key>>;
}

/// Keys from the terminal, via crossterm's event reader.
pub struct CrosstermKeys;

impl KeySource for CrosstermKeys {
    fn next_key(&mut self) -> io::Result<Option<Key>> {
        loop {
            let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()? else {
                continue;
            };
            if kind == KeyEventKind::Release {
                continue;
            }

            let key = match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Key::Char(CTRL_C),
                KeyCode::Char(c) => Key::Char(c),
                KeyCode::Up => Key::Arrow(Direction::Up),
                KeyCode::Down => Key::Arrow(Direction::Down),
                KeyCode::Left => Key::Arrow(Direction::Left),
                KeyCode::Right => Key::Arrow(Direction::Right),
                _ => continue,
            };
            return Ok(Some(key));
        }
    }
}

/// Characters decoded as UTF-8 from a byte stream. Malformed sequences come
/// out as U+FFFD.
pub struct ReaderKeys<R> {
    reader: R,
}

impl<R: Read> ReaderKeys<R> {
    pub fn new(reader: R) -> Self {
        ReaderKeys { reader }
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        loop {
            match self.reader.read(std::slice::from_mut(&mut byte)) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte)),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read + Send + 'static> KeySource for ReaderKeys<R> {
    fn next_key(&mut self) -> io::Result<Option<Key>> {
        let Some(first) = self.read_byte()? else {
            return Ok(None);
        };

        let len = match first {
            0x00..=0x7f => 1,
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Ok(Some(Key::Char(char::REPLACEMENT_CHARACTER))),
        };

        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            match self.read_byte()? {
                Some(b) => *slot = b,
                None => return Ok(Some(Key::Char(char::REPLACEMENT_CHARACTER))),
            }
        }

        let c = std::str::from_utf8(&buf[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        Ok(Some(Key::Char(c)))
    }
}

/// Starts a thread that feeds keys from `source` into a bounded queue.
///
/// The thread blocks while the queue is full. It stops quietly on end of
/// stream, on a read error, or once the receiver is dropped; the receiver
/// then sees the channel close. Nobody joins it.
pub fn spawn<S: KeySource>(mut source: S, capacity: usize) -> io::Result<mpsc::Receiver<Key>> {
    let (tx, rx) = mpsc::channel(capacity);

    thread::Builder::new()
        .name("input".to_string())
        .spawn(move || loop {
            match source.next_key() {
                Ok(Some(key)) => {
                    if tx.blocking_send(key).is_err() {
                        debug!("game loop gone, input thread stopping");
                        return;
                    }
                }
                // End of stream and read errors both just stop production.
                Ok(None) | Err(_) => return,
            }
        })?;

    Ok(rx)
}

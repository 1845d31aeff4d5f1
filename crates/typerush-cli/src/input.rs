use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::{debug, info};
use typerush::Key;

/// What a keystroke means to the game loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Key(Key),
    /// Calibration step: +1 later, -1 earlier
    Nudge(i64),
    Quit,
}

/// Spawn a thread that turns terminal key events into [`Input`]s.
///
/// The thread exits once `stop` is raised or the receiver is gone.
fn spawn_keyboard_monitor(stop: Arc<AtomicBool>, tx: Sender<Input>) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Keyboard monitor started");

        while !stop.load(Ordering::Relaxed) {
            if event::poll(Duration::from_millis(50)).unwrap_or(false)
                && let Ok(Event::Key(key_event)) = event::read()
                && let Some(input) = translate(&key_event)
                && tx.send(input).is_err()
            {
                break;
            }
        }

        debug!("Keyboard monitor stopped");
    })
}

/// Map a terminal key event onto the game's keyboard surface.
fn translate(event: &KeyEvent) -> Option<Input> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let input = match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Input::Quit,
        KeyCode::Char(_) if event.modifiers.contains(KeyModifiers::CONTROL) => return None,
        KeyCode::Char(c) => Input::Key(Key::from_char(c)),
        KeyCode::Enter => Input::Key(Key::Enter),
        KeyCode::Backspace => Input::Key(Key::Backspace),
        KeyCode::Esc => Input::Key(Key::Escape),
        KeyCode::F(4) => Input::Key(Key::HardReset),
        KeyCode::Up => Input::Nudge(1),
        KeyCode::Down => Input::Nudge(-1),
        _ => return None,
    };
    Some(input)
}

/// Inputs paced into frames.
///
/// Each frame waits up to the frame length for the first input, so keys are
/// handled as soon as they arrive. A quit, or the senders going away, sticks:
/// once quitting, every later frame reports it without waiting.
pub struct InputQueue {
    rx: Receiver<Input>,
    frame: Duration,
    quitting: bool,
}

impl InputQueue {
    pub fn new(rx: Receiver<Input>, frame: Duration) -> Self {
        Self {
            rx,
            frame,
            quitting: false,
        }
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Inputs for one frame, in arrival order.
    pub fn next_frame(&mut self) -> Vec<Input> {
        if self.quitting {
            return Vec::new();
        }
        let mut inputs = Vec::new();
        match self.rx.recv_timeout(self.frame) {
            Ok(input) => inputs.push(input),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.quitting = true,
        }
        inputs.extend(self.rx.try_iter());
        if inputs.contains(&Input::Quit) {
            debug!("Quit requested");
            self.quitting = true;
        }
        inputs
    }
}

/// Raw-mode terminal with a keyboard thread and a Ctrl+C handler.
///
/// Ctrl+C arrives as [`Input::Quit`] either way: from the key reader while
/// raw mode swallows SIGINT, or from the signal handler otherwise.
/// Dropping the session stops the thread and restores the terminal.
pub struct TerminalSession {
    queue: InputQueue,
    stop: Arc<AtomicBool>,
    monitor: Option<JoinHandle<()>>,
    _raw: RawModeGuard,
}

impl TerminalSession {
    pub fn open(frame: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let interrupt = tx.clone();
        ctrlc::set_handler(move || {
            info!("Received interrupt, ending the session");
            let _ = interrupt.send(Input::Quit);
        })
        .context("Failed to install Ctrl+C handler")?;

        let raw = RawModeGuard::enable().context("Failed to switch the terminal to raw mode")?;
        let stop = Arc::new(AtomicBool::new(false));
        let monitor = spawn_keyboard_monitor(Arc::clone(&stop), tx);
        Ok(Self {
            queue: InputQueue::new(rx, frame),
            stop,
            monitor: Some(monitor),
            _raw: raw,
        })
    }

    pub fn is_quitting(&self) -> bool {
        self.queue.is_quitting()
    }

    /// Wait out one frame and return the inputs that arrived
    pub fn next_frame(&mut self) -> Vec<Input> {
        self.queue.next_frame()
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.monitor.take() {
            let _ = handle.join();
        }
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Option<Input> {
        translate(&KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_letters_and_space() {
        assert_eq!(
            key(KeyCode::Char('k'), KeyModifiers::NONE),
            Some(Input::Key(Key::Char('k')))
        );
        assert_eq!(
            key(KeyCode::Char(' '), KeyModifiers::NONE),
            Some(Input::Key(Key::Space))
        );
        assert_eq!(
            key(KeyCode::Char('-'), KeyModifiers::NONE),
            Some(Input::Key(Key::Char('-')))
        );
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(key(KeyCode::Esc, KeyModifiers::NONE), Some(Input::Key(Key::Escape)));
        assert_eq!(key(KeyCode::F(4), KeyModifiers::NONE), Some(Input::Key(Key::HardReset)));
        assert_eq!(key(KeyCode::Up, KeyModifiers::NONE), Some(Input::Nudge(1)));
        assert_eq!(key(KeyCode::Down, KeyModifiers::NONE), Some(Input::Nudge(-1)));
    }

    #[test]
    fn test_ctrl_c_quits() {
        assert_eq!(key(KeyCode::Char('c'), KeyModifiers::CONTROL), Some(Input::Quit));
        assert_eq!(key(KeyCode::Char('a'), KeyModifiers::CONTROL), None);
        assert_eq!(
            key(KeyCode::Char('c'), KeyModifiers::NONE),
            Some(Input::Key(Key::Char('c')))
        );
    }

    #[test]
    fn test_frame_returns_inputs_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut queue = InputQueue::new(rx, Duration::from_millis(10));
        tx.send(Input::Key(Key::Char('k'))).unwrap();
        tx.send(Input::Nudge(-1)).unwrap();
        assert_eq!(
            queue.next_frame(),
            vec![Input::Key(Key::Char('k')), Input::Nudge(-1)]
        );
        assert!(queue.next_frame().is_empty());
        assert!(!queue.is_quitting());
    }

    #[test]
    fn test_quit_sticks() {
        let (tx, rx) = mpsc::channel();
        let mut queue = InputQueue::new(rx, Duration::from_secs(10));
        tx.send(Input::Key(Key::Char('a'))).unwrap();
        tx.send(Input::Quit).unwrap();
        tx.send(Input::Key(Key::Char('b'))).unwrap();
        assert_eq!(queue.next_frame().len(), 3);
        assert!(queue.is_quitting());

        // Later frames neither wait nor deliver
        let start = Instant::now();
        tx.send(Input::Key(Key::Char('c'))).unwrap();
        assert!(queue.next_frame().is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_input_from_another_thread_ends_the_wait() {
        let (tx, rx) = mpsc::channel();
        let mut queue = InputQueue::new(rx, Duration::from_secs(10));
        let sender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            tx.send(Input::Quit).unwrap();
        });

        let start = Instant::now();
        assert_eq!(queue.next_frame(), vec![Input::Quit]);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(queue.is_quitting());
        sender.join().unwrap();
    }

    #[test]
    fn test_disconnect_quits() {
        let (tx, rx) = mpsc::channel::<Input>();
        let mut queue = InputQueue::new(rx, Duration::from_millis(10));
        drop(tx);
        assert!(queue.next_frame().is_empty());
        assert!(queue.is_quitting());
    }

    #[test]
    fn test_frame_waits_when_idle() {
        let (_tx, rx) = mpsc::channel::<Input>();
        let mut queue = InputQueue::new(rx, Duration::from_millis(30));
        let start = Instant::now();
        assert!(queue.next_frame().is_empty());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_release_ignored() {
        let mut event = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(translate(&event), None);
    }
}

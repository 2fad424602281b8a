//! PTY session: runs the shell on a pseudo-terminal and relays bytes between
//! it and the real terminal.
//!
//! Lifecycle: `Created → Started → Running → Stopping → Stopped`.
//!
//! `start` allocates the PTY, spawns the shell, switches the real terminal to
//! raw mode and launches three loops:
//!
//! - resize: pushes the terminal size to the PTY at start, on SIGWINCH and
//!   whenever the polled size changes, and stops the session on a
//!   termination signal
//! - input: stdin → observer `on_input` → PTY
//! - output: PTY → observer `on_output` → stdout
//!
//! Any read or write error in a loop stops the whole session. `stop` is
//! idempotent and may be called from any thread; every caller returns only
//! once the session is `Stopped` and the terminal restored.

use crate::error::SessionError;
use crate::raw_mode::{CrosstermRawMode, CrosstermWindowSize, NoRawMode, RawMode, WindowSize};
use crossterm::tty::IsTty;
use crate::signals;
use crate::stop::StopSignal;
use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::io::{self, ErrorKind, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const INPUT_BUFFER_SIZE: usize = 1024;
const OUTPUT_BUFFER_SIZE: usize = 8192;

/// Size used when the real terminal's dimensions cannot be read.
const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Receives every chunk relayed through the session.
///
/// Called synchronously from the copy loops, so implementations must return
/// quickly and never block on audio.
pub trait SessionObserver: Send + Sync {
    fn on_input(&self, data: &[u8]);
    fn on_output(&self, data: &[u8]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    Running,
    Stopping,
    Stopped,
}

/// What to run inside the PTY.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub shell: String,
    pub args: Vec<String>,
    /// How often the resize loop checks for pending signals and size changes.
    pub resize_poll: Duration,
    /// How long `wait` lets the output loop flush after the shell exits.
    pub drain_timeout: Duration,
}

impl SessionConfig {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            args: Vec::new(),
            resize_poll: Duration::from_millis(50),
            drain_timeout: Duration::from_millis(250),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// The real terminal's streams and controls, handed to `Session::start`.
pub struct SessionIo {
    pub stdin: Box<dyn Read + Send>,
    pub stdout: Box<dyn Write + Send>,
    pub raw_mode: Box<dyn RawMode>,
    pub window_size: Box<dyn WindowSize>,
}

impl SessionIo {
    /// The process's own stdin/stdout and controlling terminal. Raw mode is
    /// left alone when stdin is not a terminal.
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let raw_mode: Box<dyn RawMode> = if stdin.is_tty() {
            Box::new(CrosstermRawMode)
        } else {
            log::debug!("Stdin is not a terminal, leaving line discipline alone");
            Box::new(NoRawMode)
        };
        Self {
            stdin: Box::new(stdin),
            stdout: Box::new(io::stdout()),
            raw_mode,
            window_size: Box::new(CrosstermWindowSize),
        }
    }
}

/// A shell running on a PTY. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    observer: Arc<dyn SessionObserver>,
    state: Mutex<SessionState>,
    stop: StopSignal,
    /// Closed once `state` reaches `Stopped`.
    stopped: StopSignal,
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    child: Mutex<Option<Box<dyn Child + Send + Sync>>>,
    killer: Mutex<Option<Box<dyn ChildKiller + Send + Sync>>>,
    /// Present while the real terminal is in raw mode.
    raw_mode: Mutex<Option<Box<dyn RawMode>>>,
    /// Disconnects when the output loop exits.
    output_done: Mutex<Option<Receiver<()>>>,
}

impl Session {
    pub fn new(config: SessionConfig, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                observer,
                state: Mutex::new(SessionState::Created),
                stop: StopSignal::new(),
                stopped: StopSignal::new(),
                master: Mutex::new(None),
                writer: Mutex::new(None),
                child: Mutex::new(None),
                killer: Mutex::new(None),
                raw_mode: Mutex::new(None),
                output_done: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// The session's stop signal, for loops that should end with it.
    pub fn stop_signal(&self) -> StopSignal {
        self.inner.stop.clone()
    }

    /// Launch the shell in a PTY and begin relaying I/O.
    pub fn start(&self, io: SessionIo) -> Result<(), SessionError> {
        let mut state = self.inner.state.lock();
        if *state != SessionState::Created {
            return Err(SessionError::AlreadyStarted);
        }

        let SessionIo {
            stdin,
            stdout,
            mut raw_mode,
            window_size,
        } = io;
        let config = &self.inner.config;
        log::debug!("Starting terminal with shell {:?}", config.shell);

        let (cols, rows) = window_size.size().unwrap_or(FALLBACK_SIZE);
        let pair = native_pty_system()
            .openpty(pty_size(cols, rows))
            .map_err(|e| SessionError::PtyOpen(format!("{e:#}")))?;

        let mut cmd = CommandBuilder::new(&config.shell);
        cmd.args(&config.args);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| SessionError::Spawn {
                shell: config.shell.clone(),
                reason: format!("{e:#}"),
            })?;
        // Only the child keeps the slave side open, so reads see EIO once it exits.
        drop(pair.slave);
        log::debug!("Shell spawned (pid {:?})", child.process_id());

        let io_handles = pair
            .master
            .try_clone_reader()
            .and_then(|reader| Ok((reader, pair.master.take_writer()?)));
        let (reader, writer) = match io_handles {
            Ok(handles) => handles,
            Err(e) => {
                let _ = child.kill();
                *state = SessionState::Stopped;
                self.inner.close_signals();
                return Err(SessionError::PtyIo(format!("{e:#}")));
            }
        };

        if let Err(e) = raw_mode.enable() {
            log::error!("Failed to set raw mode on stdin: {}", e);
            let _ = child.kill();
            *state = SessionState::Stopped;
            self.inner.close_signals();
            return Err(SessionError::RawMode(e));
        }

        *self.inner.killer.lock() = Some(child.clone_killer());
        *self.inner.child.lock() = Some(child);
        *self.inner.master.lock() = Some(pair.master);
        *self.inner.writer.lock() = Some(writer);
        *self.inner.raw_mode.lock() = Some(raw_mode);
        *state = SessionState::Started;
        drop(state);

        let (done_tx, done_rx) = bounded::<()>(0);
        *self.inner.output_done.lock() = Some(done_rx);

        let spawned = self
            .spawn_loop("resize", move |inner| inner.resize_loop(window_size))
            .and_then(|_| self.spawn_loop("input", move |inner| inner.input_loop(stdin)))
            .and_then(|_| {
                self.spawn_loop("output", move |inner| {
                    inner.output_loop(reader, stdout, done_tx)
                })
            });
        if let Err(e) = spawned {
            self.inner.stop();
            return Err(e);
        }

        {
            let mut state = self.inner.state.lock();
            // A loop may already have failed and stopped the session.
            if *state == SessionState::Started {
                *state = SessionState::Running;
            }
        }
        log::info!("Terminal session started");
        Ok(())
    }

    /// Signal every loop to exit, close the PTY and restore the terminal.
    /// Safe to call repeatedly and concurrently; returns once the session
    /// is `Stopped`.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Block until the shell exits, then stop the session.
    ///
    /// Returns the shell's exit code.
    pub fn wait(&self) -> Result<i32, SessionError> {
        let mut child = self
            .inner
            .child
            .lock()
            .take()
            .ok_or(SessionError::NotStarted)?;

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                log::error!("Error waiting for shell command exit: {}", e);
                self.inner.stop();
                return Err(SessionError::Wait(e));
            }
        };
        // The process is reaped; its pid must not be signalled again.
        self.inner.killer.lock().take();
        log::debug!("Shell process exited: {:?}", status);

        let done = self.inner.output_done.lock().take();
        if let Some(done) = done {
            // Disconnects when the output loop exits; never sends.
            let _ = done.recv_timeout(self.inner.config.drain_timeout);
        }

        self.inner.stop();
        Ok(i32::try_from(status.exit_code()).unwrap_or(1))
    }

    fn spawn_loop<F>(&self, name: &'static str, body: F) -> Result<(), SessionError>
    where
        F: FnOnce(Arc<SessionInner>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name(format!("chirp-{name}"))
            .spawn(move || body(inner))
            .map(|_| ())
            .map_err(|source| SessionError::Thread { name, source })
    }
}

impl SessionInner {
    fn stop(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                SessionState::Stopped => return,
                SessionState::Stopping => {
                    drop(state);
                    // Another caller is tearing down; return after it does.
                    self.stopped.wait();
                    return;
                }
                SessionState::Created => {
                    *state = SessionState::Stopped;
                    drop(state);
                    self.close_signals();
                    return;
                }
                SessionState::Started | SessionState::Running => {
                    *state = SessionState::Stopping;
                }
            }
        }

        log::debug!("Stopping terminal");
        self.stop.stop();

        // Hang up the shell first so a blocked PTY write returns and
        // releases the writer.
        if let Some(mut killer) = self.killer.lock().take()
            && let Err(e) = killer.kill()
        {
            log::debug!("Shell already gone: {}", e);
        }

        if let Some(mut raw_mode) = self.raw_mode.lock().take() {
            match raw_mode.restore() {
                Ok(()) => log::debug!("Restored terminal state"),
                Err(e) => log::warn!("Failed to restore terminal state: {}", e),
            }
        }

        self.writer.lock().take();
        self.master.lock().take();

        *self.state.lock() = SessionState::Stopped;
        self.stopped.stop();
        log::info!("Terminal session stopped");
    }

    fn close_signals(&self) {
        self.stop.stop();
        self.stopped.stop();
    }

    /// Push `size` to the PTY. Returns `false` if the resize failed.
    fn apply_window_size(&self, (cols, rows): (u16, u16)) -> bool {
        let master = self.master.lock();
        let Some(master) = master.as_ref() else {
            return false;
        };
        match master.resize(pty_size(cols, rows)) {
            Ok(()) => {
                log::debug!("Resized PTY to {}x{}", cols, rows);
                true
            }
            Err(e) => {
                log::warn!("Failed to resize PTY: {e:#}");
                false
            }
        }
    }

    fn resize_loop(&self, window_size: Box<dyn WindowSize>) {
        let mut applied = window_size
            .size()
            .filter(|&size| self.apply_window_size(size));

        loop {
            if self.stop.wait_timeout(self.config.resize_poll) {
                log::debug!("Resize handler stopping");
                return;
            }
            if signals::take_terminate() {
                log::info!("Received termination signal, stopping session");
                self.stop();
                return;
            }
            let notified = signals::take_resize();
            let Some(size) = window_size.size() else {
                continue;
            };
            if (notified || applied != Some(size)) && self.apply_window_size(size) {
                applied = Some(size);
            }
        }
    }

    fn input_loop(&self, mut stdin: Box<dyn Read + Send>) {
        let mut buf = [0u8; INPUT_BUFFER_SIZE];
        loop {
            if self.stop.is_stopped() {
                log::debug!("Input copier stopping");
                return;
            }

            let n = match stdin.read(&mut buf) {
                Ok(0) => {
                    log::debug!("Stdin reached EOF");
                    self.stop();
                    return;
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("Stdin read error: {}", e);
                    self.stop();
                    return;
                }
            };
            if self.stop.is_stopped() {
                log::debug!("Input copier stopping");
                return;
            }

            let data = &buf[..n];
            self.observer.on_input(data);

            let written = {
                let mut writer = self.writer.lock();
                let Some(writer) = writer.as_mut() else {
                    return;
                };
                writer.write_all(data).and_then(|_| writer.flush())
            };
            if let Err(e) = written {
                log::error!("PTY write error: {}", e);
                self.stop();
                return;
            }
        }
    }

    fn output_loop(
        &self,
        mut reader: Box<dyn Read + Send>,
        mut stdout: Box<dyn Write + Send>,
        done: Sender<()>,
    ) {
        let mut buf = [0u8; OUTPUT_BUFFER_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => {
                    log::debug!("PTY reached EOF");
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_pty_closed(&e) => {
                    log::debug!("PTY read loop finished normally: {}", e);
                    break;
                }
                Err(e) => {
                    log::error!("PTY read error: {}", e);
                    break;
                }
            };
            if self.stop.is_stopped() {
                log::debug!("Output copier stopping");
                break;
            }

            let data = &buf[..n];
            self.observer.on_output(data);

            if let Err(e) = stdout.write_all(data).and_then(|_| stdout.flush()) {
                log::error!("Stdout write error: {}", e);
                break;
            }
        }
        self.stop();
        drop(done);
    }
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// EIO is what Linux returns from the master once the slave side is gone.
fn is_pty_closed(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(libc::EIO)
    }
    #[cfg(not(unix))]
    {
        e.kind() == ErrorKind::BrokenPipe
    }
}

use crate::command::{Action, Command, CommandInner, MouseMode, TerminalRequest};
use crate::input::{Decoder, InputEvent};
use crate::key::Key;
use crate::message::Event;
use crate::model::Model;
use crate::renderer::Renderer;
use crossterm::{
    cursor,
    event::{DisableBracketedPaste, DisableFocusChange, EnableBracketedPaste, EnableFocusChange},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen, SetTitle,
    },
};
use futures::FutureExt;
use std::io::{self, stderr, stdout, Stderr, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

// SGR mouse reporting (1006) with button/drag tracking.  crossterm's
// EnableMouseCapture always enables all-motion tracking, so the two report
// granularities are written out explicitly.
const MOUSE_CELL_ON: &str = "\x1b[?1000h\x1b[?1002h\x1b[?1006h";
const MOUSE_ALL_ON: &str = "\x1b[?1000h\x1b[?1002h\x1b[?1003h\x1b[?1006h";
const MOUSE_OFF: &str = "\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l";

/// Output target for the terminal UI.
///
/// By default the UI renders to **stdout**.  When your program's stdout is
/// piped (e.g. to capture structured output), switch to
/// [`Stderr`](OutputTarget::Stderr) so the UI goes to the terminal while data
/// flows through the pipe.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to stdout (default).
    #[default]
    Stdout,
    /// Write to stderr (useful when stdout is piped).
    Stderr,
}

/// Writer behind the renderer: stdout, stderr, or an injected sink.
enum Output {
    Stdout(Stdout),
    Stderr(Stderr),
    Custom(Box<dyn Write + Send>),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(w) => w.write(buf),
            Output::Stderr(w) => w.write(buf),
            Output::Custom(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(w) => w.flush(),
            Output::Stderr(w) => w.flush(),
            Output::Custom(w) => w.flush(),
        }
    }
}

impl Output {
    fn new(target: OutputTarget) -> Self {
        match target {
            OutputTarget::Stdout => Output::Stdout(stdout()),
            OutputTarget::Stderr => Output::Stderr(stderr()),
        }
    }
}

/// Errors that can occur while running a [`Program`].
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// An I/O error from terminal setup, rendering, or teardown.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The run was cut short by an interrupt signal.
    #[error("interrupted")]
    Interrupted,
    /// The run was cut short by [`ProgramHandle::kill`].
    #[error("killed")]
    Killed,
}

/// Configuration options for a [`Program`].
///
/// All fields have sensible defaults (see [`Default`] impl).  Use struct
/// update syntax to override only the options you need:
///
/// # Example
///
/// ```rust,ignore
/// use matcha_core::{MouseMode, OutputTarget, ProgramOptions};
///
/// let opts = ProgramOptions {
///     fps: 30,
///     mouse_mode: Some(MouseMode::CellMotion),
///     title: Some("My App".into()),
///     output: OutputTarget::Stderr,
///     ..ProgramOptions::default()
/// };
/// ```
pub struct ProgramOptions {
    /// Target frames per second (default: 60; clamped to 1..=120).
    pub fps: u32,
    /// Start in alternate screen (default: true).
    pub alt_screen: bool,
    /// Enable mouse reporting.
    pub mouse_mode: Option<MouseMode>,
    /// Enable bracketed paste (default: true).
    pub bracketed_paste: bool,
    /// Enable focus reporting.
    pub focus_reporting: bool,
    /// Set terminal title.
    pub title: Option<String>,
    /// Whether to catch panics and restore the terminal (default: true).
    pub catch_panics: bool,
    /// Whether to listen for signals (resize, interrupt; default: true).
    pub handle_signals: bool,
    /// Output target: stdout (default) or stderr.
    pub output: OutputTarget,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            fps: 60,
            alt_screen: true,
            mouse_mode: None,
            bracketed_paste: true,
            focus_reporting: false,
            title: None,
            catch_panics: true,
            handle_signals: true,
            output: OutputTarget::default(),
        }
    }
}

/// A cloneable handle to a running [`Program`] for external control.
///
/// `ProgramHandle` can be sent across threads or into async tasks.  It
/// provides three capabilities:
///
/// * [`send`](ProgramHandle::send) — inject an application message into the
///   program's queue from outside.
/// * [`quit`](ProgramHandle::quit) — request a graceful quit.
/// * [`kill`](ProgramHandle::kill) — force the program to exit immediately,
///   abandoning pending work.
///
/// Obtain a handle by calling [`Program::handle`] before entering the run
/// loop.
pub struct ProgramHandle<Msg: Send + 'static> {
    msg_tx: mpsc::UnboundedSender<Event<Msg>>,
    killed: Arc<AtomicBool>,
}

impl<Msg: Send + 'static> Clone for ProgramHandle<Msg> {
    fn clone(&self) -> Self {
        Self {
            msg_tx: self.msg_tx.clone(),
            killed: self.killed.clone(),
        }
    }
}

impl<Msg: Send + 'static> ProgramHandle<Msg> {
    /// Send an application message to the running program.
    ///
    /// The message is enqueued and processed on the next iteration of the
    /// event loop.  Returns silently if the program has already exited.
    pub fn send(&self, msg: Msg) {
        let _ = self.msg_tx.send(Event::App(msg));
    }

    /// Request a graceful quit, as if the model had returned
    /// [`Command::quit`].
    pub fn quit(&self) {
        let _ = self.msg_tx.send(Event::Quit);
    }

    /// Force-kill the program.
    ///
    /// The event loop exits at the next opportunity without processing
    /// remaining messages or performing a final render; the run resolves
    /// with [`ProgramError::Killed`].
    pub fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
        // Wake the loop if it is idle; the flag decides the outcome.
        let _ = self.msg_tx.send(Event::Quit);
    }
}

/// The program runtime.  Manages terminal setup, the event loop, and the
/// full [`Model`] lifecycle.
///
/// `Program` owns the single ordered message queue that all event producers
/// feed: the input decoder pump, resolved command tasks, and signal
/// listeners.  The queue is drained one message at a time, so `update` calls
/// never overlap — commands run concurrently, but their results only touch
/// the model through the queue.
///
/// # Example
///
/// ```rust,ignore
/// use matcha_core::{Program, ProgramError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), ProgramError> {
///     let model = Program::<MyApp>::new(()).run().await?;
///     // `model` is the final state after quit
///     Ok(())
/// }
/// ```
pub struct Program<M: Model> {
    model: M,
    init_cmd: Option<Command<M::Message>>,
    msg_tx: mpsc::UnboundedSender<Event<M::Message>>,
    msg_rx: mpsc::UnboundedReceiver<Event<M::Message>>,
    renderer: Renderer<Output>,
    options: ProgramOptions,
    should_quit: bool,
    killed: Arc<AtomicBool>,
    #[allow(clippy::type_complexity)]
    filter: Option<Box<dyn Fn(Event<M::Message>) -> Option<Event<M::Message>> + Send>>,
    input: Option<Box<dyn AsyncRead + Send + Unpin>>,
    /// Injected I/O: skip terminal setup, signals, and process control.
    custom_io: bool,
    terminal_released: bool,
    pumps: Vec<tokio::task::AbortHandle>,
}

impl<M: Model> Program<M> {
    /// Create a new program with default options.
    pub fn new(flags: M::Flags) -> Self {
        Self::with_options(flags, ProgramOptions::default())
    }

    /// Create a new program with custom options.
    pub fn with_options(flags: M::Flags, options: ProgramOptions) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (model, init_cmd) = M::init(flags);
        let renderer = Renderer::new(Output::new(options.output));

        Self {
            model,
            init_cmd: Some(init_cmd),
            msg_tx,
            msg_rx,
            renderer,
            options,
            should_quit: false,
            killed: Arc::new(AtomicBool::new(false)),
            filter: None,
            input: None,
            custom_io: false,
            terminal_released: false,
            pumps: Vec::new(),
        }
    }

    /// Set a message filter.  Every event passes through the filter before
    /// reaching `update`.  Return `Some(event)` to pass (possibly
    /// transformed), `None` to drop.
    pub fn with_filter(
        mut self,
        filter: impl Fn(Event<M::Message>) -> Option<Event<M::Message>> + Send + 'static,
    ) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Read input bytes from the given reader instead of the terminal.
    ///
    /// Enables custom I/O mode: terminal setup, signal handling, and process
    /// control are skipped.  This is how tests and non-TTY hosts drive a
    /// program.
    pub fn with_input(mut self, input: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.input = Some(Box::new(input));
        self.custom_io = true;
        self
    }

    /// Write frames to the given writer instead of the terminal.
    ///
    /// Enables custom I/O mode, like [`with_input`](Program::with_input).
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.renderer = Renderer::new(Output::Custom(Box::new(output)));
        self.custom_io = true;
        self
    }

    /// Get a handle for external control (send messages, quit, force-kill).
    pub fn handle(&self) -> ProgramHandle<M::Message> {
        ProgramHandle {
            msg_tx: self.msg_tx.clone(),
            killed: self.killed.clone(),
        }
    }

    /// Run the program.  Blocks until quit.
    ///
    /// On a graceful quit the final model is returned after a final render
    /// and terminal restoration.  A kill or interrupt signal resolves with
    /// [`ProgramError::Killed`] / [`ProgramError::Interrupted`] without a
    /// final render; the terminal is restored on every path.
    pub async fn run(mut self) -> Result<M, ProgramError> {
        self.setup_terminal()?;
        let outcome = self.run_inner().await;

        debug!(target: "matcha::event", "shutting down");
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        if outcome.is_ok() {
            // Final render of whatever was staged last.
            let _ = self.renderer.stop();
        }
        if !self.terminal_released {
            self.restore_terminal();
        }

        outcome.map(|()| self.model)
    }

    async fn run_inner(&mut self) -> Result<(), ProgramError> {
        self.spawn_input_pump();
        self.spawn_resize_listener();

        if !self.custom_io {
            if let Ok((width, height)) = crossterm::terminal::size() {
                let _ = self.msg_tx.send(Event::Resize { width, height });
            }
        }

        if let Some(cmd) = self.init_cmd.take() {
            self.execute_command(cmd);
        }

        // Initial render
        self.renderer.write(self.model.view());
        self.renderer.flush()?;

        self.event_loop().await
    }

    async fn event_loop(&mut self) -> Result<(), ProgramError> {
        let fps = self.options.fps.clamp(1, 120);
        let mut frame_interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let handle_signals = self.options.handle_signals && !self.custom_io;

        loop {
            if self.killed.load(Ordering::SeqCst) {
                return Err(ProgramError::Killed);
            }

            tokio::select! {
                biased;

                _ = tokio::signal::ctrl_c(), if handle_signals => {
                    debug!(target: "matcha::event", "interrupt signal received");
                    return Err(ProgramError::Interrupted);
                }

                Some(event) = self.msg_rx.recv() => {
                    self.process_event(event);

                    // Micro-batch: drain additional messages within 100µs,
                    // up to 100 messages, so rapid input coalesces into a
                    // single frame.
                    let deadline = Instant::now() + Duration::from_micros(100);
                    let mut burst = 0u32;
                    while !self.should_quit && Instant::now() < deadline && burst < 100 {
                        match self.msg_rx.try_recv() {
                            Ok(event) => {
                                self.process_event(event);
                                burst += 1;
                            }
                            Err(_) => break,
                        }
                    }

                    if self.killed.load(Ordering::SeqCst) {
                        return Err(ProgramError::Killed);
                    }
                    if self.should_quit {
                        return Ok(());
                    }
                }

                _ = frame_interval.tick() => {
                    if !self.terminal_released {
                        self.renderer.flush()?;
                    }
                }
            }
        }
    }

    fn process_event(&mut self, event: Event<M::Message>) {
        let event = if let Some(ref filter) = self.filter {
            match filter(event) {
                Some(event) => event,
                None => return,
            }
        } else {
            event
        };

        match event {
            // Quit never reaches update: the pre-quit model is the final one.
            Event::Quit => {
                self.should_quit = true;
            }
            Event::Interrupt => {
                self.apply(Event::Interrupt);
                self.should_quit = true;
            }
            Event::Resize { width, height } => {
                // The terminal reflowed whatever was on screen.
                self.renderer.repaint();
                self.apply(Event::Resize { width, height });
            }
            event => self.apply(event),
        }
    }

    fn apply(&mut self, event: Event<M::Message>) {
        let cmd = self.model.update(event);
        self.renderer.write(self.model.view());
        self.execute_command(cmd);
    }

    fn execute_command(&mut self, cmd: Command<M::Message>) {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Action(Action::Message(msg)) => {
                let _ = self.msg_tx.send(Event::App(msg));
            }
            CommandInner::Action(Action::Quit) => {
                let _ = self.msg_tx.send(Event::Quit);
            }
            CommandInner::Future(fut) => {
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    // A failing command delivers nothing; it must not take
                    // the program down with it.
                    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(msg) => {
                            let _ = tx.send(Event::App(msg));
                        }
                        Err(_) => {
                            debug!(target: "matcha::command", "command failed, no message delivered");
                        }
                    }
                });
            }
            CommandInner::Stream(stream) => {
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let forward = async move {
                        use futures::StreamExt;
                        futures::pin_mut!(stream);
                        while let Some(msg) = stream.next().await {
                            if tx.send(Event::App(msg)).is_err() {
                                break;
                            }
                        }
                    };
                    if std::panic::AssertUnwindSafe(forward)
                        .catch_unwind()
                        .await
                        .is_err()
                    {
                        debug!(target: "matcha::command", "stream command failed");
                    }
                });
            }
            CommandInner::Batch(cmds) => {
                for cmd in cmds {
                    self.execute_command(cmd);
                }
            }
            CommandInner::Sequence(cmds) => {
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    for cmd in cmds {
                        run_sequential(cmd, &tx).await;
                    }
                });
            }
            CommandInner::Terminal(request) => {
                self.execute_terminal_request(request);
            }
            CommandInner::Exec { cmd: exec_cmd, on_exit } => {
                // Hand the terminal to the child, run it, take the terminal
                // back.
                let _ = self.release_terminal();

                let mut process = std::process::Command::new(&exec_cmd.program);
                process.args(&exec_cmd.args);
                if let Some(dir) = &exec_cmd.working_dir {
                    process.current_dir(dir);
                }
                process
                    .stdin(std::process::Stdio::inherit())
                    .stdout(std::process::Stdio::inherit())
                    .stderr(std::process::Stdio::inherit());
                let result = process.status();

                let _ = self.restore_terminal_control();
                let msg = on_exit(result);
                let _ = self.msg_tx.send(Event::App(msg));
            }
        }
    }

    fn execute_terminal_request(&mut self, request: TerminalRequest) {
        match request {
            TerminalRequest::EnterAltScreen => {
                execute!(self.renderer.out_mut(), EnterAlternateScreen).ok();
            }
            TerminalRequest::ExitAltScreen => {
                execute!(self.renderer.out_mut(), LeaveAlternateScreen).ok();
                self.renderer.repaint();
            }
            TerminalRequest::EnableMouse(mode) => {
                let seq = match mode {
                    MouseMode::CellMotion => MOUSE_CELL_ON,
                    MouseMode::AllMotion => MOUSE_ALL_ON,
                };
                let out = self.renderer.out_mut();
                write!(out, "{seq}").ok();
                out.flush().ok();
            }
            TerminalRequest::DisableMouse => {
                let out = self.renderer.out_mut();
                write!(out, "{MOUSE_OFF}").ok();
                out.flush().ok();
            }
            TerminalRequest::ShowCursor => {
                execute!(self.renderer.out_mut(), cursor::Show).ok();
            }
            TerminalRequest::HideCursor => {
                execute!(self.renderer.out_mut(), cursor::Hide).ok();
            }
            TerminalRequest::EnableBracketedPaste => {
                execute!(self.renderer.out_mut(), EnableBracketedPaste).ok();
            }
            TerminalRequest::DisableBracketedPaste => {
                execute!(self.renderer.out_mut(), DisableBracketedPaste).ok();
            }
            TerminalRequest::EnableFocusReporting => {
                execute!(self.renderer.out_mut(), EnableFocusChange).ok();
            }
            TerminalRequest::DisableFocusReporting => {
                execute!(self.renderer.out_mut(), DisableFocusChange).ok();
            }
            TerminalRequest::SetTitle(title) => {
                execute!(self.renderer.out_mut(), SetTitle(title)).ok();
            }
            TerminalRequest::ClearScreen => {
                execute!(self.renderer.out_mut(), Clear(ClearType::All)).ok();
                self.renderer.repaint();
            }
            TerminalRequest::Println(text) => {
                // \r\n because raw mode does not translate \n.
                let out = self.renderer.out_mut();
                write!(out, "{text}\r\n").ok();
                out.flush().ok();
                self.renderer.repaint();
            }
            TerminalRequest::Printf(text) => {
                let out = self.renderer.out_mut();
                write!(out, "{text}").ok();
                out.flush().ok();
                self.renderer.repaint();
            }
            TerminalRequest::Suspend => {
                self.suspend();
            }
        }
    }

    /// Temporarily release terminal control without quitting.
    pub fn release_terminal(&mut self) -> Result<(), ProgramError> {
        if !self.terminal_released && !self.custom_io {
            self.restore_terminal();
            self.terminal_released = true;
        }
        Ok(())
    }

    /// Re-acquire the terminal after [`release_terminal`](Program::release_terminal).
    pub fn restore_terminal_control(&mut self) -> Result<(), ProgramError> {
        if self.terminal_released {
            self.terminal_released = false;
            self.setup_terminal()?;
            self.renderer.repaint();
        }
        Ok(())
    }

    fn suspend(&mut self) {
        if self.custom_io {
            return;
        }

        // Let the application flush state before the process stops; the
        // queue will not be drained again until after resume.
        self.apply(Event::Suspend);

        self.restore_terminal();

        #[cfg(unix)]
        unsafe {
            libc::raise(libc::SIGTSTP);
        }

        // Execution continues here on SIGCONT.
        match self.setup_terminal() {
            Ok(()) => {
                self.renderer.repaint();
                let _ = self.msg_tx.send(Event::Resume);
            }
            Err(_) => {
                // Terminal re-init failed (e.g. detached).  Quit gracefully
                // rather than panicking.
                let _ = self.msg_tx.send(Event::Quit);
            }
        }
    }

    fn spawn_input_pump(&mut self) {
        let reader: Box<dyn AsyncRead + Send + Unpin> = match self.input.take() {
            Some(reader) => reader,
            None => Box::new(tokio::io::stdin()),
        };
        let tx = self.msg_tx.clone();

        let handle = tokio::spawn(async move {
            let mut reader = reader;
            let mut decoder = Decoder::new();
            let mut buf = [0u8; 1024];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        for event in decoder.feed(&buf[..n]) {
                            if !forward_input(&tx, event) {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        debug!(target: "matcha::input", "input read failed: {err}");
                        break;
                    }
                }
            }
            for event in decoder.finish() {
                if !forward_input(&tx, event) {
                    return;
                }
            }
        });
        self.pumps.push(handle.abort_handle());
    }

    fn spawn_resize_listener(&mut self) {
        if self.custom_io || !self.options.handle_signals {
            return;
        }
        #[cfg(unix)]
        {
            let tx = self.msg_tx.clone();
            let handle = tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                let Ok(mut winch) = signal(SignalKind::window_change()) else {
                    warn!(target: "matcha::event", "failed to install resize listener");
                    return;
                };
                while winch.recv().await.is_some() {
                    if let Ok((width, height)) = crossterm::terminal::size() {
                        if tx.send(Event::Resize { width, height }).is_err() {
                            break;
                        }
                    }
                }
            });
            self.pumps.push(handle.abort_handle());
        }
    }

    fn setup_terminal(&mut self) -> Result<(), ProgramError> {
        if self.custom_io {
            return Ok(());
        }

        // Install a panic hook that restores the terminal (only once, to
        // avoid stacking).  Without it a panic in update()/view() leaves the
        // terminal raw with a hidden cursor.
        if self.options.catch_panics {
            use std::sync::Once;
            static HOOK_INSTALLED: Once = Once::new();
            let alt_screen = self.options.alt_screen;
            let output_target = self.options.output;
            HOOK_INSTALLED.call_once(|| {
                let original_hook = std::panic::take_hook();
                std::panic::set_hook(Box::new(move |info| {
                    restore_terminal_for(alt_screen, output_target);
                    original_hook(info);
                }));
            });
        }

        enable_raw_mode()?;
        let out = self.renderer.out_mut();

        if self.options.alt_screen {
            execute!(out, EnterAlternateScreen)?;
        }
        if self.options.bracketed_paste {
            execute!(out, EnableBracketedPaste)?;
        }
        if let Some(mode) = self.options.mouse_mode {
            let seq = match mode {
                MouseMode::CellMotion => MOUSE_CELL_ON,
                MouseMode::AllMotion => MOUSE_ALL_ON,
            };
            write!(out, "{seq}")?;
        }
        if self.options.focus_reporting {
            execute!(out, EnableFocusChange)?;
        }
        if let Some(ref title) = self.options.title {
            execute!(out, SetTitle(title))?;
        }
        execute!(out, cursor::Hide)?;
        out.flush()?;
        Ok(())
    }

    fn restore_terminal(&mut self) {
        if self.custom_io {
            return;
        }
        restore_terminal_for(self.options.alt_screen, self.options.output);
    }
}

/// Best-effort terminal restoration: continue even if individual steps fail,
/// so as much state as possible comes back.
fn restore_terminal_for(alt_screen: bool, output_target: OutputTarget) {
    disable_raw_mode().ok();
    let mut out = Output::new(output_target);
    execute!(out, DisableBracketedPaste).ok();
    write!(out, "{MOUSE_OFF}").ok();
    execute!(out, DisableFocusChange).ok();
    execute!(out, cursor::Show).ok();
    if alt_screen {
        execute!(out, LeaveAlternateScreen).ok();
    }
    out.flush().ok();
}

/// Map a decoded input event into the runtime vocabulary.  Returns false
/// once the queue is gone.
fn forward_input<Msg: Send + 'static>(
    tx: &mpsc::UnboundedSender<Event<Msg>>,
    event: InputEvent,
) -> bool {
    let event = match event {
        InputEvent::Key(key) if key.key == Key::Ctrl('c') && !key.alt && !key.paste => {
            Event::Interrupt
        }
        InputEvent::Key(key) => Event::Key(key),
        InputEvent::Mouse(mouse) => Event::Mouse(mouse),
        InputEvent::FocusGained => Event::FocusGained,
        InputEvent::FocusLost => Event::FocusLost,
    };
    tx.send(event).is_ok()
}

/// Execute a command within a `Command::sequence`: each command's messages
/// are fully delivered before the next command starts.
fn run_sequential<Msg: Send + 'static>(
    cmd: Command<Msg>,
    tx: &mpsc::UnboundedSender<Event<Msg>>,
) -> futures::future::BoxFuture<'_, ()> {
    Box::pin(async move {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Action(Action::Message(msg)) => {
                let _ = tx.send(Event::App(msg));
            }
            CommandInner::Action(Action::Quit) => {
                let _ = tx.send(Event::Quit);
            }
            CommandInner::Future(fut) => {
                match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(msg) => {
                        let _ = tx.send(Event::App(msg));
                    }
                    Err(_) => {
                        debug!(target: "matcha::command", "sequenced command failed");
                    }
                }
            }
            CommandInner::Stream(stream) => {
                use futures::StreamExt;
                futures::pin_mut!(stream);
                while let Some(msg) = stream.next().await {
                    if tx.send(Event::App(msg)).is_err() {
                        break;
                    }
                }
            }
            CommandInner::Batch(cmds) => {
                // Within a sequence, a batch still runs concurrently with
                // itself; the sequence waits for the whole batch.
                let handles: Vec<_> = cmds
                    .into_iter()
                    .map(|cmd| {
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            run_sequential(cmd, &tx).await;
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.await.ok();
                }
            }
            CommandInner::Sequence(cmds) => {
                for cmd in cmds {
                    run_sequential(cmd, tx).await;
                }
            }
            CommandInner::Terminal(_) | CommandInner::Exec { .. } => {
                // These need the runtime's terminal; they cannot run from a
                // detached sequence task.
                debug!(target: "matcha::command", "terminal/exec command ignored inside sequence");
            }
        }
    })
}

/// Open a log file for debugging TUI applications.
///
/// A TUI owns the terminal, so debug output has to go somewhere else.  The
/// returned handle can back `writeln!` or a `tracing` writer; the file is
/// opened in append mode.
///
/// # Example
///
/// ```no_run
/// use matcha_core::program::log_to_file;
/// use std::io::Write;
///
/// let mut f = log_to_file("debug.log").unwrap();
/// writeln!(f, "debug message").unwrap();
/// ```
pub fn log_to_file(path: impl AsRef<std::path::Path>) -> Result<std::fs::File, std::io::Error> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Counts key and injected messages; quits on `q`.
    struct KeyCounter {
        count: usize,
        interrupted: bool,
    }

    impl Model for KeyCounter {
        type Message = ();
        type Flags = ();

        fn init(_: ()) -> (Self, Command<()>) {
            (
                KeyCounter {
                    count: 0,
                    interrupted: false,
                },
                Command::none(),
            )
        }

        fn update(&mut self, event: Event<()>) -> Command<()> {
            match event {
                Event::Key(key) if key.is_char('q') => return Command::quit(),
                Event::Key(_) => self.count += 1,
                Event::App(()) => self.count += 1,
                Event::Interrupt => self.interrupted = true,
                _ => {}
            }
            Command::none()
        }

        fn view(&self) -> String {
            format!("keys: {}", self.count)
        }
    }

    #[tokio::test]
    async fn quit_key_ends_run_with_pre_quit_model() {
        let out = SharedBuf::default();
        let model = Program::<KeyCounter>::new(())
            .with_input(Cursor::new(b"abq".to_vec()))
            .with_output(out.clone())
            .run()
            .await
            .unwrap();

        // `q` quit the program without being counted.
        assert_eq!(model.count, 2);
        assert!(out.contents().contains("keys: 2"));
    }

    #[tokio::test]
    async fn ctrl_c_is_delivered_then_quits() {
        let model = Program::<KeyCounter>::new(())
            .with_input(Cursor::new(b"\x03".to_vec()))
            .with_output(std::io::sink())
            .run()
            .await
            .unwrap();

        assert!(model.interrupted);
        assert_eq!(model.count, 0);
    }

    #[tokio::test]
    async fn handle_injects_messages_and_quits() {
        let program = Program::<KeyCounter>::new(())
            .with_input(tokio::io::empty())
            .with_output(std::io::sink());
        let handle = program.handle();
        let run = tokio::spawn(program.run());

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.send(());
        handle.send(());
        handle.quit();

        let model = run.await.unwrap().unwrap();
        assert_eq!(model.count, 2);
    }

    #[tokio::test]
    async fn kill_rejects_the_run() {
        let program = Program::<KeyCounter>::new(())
            .with_input(tokio::io::empty())
            .with_output(std::io::sink());
        let handle = program.handle();
        let run = tokio::spawn(program.run());

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.kill();

        let result = run.await.unwrap();
        assert!(matches!(result, Err(ProgramError::Killed)));
    }

    /// Records message arrival order for combinator-ordering assertions.
    struct OrderModel {
        arrivals: Vec<u64>,
    }

    #[derive(Clone, Copy)]
    enum Mode {
        Batch,
        Sequence,
    }

    impl Model for OrderModel {
        type Message = u64;
        type Flags = Mode;

        fn init(mode: Mode) -> (Self, Command<u64>) {
            let cmds = vec![
                Command::tick(Duration::from_millis(30), |_| 30),
                Command::tick(Duration::from_millis(10), |_| 10),
                Command::tick(Duration::from_millis(20), |_| 20),
            ];
            let cmd = match mode {
                Mode::Batch => Command::batch(cmds),
                Mode::Sequence => Command::sequence(cmds),
            };
            (OrderModel { arrivals: vec![] }, cmd)
        }

        fn update(&mut self, event: Event<u64>) -> Command<u64> {
            if let Event::App(n) = event {
                self.arrivals.push(n);
                if self.arrivals.len() == 3 {
                    return Command::quit();
                }
            }
            Command::none()
        }

        fn view(&self) -> String {
            format!("{:?}", self.arrivals)
        }
    }

    #[tokio::test]
    async fn batch_delivers_in_completion_order() {
        let model = Program::<OrderModel>::new(Mode::Batch)
            .with_input(tokio::io::empty())
            .with_output(std::io::sink())
            .run()
            .await
            .unwrap();
        assert_eq!(model.arrivals, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn sequence_delivers_in_argument_order() {
        let model = Program::<OrderModel>::new(Mode::Sequence)
            .with_input(tokio::io::empty())
            .with_output(std::io::sink())
            .run()
            .await
            .unwrap();
        assert_eq!(model.arrivals, vec![30, 10, 20]);
    }

    /// A command whose task panics must deliver nothing and leave the loop
    /// running.
    struct Sturdy {
        got: Vec<&'static str>,
    }

    impl Model for Sturdy {
        type Message = &'static str;
        type Flags = ();

        fn init(_: ()) -> (Self, Command<&'static str>) {
            let cmd = Command::batch(vec![
                Command::perform(async { panic!("boom") }, |_: ()| "never"),
                Command::tick(Duration::from_millis(30), |_| "tick"),
            ]);
            (Sturdy { got: vec![] }, cmd)
        }

        fn update(&mut self, event: Event<&'static str>) -> Command<&'static str> {
            if let Event::App(msg) = event {
                self.got.push(msg);
                if msg == "tick" {
                    return Command::quit();
                }
            }
            Command::none()
        }

        fn view(&self) -> String {
            self.got.join(",")
        }
    }

    #[tokio::test]
    async fn failing_command_is_contained() {
        let model = Program::<Sturdy>::new(())
            .with_input(tokio::io::empty())
            .with_output(std::io::sink())
            .run()
            .await
            .unwrap();
        assert_eq!(model.got, vec!["tick"]);
    }

    /// Repeating timer model: quits after three ticks.
    struct Ticker {
        ticks: u32,
    }

    impl Model for Ticker {
        type Message = ();
        type Flags = ();

        fn init(_: ()) -> (Self, Command<()>) {
            (
                Ticker { ticks: 0 },
                Command::every(Duration::from_millis(10), |_| ()),
            )
        }

        fn update(&mut self, event: Event<()>) -> Command<()> {
            if let Event::App(()) = event {
                self.ticks += 1;
                if self.ticks == 3 {
                    return Command::quit();
                }
            }
            Command::none()
        }

        fn view(&self) -> String {
            format!("ticks: {}", self.ticks)
        }
    }

    #[tokio::test]
    async fn every_fires_repeatedly() {
        let model = Program::<Ticker>::new(())
            .with_input(tokio::io::empty())
            .with_output(std::io::sink())
            .run()
            .await
            .unwrap();
        assert_eq!(model.ticks, 3);
    }

    #[tokio::test]
    async fn filter_drops_and_transforms_events() {
        let model = Program::<KeyCounter>::new(())
            .with_input(Cursor::new(b"abcq".to_vec()))
            .with_output(std::io::sink())
            .with_filter(|event| match event {
                // Drop every `b` before it reaches update.
                Event::Key(key) if key.is_char('b') => None,
                event => Some(event),
            })
            .run()
            .await
            .unwrap();
        assert_eq!(model.count, 2); // a and c
    }
}

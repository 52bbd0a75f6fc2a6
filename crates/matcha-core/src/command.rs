use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A side effect returned from [`Model::update`](crate::Model::update) or
/// [`Model::init`](crate::Model::init).
///
/// Commands represent async work, immediate messages, terminal mode changes,
/// and program lifecycle actions.  They are values: invoking one spawns an
/// independent task, and invoking the same constructor twice produces two
/// independent effects.  A command whose task fails delivers no message and
/// never crashes the program.
///
/// # Examples
///
/// ```rust,ignore
/// // Do nothing:
/// let cmd = Command::none();
///
/// // Run an async task and map the result to a message:
/// let cmd = Command::perform(
///     async { fetch_data().await },
///     |data| Msg::DataLoaded(data),
/// );
///
/// // Quit the program:
/// let cmd = Command::quit();
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) inner: CommandInner<Msg>,
}

pub(crate) enum CommandInner<Msg: Send + 'static> {
    None,
    Action(Action<Msg>),
    Future(BoxFuture<'static, Msg>),
    Stream(BoxStream<'static, Msg>),
    Batch(Vec<Command<Msg>>),
    Sequence(Vec<Command<Msg>>),
    Terminal(TerminalRequest),
    /// Execute an external process, releasing terminal control.
    Exec {
        cmd: ExecCommand,
        on_exit: Box<dyn FnOnce(std::io::Result<std::process::ExitStatus>) -> Msg + Send>,
    },
}

/// Action variants handled synchronously by the runtime, without spawning
/// async tasks.
pub(crate) enum Action<Msg> {
    /// Enqueue a message immediately.
    Message(Msg),
    /// Enqueue a quit request.
    Quit,
}

/// Terminal mode-control requests executed by the runtime.
///
/// Produced via [`Command::terminal`] or the convenience constructors such as
/// [`Command::enter_alt_screen`] and [`Command::hide_cursor`].  Each request
/// corresponds to a fixed ANSI control sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalRequest {
    /// Switch to the alternate screen buffer.
    EnterAltScreen,
    /// Return to the primary screen buffer.
    ExitAltScreen,
    /// Enable SGR mouse reporting in the given mode.
    EnableMouse(MouseMode),
    /// Disable mouse reporting.
    DisableMouse,
    /// Make the terminal cursor visible.
    ShowCursor,
    /// Hide the terminal cursor.
    HideCursor,
    /// Enable bracketed paste mode.
    EnableBracketedPaste,
    /// Disable bracketed paste mode.
    DisableBracketedPaste,
    /// Enable focus-in/focus-out reporting.
    EnableFocusReporting,
    /// Disable focus-in/focus-out reporting.
    DisableFocusReporting,
    /// Set the terminal window title.
    SetTitle(String),
    /// Clear the entire screen and force the next frame to repaint.
    ClearScreen,
    /// Print a line above the UI (for inline mode).
    Println(String),
    /// Print text above the UI without a trailing newline.
    Printf(String),
    /// Suspend the process (SIGTSTP on Unix).
    Suspend,
}

/// Mouse reporting modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Click, release, wheel, drag.
    CellMotion,
    /// All of the above plus hover motion.
    AllMotion,
}

/// Configuration for executing an external process via [`Command::exec`].
///
/// Build with [`ExecCommand::new`], then chain [`arg`](ExecCommand::arg),
/// [`args`](ExecCommand::args), and [`working_dir`](ExecCommand::working_dir).
#[derive(Debug)]
pub struct ExecCommand {
    /// The command to execute.
    pub program: String,
    /// Arguments to the command.
    pub args: Vec<String>,
    /// Working directory (None = inherit).
    pub working_dir: Option<PathBuf>,
}

impl ExecCommand {
    /// Create a new `ExecCommand` for the given program name or path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Append a single argument to the command.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments to the command.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the child process.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl<Msg: Send + 'static> Command<Msg> {
    /// No-op command.
    pub fn none() -> Self {
        Command {
            inner: CommandInner::None,
        }
    }

    /// Run an async future, map the result to a message.
    pub fn perform<F, T>(future: F, map: impl FnOnce(T) -> Msg + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Command {
            inner: CommandInner::Future(Box::pin(async move { map(future.await) })),
        }
    }

    /// Deliver a message immediately.
    pub fn message(msg: Msg) -> Self {
        Command {
            inner: CommandInner::Action(Action::Message(msg)),
        }
    }

    /// Request a graceful quit.
    ///
    /// The quit enters the message queue like any other message; when the
    /// runtime dequeues it the loop stops without a further `update` call,
    /// so quitting never mutates the model.
    pub fn quit() -> Self {
        Command {
            inner: CommandInner::Action(Action::Quit),
        }
    }

    /// Run multiple commands concurrently.
    ///
    /// Each command's messages enter the queue in the order the commands
    /// *complete*, not the order given.  Use [`sequence`](Command::sequence)
    /// when ordering matters.
    pub fn batch(cmds: impl IntoIterator<Item = Command<Msg>>) -> Self {
        let cmds: Vec<_> = cmds.into_iter().filter(|cmd| !cmd.is_none()).collect();
        if cmds.is_empty() {
            return Command::none();
        }
        if cmds.len() == 1 {
            let mut cmds = cmds;
            return cmds.pop().unwrap();
        }
        Command {
            inner: CommandInner::Batch(cmds),
        }
    }

    /// Run commands one at a time — each command's messages are delivered
    /// before the next command starts, regardless of individual latency.
    pub fn sequence(cmds: impl IntoIterator<Item = Command<Msg>>) -> Self {
        let cmds: Vec<_> = cmds.into_iter().filter(|cmd| !cmd.is_none()).collect();
        if cmds.is_empty() {
            return Command::none();
        }
        if cmds.len() == 1 {
            let mut cmds = cmds;
            return cmds.pop().unwrap();
        }
        Command {
            inner: CommandInner::Sequence(cmds),
        }
    }

    /// One-shot timer: fires once after `duration`, mapping the fire time to
    /// a message.
    pub fn tick(duration: Duration, map: impl FnOnce(Instant) -> Msg + Send + 'static) -> Self {
        Command {
            inner: CommandInner::Future(Box::pin(async move {
                tokio::time::sleep(duration).await;
                map(Instant::now())
            })),
        }
    }

    /// Repeating timer: fires every `interval`, starting one interval from
    /// now, mapping each fire time to a message.
    ///
    /// There is no cancellation handle: embed a [`TickTag`] in the produced
    /// message and have `update` ignore ticks whose tag is stale.
    pub fn every(interval: Duration, map: impl Fn(Instant) -> Msg + Send + Sync + 'static) -> Self {
        use futures::StreamExt;
        // The timer is created on first poll, inside the runtime's task.
        let stream = futures::stream::once(async move {
            let start = tokio::time::Instant::now() + interval;
            tokio_stream::wrappers::IntervalStream::new(tokio::time::interval_at(start, interval))
        })
        .flatten()
        .map(move |tick| map(tick.into_std()));
        Command {
            inner: CommandInner::Stream(Box::pin(stream)),
        }
    }

    /// Terminal mode-control request.
    pub fn terminal(request: TerminalRequest) -> Self {
        Command {
            inner: CommandInner::Terminal(request),
        }
    }

    /// Transform the message type (for component composition).
    pub fn map<NewMsg: Send + 'static>(
        self,
        f: impl Fn(Msg) -> NewMsg + Send + Sync + 'static,
    ) -> Command<NewMsg> {
        self.map_with(std::sync::Arc::new(f))
    }

    fn map_with<NewMsg: Send + 'static>(
        self,
        f: std::sync::Arc<dyn Fn(Msg) -> NewMsg + Send + Sync>,
    ) -> Command<NewMsg> {
        match self.inner {
            CommandInner::None => Command::none(),
            CommandInner::Action(Action::Message(msg)) => Command::message(f(msg)),
            CommandInner::Action(Action::Quit) => Command::quit(),
            CommandInner::Future(fut) => {
                let f = f.clone();
                Command {
                    inner: CommandInner::Future(Box::pin(async move { f(fut.await) })),
                }
            }
            CommandInner::Stream(stream) => {
                use futures::StreamExt;
                let f = f.clone();
                Command {
                    inner: CommandInner::Stream(Box::pin(stream.map(move |msg| f(msg)))),
                }
            }
            CommandInner::Batch(cmds) => Command {
                inner: CommandInner::Batch(
                    cmds.into_iter().map(|cmd| cmd.map_with(f.clone())).collect(),
                ),
            },
            CommandInner::Sequence(cmds) => Command {
                inner: CommandInner::Sequence(
                    cmds.into_iter().map(|cmd| cmd.map_with(f.clone())).collect(),
                ),
            },
            CommandInner::Terminal(request) => Command::terminal(request),
            CommandInner::Exec { cmd, on_exit } => Command {
                inner: CommandInner::Exec {
                    cmd,
                    on_exit: Box::new(move |result| f(on_exit(result))),
                },
            },
        }
    }

    /// Execute an external process (e.g. `$EDITOR`), releasing terminal
    /// control for its duration.  The callback receives the exit status.
    pub fn exec(
        cmd: ExecCommand,
        on_exit: impl FnOnce(std::io::Result<std::process::ExitStatus>) -> Msg + Send + 'static,
    ) -> Self {
        Command {
            inner: CommandInner::Exec {
                cmd,
                on_exit: Box::new(on_exit),
            },
        }
    }

    /// Request the current window size.  The callback receives
    /// (columns, rows).
    pub fn window_size(map: impl FnOnce(u16, u16) -> Msg + Send + 'static) -> Self {
        Command {
            inner: CommandInner::Future(Box::pin(async move {
                let size = crossterm::terminal::size().unwrap_or((80, 24));
                map(size.0, size.1)
            })),
        }
    }

    /// Print a line above the UI area (for inline mode).
    pub fn println(text: impl Into<String>) -> Self {
        Command::terminal(TerminalRequest::Println(text.into()))
    }

    /// Print text above the UI area without a trailing newline.
    pub fn printf(text: impl Into<String>) -> Self {
        Command::terminal(TerminalRequest::Printf(text.into()))
    }

    // Convenience terminal request constructors

    /// Switch to the alternate screen buffer.
    pub fn enter_alt_screen() -> Self {
        Command::terminal(TerminalRequest::EnterAltScreen)
    }

    /// Return to the primary screen buffer.
    pub fn exit_alt_screen() -> Self {
        Command::terminal(TerminalRequest::ExitAltScreen)
    }

    /// Enable mouse reporting in cell-motion mode (click, release, wheel,
    /// drag).
    pub fn enable_mouse_capture() -> Self {
        Command::terminal(TerminalRequest::EnableMouse(MouseMode::CellMotion))
    }

    /// Enable mouse reporting in all-motion mode (includes hover).
    pub fn enable_mouse_all() -> Self {
        Command::terminal(TerminalRequest::EnableMouse(MouseMode::AllMotion))
    }

    /// Disable mouse reporting.
    pub fn disable_mouse() -> Self {
        Command::terminal(TerminalRequest::DisableMouse)
    }

    /// Make the terminal cursor visible.
    pub fn show_cursor() -> Self {
        Command::terminal(TerminalRequest::ShowCursor)
    }

    /// Hide the terminal cursor.
    pub fn hide_cursor() -> Self {
        Command::terminal(TerminalRequest::HideCursor)
    }

    /// Set the terminal window title.
    pub fn set_title(title: impl Into<String>) -> Self {
        Command::terminal(TerminalRequest::SetTitle(title.into()))
    }

    /// Clear the entire screen.
    pub fn clear_screen() -> Self {
        Command::terminal(TerminalRequest::ClearScreen)
    }

    /// Suspend the process (SIGTSTP on Unix).
    pub fn suspend() -> Self {
        Command::terminal(TerminalRequest::Suspend)
    }

    // --- Inspection methods (useful for testing) ---

    /// Returns `true` if this is a no-op command.
    pub fn is_none(&self) -> bool {
        matches!(self.inner, CommandInner::None)
    }

    /// If this command is an immediate message, return it.
    pub fn into_message(self) -> Option<Msg> {
        match self.inner {
            CommandInner::Action(Action::Message(msg)) => Some(msg),
            _ => None,
        }
    }

    /// If this command is a batch, return the inner commands.
    pub fn into_batch(self) -> Option<Vec<Command<Msg>>> {
        match self.inner {
            CommandInner::Batch(cmds) => Some(cmds),
            _ => None,
        }
    }
}

/// A (timer identity, generation) pair for recognizing stale timer messages.
///
/// [`Command::every`] has no cancellation handle; the idiom is to carry a
/// `TickTag` on every timer-originated message and bump the generation
/// whenever the timer is logically restarted.  `update` then drops delivered
/// ticks whose tag no longer [`matches`](TickTag::matches) the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickTag {
    /// Which timer instance this tick belongs to.
    pub timer: u64,
    /// Incremented on every restart; stale ticks carry an old value.
    pub generation: u64,
}

impl TickTag {
    /// First generation of a timer identity (obtain ids from [`IdSource`]).
    pub fn new(timer: u64) -> Self {
        Self {
            timer,
            generation: 0,
        }
    }

    /// Invalidate all ticks issued under the current generation.
    pub fn bump(&mut self) {
        self.generation += 1;
    }

    /// True when a delivered tick is still current.
    pub fn matches(self, delivered: TickTag) -> bool {
        self == delivered
    }
}

/// Monotonic identity generator for timers and other per-instance routing.
///
/// Pass one `IdSource` (or ids drawn from it) into component constructors
/// instead of relying on module-level globals — this keeps instance
/// identities explicit and tests deterministic.
#[derive(Debug, Default)]
pub struct IdSource(AtomicU64);

impl IdSource {
    /// A source starting at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next unused id.
    pub fn next_id(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_none_is_none() {
        let cmd: Command<()> = Command::none();
        assert!(cmd.is_none());
    }

    #[test]
    fn command_message_creates_action() {
        let cmd: Command<i32> = Command::message(42);
        assert_eq!(cmd.into_message(), Some(42));
    }

    #[test]
    fn command_quit_creates_quit() {
        let cmd: Command<()> = Command::quit();
        assert!(matches!(cmd.inner, CommandInner::Action(Action::Quit)));
    }

    #[test]
    fn command_batch_empty_returns_none() {
        let cmd: Command<()> = Command::batch(vec![]);
        assert!(cmd.is_none());
    }

    #[test]
    fn command_batch_drops_none_entries() {
        let cmd: Command<i32> = Command::batch(vec![Command::none(), Command::message(1)]);
        assert_eq!(cmd.into_message(), Some(1));
    }

    #[test]
    fn command_batch_single_unwraps() {
        let cmd: Command<i32> = Command::batch(vec![Command::message(1)]);
        assert_eq!(cmd.into_message(), Some(1));
    }

    #[test]
    fn command_batch_multiple() {
        let cmd: Command<i32> = Command::batch(vec![Command::message(1), Command::message(2)]);
        match cmd.inner {
            CommandInner::Batch(cmds) => assert_eq!(cmds.len(), 2),
            _ => panic!("expected Batch"),
        }
    }

    #[test]
    fn command_sequence_empty_returns_none() {
        let cmd: Command<()> = Command::sequence(vec![]);
        assert!(cmd.is_none());
    }

    #[test]
    fn command_map_message() {
        let cmd: Command<i32> = Command::message(42);
        let mapped: Command<String> = cmd.map(|n| n.to_string());
        assert_eq!(mapped.into_message(), Some("42".to_string()));
    }

    #[test]
    fn command_map_quit_stays_quit() {
        let cmd: Command<i32> = Command::quit();
        let mapped: Command<String> = cmd.map(|n| n.to_string());
        assert!(matches!(mapped.inner, CommandInner::Action(Action::Quit)));
    }

    #[test]
    fn command_map_terminal_preserves_request() {
        let cmd: Command<i32> = Command::enter_alt_screen();
        let mapped: Command<String> = cmd.map(|n| n.to_string());
        match mapped.inner {
            CommandInner::Terminal(TerminalRequest::EnterAltScreen) => {}
            _ => panic!("expected terminal request preserved"),
        }
    }

    #[test]
    fn command_map_batch() {
        let cmd: Command<i32> = Command::batch(vec![Command::message(1), Command::message(2)]);
        let mapped: Command<String> = cmd.map(|n| n.to_string());
        match mapped.inner {
            CommandInner::Batch(cmds) => assert_eq!(cmds.len(), 2),
            _ => panic!("expected mapped batch"),
        }
    }

    #[test]
    fn terminal_request_constructors() {
        let cmd: Command<()> = Command::enable_mouse_all();
        assert!(matches!(
            cmd.inner,
            CommandInner::Terminal(TerminalRequest::EnableMouse(MouseMode::AllMotion))
        ));

        let cmd: Command<()> = Command::set_title("test");
        match cmd.inner {
            CommandInner::Terminal(TerminalRequest::SetTitle(s)) => assert_eq!(s, "test"),
            _ => panic!("expected SetTitle"),
        }
    }

    #[test]
    fn tick_tag_staleness() {
        let ids = IdSource::new();
        let mut current = TickTag::new(ids.next_id());
        let issued = current;
        assert!(current.matches(issued));

        current.bump();
        assert!(!current.matches(issued));
    }

    #[test]
    fn id_source_is_monotonic() {
        let ids = IdSource::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);
    }
}

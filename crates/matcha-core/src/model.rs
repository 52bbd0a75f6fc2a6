use crate::command::Command;
use crate::message::Event;

/// The top-level application trait, following the [Elm Architecture].
///
/// Every matcha application implements `Model`.  The runtime drives a
/// continuous **init -> update -> view** cycle:
///
/// 1. [`init`](Model::init) creates the initial state and may return a
///    [`Command`] for early side effects (e.g. fetching data).
/// 2. [`view`](Model::view) renders the current state to a string.
/// 3. External events — decoded key and mouse input, resizes, focus changes,
///    and resolved command results — arrive as [`Event`]s.
/// 4. [`update`](Model::update) processes each event, mutates state, and
///    optionally returns a [`Command`] for further work.
/// 5. Steps 2–4 repeat until a [`Command::quit`] is dequeued.
///
/// The runtime holds the model exclusively and delivers events one at a
/// time, so `update` calls never overlap and no synchronization is needed
/// around application state.
///
/// # Example
///
/// ```rust,ignore
/// use matcha_core::{Command, Event, Model};
///
/// struct Counter {
///     count: i64,
/// }
///
/// #[derive(Debug)]
/// enum Msg {
///     Tick,
/// }
///
/// impl Model for Counter {
///     type Message = Msg;
///     type Flags = ();
///
///     fn init(_flags: ()) -> (Self, Command<Msg>) {
///         (Counter { count: 0 }, Command::none())
///     }
///
///     fn update(&mut self, event: Event<Msg>) -> Command<Msg> {
///         match event {
///             Event::Key(key) if key.is_char('q') => return Command::quit(),
///             Event::Key(key) if key.is_char('+') => self.count += 1,
///             Event::App(Msg::Tick) => self.count += 1,
///             _ => {}
///         }
///         Command::none()
///     }
///
///     fn view(&self) -> String {
///         format!("Count: {}\n\nPress q to quit.", self.count)
///     }
/// }
/// ```
///
/// [Elm Architecture]: https://guide.elm-lang.org/architecture/
pub trait Model: Sized + Send + 'static {
    /// The application's message type.
    ///
    /// Every application-defined event is a variant of this type, delivered
    /// wrapped in [`Event::App`].  Messages are produced by
    /// [`Command::message`], by async work via [`Command::perform`], by
    /// timers via [`Command::tick`]/[`Command::every`], or injected from
    /// outside through a [`ProgramHandle`](crate::ProgramHandle).
    type Message: Send + 'static;

    /// Initialization data passed to [`Model::init`].
    ///
    /// Use `()` when no startup data is needed.
    type Flags: Send + 'static;

    /// Create the initial model state and an optional startup command.
    ///
    /// Called once before the run loop starts.  Return [`Command::none()`]
    /// if no startup side effects are needed.
    fn init(flags: Self::Flags) -> (Self, Command<Self::Message>);

    /// Process one event, mutate state, and return a command for side
    /// effects.
    ///
    /// This is the heart of the application.  Pattern-match on the incoming
    /// [`Event`] with a wildcard arm for variants you do not handle — the
    /// runtime may deliver kinds your application has never seen, and they
    /// must be ignored rather than treated as errors.
    fn update(&mut self, event: Event<Self::Message>) -> Command<Self::Message>;

    /// Render the current state to a string.
    ///
    /// Must be a pure function of `&self`.  The returned frame replaces the
    /// whole screen; lines are separated by `\n`.  The runtime deduplicates
    /// identical frames and throttles writes, so returning the same string
    /// repeatedly is free.
    fn view(&self) -> String;
}

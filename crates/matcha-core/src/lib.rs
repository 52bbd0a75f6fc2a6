//! Core runtime for the **matcha** TUI framework.
//!
//! `matcha-core` provides the traits, types, and runtime that power every
//! matcha application.  The design follows the [Elm Architecture]: your
//! program is expressed as a pure **init -> update -> view** cycle, with side
//! effects pushed to the edges through [`Command`]s.
//!
//! Unlike frameworks that delegate terminal handling to an event library,
//! matcha owns the whole path between the byte stream and your model: a
//! restartable escape-sequence decoder turns raw input into typed key and
//! mouse events, and a throttled, deduplicating renderer writes whole string
//! frames back.
//!
//! # Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Model`] | Top-level application trait (init / update / view) |
//! | [`Event`] | Message vocabulary delivered to `update` |
//! | [`Command`] | Describes a side effect to be executed by the runtime |
//! | [`Program`] | Wires a [`Model`] to a terminal and drives the event loop |
//! | [`ProgramHandle`] | Inject messages or stop a running program from outside |
//! | [`Decoder`] | Chunked byte-stream parser for terminal input |
//! | [`TestProgram`](testing::TestProgram) | Headless harness for unit-testing a [`Model`] |
//!
//! # Architecture
//!
//! 1. **init** — [`Model::init`] creates the initial state and may return a
//!    [`Command`] to kick off early work.
//! 2. **view** — the runtime calls [`Model::view`] and stages the returned
//!    frame; the renderer writes it only if it changed, at a bounded rate.
//! 3. **event** — decoded input, resizes, focus changes, and resolved
//!    command results enter one ordered queue.
//! 4. **update** — [`Model::update`] receives each event in turn, mutates
//!    state, and optionally returns a [`Command`] for further side effects.
//!    Update calls never overlap; only command execution is concurrent.
//! 5. **repeat** — steps 2-4 repeat until a [`Command::quit`] is dequeued.
//!
//! # Quick example
//!
//! ```ignore
//! use matcha_core::{Command, Event, Model};
//!
//! struct Hello;
//!
//! impl Model for Hello {
//!     type Message = ();
//!     type Flags = ();
//!
//!     fn init(_: ()) -> (Self, Command<()>) {
//!         (Hello, Command::none())
//!     }
//!
//!     fn update(&mut self, event: Event<()>) -> Command<()> {
//!         match event {
//!             Event::Key(_) => Command::quit(),
//!             _ => Command::none(),
//!         }
//!     }
//!
//!     fn view(&self) -> String {
//!         "Hello, matcha! Press any key to exit.".into()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     matcha_core::run::<Hello>(()).await.unwrap();
//! }
//! ```
//!
//! [Elm Architecture]: https://guide.elm-lang.org/architecture/

pub mod command;
pub mod input;
pub mod key;
pub mod message;
pub mod model;
pub mod mouse;
pub mod program;
mod renderer;
pub mod testing;

pub use command::{Command, ExecCommand, IdSource, MouseMode, TerminalRequest, TickTag};
pub use input::{Decoder, InputEvent};
pub use key::{Key, KeyEvent};
pub use message::Event;
pub use model::Model;
pub use mouse::{MouseAction, MouseButton, MouseEvent};
pub use program::{
    log_to_file, OutputTarget, Program, ProgramError, ProgramHandle, ProgramOptions,
};

/// Run a matcha application with default options.
pub async fn run<M: Model>(flags: M::Flags) -> Result<M, ProgramError> {
    Program::<M>::new(flags).run().await
}

/// Run with custom options.
pub async fn run_with<M: Model>(
    flags: M::Flags,
    options: ProgramOptions,
) -> Result<M, ProgramError> {
    Program::<M>::with_options(flags, options).run().await
}

use crate::command::{Action, Command, CommandInner};
use crate::input::{Decoder, InputEvent};
use crate::key::Key;
use crate::message::Event;
use crate::model::Model;

/// A headless test harness that drives a [`Model`] without a terminal.
///
/// `TestProgram` exercises the init/update/view cycle in a plain `#[test]`
/// function — no tokio runtime or TTY required.  Synchronous commands
/// ([`Command::message`], [`Command::quit`]) are collected and can be flushed
/// with [`drain_messages`](TestProgram::drain_messages); async and terminal
/// commands are silently ignored.  Raw terminal bytes can be pushed through a
/// real input decoder with [`feed_input`](TestProgram::feed_input).
///
/// # Example
///
/// ```rust,ignore
/// use matcha_core::testing::TestProgram;
///
/// let mut prog = TestProgram::<Counter>::new(0); // calls Counter::init(0)
/// prog.feed_input(b"++");                        // decoded key events
/// assert_eq!(prog.model().count, 2);
/// assert!(prog.render().contains("Count: 2"));
///
/// prog.feed_input(b"q");
/// assert!(prog.quit_requested());
/// ```
pub struct TestProgram<M: Model> {
    model: M,
    decoder: Decoder,
    pending: Vec<Event<M::Message>>,
    quit_requested: bool,
}

impl<M: Model> TestProgram<M> {
    /// Create a test program by calling [`Model::init`] with the given flags.
    ///
    /// Synchronous commands produced by `init` are collected into the
    /// pending-message queue; call
    /// [`drain_messages`](TestProgram::drain_messages) to process them.
    pub fn new(flags: M::Flags) -> Self {
        let (model, init_cmd) = M::init(flags);
        let mut program = Self {
            model,
            decoder: Decoder::new(),
            pending: Vec::new(),
            quit_requested: false,
        };
        program.collect_sync(init_cmd);
        program
    }

    /// Deliver one event, triggering a single update cycle.
    ///
    /// Mirrors the runtime's dispatch: [`Event::Quit`] is intercepted without
    /// reaching `update`, and [`Event::Interrupt`] is delivered and then
    /// marks the program as quit.
    pub fn send(&mut self, event: Event<M::Message>) {
        match event {
            Event::Quit => self.quit_requested = true,
            Event::Interrupt => {
                let cmd = self.model.update(Event::Interrupt);
                self.collect_sync(cmd);
                self.quit_requested = true;
            }
            event => {
                let cmd = self.model.update(event);
                self.collect_sync(cmd);
            }
        }
    }

    /// Deliver an application message (shorthand for `send(Event::App(..))`).
    pub fn send_message(&mut self, msg: M::Message) {
        self.send(Event::App(msg));
    }

    /// Push raw terminal bytes through the input decoder and deliver every
    /// resulting event.
    ///
    /// Chunking works exactly as at runtime: an incomplete escape sequence is
    /// carried over to the next `feed_input` call.
    pub fn feed_input(&mut self, bytes: &[u8]) {
        let events = self.decoder.feed(bytes);
        for event in events {
            self.send(input_to_event(event));
        }
    }

    /// Process all pending synchronous messages produced by
    /// [`Command::message`].
    ///
    /// Repeatedly drains the pending queue, calling [`Model::update`] for
    /// each message, until no new synchronous messages are generated.  Useful
    /// for command-chaining scenarios where one update produces a message
    /// that triggers another update.
    pub fn drain_messages(&mut self) {
        while !self.pending.is_empty() {
            let events: Vec<_> = self.pending.drain(..).collect();
            for event in events {
                self.send(event);
            }
        }
    }

    /// Get a shared reference to the model for assertions.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get a mutable reference to the model for direct test setup.
    ///
    /// This bypasses the normal message-driven update cycle, which can be
    /// useful for arranging state before sending events.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Render the current state, exactly as the runtime would stage it.
    pub fn render(&self) -> String {
        self.model.view()
    }

    /// True once a quit has been requested (via [`Command::quit`], a decoded
    /// `ctrl+c`, or an explicit [`Event::Quit`]).
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    fn collect_sync(&mut self, cmd: Command<M::Message>) {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Action(Action::Message(msg)) => {
                self.pending.push(Event::App(msg));
            }
            CommandInner::Action(Action::Quit) => {
                self.quit_requested = true;
            }
            CommandInner::Batch(cmds) | CommandInner::Sequence(cmds) => {
                for cmd in cmds {
                    self.collect_sync(cmd);
                }
            }
            // Async and terminal commands cannot run without a runtime.
            CommandInner::Future(_) | CommandInner::Stream(_) => {}
            CommandInner::Terminal(_) => {}
            CommandInner::Exec { .. } => {}
        }
    }
}

/// The runtime's input mapping, mirrored for the harness: a plain `ctrl+c`
/// becomes an interrupt, everything else passes through.
fn input_to_event<Msg>(event: InputEvent) -> Event<Msg> {
    match event {
        InputEvent::Key(key) if key.key == Key::Ctrl('c') && !key.alt && !key.paste => {
            Event::Interrupt
        }
        InputEvent::Key(key) => Event::Key(key),
        InputEvent::Mouse(mouse) => Event::Mouse(mouse),
        InputEvent::FocusGained => Event::FocusGained,
        InputEvent::FocusLost => Event::FocusLost,
    }
}

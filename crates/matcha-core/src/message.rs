use crate::key::KeyEvent;
use crate::mouse::MouseEvent;

/// A message delivered to [`Model::update`](crate::Model::update).
///
/// `Event` is the runtime's whole message vocabulary: the built-in variants
/// are produced by the input decoder, the signal listeners, and the program
/// lifecycle; [`Event::App`] lifts the application's own message type, which
/// is what [`Command`](crate::Command)s resolve to.
///
/// Match exhaustively with a wildcard arm — variants your application does
/// not care about must be ignored, never treated as an error:
///
/// ```rust,ignore
/// fn update(&mut self, event: Event<Msg>) -> Command<Msg> {
///     match event {
///         Event::Key(key) if key.is_char('q') => return Command::quit(),
///         Event::App(msg) => self.apply(msg),
///         Event::Resize { width, .. } => self.width = width,
///         _ => {}
///     }
///     Command::none()
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<M> {
    /// A keyboard event from the input decoder.
    Key(KeyEvent),
    /// A mouse event from the input decoder (requires a mouse mode).
    Mouse(MouseEvent),
    /// Terminal resized to (columns, rows).  Also sent once at startup with
    /// the initial size.
    Resize {
        /// New width in columns.
        width: u16,
        /// New height in rows.
        height: u16,
    },
    /// Terminal window gained focus (requires focus reporting).
    FocusGained,
    /// Terminal window lost focus (requires focus reporting).
    FocusLost,
    /// The program is about to suspend (job control).  Delivered before the
    /// process stops so state can be flushed.
    Suspend,
    /// The program resumed after a suspend; the screen has been repainted.
    Resume,
    /// Interrupt requested (`ctrl+c`).  Delivered to `update`, after which
    /// the program quits gracefully.  Use a message filter to remap it.
    Interrupt,
    /// Quit request.  Intercepted by the runtime — `update` never sees it.
    Quit,
    /// An application-defined message.
    App(M),
}

impl<M> Event<M> {
    /// If this is an application message, return it.
    pub fn into_app(self) -> Option<M> {
        match self {
            Event::App(msg) => Some(msg),
            _ => None,
        }
    }

    /// Rewrite the application message type (for component composition).
    pub fn map<N>(self, f: impl FnOnce(M) -> N) -> Event<N> {
        match self {
            Event::App(msg) => Event::App(f(msg)),
            Event::Key(k) => Event::Key(k),
            Event::Mouse(m) => Event::Mouse(m),
            Event::Resize { width, height } => Event::Resize { width, height },
            Event::FocusGained => Event::FocusGained,
            Event::FocusLost => Event::FocusLost,
            Event::Suspend => Event::Suspend,
            Event::Resume => Event::Resume,
            Event::Interrupt => Event::Interrupt,
            Event::Quit => Event::Quit,
        }
    }
}

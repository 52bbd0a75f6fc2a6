//! **matcha** — an Elm-architecture TUI framework that owns its own input
//! decoding and rendering.
//!
//! This is the umbrella crate that re-exports everything you need to build a
//! matcha application from a single dependency:
//!
//! ```toml
//! [dependencies]
//! matcha = "0.1"
//! ```
//!
//! # Re-exports
//!
//! * All public items from [`matcha_core`] are available at the crate root
//!   ([`Model`], [`Event`], [`Command`], [`Program`], [`run`], [`run_with`],
//!   etc.).
//! * [`tokio`] is re-exported so downstream crates can write
//!   `#[matcha::tokio::main]` without depending on it directly.
//!
//! # Quick start
//!
//! ```ignore
//! use matcha::{Command, Event, Model};
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
//!     fn update(&mut self, event: Event<()>) -> Command<()> {
//!         match event {
//!             Event::Key(_) => Command::quit(),
//!             _ => Command::none(),
//!         }
//!     }
//!     fn view(&self) -> String {
//!         "Hello, matcha!".into()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     matcha::run::<Hello>(()).await.unwrap();
//! }
//! ```

pub use matcha_core::*;

// Re-export the async runtime for examples and downstream crates
pub use tokio;

//! # Counter Example
//!
//! A minimal counter app demonstrating the core matcha architecture:
//! - Implementing the [`Model`] trait with `init`, `update`, and `view`
//! - Matching on decoded key events
//! - Using `Command::none()` and `Command::quit()`
//!
//! Run with: `cargo run --example counter`

use matcha::{Command, Event, Key, Model};

/// A minimal counter app that validates the core loop.
struct Counter {
    count: i64,
}

impl Model for Counter {
    type Message = ();
    type Flags = ();

    fn init(_: ()) -> (Self, Command<()>) {
        (Counter { count: 0 }, Command::none())
    }

    fn update(&mut self, event: Event<()>) -> Command<()> {
        match event {
            Event::Key(key) => match key.key {
                Key::Char('+') | Key::Char('k') | Key::Up => self.count += 1,
                Key::Char('-') | Key::Char('j') | Key::Down => self.count -= 1,
                Key::Char('r') => self.count = 0,
                Key::Char('q') | Key::Esc => return Command::quit(),
                _ => {}
            },
            _ => {}
        }
        Command::none()
    }

    fn view(&self) -> String {
        let title = "matcha counter";
        let rule = "─".repeat(title.len());
        format!(
            "{title}\n{rule}\n\n  count: {}\n\n  +/k/up    increment\n  -/j/down  decrement\n  r         reset\n  q         quit\n",
            self.count
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), matcha::ProgramError> {
    let model = matcha::run::<Counter>(()).await?;
    println!("final count: {}", model.count);
    Ok(())
}

//! # Stopwatch Example
//!
//! Demonstrates repeating timers and the generation-tag idiom:
//! [`Command::every`] has no cancellation handle, so every tick message
//! carries a [`TickTag`] and `update` ignores ticks whose tag is stale.
//! Toggling the stopwatch bumps the generation, which orphans the previous
//! timer stream.
//!
//! Run with: `cargo run --example stopwatch`

use matcha::{Command, Event, IdSource, Key, Model, TickTag};
use std::time::Duration;

const RESOLUTION: Duration = Duration::from_millis(100);

struct Stopwatch {
    tag: TickTag,
    running: bool,
    elapsed: Duration,
}

#[derive(Debug)]
enum Msg {
    Tick(TickTag),
}

impl Model for Stopwatch {
    type Message = Msg;
    type Flags = ();

    fn init(_: ()) -> (Self, Command<Msg>) {
        let ids = IdSource::new();
        let model = Stopwatch {
            tag: TickTag::new(ids.next_id()),
            running: false,
            elapsed: Duration::ZERO,
        };
        (model, Command::none())
    }

    fn update(&mut self, event: Event<Msg>) -> Command<Msg> {
        match event {
            Event::Key(key) => match key.key {
                Key::Char(' ') | Key::Char('s') => {
                    // Any ticks still in flight belong to the old generation.
                    self.tag.bump();
                    self.running = !self.running;
                    if self.running {
                        let tag = self.tag;
                        return Command::every(RESOLUTION, move |_| Msg::Tick(tag));
                    }
                }
                Key::Char('r') => self.elapsed = Duration::ZERO,
                Key::Char('q') | Key::Esc => return Command::quit(),
                _ => {}
            },
            Event::App(Msg::Tick(tag)) if self.tag.matches(tag) => {
                self.elapsed += RESOLUTION;
            }
            _ => {}
        }
        Command::none()
    }

    fn view(&self) -> String {
        let state = if self.running { "running" } else { "stopped" };
        format!(
            "stopwatch  {:>7.1}s  [{state}]\n\n  space/s  start/stop\n  r        reset\n  q        quit\n",
            self.elapsed.as_secs_f64()
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), matcha::ProgramError> {
    let model = matcha::run::<Stopwatch>(()).await?;
    println!("elapsed: {:.1}s", model.elapsed.as_secs_f64());
    Ok(())
}

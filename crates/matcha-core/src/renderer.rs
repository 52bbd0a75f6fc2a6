//! Throttled, deduplicating frame output.
//!
//! The renderer never initiates I/O on its own: [`Renderer::write`] only
//! stages the latest frame, and the program's frame-rate interval calls
//! [`Renderer::flush`] at most once per tick.  A flush writes nothing when
//! the staged frame equals the last frame written, so models can return the
//! same `view()` output every update for free.
//!
//! Each real flush replaces the whole screen: clear, cursor home, frame.
//! There is deliberately no incremental line diffing — a full replace has no
//! notion of "previous layout" to get wrong across resizes, and the output
//! byte stream stays predictable.

use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use crossterm::Command as _;
use std::io::{self, Write};

pub(crate) struct Renderer<W: Write> {
    out: W,
    staged: Option<String>,
    last: Option<String>,
    force: bool,
}

impl<W: Write> Renderer<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out,
            staged: None,
            last: None,
            force: false,
        }
    }

    /// Stage a frame for the next flush.  Performs no I/O.
    pub(crate) fn write(&mut self, frame: String) {
        self.staged = Some(frame);
    }

    /// Force the next flush to repaint even if the frame is unchanged.
    ///
    /// Used after resizes, mode changes, and inline prints, where the
    /// terminal's contents may have diverged from the last written frame.
    pub(crate) fn repaint(&mut self) {
        self.force = true;
    }

    /// Write the staged frame if it differs from the last one written (or a
    /// repaint was forced), as a single buffered write.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        let frame = match self.staged.take() {
            Some(frame) => frame,
            // A forced repaint with nothing staged redraws the last frame.
            None if self.force => match self.last.clone() {
                Some(frame) => frame,
                None => {
                    self.force = false;
                    return Ok(());
                }
            },
            None => return Ok(()),
        };

        if !self.force && self.last.as_deref() == Some(frame.as_str()) {
            return Ok(());
        }
        self.force = false;

        let mut payload = String::with_capacity(frame.len() + 16);
        // write_ansi into a String cannot fail
        let _ = Clear(ClearType::All).write_ansi(&mut payload);
        let _ = MoveTo(0, 0).write_ansi(&mut payload);
        push_crlf_normalized(&mut payload, &frame);

        self.out.write_all(payload.as_bytes())?;
        self.out.flush()?;
        self.last = Some(frame);
        Ok(())
    }

    /// Final synchronous flush before the renderer is dropped.
    pub(crate) fn stop(&mut self) -> io::Result<()> {
        self.flush()
    }

    /// Direct access to the underlying writer for mode-control sequences.
    pub(crate) fn out_mut(&mut self) -> &mut W {
        &mut self.out
    }
}

/// Append `frame` with every line break emitted as `\r\n` — raw mode does
/// not translate bare `\n`.
fn push_crlf_normalized(out: &mut String, frame: &str) {
    for (i, line) in frame.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        out.push_str(line.strip_suffix('\r').unwrap_or(line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAR_HOME: &str = "\u{1b}[2J\u{1b}[1;1H";

    fn writes(buf: &[u8]) -> usize {
        let text = String::from_utf8_lossy(buf);
        text.matches(CLEAR_HOME).count()
    }

    #[test]
    fn identical_frame_writes_once() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.write("hello".into());
        renderer.flush().unwrap();
        renderer.write("hello".into());
        renderer.flush().unwrap();
        assert_eq!(writes(&renderer.out), 1);
    }

    #[test]
    fn changed_frame_writes_again() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.write("one".into());
        renderer.flush().unwrap();
        renderer.write("two".into());
        renderer.flush().unwrap();
        assert_eq!(writes(&renderer.out), 2);
    }

    #[test]
    fn repaint_forces_rewrite_of_same_frame() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.write("hello".into());
        renderer.flush().unwrap();
        renderer.repaint();
        renderer.write("hello".into());
        renderer.flush().unwrap();
        assert_eq!(writes(&renderer.out), 2);
    }

    #[test]
    fn repaint_without_staged_frame_redraws_last() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.write("hello".into());
        renderer.flush().unwrap();
        renderer.repaint();
        renderer.flush().unwrap();
        assert_eq!(writes(&renderer.out), 2);
    }

    #[test]
    fn flush_without_staged_frame_is_noop() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.flush().unwrap();
        assert!(renderer.out.is_empty());
    }

    #[test]
    fn newlines_become_crlf() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.write("a\nb\r\nc".into());
        renderer.flush().unwrap();
        let text = String::from_utf8(renderer.out).unwrap();
        assert!(text.ends_with("a\r\nb\r\nc"));
    }

    #[test]
    fn throttle_decisions_are_stable_across_stop() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.write("final".into());
        renderer.stop().unwrap();
        assert_eq!(writes(&renderer.out), 1);
    }
}

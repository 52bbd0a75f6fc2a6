//! Byte-stream input decoding.
//!
//! The terminal hands the runtime raw bytes in arbitrary chunks: a single
//! keypress, half of a UTF-8 rune, three mouse reports glued together, or an
//! escape sequence split at any byte boundary.  [`Decoder`] turns that stream
//! into [`InputEvent`]s without ever blocking: when a chunk ends in the
//! middle of a sequence the unconsumed tail is carried over and re-examined
//! once more bytes arrive.  Decoding the stream whole or split at any
//! boundary yields the same events.

use tracing::debug;

use crate::key::{self, Key, KeyEvent};
use crate::mouse::{self, MouseEvent};

const ESC: u8 = 0x1B;

/// Cap on the carry-over buffer.  A stream that never completes a sequence
/// (malformed or hostile) is dropped rather than accumulated forever.
const MAX_PENDING: usize = 64 * 1024;

/// An event produced by the [`Decoder`].
///
/// This is the decoder's slice of the runtime vocabulary; the program wraps
/// these into [`Event`](crate::Event) variants before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A keyboard event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// Focus-in report (`CSI I`).
    FocusGained,
    /// Focus-out report (`CSI O`).
    FocusLost,
}

/// Restartable decoder for the terminal input byte stream.
///
/// The only state carried between calls is the unconsumed byte tail of a
/// possibly-incomplete escape sequence and the bracketed-paste flag.  Feed
/// chunks as they arrive with [`feed`](Decoder::feed); call
/// [`finish`](Decoder::finish) once at end of stream so a trailing lone ESC
/// is delivered as an `esc` key instead of being held forever.
#[derive(Debug, Default)]
pub struct Decoder {
    pending: Vec<u8>,
    in_paste: bool,
}

enum Step {
    /// The buffer holds an incomplete prefix; wait for more bytes.
    NeedMore,
    /// Consume this many bytes and apply the output.
    Advance(usize, Output),
}

enum Output {
    /// Bytes consumed without an event (malformed or unsupported input).
    Nothing,
    Event(InputEvent),
    PasteBegin,
    PasteEnd,
}

impl Decoder {
    /// A fresh decoder with no carried-over state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk of input, returning all events completed by it.
    ///
    /// Any trailing bytes that look like the start of an escape sequence (or
    /// a partial UTF-8 rune) are retained and combined with the next chunk.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<InputEvent> {
        if self.pending.len() + bytes.len() > MAX_PENDING {
            debug!(target: "matcha::input", "pending input exceeded cap, dropping buffer");
            self.pending.clear();
        }
        self.pending.extend_from_slice(bytes);
        self.drain(false)
    }

    /// Drain end-of-stream state.
    ///
    /// Incomplete sequences can no longer complete: a lone ESC becomes an
    /// `esc` key and partial runes are dropped.
    pub fn finish(&mut self) -> Vec<InputEvent> {
        self.drain(true)
    }

    fn drain(&mut self, at_end: bool) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let mut offset = 0;
        while offset < self.pending.len() {
            match parse_one(&self.pending[offset..], self.in_paste, at_end) {
                Step::NeedMore => break,
                Step::Advance(consumed, output) => {
                    debug_assert!(consumed > 0, "decoder must always make progress");
                    offset += consumed.max(1);
                    match output {
                        Output::Nothing => {}
                        Output::Event(event) => events.push(event),
                        Output::PasteBegin => self.in_paste = true,
                        Output::PasteEnd => self.in_paste = false,
                    }
                }
            }
        }
        self.pending.drain(..offset);
        events
    }
}

fn key_event(key: Key, alt: bool, paste: bool) -> Output {
    Output::Event(InputEvent::Key(KeyEvent { key, alt, paste }))
}

fn parse_one(buf: &[u8], in_paste: bool, at_end: bool) -> Step {
    let first = buf[0];

    if first == ESC {
        return parse_escape(buf, in_paste, at_end);
    }

    if let Some(key) = key::control_key(first) {
        return Step::Advance(1, key_event(key, false, in_paste));
    }

    match decode_rune(buf) {
        RuneStep::NeedMore => {
            if at_end {
                // A rune can never complete now; drop the fragment.
                Step::Advance(buf.len(), Output::Nothing)
            } else {
                Step::NeedMore
            }
        }
        RuneStep::Invalid(n) => Step::Advance(n, Output::Nothing),
        RuneStep::Rune(c, n) => Step::Advance(n, key_event(Key::Char(c), false, in_paste)),
    }
}

fn parse_escape(buf: &[u8], in_paste: bool, at_end: bool) -> Step {
    if buf.len() == 1 {
        return if at_end {
            Step::Advance(1, key_event(Key::Esc, false, in_paste))
        } else {
            Step::NeedMore
        };
    }

    match buf[1] {
        b'[' => parse_csi(buf, in_paste, at_end),
        b'O' => {
            if buf.len() < 3 {
                return if at_end {
                    Step::Advance(1, key_event(Key::Esc, false, in_paste))
                } else {
                    Step::NeedMore
                };
            }
            match key::ss3_key(buf[2]) {
                Some(key) => Step::Advance(3, key_event(key, false, in_paste)),
                None => Step::Advance(3, Output::Nothing),
            }
        }
        ESC => Step::Advance(2, key_event(Key::Esc, true, in_paste)),
        second => {
            // Alt-prefixed key: decode the remainder as a plain key.
            if let Some(key) = key::control_key(second) {
                return Step::Advance(2, key_event(key, true, in_paste));
            }
            match decode_rune(&buf[1..]) {
                RuneStep::NeedMore => {
                    if at_end {
                        Step::Advance(1, key_event(Key::Esc, false, in_paste))
                    } else {
                        Step::NeedMore
                    }
                }
                RuneStep::Invalid(n) => Step::Advance(1 + n, Output::Nothing),
                RuneStep::Rune(c, n) => {
                    Step::Advance(1 + n, key_event(Key::Char(c), true, in_paste))
                }
            }
        }
    }
}

/// Accumulate a CSI sequence: `ESC [`, parameter bytes (0x30-0x3F),
/// intermediate bytes (0x20-0x2F), one final byte (0x40-0x7E).
fn parse_csi(buf: &[u8], in_paste: bool, at_end: bool) -> Step {
    let mut i = 2;
    while i < buf.len() && (0x30..=0x3F).contains(&buf[i]) {
        i += 1;
    }
    while i < buf.len() && (0x20..=0x2F).contains(&buf[i]) {
        i += 1;
    }

    let Some(&final_byte) = buf.get(i) else {
        return if at_end {
            Step::Advance(1, key_event(Key::Esc, false, in_paste))
        } else {
            Step::NeedMore
        };
    };

    if !(0x40..=0x7E).contains(&final_byte) {
        // A control byte or another ESC interrupted the sequence.  Drop what
        // we accumulated and let the interrupting byte re-parse on its own.
        return Step::Advance(i, Output::Nothing);
    }

    let total = i + 1;
    let body = &buf[2..i];

    // SGR mouse: ESC [ < p1 ; p2 ; p3 (M|m)
    if let Some(sgr) = body.strip_prefix(b"<") {
        if final_byte == b'M' || final_byte == b'm' {
            if let Some(params) = numeric_params(sgr) {
                if let Some(event) = mouse::decode_sgr(&params, final_byte) {
                    return Step::Advance(total, Output::Event(InputEvent::Mouse(event)));
                }
            }
        }
        return Step::Advance(total, Output::Nothing);
    }

    if final_byte == b'I' && body.is_empty() {
        return Step::Advance(total, Output::Event(InputEvent::FocusGained));
    }
    if final_byte == b'O' && body.is_empty() {
        return Step::Advance(total, Output::Event(InputEvent::FocusLost));
    }

    let Some(params) = numeric_params(body) else {
        return Step::Advance(total, Output::Nothing);
    };

    if final_byte == b'~' {
        match params.first() {
            Some(200) => return Step::Advance(total, Output::PasteBegin),
            Some(201) => return Step::Advance(total, Output::PasteEnd),
            _ => {}
        }
    }

    match key::csi_key(&params, final_byte) {
        Some(mut event) => {
            event.paste = in_paste;
            Step::Advance(total, Output::Event(InputEvent::Key(event)))
        }
        // Recognized grammar, unrecognized meaning: swallow it.
        None => Step::Advance(total, Output::Nothing),
    }
}

/// Split `;`-separated decimal parameters.  An empty body yields no
/// parameters; an empty segment yields 0.  Returns `None` on any
/// non-digit byte or overflow (the sequence is then dropped whole).
fn numeric_params(body: &[u8]) -> Option<Vec<u16>> {
    if body.is_empty() {
        return Some(Vec::new());
    }
    let mut params = Vec::new();
    for segment in body.split(|&b| b == b';') {
        let mut value: u16 = 0;
        for &b in segment {
            if !b.is_ascii_digit() {
                return None;
            }
            value = value
                .checked_mul(10)?
                .checked_add(u16::from(b - b'0'))?;
        }
        params.push(value);
    }
    Some(params)
}

enum RuneStep {
    NeedMore,
    /// Not valid UTF-8; skip this many bytes.
    Invalid(usize),
    Rune(char, usize),
}

fn decode_rune(buf: &[u8]) -> RuneStep {
    let first = buf[0];
    let width = match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        // Continuation or out-of-range leading byte.
        _ => return RuneStep::Invalid(1),
    };
    if buf.len() < width {
        return RuneStep::NeedMore;
    }
    match std::str::from_utf8(&buf[..width]) {
        Ok(s) => match s.chars().next() {
            Some(c) => RuneStep::Rune(c, width),
            None => RuneStep::Invalid(1),
        },
        Err(_) => RuneStep::Invalid(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mouse::{MouseAction, MouseButton};

    fn decode_all(bytes: &[u8]) -> Vec<InputEvent> {
        let mut decoder = Decoder::new();
        let mut events = decoder.feed(bytes);
        events.extend(decoder.finish());
        events
    }

    fn key(k: Key) -> InputEvent {
        InputEvent::Key(KeyEvent::new(k))
    }

    #[test]
    fn plain_rune() {
        assert_eq!(decode_all(b"a"), vec![key(Key::Char('a'))]);
    }

    #[test]
    fn multibyte_rune() {
        assert_eq!(decode_all("é".as_bytes()), vec![key(Key::Char('é'))]);
        assert_eq!(decode_all("世".as_bytes()), vec![key(Key::Char('世'))]);
    }

    #[test]
    fn control_bytes() {
        assert_eq!(decode_all(b"\x03"), vec![key(Key::Ctrl('c'))]);
        assert_eq!(decode_all(b"\r"), vec![key(Key::Enter)]);
        assert_eq!(decode_all(b"\t"), vec![key(Key::Tab)]);
        assert_eq!(decode_all(b"\x7f"), vec![key(Key::Backspace)]);
    }

    #[test]
    fn alt_prefixed_rune() {
        assert_eq!(
            decode_all(b"\x1ba"),
            vec![InputEvent::Key(KeyEvent::new(Key::Char('a')).with_alt())]
        );
    }

    #[test]
    fn alt_prefixed_control() {
        assert_eq!(
            decode_all(b"\x1b\r"),
            vec![InputEvent::Key(KeyEvent::new(Key::Enter).with_alt())]
        );
    }

    #[test]
    fn double_esc_is_alt_esc() {
        assert_eq!(
            decode_all(b"\x1b\x1b"),
            vec![InputEvent::Key(KeyEvent::new(Key::Esc).with_alt())]
        );
    }

    #[test]
    fn lone_esc_delivered_at_end_of_stream() {
        let mut decoder = Decoder::new();
        assert!(decoder.feed(b"\x1b").is_empty());
        assert_eq!(decoder.finish(), vec![key(Key::Esc)]);
    }

    #[test]
    fn csi_arrow_keys() {
        assert_eq!(decode_all(b"\x1b[A"), vec![key(Key::Up)]);
        assert_eq!(decode_all(b"\x1b[D"), vec![key(Key::Left)]);
        assert_eq!(decode_all(b"\x1b[5~"), vec![key(Key::PageUp)]);
        assert_eq!(decode_all(b"\x1b[Z"), vec![key(Key::BackTab)]);
    }

    #[test]
    fn ss3_function_keys() {
        assert_eq!(decode_all(b"\x1bOP"), vec![key(Key::F(1))]);
        assert_eq!(decode_all(b"\x1bOA"), vec![key(Key::Up)]);
    }

    #[test]
    fn sgr_mouse_press_release_wheel() {
        let events = decode_all(b"\x1b[<0;5;10M");
        let InputEvent::Mouse(event) = events[0] else {
            panic!("expected mouse event, got {events:?}");
        };
        assert_eq!(event.button, MouseButton::Left);
        assert_eq!(event.action, MouseAction::Press);
        assert_eq!((event.x, event.y), (4, 9));

        let events = decode_all(b"\x1b[<0;5;10m");
        let InputEvent::Mouse(event) = events[0] else {
            panic!("expected mouse event, got {events:?}");
        };
        assert_eq!(event.action, MouseAction::Release);

        let events = decode_all(b"\x1b[<64;2;3M");
        let InputEvent::Mouse(event) = events[0] else {
            panic!("expected mouse event, got {events:?}");
        };
        assert_eq!(event.button, MouseButton::WheelUp);
        assert_eq!(event.action, MouseAction::Press);
    }

    #[test]
    fn focus_reports() {
        assert_eq!(
            decode_all(b"\x1b[I\x1b[O"),
            vec![InputEvent::FocusGained, InputEvent::FocusLost]
        );
    }

    #[test]
    fn bracketed_paste_tags_runes() {
        let events = decode_all(b"\x1b[200~hi\x1b[201~x");
        assert_eq!(
            events,
            vec![
                InputEvent::Key(KeyEvent::new(Key::Char('h')).with_paste()),
                InputEvent::Key(KeyEvent::new(Key::Char('i')).with_paste()),
                InputEvent::Key(KeyEvent::new(Key::Char('x'))),
            ]
        );
    }

    #[test]
    fn paste_tags_control_keys_too() {
        let events = decode_all(b"\x1b[200~a\rb\x1b[201~");
        assert_eq!(
            events,
            vec![
                InputEvent::Key(KeyEvent::new(Key::Char('a')).with_paste()),
                InputEvent::Key(KeyEvent::new(Key::Enter).with_paste()),
                InputEvent::Key(KeyEvent::new(Key::Char('b')).with_paste()),
            ]
        );
    }

    #[test]
    fn malformed_csi_dropped_silently() {
        // Reaches a legal final byte but names nothing we know.
        assert_eq!(decode_all(b"\x1b[999y"), vec![]);
        // Still decodes what follows.
        assert_eq!(decode_all(b"\x1b[999yq"), vec![key(Key::Char('q'))]);
    }

    #[test]
    fn csi_interrupted_by_control_byte() {
        // The accumulated prefix is dropped; the interrupting byte survives.
        assert_eq!(decode_all(b"\x1b[12\x03"), vec![key(Key::Ctrl('c'))]);
    }

    #[test]
    fn invalid_utf8_skipped() {
        assert_eq!(decode_all(b"\x80\xffq"), vec![key(Key::Char('q'))]);
    }

    #[test]
    fn multiple_sequences_in_one_chunk() {
        let events = decode_all(b"ab\x1b[A\x1b[<0;1;1M\r");
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], key(Key::Char('a')));
        assert_eq!(events[2], key(Key::Up));
        assert_eq!(events[4], key(Key::Enter));
    }

    #[test]
    fn rechunking_invariance() {
        // Every category of sequence, concatenated.
        let stream: Vec<u8> = [
            b"q".as_ref(),
            "é".as_bytes(),
            b"\x1b[A",
            b"\x1ba",
            b"\x1b[<64;2;3M",
            b"\x1b[200~ok\x1b[201~",
            b"\x1b[I",
            b"\x03",
            b"\x1b[5~",
            "世".as_bytes(),
            b"\x1bOP",
            b"\x1b",
        ]
        .concat();

        let expected = decode_all(&stream);
        assert!(!expected.is_empty());

        for split in 0..=stream.len() {
            let mut decoder = Decoder::new();
            let mut events = decoder.feed(&stream[..split]);
            events.extend(decoder.feed(&stream[split..]));
            events.extend(decoder.finish());
            assert_eq!(events, expected, "split at byte {split}");
        }
    }

    #[test]
    fn three_way_rechunking_of_mouse_report() {
        let stream = b"\x1b[<0;12;34M";
        let expected = decode_all(stream);
        for a in 0..stream.len() {
            for b in a..stream.len() {
                let mut decoder = Decoder::new();
                let mut events = decoder.feed(&stream[..a]);
                events.extend(decoder.feed(&stream[a..b]));
                events.extend(decoder.feed(&stream[b..]));
                events.extend(decoder.finish());
                assert_eq!(events, expected, "splits at {a}/{b}");
            }
        }
    }
}

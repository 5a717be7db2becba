//! Escape-sequence resolution.
//!
//! Terminal protocols multiplex modified keys onto multi-code escape
//! sequences with no framing, so a buffered prefix like `ESC O 3` is
//! simultaneously a possible keypad chord, a possible alt chord, and a
//! bare escape followed by literals.  Each [`KeyResolver`] examines the
//! buffered prefix independently and reports one of three outcomes; the
//! pump aggregates the reports by consumed count rather than by
//! registration order.
//!
//! Two aggregation modes exist and their tie-breaks differ on purpose:
//!
//! * [`resolve_speculative`] runs as each new key event is appended,
//!   while more input may still arrive.  A match must *strictly* beat
//!   the running best, and a resolver can outbid a shorter match with
//!   [`Resolution::Partial`] to hold the buffer open for a longer
//!   pattern.
//! * [`resolve_forced`] runs when the buffer must drain (a non-key
//!   event arrived, or the poll timed out).  Partial claims are void,
//!   ties go to the later resolver (`>=`), and if nothing matches the
//!   first buffered event is consumed verbatim, so a forced flush
//!   always terminates in at most `buffer.len()` rounds.

use crate::input::{Key, KeyEvent, Modifiers};
use std::sync::Arc;

/// The verdict of one resolver over one buffered prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The pattern cannot match this buffer.
    NoMatch,
    /// The buffer is a compatible strict prefix; a full match needs at
    /// least this many events.
    Partial(usize),
    /// A resolved key press, consuming `consumed` events from the head
    /// of the buffer.
    Match { key: KeyEvent, consumed: usize },
}

/// A pure function over a buffered prefix of raw key events.
///
/// Resolvers must be prefix-safe: given a strict prefix of a sequence
/// they would eventually match, they must answer [`Resolution::Partial`]
/// or a definitive [`Resolution::NoMatch`], never a wrong match.  They
/// must never claim more events than the buffer holds.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, buffer: &[KeyEvent]) -> Resolution;
}

impl<F> KeyResolver for F
where
    F: Fn(&[KeyEvent]) -> Resolution + Send + Sync,
{
    fn resolve(&self, buffer: &[KeyEvent]) -> Resolution {
        self(buffer)
    }
}

fn is_bare_escape(event: &KeyEvent) -> bool {
    event.modifiers.is_empty() && matches!(event.key, Key::Char('\u{1b}') | Key::Escape)
}

/// Remaps a leading control code to its named key: `ESC`, `TAB`, `LF`
/// and `DEL` read better as `Escape`, `Tab`, `Enter` and `Backspace`.
pub fn special_chars(buffer: &[KeyEvent]) -> Resolution {
    let first = match buffer.first() {
        Some(event) => event,
        None => return Resolution::NoMatch,
    };
    let key = match first.key {
        Key::Char('\u{1b}') => Key::Escape,
        Key::Char('\t') => Key::Tab,
        Key::Char('\n') => Key::Enter,
        Key::Char('\u{7f}') => Key::Backspace,
        _ => return Resolution::NoMatch,
    };
    Resolution::Match {
        key: KeyEvent::new(key, first.modifiers),
        consumed: 1,
    }
}

/// Remaps a leading literal in the C0 range to `Ctrl+<letter>`; the
/// terminal sends `Ctrl+A`..`Ctrl+Z` as codes 1..26 and `Ctrl+Space`
/// as NUL.
pub fn control_keys(buffer: &[KeyEvent]) -> Resolution {
    let first = match buffer.first() {
        Some(event) => event,
        None => return Resolution::NoMatch,
    };
    let c = match first.key {
        Key::Char(c) => c,
        _ => return Resolution::NoMatch,
    };
    let resolved = match c as u32 {
        0 => ' ',
        // tab and newline belong to special_chars; keeping the two
        // resolvers on disjoint code ranges makes aggregation order
        // irrelevant for single-event buffers
        9 | 10 => return Resolution::NoMatch,
        code @ 1..=26 => (b'A' + code as u8 - 1) as char,
        _ => return Resolution::NoMatch,
    };
    Resolution::Match {
        key: KeyEvent::new(Key::Char(resolved), first.modifiers | Modifiers::CTRL),
        consumed: 1,
    }
}

/// Resolves a bare escape followed by one more event as an alt chord.
///
/// `ESC f` / `ESC b` follow the readline word-navigation convention and
/// become `Alt+RightArrow` / `Alt+LeftArrow`.  A second escape (or an
/// unclassifiable key) is a definitive non-match, which lets the
/// leading escape flush alone.
pub fn alt_keys(buffer: &[KeyEvent]) -> Resolution {
    let first = match buffer.first() {
        Some(event) => event,
        None => return Resolution::NoMatch,
    };
    if !is_bare_escape(first) {
        return Resolution::NoMatch;
    }
    let second = match buffer.get(1) {
        Some(event) => event,
        None => return Resolution::Partial(2),
    };
    let key = match second.key {
        Key::Char('f') => KeyEvent::new(Key::RightArrow, second.modifiers | Modifiers::ALT),
        Key::Char('b') => KeyEvent::new(Key::LeftArrow, second.modifiers | Modifiers::ALT),
        Key::Unknown | Key::Escape | Key::Char('\u{1b}') => return Resolution::NoMatch,
        _ => KeyEvent {
            key: second.key,
            modifiers: second.modifiers | Modifiers::ALT,
            name: second.name.clone(),
        },
    };
    Resolution::Match { key, consumed: 2 }
}

/// Resolves the 4-event keypad chord `ESC O <digit 1-9> <letter A-H>`.
///
/// `digit - 1` is a 3-bit modifier mask (bit0 shift, bit1 alt, bit2
/// ctrl) and the letter selects the base key.  Compatible strict
/// prefixes answer `Partial` so the buffer keeps growing instead of
/// resolving `ESC O` as an alt chord.
pub fn keypad_modifiers(buffer: &[KeyEvent]) -> Resolution {
    let first = match buffer.first() {
        Some(event) => event,
        None => return Resolution::NoMatch,
    };
    if !is_bare_escape(first) {
        return Resolution::NoMatch;
    }
    let second = match buffer.get(1) {
        Some(event) => event,
        None => return Resolution::Partial(2),
    };
    if second.key != Key::Char('O') {
        return Resolution::NoMatch;
    }
    let third = match buffer.get(2) {
        Some(event) => event,
        None => return Resolution::Partial(3),
    };
    let mask = match third.key {
        Key::Char(c @ '1'..='9') => c as u32 - '1' as u32,
        _ => return Resolution::NoMatch,
    };
    let fourth = match buffer.get(3) {
        Some(event) => event,
        None => return Resolution::Partial(4),
    };
    let key = match fourth.key {
        Key::Char('A') => Key::UpArrow,
        Key::Char('B') => Key::DownArrow,
        Key::Char('C') => Key::RightArrow,
        Key::Char('D') => Key::LeftArrow,
        Key::Char('E') => Key::PageUp,
        Key::Char('F') => Key::End,
        Key::Char('G') => Key::PageDown,
        Key::Char('H') => Key::Home,
        _ => return Resolution::NoMatch,
    };
    let mut modifiers = Modifiers::NONE;
    if mask & 1 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if mask & 2 != 0 {
        modifiers |= Modifiers::ALT;
    }
    if mask & 4 != 0 {
        modifiers |= Modifiers::CTRL;
    }
    Resolution::Match {
        key: KeyEvent::new(key, modifiers),
        consumed: 4,
    }
}

/// Forced-mode aggregation over a non-empty buffer.
///
/// Returns the winning key and its consumed count; ties between equal
/// counts go to the later resolver.  Guaranteed to consume between 1
/// and `buffer.len()` events: when nothing matches, the first buffered
/// event is taken verbatim.
pub fn resolve_forced(
    resolvers: &[Arc<dyn KeyResolver>],
    buffer: &[KeyEvent],
) -> (KeyEvent, usize) {
    debug_assert!(!buffer.is_empty());
    let mut best: Option<(KeyEvent, usize)> = None;
    for resolver in resolvers {
        if let Resolution::Match { key, consumed } = resolver.resolve(buffer) {
            let consumed = consumed.min(buffer.len());
            if consumed == 0 {
                continue;
            }
            match &best {
                Some((_, count)) if consumed < *count => {}
                _ => best = Some((key, consumed)),
            }
        }
    }
    best.unwrap_or_else(|| (buffer[0].clone(), 1))
}

/// Speculative-mode aggregation, run while more input may still arrive.
///
/// `None` means keep buffering: either nothing claimed the prefix yet,
/// or a resolver is holding the buffer open for a longer pattern.
pub fn resolve_speculative(
    resolvers: &[Arc<dyn KeyResolver>],
    buffer: &[KeyEvent],
) -> Option<(KeyEvent, usize)> {
    let mut best: Option<(KeyEvent, usize)> = None;
    let mut best_count = 0;
    let mut waiting = false;
    for resolver in resolvers {
        match resolver.resolve(buffer) {
            Resolution::Match { key, consumed } => {
                let consumed = consumed.min(buffer.len());
                if consumed > best_count {
                    best_count = consumed;
                    best = Some((key, consumed));
                    waiting = false;
                }
            }
            Resolution::Partial(need) => {
                if need > best_count {
                    best_count = need;
                    best = None;
                    waiting = true;
                }
            }
            Resolution::NoMatch => {}
        }
    }
    if waiting {
        None
    } else {
        best
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn chain() -> Vec<Arc<dyn KeyResolver>> {
        vec![
            Arc::new(special_chars) as Arc<dyn KeyResolver>,
            Arc::new(control_keys),
            Arc::new(alt_keys),
            Arc::new(keypad_modifiers),
        ]
    }

    fn chars(s: &str) -> Vec<KeyEvent> {
        s.chars()
            .map(|c| KeyEvent::new(Key::Char(c), Modifiers::NONE))
            .collect()
    }

    #[test]
    fn ctrl_c_resolves_to_uppercase_letter() {
        let resolved = resolve_speculative(&chain(), &chars("\u{03}"));
        assert_eq!(
            resolved,
            Some((KeyEvent::new(Key::Char('C'), Modifiers::CTRL), 1))
        );
    }

    #[test]
    fn ctrl_space_and_range_edges() {
        assert_eq!(
            control_keys(&chars("\u{00}")),
            Resolution::Match {
                key: KeyEvent::new(Key::Char(' '), Modifiers::CTRL),
                consumed: 1,
            }
        );
        assert_eq!(
            control_keys(&chars("\u{01}")),
            Resolution::Match {
                key: KeyEvent::new(Key::Char('A'), Modifiers::CTRL),
                consumed: 1,
            }
        );
        assert_eq!(
            control_keys(&chars("\u{1a}")),
            Resolution::Match {
                key: KeyEvent::new(Key::Char('Z'), Modifiers::CTRL),
                consumed: 1,
            }
        );
        // 0x1b is outside the 1-26 range
        assert_eq!(control_keys(&chars("\u{1b}")), Resolution::NoMatch);
    }

    #[test]
    fn special_codes_map_to_named_keys() {
        for (input, key) in &[
            ("\u{1b}", Key::Escape),
            ("\t", Key::Tab),
            ("\n", Key::Enter),
            ("\u{7f}", Key::Backspace),
        ] {
            assert_eq!(
                special_chars(&chars(input)),
                Resolution::Match {
                    key: KeyEvent::new(*key, Modifiers::NONE),
                    consumed: 1,
                }
            );
        }
    }

    #[test]
    fn special_and_control_partition_single_event_buffers() {
        for code in 0u32..=0x7f {
            let c = match std::char::from_u32(code) {
                Some(c) => c,
                None => continue,
            };
            let buffer = vec![KeyEvent::new(Key::Char(c), Modifiers::NONE)];
            let special = matches!(special_chars(&buffer), Resolution::Match { .. });
            let control = matches!(control_keys(&buffer), Resolution::Match { .. });
            assert!(
                !(special && control),
                "both resolvers claimed code {:#04x}",
                code
            );
        }
    }

    #[test]
    fn forced_mode_always_progresses_and_terminates() {
        let chain = chain();
        for input in &[
            "\u{1b}",
            "\u{1b}O",
            "\u{1b}O3",
            "\u{1b}O3C",
            "\u{1b}\u{1b}\u{1b}",
            "abc",
            "\u{1b}Ozz",
        ] {
            let mut buffer = chars(input);
            let mut rounds = 0;
            while !buffer.is_empty() {
                let (_, consumed) = resolve_forced(&chain, &buffer);
                assert!(consumed >= 1, "forced resolution stalled on {:?}", input);
                assert!(consumed <= buffer.len());
                buffer.drain(..consumed);
                rounds += 1;
                assert!(rounds <= input.chars().count());
            }
        }
    }

    #[test]
    fn forced_mode_falls_back_to_verbatim_event() {
        let up = KeyEvent::new(Key::UpArrow, Modifiers::NONE).with_name("kcuu1");
        let (key, consumed) = resolve_forced(&chain(), &[up.clone()]);
        assert_eq!(consumed, 1);
        assert_eq!(key, up);
        // the verbatim fallback keeps the diagnostic name intact
        assert_eq!(key.name.as_deref(), Some("kcuu1"));
    }

    #[test]
    fn speculative_waits_on_every_keypad_prefix() {
        let chain = chain();
        let full = chars("\u{1b}O3C");
        for len in 1..full.len() {
            assert_eq!(
                resolve_speculative(&chain, &full[..len]),
                None,
                "prefix of length {} resolved prematurely",
                len
            );
        }
        assert_eq!(
            resolve_speculative(&chain, &full),
            Some((KeyEvent::new(Key::RightArrow, Modifiers::ALT), 4))
        );
    }

    #[test]
    fn keypad_digit_encodes_modifier_mask() {
        for (digit, modifiers) in &[
            ('1', Modifiers::NONE),
            ('2', Modifiers::SHIFT),
            ('3', Modifiers::ALT),
            ('5', Modifiers::CTRL),
            ('8', Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL),
        ] {
            let buffer = chars(&format!("\u{1b}O{}H", digit));
            assert_eq!(
                keypad_modifiers(&buffer),
                Resolution::Match {
                    key: KeyEvent::new(Key::Home, *modifiers),
                    consumed: 4,
                }
            );
        }
    }

    #[test]
    fn alt_word_navigation_and_plain_chords() {
        let chain = chain();
        assert_eq!(
            resolve_speculative(&chain, &chars("\u{1b}f")),
            Some((KeyEvent::new(Key::RightArrow, Modifiers::ALT), 2))
        );
        assert_eq!(
            resolve_speculative(&chain, &chars("\u{1b}b")),
            Some((KeyEvent::new(Key::LeftArrow, Modifiers::ALT), 2))
        );
        assert_eq!(
            resolve_speculative(&chain, &chars("\u{1b}x")),
            Some((KeyEvent::new(Key::Char('x'), Modifiers::ALT), 2))
        );
    }

    #[test]
    fn double_escape_flushes_first_escape_alone() {
        // a second escape disqualifies the alt chord, so the leading
        // escape resolves by itself and the second stays buffered
        assert_eq!(alt_keys(&chars("\u{1b}\u{1b}")), Resolution::NoMatch);
        assert_eq!(
            resolve_speculative(&chain(), &chars("\u{1b}\u{1b}")),
            Some((KeyEvent::new(Key::Escape, Modifiers::NONE), 1))
        );
    }

    #[test]
    fn lone_escape_is_held_open_speculatively() {
        assert_eq!(resolve_speculative(&chain(), &chars("\u{1b}")), None);
        let (key, consumed) = resolve_forced(&chain(), &chars("\u{1b}"));
        assert_eq!((key, consumed), (KeyEvent::new(Key::Escape, Modifiers::NONE), 1));
    }

    #[test]
    fn forced_tie_goes_to_the_later_resolver() {
        // two resolvers claiming the same count: registration order
        // decides via the >= overwrite rule
        fn lower(buffer: &[KeyEvent]) -> Resolution {
            match buffer.first().map(|e| e.key) {
                Some(Key::Char(c)) => Resolution::Match {
                    key: KeyEvent::new(Key::Char(c.to_ascii_lowercase()), Modifiers::NONE),
                    consumed: 1,
                },
                _ => Resolution::NoMatch,
            }
        }
        fn upper(buffer: &[KeyEvent]) -> Resolution {
            match buffer.first().map(|e| e.key) {
                Some(Key::Char(c)) => Resolution::Match {
                    key: KeyEvent::new(Key::Char(c.to_ascii_uppercase()), Modifiers::NONE),
                    consumed: 1,
                },
                _ => Resolution::NoMatch,
            }
        }
        let chain: Vec<Arc<dyn KeyResolver>> =
            vec![Arc::new(lower) as Arc<dyn KeyResolver>, Arc::new(upper)];
        let (key, _) = resolve_forced(&chain, &chars("q"));
        assert_eq!(key, KeyEvent::new(Key::Char('Q'), Modifiers::NONE));

        // speculative mode requires strictly-greater, so the first
        // registration wins the same tie
        let (key, _) = resolve_speculative(&chain, &chars("q")).unwrap();
        assert_eq!(key, KeyEvent::new(Key::Char('q'), Modifiers::NONE));
    }
}

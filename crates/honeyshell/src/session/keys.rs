//! Keystroke decoding
//!
//! Transports in character mode hand the session raw client bytes. This
//! module turns them into [`Key`]s, including the ANSI escape sequences
//! terminals send for arrows, Home and End.

/// One decoded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
    /// Ctrl-C
    Interrupt,
    /// Ctrl-D
    Eof,
    /// Ctrl-K
    KillToEnd,
    /// Ctrl-U
    KillToStart,
    /// Ctrl-L
    ClearScreen,
    Home,
    End,
    Left,
    Right,
    Up,
    Down,
}

/// Decode a chunk of client input.
///
/// Unknown control characters and escape sequences are dropped. `\r\n` is
/// a single Enter.
pub fn decode(data: &[u8]) -> Vec<Key> {
    let text = String::from_utf8_lossy(data);
    let mut chars = text.chars().peekable();
    let mut keys = Vec::new();

    while let Some(c) = chars.next() {
        let key = match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                Key::Enter
            }
            '\n' => Key::Enter,
            '\t' => Key::Tab,
            '\x7f' | '\x08' => Key::Backspace,
            '\x01' => Key::Home,
            '\x02' => Key::Left,
            '\x03' => Key::Interrupt,
            '\x04' => Key::Eof,
            '\x05' => Key::End,
            '\x06' => Key::Right,
            '\x0b' => Key::KillToEnd,
            '\x0c' => Key::ClearScreen,
            '\x0e' => Key::Down,
            '\x10' => Key::Up,
            '\x15' => Key::KillToStart,
            '\x1b' => match escape(&mut chars) {
                Some(key) => key,
                None => continue,
            },
            c if c.is_control() => continue,
            c => Key::Char(c),
        };
        keys.push(key);
    }
    keys
}

/// Decode the rest of an escape sequence; the ESC is already consumed.
fn escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<Key> {
    match chars.next()? {
        // SS3 sequences from keypads in application mode
        'O' => match chars.next()? {
            'A' => Some(Key::Up),
            'B' => Some(Key::Down),
            'C' => Some(Key::Right),
            'D' => Some(Key::Left),
            'H' => Some(Key::Home),
            'F' => Some(Key::End),
            _ => None,
        },
        '[' => {
            let mut params = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() || c == ';' {
                    params.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            match (chars.next()?, params.as_str()) {
                ('A', _) => Some(Key::Up),
                ('B', _) => Some(Key::Down),
                ('C', _) => Some(Key::Right),
                ('D', _) => Some(Key::Left),
                ('H', _) => Some(Key::Home),
                ('F', _) => Some(Key::End),
                ('~', "1" | "7") => Some(Key::Home),
                ('~', "4" | "8") => Some(Key::End),
                ('~', "3") => Some(Key::Delete),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_and_enter() {
        assert_eq!(
            decode(b"ls\r\n"),
            [Key::Char('l'), Key::Char('s'), Key::Enter]
        );
        assert_eq!(decode(b"a\rb"), [Key::Char('a'), Key::Enter, Key::Char('b')]);
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(
            decode(b"\x03\x04\x0b\x15\x0c\x01\x05\x7f\t"),
            [
                Key::Interrupt,
                Key::Eof,
                Key::KillToEnd,
                Key::KillToStart,
                Key::ClearScreen,
                Key::Home,
                Key::End,
                Key::Backspace,
                Key::Tab,
            ]
        );
    }

    #[test]
    fn test_escape_sequences() {
        assert_eq!(
            decode(b"\x1b[A\x1b[B\x1b[C\x1b[D\x1b[H\x1b[F\x1b[3~\x1b[1~\x1b[4~\x1bOA"),
            [
                Key::Up,
                Key::Down,
                Key::Right,
                Key::Left,
                Key::Home,
                Key::End,
                Key::Delete,
                Key::Home,
                Key::End,
                Key::Up,
            ]
        );
    }

    #[test]
    fn test_unknown_sequences_dropped() {
        assert_eq!(decode(b"\x1b[99Zx\x1b"), [Key::Char('x')]);
        assert!(decode(b"\x00\x1f").is_empty());
    }

    #[test]
    fn test_utf8() {
        assert_eq!(decode("é".as_bytes()), [Key::Char('é')]);
    }
}

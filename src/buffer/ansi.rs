//! ANSI escape sequence stripping

/// Longest escape sequence held back waiting for its terminator.
const MAX_HELD: usize = 256;

/// Strip ANSI escape sequences from a byte slice
pub fn strip_ansi(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if data[i] == b'\x1b' && i + 1 < data.len() {
            i = skip_sequence(data, i);
        } else {
            result.push(data[i]);
            i += 1;
        }
    }

    result
}

/// Index just past the escape sequence starting at `start`.
fn skip_sequence(data: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    match data[start + 1] {
        // CSI: parameters up to a final letter
        b'[' => {
            while i < data.len() {
                i += 1;
                if data[i - 1].is_ascii_alphabetic() {
                    break;
                }
            }
            i
        }
        // OSC: terminated by BEL or ST (ESC \)
        b']' => {
            while i < data.len() {
                if data[i] == b'\x07' {
                    return i + 1;
                }
                if data[i] == b'\x1b' && data.get(i + 1) == Some(&b'\\') {
                    return i + 2;
                }
                i += 1;
            }
            i
        }
        // Character set designation: ESC ( X
        b'(' | b')' => (start + 3).min(data.len()),
        _ => i,
    }
}

/// Position where a trailing, not yet terminated escape sequence begins.
///
/// Returns `data.len()` when the data ends cleanly. Everything from the
/// returned index on should be held back until more bytes arrive, so a
/// sequence split across two reads is still stripped as a whole.
pub fn incomplete_tail(data: &[u8]) -> usize {
    let Some(start) = data.iter().rposition(|&b| b == b'\x1b') else {
        return data.len();
    };
    if data.len() - start > MAX_HELD {
        return data.len();
    }

    let rest = &data[start + 1..];
    let complete = match rest.first() {
        None => false,
        Some(b'[') => rest[1..].iter().any(u8::is_ascii_alphabetic),
        Some(b']') => rest.contains(&b'\x07'),
        Some(b'(') | Some(b')') => rest.len() >= 2,
        Some(_) => true,
    };

    if complete {
        data.len()
    } else {
        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_csi() {
        let output = strip_ansi(b"Hello \x1b[31mred\x1b[0m world");
        assert_eq!(output, b"Hello red world");
    }

    #[test]
    fn test_strip_osc() {
        assert_eq!(strip_ansi(b"a\x1b]0;Title\x07b"), b"ab");
        assert_eq!(strip_ansi(b"a\x1b]0;Title\x1b\\b"), b"ab");
    }

    #[test]
    fn test_strip_charset() {
        assert_eq!(strip_ansi(b"\x1b(Bprompt$ "), b"prompt$ ");
    }

    #[test]
    fn test_no_ansi() {
        assert_eq!(strip_ansi(b"login: "), b"login: ");
    }

    #[test]
    fn test_incomplete_tail_none() {
        assert_eq!(incomplete_tail(b"plain"), 5);
        assert_eq!(incomplete_tail(b"x\x1b[0m"), 5);
        assert_eq!(incomplete_tail(b"x\x1b]0;t\x07"), 7);
    }

    #[test]
    fn test_incomplete_tail_split() {
        assert_eq!(incomplete_tail(b"ok\x1b"), 2);
        assert_eq!(incomplete_tail(b"ok\x1b[3"), 2);
        assert_eq!(incomplete_tail(b"ok\x1b]0;tit"), 2);
        assert_eq!(incomplete_tail(b"ok\x1b("), 2);
    }

    #[test]
    fn test_incomplete_tail_gives_up_on_runaway() {
        let mut data = b"\x1b[".to_vec();
        data.extend(std::iter::repeat_n(b'1', 300));
        assert_eq!(incomplete_tail(&data), data.len());
    }
}

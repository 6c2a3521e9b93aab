use std::borrow::Cow;

const ESC: char = '\u{1b}';
const BEL: char = '\u{7}';

fn is_unsafe_control(c: char) -> bool {
    (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r')) || c == ESC
}

/// Strips terminal control characters and ANSI escape sequences from feed text.
///
/// Titles and descriptions come from the network and are printed straight to
/// a terminal, so anything that could drive the terminal is removed:
/// - ASCII control chars other than tab, newline and carriage return (incl. DEL)
/// - CSI sequences: `ESC [` ... final byte in `@`..=`~`
/// - OSC sequences: `ESC ]` ... until BEL or `ESC \`
/// - a bare ESC
///
/// Walks `char`s rather than bytes so multi-byte text is copied whole.
/// Returns `Cow::Borrowed` when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_unsafe_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESC {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == BEL {
                            break;
                        }
                        if c == ESC && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_unsafe_control(c) {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_is_borrowed() {
        let s = "Plain title\twith tab\nand newline";
        assert!(matches!(strip_control_chars(s), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strips_csi_and_osc() {
        assert_eq!(strip_control_chars("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_control_chars("\x1b]0;title\x07after"), "after");
        assert_eq!(strip_control_chars("\x1b]8;;http://x\x1b\\link"), "link");
    }

    #[test]
    fn test_strips_bare_controls() {
        assert_eq!(strip_control_chars("a\x00b\x7fc\x1bd"), "abcd");
    }

    #[test]
    fn test_keeps_unicode() {
        assert_eq!(
            strip_control_chars("caf\u{e9} \x1b[1m\u{65e5}\u{672c}"),
            "caf\u{e9} \u{65e5}\u{672c}"
        );
    }
}

use std::borrow::Cow;

const ESC: char = '\x1b';
const BEL: char = '\x07';

fn is_stripped_control(c: char) -> bool {
    c == '\x7f' || (c < ' ' && c != '\t' && c != '\n' && c != '\r')
}

/// Strip terminal control characters and ANSI escape sequences from text.
///
/// Feed titles and bodies end up printed to a terminal by the CLI, so anything
/// that could move the cursor or retitle the window is removed:
/// - C0 controls and DEL (tab, newline and carriage return are kept)
/// - CSI sequences (`ESC [` ... final byte `0x40..=0x7E`)
/// - OSC sequences (`ESC ]` ... terminated by BEL or `ESC \`)
/// - any other bare ESC
///
/// Returns `Cow::Borrowed` when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c == ESC || is_stripped_control(c)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESC {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    // Parameter and intermediate bytes up to and including the final byte
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
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
        } else if !is_stripped_control(c) {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

/// Normalizes whitespace in extracted or stored post text.
///
/// - CRLF and lone CR become LF
/// - runs of spaces/tabs collapse to a single space
/// - whitespace at the start and end of every line is removed
/// - runs of blank lines collapse to exactly one blank line
/// - leading and trailing blank lines are dropped
///
/// Paragraphs therefore come out separated by exactly `"\n\n"`.
pub fn normalize_whitespace(s: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut pending_blank = false;

    for line in unified.split('\n') {
        let collapsed = collapse_horizontal(line);
        if collapsed.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_blank { "\n\n" } else { "\n" });
        }
        out.push_str(&collapsed);
        pending_blank = false;
    }

    out
}

/// Collapses horizontal whitespace runs inside one line and trims both ends.
fn collapse_horizontal(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for word in line.split(|c: char| c.is_whitespace()).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

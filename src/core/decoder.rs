//! Keystroke decoding: raw input chunks to edit commands.

/// Edit effect produced by the decoder. The decoder never touches the
/// terminal; the engine applies these to the line buffer and history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Printable character inserted at the cursor.
    Insert(char),
    /// Enter on the current buffer.
    Submit,
    /// Whole-chunk paste: replace the buffer with the normalized text and
    /// submit immediately.
    Paste(String),
    /// Ctrl+C.
    Interrupt,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    Backspace,
    DeleteForward,
    /// Ctrl+U.
    KillLine,
    /// Ctrl+K.
    KillToEnd,
    /// Ctrl+W.
    DeleteWordBack,
    HistoryUp,
    HistoryDown,
}

/// Escape-sequence parser state, chunk-scoped.
#[derive(Debug, PartialEq, Eq)]
enum State {
    Normal,
    EscSeen,
    CsiParams(String),
}

const CTRL_A: char = '\u{01}';
const CTRL_C: char = '\u{03}';
const CTRL_E: char = '\u{05}';
const CTRL_K: char = '\u{0b}';
const CTRL_U: char = '\u{15}';
const CTRL_W: char = '\u{17}';
const BACKSPACE: char = '\u{7f}';
const CTRL_H: char = '\u{08}';
const ESC: char = '\u{1b}';

/// Decode one chunk of raw input into edit commands.
///
/// A chunk containing a line-ending byte is either a lone Enter keystroke
/// (`\r`, `\n`, or `\r\n` exactly) or treated wholesale as pasted text.
/// Detecting paste by "chunk contains a newline" is kept for compatibility;
/// it can misclassify a burst of fast keystrokes delivered as one chunk.
///
/// Escape state does not persist across chunks: reassembling sequences split
/// across reads is the platform chunker's job.
pub fn decode(chunk: &str) -> Vec<Cmd> {
    if chunk.is_empty() {
        return Vec::new();
    }

    if chunk.contains('\r') || chunk.contains('\n') {
        if matches!(chunk, "\r" | "\n" | "\r\n") {
            return vec![Cmd::Submit];
        }
        return vec![Cmd::Paste(normalize_paste(chunk))];
    }

    let mut cmds = Vec::new();
    let mut state = State::Normal;

    for ch in chunk.chars() {
        state = match state {
            State::Normal => match ch {
                ESC => State::EscSeen,
                CTRL_C => {
                    cmds.push(Cmd::Interrupt);
                    State::Normal
                }
                CTRL_A => {
                    cmds.push(Cmd::CursorHome);
                    State::Normal
                }
                CTRL_E => {
                    cmds.push(Cmd::CursorEnd);
                    State::Normal
                }
                CTRL_U => {
                    cmds.push(Cmd::KillLine);
                    State::Normal
                }
                CTRL_K => {
                    cmds.push(Cmd::KillToEnd);
                    State::Normal
                }
                CTRL_W => {
                    cmds.push(Cmd::DeleteWordBack);
                    State::Normal
                }
                BACKSPACE | CTRL_H => {
                    cmds.push(Cmd::Backspace);
                    State::Normal
                }
                ch if (ch as u32) < 0x20 => State::Normal,
                ch => {
                    cmds.push(Cmd::Insert(ch));
                    State::Normal
                }
            },
            State::EscSeen => match ch {
                '[' => State::CsiParams(String::new()),
                // Alt-key combination: swallow the byte.
                _ => State::Normal,
            },
            State::CsiParams(mut params) => {
                if (0x30..=0x3f).contains(&(ch as u32)) {
                    params.push(ch);
                    State::CsiParams(params)
                } else {
                    if let Some(cmd) = dispatch_csi(ch, &params) {
                        cmds.push(cmd);
                    }
                    State::Normal
                }
            }
        };
    }

    cmds
}

fn dispatch_csi(final_byte: char, params: &str) -> Option<Cmd> {
    match final_byte {
        'A' => Some(Cmd::HistoryUp),
        'B' => Some(Cmd::HistoryDown),
        'C' => Some(Cmd::CursorRight),
        'D' => Some(Cmd::CursorLeft),
        'H' => Some(Cmd::CursorHome),
        'F' => Some(Cmd::CursorEnd),
        '~' if params == "3" => Some(Cmd::DeleteForward),
        _ => None,
    }
}

/// Flatten pasted text to a single line: normalize line endings, right-trim
/// each line, drop empty lines, join with single spaces.
fn normalize_paste(chunk: &str) -> String {
    chunk
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{decode, Cmd};

    #[test]
    fn printable_chars_insert_in_order() {
        let cmds = decode("hi!");
        assert_eq!(
            cmds,
            vec![Cmd::Insert('h'), Cmd::Insert('i'), Cmd::Insert('!')]
        );
    }

    #[test]
    fn bare_line_endings_submit() {
        assert_eq!(decode("\r"), vec![Cmd::Submit]);
        assert_eq!(decode("\n"), vec![Cmd::Submit]);
        assert_eq!(decode("\r\n"), vec![Cmd::Submit]);
    }

    #[test]
    fn chunk_with_newline_is_a_paste() {
        let cmds = decode("line one\nline two\n");
        assert_eq!(cmds, vec![Cmd::Paste("line one line two".to_string())]);
    }

    #[test]
    fn paste_normalizes_every_line_ending_kind() {
        let cmds = decode("a\r\nb\rc\n\n  \nd  \n");
        assert_eq!(cmds, vec![Cmd::Paste("a b c d".to_string())]);
    }

    #[test]
    fn control_byte_dispatch() {
        assert_eq!(decode("\x01"), vec![Cmd::CursorHome]);
        assert_eq!(decode("\x05"), vec![Cmd::CursorEnd]);
        assert_eq!(decode("\x15"), vec![Cmd::KillLine]);
        assert_eq!(decode("\x0b"), vec![Cmd::KillToEnd]);
        assert_eq!(decode("\x17"), vec![Cmd::DeleteWordBack]);
        assert_eq!(decode("\x7f"), vec![Cmd::Backspace]);
        assert_eq!(decode("\x08"), vec![Cmd::Backspace]);
        assert_eq!(decode("\x03"), vec![Cmd::Interrupt]);
    }

    #[test]
    fn unknown_control_bytes_are_ignored() {
        assert_eq!(decode("\x02"), Vec::<Cmd>::new());
        assert_eq!(decode("\x06a"), vec![Cmd::Insert('a')]);
        assert_eq!(decode("\t"), Vec::<Cmd>::new());
    }

    #[test]
    fn arrow_and_navigation_sequences() {
        assert_eq!(decode("\x1b[A"), vec![Cmd::HistoryUp]);
        assert_eq!(decode("\x1b[B"), vec![Cmd::HistoryDown]);
        assert_eq!(decode("\x1b[C"), vec![Cmd::CursorRight]);
        assert_eq!(decode("\x1b[D"), vec![Cmd::CursorLeft]);
        assert_eq!(decode("\x1b[H"), vec![Cmd::CursorHome]);
        assert_eq!(decode("\x1b[F"), vec![Cmd::CursorEnd]);
        assert_eq!(decode("\x1b[3~"), vec![Cmd::DeleteForward]);
    }

    #[test]
    fn csi_with_unknown_final_byte_is_swallowed() {
        assert_eq!(decode("\x1b[5~"), Vec::<Cmd>::new());
        assert_eq!(decode("\x1b[1;5Cx"), vec![Cmd::Insert('x')]);
    }

    #[test]
    fn alt_combinations_are_swallowed() {
        assert_eq!(decode("\x1bf"), Vec::<Cmd>::new());
        assert_eq!(decode("\x1bfx"), vec![Cmd::Insert('x')]);
    }

    #[test]
    fn mixed_chunk_preserves_order() {
        let cmds = decode("ab\x7f\x1b[Dc");
        assert_eq!(
            cmds,
            vec![
                Cmd::Insert('a'),
                Cmd::Insert('b'),
                Cmd::Backspace,
                Cmd::CursorLeft,
                Cmd::Insert('c'),
            ]
        );
    }

    #[test]
    fn unicode_input_inserts() {
        assert_eq!(decode("é"), vec![Cmd::Insert('é')]);
    }
}

//! Visible width helpers that ignore ANSI control sequences.
//!
//! The prompt may carry color styling; layout math must see its printed
//! width, not its byte length.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

pub fn grapheme_width(grapheme: &str) -> usize {
    let mut width = 0;
    for ch in grapheme.chars() {
        width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }
    width
}

/// Printed width of `input` with CSI/OSC escape sequences stripped.
pub fn visible_width(input: &str) -> usize {
    if input.is_empty() {
        return 0;
    }

    let mut clean = String::with_capacity(input.len());
    let mut idx = 0;
    while idx < input.len() {
        if let Some(len) = ansi_sequence_len(input, idx) {
            idx += len;
            continue;
        }

        let ch = input[idx..].chars().next().expect("missing char");
        clean.push(ch);
        idx += ch.len_utf8();
    }

    clean.graphemes(true).map(grapheme_width).sum()
}

/// Length in bytes of the escape sequence starting at `pos`, if any.
fn ansi_sequence_len(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.get(pos) != Some(&0x1b) {
        return None;
    }

    match bytes.get(pos + 1) {
        // CSI: parameter/intermediate bytes, then one final byte in 0x40..=0x7e.
        Some(b'[') => {
            let mut idx = pos + 2;
            while idx < bytes.len() {
                if (0x40..=0x7e).contains(&bytes[idx]) {
                    return Some(idx + 1 - pos);
                }
                idx += 1;
            }
            None
        }
        // OSC: terminated by BEL or ST.
        Some(b']') => {
            let mut idx = pos + 2;
            while idx < bytes.len() {
                if bytes[idx] == 0x07 {
                    return Some(idx + 1 - pos);
                }
                if bytes[idx] == 0x1b && bytes.get(idx + 1) == Some(&b'\\') {
                    return Some(idx + 2 - pos);
                }
                idx += 1;
            }
            None
        }
        // Anything else is not a sequence this cares about; the ESC itself
        // has zero width and the following char is measured normally.
        _ => None,
    }
}

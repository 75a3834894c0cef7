//! Row layout: scroll region boundaries and chrome positions.

use crate::core::output::{OutputGate, TerminalCmd};

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Derived row layout for a terminal size. Recomputed on init/resize/resume,
/// never stored across size changes.
///
/// Rows are 1-indexed: native scrolling is confined to `1..=scroll_end`, the
/// separator rule and the input line sit below it, outside the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub rows: u16,
    pub cols: u16,
    pub scroll_end: u16,
    pub separator_row: u16,
    pub input_row: u16,
}

impl Layout {
    pub fn compute(rows: u16, cols: u16) -> Self {
        // Tiny terminals degrade to a one-row region rather than an invalid one.
        let scroll_end = rows.saturating_sub(2).max(1);
        Self {
            rows,
            cols,
            scroll_end,
            separator_row: rows.saturating_sub(1).max(1),
            input_row: rows.max(1),
        }
    }

    /// Confine native scrolling to the region above the chrome.
    pub fn apply_scroll_region(&self, output: &mut OutputGate) {
        output.push(TerminalCmd::SetScrollRegion(self.scroll_end));
    }

    /// Paint the separator rule and clear the input row.
    ///
    /// Chrome rows live outside the scroll region, so scrolling never touches
    /// them; this runs once per init/resize/resume, never per output write.
    pub fn draw_chrome(&self, output: &mut OutputGate) {
        let rule = "─".repeat(self.cols as usize);
        output.push(TerminalCmd::MoveTo(self.separator_row, 1));
        output.push(TerminalCmd::ClearLine);
        output.push(TerminalCmd::bytes(format!("{DIM}{rule}{RESET}")));
        output.push(TerminalCmd::MoveTo(self.input_row, 1));
        output.push(TerminalCmd::ClearLine);
    }

    /// Establish the output anchor at the bottom of the scroll region.
    ///
    /// The one place the anchor is set rather than restored; every
    /// intercepted write afterwards round-trips it with `ESC[u` / `ESC[s`.
    pub fn reset_anchor(&self, output: &mut OutputGate) {
        output.push(TerminalCmd::MoveTo(self.scroll_end, 1));
        output.push(TerminalCmd::SaveCursor);
    }
}

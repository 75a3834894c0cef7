#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use moorline::Terminal;

/// Terminal double that records every write and lets tests change its size.
pub struct CaptureTerminal {
    written: Rc<RefCell<String>>,
    size: Rc<RefCell<(u16, u16)>>,
    interactive: bool,
}

impl CaptureTerminal {
    /// Returns the terminal plus handles to the captured output and the
    /// mutable (rows, cols) size.
    pub fn new(rows: u16, cols: u16) -> (Self, Rc<RefCell<String>>, Rc<RefCell<(u16, u16)>>) {
        let written = Rc::new(RefCell::new(String::new()));
        let size = Rc::new(RefCell::new((rows, cols)));
        (
            Self {
                written: Rc::clone(&written),
                size: Rc::clone(&size),
                interactive: true,
            },
            written,
            size,
        )
    }

    pub fn non_interactive(rows: u16, cols: u16) -> (Self, Rc<RefCell<String>>) {
        let (mut terminal, written, _) = Self::new(rows, cols);
        terminal.interactive = false;
        (terminal, written)
    }
}

impl Terminal for CaptureTerminal {
    fn start(
        &mut self,
        _on_input: Box<dyn FnMut(String) + Send>,
        _on_resize: Box<dyn FnMut() + Send>,
    ) -> std::io::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn drain_input(&mut self, _max_ms: u64, _idle_ms: u64) {}

    fn write(&mut self, data: &str) {
        self.written.borrow_mut().push_str(data);
    }

    fn columns(&self) -> u16 {
        self.size.borrow().1
    }

    fn rows(&self) -> u16 {
        self.size.borrow().0
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

pub fn unescape(input: &str) -> String {
    let mut out = String::new();
    let mut iter = input.chars().peekable();

    while let Some(ch) = iter.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match iter.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('x') => {
                let hi = iter.next();
                let lo = iter.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    if let (Some(h), Some(l)) = (hi.to_digit(16), lo.to_digit(16)) {
                        out.push(((h << 4) | l) as u8 as char);
                    } else {
                        out.push('\\');
                        out.push('x');
                        out.push(hi);
                        out.push(lo);
                    }
                } else {
                    out.push('\\');
                    out.push('x');
                    if let Some(hi) = hi {
                        out.push(hi);
                    }
                    if let Some(lo) = lo {
                        out.push(lo);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

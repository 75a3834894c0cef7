//! Decoder vectors: raw chunk -> expected command sequence.

mod support;

use std::fs;
use std::path::PathBuf;

use moorline::{decode, Cmd};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("failed to read fixture {name}: {err}"))
}

fn format_cmd(cmd: &Cmd) -> String {
    match cmd {
        Cmd::Insert(ch) => format!("Insert({ch})"),
        Cmd::Paste(text) => format!("Paste({text})"),
        Cmd::Submit => "Submit".to_string(),
        Cmd::Interrupt => "Interrupt".to_string(),
        Cmd::CursorLeft => "CursorLeft".to_string(),
        Cmd::CursorRight => "CursorRight".to_string(),
        Cmd::CursorHome => "CursorHome".to_string(),
        Cmd::CursorEnd => "CursorEnd".to_string(),
        Cmd::Backspace => "Backspace".to_string(),
        Cmd::DeleteForward => "DeleteForward".to_string(),
        Cmd::KillLine => "KillLine".to_string(),
        Cmd::KillToEnd => "KillToEnd".to_string(),
        Cmd::DeleteWordBack => "DeleteWordBack".to_string(),
        Cmd::HistoryUp => "HistoryUp".to_string(),
        Cmd::HistoryDown => "HistoryDown".to_string(),
    }
}

#[test]
fn decode_vectors_match_fixture() {
    let raw = read_fixture("decode_vectors.tsv");
    for (idx, line) in raw.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        assert!(
            parts.len() == 2,
            "line {line_num}: expected 2 columns, got {}",
            parts.len()
        );

        let input = support::unescape(parts[0]);
        let expected = parts[1].trim();

        let actual = decode(&input)
            .iter()
            .map(format_cmd)
            .collect::<Vec<_>>()
            .join(",");
        let actual = if actual.is_empty() {
            "none".to_string()
        } else {
            actual
        };

        assert_eq!(
            actual, expected,
            "line {line_num}: decode({input:?}) mismatch"
        );
    }
}

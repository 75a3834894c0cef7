#![allow(unused_imports)]

use moorline::{
    decode, visible_width, Cmd, EngineEvent, EnvConfig, History, InputChunker, Layout, LineBuffer,
    LineEngine, OutputGate, OutputHandle, ProcessTerminal, Terminal, TerminalCmd, TerminalGuard,
    HISTORY_CAPACITY,
};

#[test]
fn public_api_exports_compile() {}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! `svm` - run an SVM bytecode file.
//!
//! ```text
//! svm <bytecode-file>
//! ```
//!
//! Reads the whole file, executes it from offset 0 and writes `PRINTREG`
//! output to stdout. Exit status:
//!
//! - `0`: the program halted
//! - `1`: the program faulted; the fault is printed to stderr
//! - `2`: usage or I/O error
//!
//! Log output goes to stderr and is filtered by `RUST_LOG` (default `warn`).

use std::env;
use std::fs;
use std::io;
use std::process::ExitCode;

use svm::{Bytecode, VmState, WriterSink, execute};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: svm <bytecode-file>";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let mut args = env::args_os().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    let code = match fs::read(&path) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("svm: cannot read {}: {e}", path.to_string_lossy());
            return ExitCode::from(2);
        }
    };
    info!(path = %path.to_string_lossy(), bytes = code.len(), version = svm::VERSION, "loaded");

    let mut state = VmState::new();
    let mut sink = WriterSink::new(io::stdout().lock());
    match execute(Bytecode::new(&code), &mut state, &mut sink) {
        Ok(()) => {
            debug!(steps = state.steps(), "program halted");
            ExitCode::SUCCESS
        }
        Err(fault) => {
            eprintln!("svm: {fault}");
            ExitCode::from(1)
        }
    }
}

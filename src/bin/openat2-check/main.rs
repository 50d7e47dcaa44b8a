/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

// Treat all Clippy warnings as errors.
#![deny(clippy::all)]

mod global_opts;
mod tracing;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use openat2_check::CheckOutcome;
use openat2_check::Error;
use openat2_check::run_check;

use self::global_opts::GlobalOpts;

/// Conformance check for the io_uring `openat2` opcode.
///
/// Opens a scratch file through the ring twice: once by absolute path with
/// no base directory and once by a path relative to the working directory.
/// A kernel without the opcode is reported as a skip, not a failure.
#[derive(Debug, Parser)]
#[clap(name = "openat2-check")]
struct Args {
    #[clap(flatten)]
    global: GlobalOpts,

    /// Pre-existing file to open relative to the working directory. It is
    /// not created or removed by the check. Without it, a default relative
    /// fixture is created and cleaned up automatically.
    #[clap(value_name = "FILE")]
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = args.global.init_tracing();

    match run_check(args.file) {
        Ok(CheckOutcome::Passed) => ExitCode::SUCCESS,
        Ok(CheckOutcome::Skipped) => {
            println!("openat2 not supported, skipping");
            ExitCode::SUCCESS
        }
        Err(err) => {
            display_error(err);
            ExitCode::FAILURE
        }
    }
}

fn display_error(error: Error) {
    let mut chain = error.chain();

    if let Some(error) = chain.next() {
        eprintln!("{}: {}", "Error".red().bold(), error);
    }

    for cause in chain {
        eprintln!("     {} {}", ">".dimmed().bold(), cause);
    }
}

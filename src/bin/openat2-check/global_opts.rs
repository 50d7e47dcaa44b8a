/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use tracing::metadata::LevelFilter;

use super::tracing::init_file_tracing;
use super::tracing::init_stderr_tracing;

/// Logging options shared by every invocation.
#[derive(Debug, Parser, Clone)]
pub struct GlobalOpts {
    /// The verbosity level of log output.
    #[clap(short, long, value_name = "LEVEL", env = "OPENAT2_CHECK_LOG")]
    pub log: Option<LevelFilter>,

    /// Log to a file instead of stderr.
    #[clap(long, value_name = "FILE", env = "OPENAT2_CHECK_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl GlobalOpts {
    /// Initializes tracing. Must run before any probing starts.
    #[must_use = "This function returns a guard that should not be immediately dropped"]
    pub fn init_tracing(&self) -> Option<impl Drop + use<>> {
        if let Some(path) = &self.log_file {
            let file_writer = File::create(path).expect("Failed to open log file");
            Some(init_file_tracing(self.log, file_writer))
        } else {
            init_stderr_tracing(self.log);
            None
        }
    }
}

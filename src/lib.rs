/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Conformance check for the io_uring `openat2` opcode.
//!
//! The check stages scratch files and opens them through the ring twice:
//! once by absolute path with no base directory, once by a path resolved
//! against the working directory. A kernel that lacks the opcode is
//! reported as a skip rather than a failure.

// Treat all Clippy warnings as errors.
#![deny(clippy::all)]

mod error;
pub mod fixture;
pub mod probe;

use std::env;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use io_uring::IoUring;
use tracing::info;

pub use error::Context;
pub use error::Error;
use fixture::FIXTURE_SIZE;
use fixture::Fixture;
use probe::BaseDir;
use probe::OpenOutcome;
use probe::classify;
use probe::probe_openat2;

/// Queue depth for the one-request-at-a-time check.
const QUEUE_DEPTH: u32 = 8;

/// File name shared by the default fixtures.
const FIXTURE_NAME: &str = ".openat2-check";

/// Overall verdict of the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Both probes opened their fixture.
    Passed,
    /// The kernel lacks `IORING_OP_OPENAT2`; nothing further was probed.
    Skipped,
}

fn cstring_path(path: &Path) -> Result<CString, Error> {
    CString::new(path.as_os_str().as_bytes())
        .with_context(|| format!("path {} contains a NUL byte", path.display()))
}

/// Runs both openat2 probes against one ring.
///
/// When `caller_path` is given it names a pre-existing file owned by the
/// caller, opened relative to the working directory and left in place.
/// Otherwise a default relative fixture is created and removed alongside
/// the absolute one.
pub fn run_check(caller_path: Option<PathBuf>) -> Result<CheckOutcome, Error> {
    // Engine setup comes first: with no ring there is no point staging
    // fixtures.
    let mut ring = IoUring::new(QUEUE_DEPTH).context("io_uring queue setup failed")?;

    let absolute = Fixture::create(env::temp_dir().join(FIXTURE_NAME), FIXTURE_SIZE)
        .context("absolute fixture setup failed")?;
    let relative = match caller_path {
        Some(path) => Fixture::adopt(path),
        None => Fixture::create(FIXTURE_NAME, FIXTURE_SIZE)
            .context("relative fixture setup failed")?,
    };

    let res = probe_openat2(&mut ring, &cstring_path(absolute.path())?, BaseDir::Absolute)
        .context("absolute-path probe could not run")?;
    match classify(res) {
        OpenOutcome::Opened(_) => info!("Absolute-path openat2 succeeded"),
        OpenOutcome::Unsupported => return Ok(CheckOutcome::Skipped),
        OpenOutcome::Failed(errno) => {
            bail!("absolute-path openat2 failed: {} ({})", errno, res)
        }
    }

    let res = probe_openat2(&mut ring, &cstring_path(relative.path())?, BaseDir::Cwd)
        .context("relative-path probe could not run")?;
    match classify(res) {
        OpenOutcome::Opened(_) => info!("Relative-path openat2 succeeded"),
        // The unsupported allowance belongs to the absolute probe alone;
        // by this point the opcode is known to work.
        OpenOutcome::Unsupported | OpenOutcome::Failed(_) => {
            bail!(
                "relative-path openat2 failed: {} ({})",
                nix::errno::Errno::from_raw(-res),
                res
            )
        }
    }

    Ok(CheckOutcome::Passed)
}

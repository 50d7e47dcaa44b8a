/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Scratch files for the probes to open.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::error::Context;
use crate::error::Error;

/// Byte written at every offset of a generated fixture.
pub const FILL_BYTE: u8 = 0xaa;

/// Size of a generated fixture, one page.
pub const FIXTURE_SIZE: usize = 4096;

/// A scratch file with deterministic content.
///
/// Owned fixtures are created here and unlinked on drop, so every exit
/// branch of the check reaches the same teardown. Adopted fixtures belong
/// to the caller and are never created or removed.
#[derive(Debug)]
pub struct Fixture {
    path: PathBuf,
    owned: bool,
}

impl Fixture {
    /// Creates (or truncates) `path` and fills it with `size` bytes of
    /// [`FILL_BYTE`]. A file the probes cannot rely on is fatal, so any
    /// open or write error is reported.
    pub fn create(path: impl Into<PathBuf>, size: usize) -> Result<Self, Error> {
        let path = path.into();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(&path)
            .with_context(|| format!("failed to create fixture {}", path.display()))?;
        file.write_all(&vec![FILL_BYTE; size])
            .with_context(|| format!("failed to fill fixture {}", path.display()))?;
        debug!("Created fixture {} ({} bytes)", path.display(), size);
        Ok(Self { path, owned: true })
    }

    /// Wraps a pre-existing file owned by the caller.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if self.owned {
            remove_fixture(&self.path);
        }
    }
}

/// Best-effort unlink. Teardown must never fail the check or mask an
/// earlier failure, so the result is discarded.
pub fn remove_fixture(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        debug!("Ignoring removal error for {}: {}", path.display(), err);
    }
}

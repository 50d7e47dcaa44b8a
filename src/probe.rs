/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! One-shot openat2 probes through an io_uring instance.

use std::ffi::CStr;
use std::io;
use std::os::fd::FromRawFd;
use std::os::fd::OwnedFd;

use io_uring::IoUring;
use io_uring::opcode;
use io_uring::types;
use nix::errno::Errno;
use thiserror::Error;
use tracing::debug;

/// How the kernel should resolve the request's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDir {
    /// No base directory; the path must be absolute.
    Absolute,
    /// Resolve relative to the calling process's working directory.
    Cwd,
}

impl BaseDir {
    const fn dirfd(self) -> i32 {
        match self {
            Self::Absolute => -1,
            Self::Cwd => libc::AT_FDCWD,
        }
    }
}

/// Failure on the submission path, before the kernel produced any verdict
/// on the open itself. Distinct from a negative completion result.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("submission queue full")]
    QueueFull,
    #[error("submission accepted zero entries")]
    Rejected,
    #[error("io_uring submit failed")]
    Submit(#[from] io::Error),
    #[error("no completion after blocking wait")]
    NoCompletion,
}

/// Outcome of one classified openat2 completion.
#[derive(Debug)]
pub enum OpenOutcome {
    /// The open succeeded; dropping the fd closes it.
    Opened(OwnedFd),
    /// The kernel does not implement `IORING_OP_OPENAT2`.
    Unsupported,
    /// The kernel rejected the open.
    Failed(Errno),
}

/// Submits one read-only openat2 request and blocks until its completion
/// arrives. Exactly one submit/wait cycle, no timeout, no cancellation.
///
/// Returns the raw signed result code unchanged. Interpreting it is the
/// caller's business, because the absolute and relative call sites accept
/// different outcomes.
pub fn probe_openat2(
    ring: &mut IoUring,
    path: &CStr,
    base: BaseDir,
) -> Result<i32, ProbeError> {
    // O_RDONLY, every extension field zeroed.
    let how = types::OpenHow::new().flags(libc::O_RDONLY as u64);
    let entry = opcode::OpenAt2::new(types::Fd(base.dirfd()), path.as_ptr(), &how).build();

    // SAFETY: `path` and `how` outlive submit_and_wait below, which returns
    // only after the kernel has consumed the request.
    unsafe {
        ring.submission()
            .push(&entry)
            .map_err(|_| ProbeError::QueueFull)?;
    }

    let submitted = ring.submit_and_wait(1)?;
    if submitted == 0 {
        return Err(ProbeError::Rejected);
    }

    let cqe = ring.completion().next().ok_or(ProbeError::NoCompletion)?;
    let res = cqe.result();
    debug!("openat2 completion for {:?} base: {}", base, res);
    Ok(res)
}

/// Maps a raw completion result onto the outcomes the check cares about.
///
/// Kernels without the opcode report `-EINVAL`, the one negative value
/// that is not a failure for the absolute-path probe.
pub fn classify(res: i32) -> OpenOutcome {
    if res >= 0 {
        // SAFETY: a non-negative openat2 result is a freshly opened fd
        // that nothing else owns.
        OpenOutcome::Opened(unsafe { OwnedFd::from_raw_fd(res) })
    } else if res == -libc::EINVAL {
        OpenOutcome::Unsupported
    } else {
        OpenOutcome::Failed(Errno::from_raw(-res))
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::fs::File;
    use std::os::fd::AsRawFd;
    use std::os::fd::IntoRawFd;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixture::FIXTURE_SIZE;
    use crate::fixture::Fixture;

    fn test_ring() -> Option<IoUring> {
        // Sandboxes may refuse io_uring entirely; skip the live probes there.
        IoUring::new(8).ok()
    }

    fn cstring(path: &Path) -> CString {
        CString::new(path.as_os_str().as_bytes()).unwrap()
    }

    #[test]
    fn classify_non_negative_is_opened() {
        let fd = File::open("/dev/null").unwrap().into_raw_fd();
        match classify(fd) {
            OpenOutcome::Opened(owned) => assert_eq!(owned.as_raw_fd(), fd),
            other => panic!("expected Opened, got {:?}", other),
        }
    }

    #[test]
    fn classify_einval_is_unsupported() {
        assert!(matches!(classify(-libc::EINVAL), OpenOutcome::Unsupported));
    }

    #[test]
    fn classify_other_negative_is_failed() {
        match classify(-libc::ENOENT) {
            OpenOutcome::Failed(errno) => assert_eq!(errno, Errno::ENOENT),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn absolute_probe_opens_fixture() {
        let Some(mut ring) = test_ring() else { return };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe-abs");
        let _fixture = Fixture::create(&path, FIXTURE_SIZE).unwrap();

        let res = probe_openat2(&mut ring, &cstring(&path), BaseDir::Absolute).unwrap();
        match classify(res) {
            OpenOutcome::Opened(_) | OpenOutcome::Unsupported => {}
            OpenOutcome::Failed(errno) => panic!("absolute probe failed: {}", errno),
        }
    }

    #[test]
    fn relative_probe_opens_fixture() {
        let Some(mut ring) = test_ring() else { return };
        // Relative to the test process's working directory, so the name
        // must not collide with the binary's own default fixture.
        let name = format!(".openat2-probe-{}", std::process::id());
        let _fixture = Fixture::create(&name, FIXTURE_SIZE).unwrap();

        let res = probe_openat2(
            &mut ring,
            &CString::new(name.as_str()).unwrap(),
            BaseDir::Cwd,
        )
        .unwrap();
        match classify(res) {
            OpenOutcome::Opened(_) | OpenOutcome::Unsupported => {}
            OpenOutcome::Failed(errno) => panic!("relative probe failed: {}", errno),
        }
    }

    #[test]
    fn missing_path_reports_enoent() {
        let Some(mut ring) = test_ring() else { return };
        let path = CString::new("/no/such/fixture").unwrap();

        let res = probe_openat2(&mut ring, &path, BaseDir::Absolute).unwrap();
        match classify(res) {
            OpenOutcome::Unsupported => {}
            OpenOutcome::Failed(errno) => assert_eq!(errno, Errno::ENOENT),
            OpenOutcome::Opened(_) => panic!("open of a missing path succeeded"),
        }
    }
}

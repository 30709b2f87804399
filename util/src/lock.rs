//! Advisory `flock(2)` locks keyed by a path.
//!
//! The lock file is created on first use and never removed; its contents are never read or
//! written. Locks taken through separate opens of the same path exclude each other even within
//! one process.

pub use timeout::Timeout;
pub mod timeout {
    /// How long to wait for a contended lock.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Timeout {
        #[default]
        Never,
        After(Duration),
    }

    impl Timeout {
        pub(crate) fn deadline(self) -> Option<Instant> {
            match self {
                Self::Never => None,
                Self::After(duration) => Instant::now().checked_add(duration),
            }
        }
    }

    use std::time::Duration;
    use std::time::Instant;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Shared,
    Exclusive,
}

impl Mode {
    fn operation(self) -> libc::c_int {
        match self {
            Self::Shared => libc::LOCK_SH,
            Self::Exclusive => libc::LOCK_EX,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shared => "shared",
            Self::Exclusive => "exclusive",
        })
    }
}

pub fn shared(path: &fs::Path, timeout: Timeout) -> Result<Guard, Error> {
    acquire(path, Mode::Shared, timeout)
}

pub fn exclusive(path: &fs::Path, timeout: Timeout) -> Result<Guard, Error> {
    acquire(path, Mode::Exclusive, timeout)
}

pub fn acquire(path: &fs::Path, mode: Mode, timeout: Timeout) -> Result<Guard, Error> {
    let file = acquire_inner(path, mode, timeout).map_err(|kind| Error {
        path: path.into(),
        mode,
        kind,
    })?;
    tracing::debug!(path = %path.display(), %mode, "acquired lock");
    Ok(Guard {
        file: Some(file),
        mode,
    })
}

fn acquire_inner(
    path: &fs::Path,
    mode: Mode,
    timeout: Timeout,
) -> Result<fs::File<fs::PathBuf>, ErrorKind> {
    let access = Access::ReadWrite(WriteOptions::OpenOrCreate);
    let options = Options::from_access(access).permissions(0o600);
    let file = fs::file::open(path.to_owned(), options)?;

    let start = Instant::now();
    let deadline = timeout.deadline();
    let mut backoff = MIN_BACKOFF;

    loop {
        let operation = match deadline {
            Some(_) => mode.operation() | libc::LOCK_NB,
            None => mode.operation(),
        };
        let error = match flock(&file, operation) {
            Ok(()) => return Ok(file),
            Err(e) => e,
        };
        match (error.kind(), deadline) {
            (io::ErrorKind::Interrupted, _) => {}
            (io::ErrorKind::WouldBlock, Some(deadline)) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(ErrorKind::TimedOut(now - start));
                }
                thread::sleep(backoff.min(deadline - now));
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            _ => return Err(ErrorKind::Lock(error)),
        }
    }
}

const MIN_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(100);

fn flock(file: &impl AsRawFd, operation: libc::c_int) -> io::Result<()> {
    // SAFETY: the descriptor is owned by `file`, which outlives the call.
    match unsafe { libc::flock(file.as_raw_fd(), operation) } {
        0 => Ok(()),
        _ => Err(io::Error::last_os_error()),
    }
}

/// A held lock. Dropping it releases the lock; [`Guard::release`] does the same but reports
/// failure.
#[derive(Debug)]
pub struct Guard {
    file: Option<fs::File<fs::PathBuf>>,
    mode: Mode,
}

impl Guard {
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn release(mut self) -> Result<(), Error> {
        match self.file.take() {
            Some(file) => unlock(file, self.mode),
            None => Ok(()),
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = unlock(file, self.mode) {
                tracing::debug!(error = %e, "ignoring unlock failure on drop");
            }
        }
    }
}

fn unlock(file: fs::File<fs::PathBuf>, mode: Mode) -> Result<(), Error> {
    let res = flock(&file, libc::LOCK_UN);
    let path = file.into_path();
    match res {
        Ok(()) => {
            tracing::debug!(path = %path.display(), %mode, "released lock");
            Ok(())
        }
        Err(source) => Err(Error {
            path: path.into_boxed_path(),
            mode,
            kind: ErrorKind::Unlock(source),
        }),
    }
}

#[derive(Debug)]
pub struct Error {
    pub path: Box<fs::Path>,
    pub mode: Mode,
    pub kind: ErrorKind,
}

impl Error {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::TimedOut(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        let mode = self.mode;
        match &self.kind {
            ErrorKind::Open(_) | ErrorKind::Lock(_) => {
                write!(f, "failed to take {mode} lock on {path}")
            }
            ErrorKind::Unlock(_) => write!(f, "failed to release {mode} lock on {path}"),
            ErrorKind::TimedOut(waited) => write!(
                f,
                "gave up waiting for {mode} lock on {path} after {}ms",
                waited.as_millis()
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Open(e) => Some(e),
            ErrorKind::Lock(e) | ErrorKind::Unlock(e) => Some(e),
            ErrorKind::TimedOut(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    Open(fs::file::open::Error),
    Lock(io::Error),
    Unlock(io::Error),
    TimedOut(Duration),
}

impl From<fs::file::open::Error> for ErrorKind {
    fn from(error: fs::file::open::Error) -> Self {
        Self::Open(error)
    }
}


use crate::fs;
use crate::fs::file::open::Access;
use crate::fs::file::open::Options;
use crate::fs::file::open::WriteOptions;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io;
use std::os::unix::io::AsRawFd;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

const LOCK_FILE: &str = ".lock";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Exclusive hold on a `.trellis` directory for one store write.
///
/// The `flock` lives on the open descriptor; the file itself records the
/// pid of the current holder and stays in place between writers. Removing
/// it would let a waiter that already opened the old inode lock it while a
/// newcomer locks a fresh one.
pub struct StoreLock {
    file: File,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("gave up waiting for {path} after {waited:?}: held by {}", describe_holder(.holder))]
    Timeout {
        path: PathBuf,
        waited: Duration,
        holder: Option<u32>,
    },
}

fn describe_holder(holder: &Option<u32>) -> String {
    match holder {
        Some(pid) => format!("trl process {pid}"),
        None => "another trl process".to_string(),
    }
}

impl StoreLock {
    /// Lock the store in `dir`, polling until `timeout` runs out.
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::CreateError {
                path: path.clone(),
                source,
            })?;

        let started = Instant::now();
        let mut pause = Duration::from_millis(2);
        while !try_lock(&file) {
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    holder: read_holder(&path),
                    path,
                    waited,
                });
            }
            debug!(path = %path.display(), ?waited, "store is locked, waiting");
            std::thread::sleep(pause.min(timeout - waited));
            pause = (pause * 2).min(Duration::from_millis(50));
        }

        let lock = StoreLock { file };
        if let Err(e) = lock.record_holder() {
            debug!(path = %path.display(), error = %e, "could not record lock holder");
        }
        Ok(lock)
    }

    pub fn acquire_default(dir: &Path) -> Result<Self, LockError> {
        Self::acquire(dir, DEFAULT_TIMEOUT)
    }

    fn record_holder(&self) -> std::io::Result<()> {
        self.file.set_len(0)?;
        let mut file = &self.file;
        write!(file, "{}", std::process::id())?;
        file.flush()
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // clear the pid; closing the descriptor releases the flock
        let _ = self.file.set_len(0);
    }
}

/// Pid written by the current holder, if readable.
fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn try_lock(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> bool {
    true
}

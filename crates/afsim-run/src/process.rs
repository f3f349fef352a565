//! Spawning and signalling the simulator process.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// File in the output directory receiving the simulator's stdout and stderr.
pub const LOG_FILE: &str = "simulation.log";

/// Everything needed to start one simulator process.
#[derive(Clone, Debug)]
pub struct Launch<'a> {
    /// Simulator executable.
    pub binary: &'a Path,
    /// Rendered scenario handed to the simulator.
    pub scenario_file: &'a Path,
    /// Flag preceding the output directory.
    pub output_flag: &'a str,
    /// Output and working directory.
    pub output_dir: &'a Path,
    /// Appended verbatim.
    pub extra_args: &'a [String],
}

impl Launch<'_> {
    /// Arguments after the binary.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            self.scenario_file.display().to_string(),
            self.output_flag.to_string(),
            self.output_dir.display().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Start the process with stdout and stderr appended to
    /// [`LOG_FILE`]. Returns the child and the log path.
    pub fn spawn(&self) -> io::Result<(Child, PathBuf)> {
        let log_path = self.output_dir.join(LOG_FILE);
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        let mut attempt = 0;
        loop {
            let mut command = Command::new(self.binary);
            command
                .arg(self.scenario_file)
                .arg(self.output_flag)
                .arg(self.output_dir)
                .args(self.extra_args)
                .current_dir(self.output_dir)
                .stdin(Stdio::null())
                .stdout(log.try_clone()?)
                .stderr(log.try_clone()?);
            match command.spawn() {
                Ok(child) => return Ok((child, log_path)),
                // A binary written moments ago may still be open for writing
                // in a concurrently forked process.
                Err(e) if text_file_busy(&e) && attempt < SPAWN_RETRIES => {
                    attempt += 1;
                    std::thread::sleep(std::time::Duration::from_millis(20 * attempt));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

const SPAWN_RETRIES: u64 = 5;

#[cfg(unix)]
fn text_file_busy(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::ETXTBSY)
}

#[cfg(not(unix))]
fn text_file_busy(_: &io::Error) -> bool {
    false
}

/// Ask the child to exit (SIGTERM). Elsewhere the process is killed
/// outright.
#[cfg(unix)]
#[allow(unsafe_code)]
pub fn terminate(child: &mut Child) -> io::Result<()> {
    let pid = libc::pid_t::try_from(child.id())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill(2) has no memory-safety preconditions. `child` has not
    // been reaped, so the pid still names our child.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Ask the child to exit (SIGTERM). Elsewhere the process is killed
/// outright.
#[cfg(not(unix))]
pub fn terminate(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Exit code and a one-line description of how the process ended.
pub fn describe(status: ExitStatus) -> (Option<i32>, String) {
    if let Some(code) = status.code() {
        return (Some(code), format!("simulator exited with status {code}"));
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (None, format!("simulator killed by signal {signal}"));
        }
    }
    (None, "simulator ended without an exit code".to_string())
}

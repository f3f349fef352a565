//! Shell scripts that stand in for the simulator binary.
//!
//! The run controller invokes `<binary> <scenario> -o <output_dir> ...` with
//! the output directory as working directory, so each script sees the
//! scenario path in `$1` and the output directory in `$3`.

use std::path::{Path, PathBuf};

/// What the fake simulator does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Echo the arguments, write `results.csv` and `events.evt`, exit 0.
    Succeed,
    /// Exit immediately with this code.
    Exit(i32),
    /// Sleep for this many seconds; dies on SIGTERM.
    Sleep(u32),
    /// Ignore SIGTERM and sleep for this many seconds.
    IgnoreTerm(u32),
}

impl FakeBehavior {
    fn script(self) -> String {
        let body = match self {
            FakeBehavior::Succeed => concat!(
                "echo \"fake simulator: $*\"\n",
                "test -f \"$1\" || { echo \"missing scenario $1\" >&2; exit 9; }\n",
                "printf 'time,platform,alt\\n0,blue_1,9000\\n1,blue_1,9010\\n' > \"$3/results.csv\"\n",
                "printf '0.0 SIMULATION_STARTING\\n1.0 PLATFORM_ADDED blue_1 WSF_PLATFORM blue\\n' > \"$3/events.evt\"\n",
                "exit 0\n",
            )
            .to_string(),
            FakeBehavior::Exit(code) => format!("echo \"failing with {code}\" >&2\nexit {code}\n"),
            FakeBehavior::Sleep(secs) => format!("exec sleep {secs}\n"),
            FakeBehavior::IgnoreTerm(secs) => format!("trap '' TERM\nexec sleep {secs}\n"),
        };
        format!("#!/bin/sh\n{body}")
    }
}

/// Write an executable fake simulator into `dir` and return its path.
pub fn fake_simulator(dir: &Path, behavior: FakeBehavior) -> PathBuf {
    let path = dir.join("wsf_fake");
    std::fs::write(&path, behavior.script()).expect("write fake simulator");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fake simulator");
    }
    path
}

/// A fresh scratch directory.
pub fn scratch() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

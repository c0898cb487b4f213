//! Build run logging.
//!
//! Every install run opens two append-only files under the log directory,
//! named after the target and a timestamp taken at open time:
//!
//! - `install-<target>-<stamp>.log` takes status lines and tool stdout
//! - `install-<target>-<stamp>.err.log` takes tool stderr
//!
//! Child processes are wired straight into the files, so a crash loses
//! nothing. After a failed run the error log's tail is replayed as a
//! post-mortem.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use chrono::Local;

/// Lines replayed from the error log after a failure.
pub const TAIL_LINES: usize = 10;

const SEPARATOR_WIDTH: usize = 72;

/// Paired full and error-stream log files for one install run.
#[derive(Debug)]
pub struct BuildLog {
    full: File,
    err: File,
    full_path: PathBuf,
    err_path: PathBuf,
}

impl BuildLog {
    /// Open both log files for a run against `target`.
    pub fn open(log_dir: &Path, target: &str) -> anyhow::Result<BuildLog> {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let full_path = log_dir.join(format!("install-{target}-{stamp}.log"));
        let err_path = log_dir.join(format!("install-{target}-{stamp}.err.log"));
        let full = open_append(&full_path)?;
        let err = open_append(&err_path)?;
        Ok(BuildLog {
            full,
            err,
            full_path,
            err_path,
        })
    }

    /// Path of the full log file.
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Path of the error log file.
    pub fn err_path(&self) -> &Path {
        &self.err_path
    }

    /// Append a right-aligned status line to the full log.
    pub fn line(&self, marker: &str, text: &str) -> io::Result<()> {
        (&self.full).write_all(format!("{marker:>35} {text}\n").as_bytes())
    }

    /// Stdio sink that appends tool stdout to the full log.
    pub fn stdout_sink(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.full.try_clone()?))
    }

    /// Stdio sink that appends tool stderr to the error log.
    pub fn stderr_sink(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.err.try_clone()?))
    }

    /// Write the post-mortem for a failed run: the last [`TAIL_LINES`]
    /// lines of the error log, framed, followed by both log paths.
    ///
    /// An empty error log is reported as such without replaying anything,
    /// since the failure detail then lives in the full log.
    pub fn summarize<W: Write>(&self, out: &mut W) -> io::Result<()> {
        (&self.full).flush()?;
        (&self.err).flush()?;
        let meta = fs::metadata(&self.err_path)?;
        if meta.len() == 0 {
            writeln!(out, "The error log appears to be empty.")?;
        } else {
            let reader = BufReader::new(File::open(&self.err_path)?);
            let lines: Vec<String> = reader.lines().collect::<io::Result<_>>()?;
            let start = lines.len().saturating_sub(TAIL_LINES);
            let rule = "-".repeat(SEPARATOR_WIDTH);
            writeln!(out, "{rule}")?;
            for line in &lines[start..] {
                writeln!(out, "{line}")?;
            }
            writeln!(out, "{rule}")?;
        }
        writeln!(out, "Full log:  {}", self.full_path.display())?;
        writeln!(out, "Error log: {}", self.err_path.display())?;
        Ok(())
    }
}

impl Drop for BuildLog {
    fn drop(&mut self) {
        let _ = self.full.flush();
        let _ = self.err.flush();
    }
}

fn open_append(path: &Path) -> anyhow::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

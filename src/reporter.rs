//! Terminal UI for the install pipeline, rendered via `indicatif`.
//!
//! One progress bar tracks completed steps; status lines are printed above
//! it in a fixed two-column layout: a right-aligned step marker and a
//! left-padded message carrying the running step counter. Omitted steps
//! advance the bar like completed ones, so a resumed run still ends at 8/8.

use std::sync::atomic::{AtomicUsize, Ordering};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::step::Step;

/// Right-aligned width of the step marker column.
pub const MARKER_WIDTH: usize = 35;

/// Left-aligned width of the message column.
pub const MESSAGE_WIDTH: usize = 65;

const CHECK: &str = "✓";
const CROSS: &str = "✗";
const SKIP: &str = "↷";

/// Format one status line in the two-column layout.
pub fn format_status(marker: &str, message: &str) -> String {
    format!("{marker:>MARKER_WIDTH$} {message:<MESSAGE_WIDTH$}")
}

/// Progress display for one install run.
pub struct StepReporter {
    multi: MultiProgress,
    steps_bar: ProgressBar,
    verbose: bool,
    done: AtomicUsize,
}

impl StepReporter {
    /// Create the reporter and its steps bar, sized to the full pipeline.
    pub fn new(verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let steps_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let steps_bar = multi.add(ProgressBar::new(Step::COUNT as u64));
        steps_bar.set_style(steps_style);
        steps_bar.set_prefix("Steps");

        Self {
            multi,
            steps_bar,
            verbose,
            done: AtomicUsize::new(0),
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` when
    /// the rich UI is unavailable.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Print a raw line without column formatting.
    pub fn print_plain(&self, msg: &str) {
        self.print_line(msg);
    }

    /// Emit a status line for a step in progress and update the bar message.
    pub fn report(&self, step: Step, message: &str) {
        self.steps_bar
            .set_message(format!("{}: {}", style(step.label()).yellow(), message));
        if self.verbose {
            self.print_line(style(format_status(step.label(), message)).dim().to_string());
        }
    }

    /// Mark a step completed: advance the bar and print a numbered check line.
    pub fn step_done(&self, step: Step) {
        let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        self.steps_bar.inc(1);
        self.print_line(format!(
            "{} {}",
            style(CHECK).green().bold(),
            format_status(step.label(), &format!("[{n}/{}] done", Step::COUNT))
        ));
    }

    /// Mark a step skipped by the continuation cursor: advance the bar and
    /// print a dim omitted line.
    pub fn step_omitted(&self, step: Step) {
        let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        self.steps_bar.inc(1);
        self.print_line(format!(
            "{} {}",
            style(SKIP).dim(),
            style(format_status(
                step.label(),
                &format!("[{n}/{}] omitted", Step::COUNT)
            ))
            .dim()
        ));
    }

    /// Number of steps counted as done, skipped ones included.
    pub fn steps_done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Finish the bar and print the success banner.
    pub fn success_summary(&self, target: &str, prefix: &std::path::Path) {
        self.steps_bar.finish_with_message("complete");
        self.print_line("");
        self.print_line(format!(
            "{} Installed {} into {}",
            style(CHECK).green().bold(),
            style(target).green().bold(),
            prefix.display()
        ));
    }

    /// Abandon the bar and print the failure banner with a resume hint.
    pub fn failure_summary(&self, reason: &str, resume_hint: Option<usize>) {
        self.steps_bar.abandon_with_message("failed");
        self.print_line("");
        self.print_line(format!(
            "{} {}",
            style(CROSS).red().bold(),
            style(reason).red()
        ));
        self.print_line(format!(
            "{}/{} steps completed",
            self.steps_done(),
            Step::COUNT
        ));
        if let Some(cursor) = resume_hint {
            self.print_line(format!(
                "Resume with {}",
                style(format!("--continue {cursor}")).cyan()
            ));
        }
    }
}

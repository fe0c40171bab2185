// src/report/summary.rs

//! Human-readable run summary.

use std::fmt;

use crate::report::outcome::{Outcome, RunReport};

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.results {
            let tag = match r.outcome {
                Outcome::Succeeded => "[ok]  ",
                Outcome::Skipped => "[skip]",
                Outcome::Failed => "[FAIL]",
                Outcome::TimedOut => "[TIME]",
                Outcome::NotRun(_) => "[--]  ",
            };
            write!(f, "  {tag} {}", r.name)?;
            if let Some(v) = &r.version {
                write!(f, " {v}")?;
            }
            if let Some(src) = &r.source {
                write!(f, " ({src})")?;
            }
            if let Some(d) = r.duration {
                write!(f, " [{:.1}s]", d.as_secs_f64())?;
            }
            writeln!(f)?;

            let show_detail = !matches!(r.outcome, Outcome::Succeeded | Outcome::Skipped);
            if show_detail {
                if let Some(detail) = &r.detail {
                    writeln!(f, "         {detail}")?;
                }
                if let Some(log) = &r.log {
                    writeln!(f, "         log: {}", log.display())?;
                }
            }
        }

        let succeeded = self.count(|o| matches!(o, Outcome::Succeeded));
        let skipped = self.count(|o| matches!(o, Outcome::Skipped));
        let failed = self.count(|o| matches!(o, Outcome::Failed | Outcome::TimedOut));
        let not_run = self.count(|o| matches!(o, Outcome::NotRun(_)));

        writeln!(
            f,
            "{}: {succeeded} succeeded, {skipped} skipped, {failed} failed, {not_run} not run",
            if self.success { "OK" } else { "FAILED" }
        )
    }
}

use std::fmt;

use uuid::Uuid;

use crate::monitor::MonitorReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CloseProcesses,
    ClearBrowserCache,
    HighPerformancePower,
    FlushDns,
    DisableStartupItems,
    RestorePowerPlan,
    RestoreStartupItems,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::CloseProcesses => "Close background processes",
            Step::ClearBrowserCache => "Clear browser cache",
            Step::HighPerformancePower => "High Performance power plan",
            Step::FlushDns => "Flush DNS cache",
            Step::DisableStartupItems => "Disable startup items",
            Step::RestorePowerPlan => "Restore power plan",
            Step::RestoreStartupItems => "Restore startup items",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(String),
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Optimized,
    Restored,
    /// An elevated copy took over
    Relaunched,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub kind: ReportKind,
    pub run_id: Option<Uuid>,
    pub steps: Vec<StepReport>,
    pub monitor: Option<MonitorReport>,
    pub interrupted: bool,
    /// Exit code of the elevated copy
    pub exit_code: Option<i32>,
}

impl Report {
    pub fn relaunched(exit_code: i32) -> Self {
        Self {
            kind: ReportKind::Relaunched,
            run_id: None,
            steps: Vec::new(),
            monitor: None,
            interrupted: false,
            exit_code: Some(exit_code),
        }
    }

    #[cfg(test)]
    pub fn outcome(&self, step: Step) -> Option<&Outcome> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.outcome)
    }

    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Failed(_)))
            .count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReportKind::Relaunched => {
                return writeln!(
                    f,
                    "The elevated GPTboost window finished with exit code {}.",
                    self.exit_code.unwrap_or_default()
                );
            }
            ReportKind::Optimized => writeln!(f, "GPTboost optimization report")?,
            ReportKind::Restored => writeln!(f, "GPTboost undo report")?,
        }
        if let Some(id) = self.run_id {
            writeln!(f, "  run: {}", id)?;
        }

        for s in &self.steps {
            let (mark, detail) = match &s.outcome {
                Outcome::Done(d) => ("ok", d),
                Outcome::Skipped(d) => ("--", d),
                Outcome::Failed(d) => ("!!", d),
            };
            writeln!(f, "  [{}] {}: {}", mark, s.step.label(), detail)?;
        }

        if let Some(m) = &self.monitor {
            if m.samples == 0 {
                writeln!(f, "  Monitoring: no samples taken")?;
            } else {
                writeln!(
                    f,
                    "  Monitoring ({} samples): CPU avg {:.1}% / peak {:.1}%, RAM avg {:.1}% / peak {:.1}%",
                    m.samples, m.avg_cpu, m.peak_cpu, m.avg_memory, m.peak_memory
                )?;
            }
        }

        if self.interrupted {
            writeln!(f, "Operation cancelled by user")
        } else if self.failures() > 0 {
            writeln!(f, "Completed with {} failed step(s); see the log for details.", self.failures())
        } else {
            match self.kind {
                ReportKind::Optimized => {
                    writeln!(f, "GPTboost completed successfully! You can now test ChatGPT performance.")
                }
                _ => writeln!(f, "Undo complete."),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_steps_and_failures() {
        let report = Report {
            kind: ReportKind::Optimized,
            run_id: None,
            steps: vec![
                StepReport {
                    step: Step::FlushDns,
                    outcome: Outcome::Failed("ipconfig exited with 1".into()),
                },
                StepReport {
                    step: Step::ClearBrowserCache,
                    outcome: Outcome::Skipped("no browser selected".into()),
                },
            ],
            monitor: Some(MonitorReport::default()),
            interrupted: false,
            exit_code: None,
        };

        let text = report.to_string();
        assert!(text.contains("[!!] Flush DNS cache: ipconfig exited with 1"));
        assert!(text.contains("[--] Clear browser cache"));
        assert!(text.contains("no samples taken"));
        assert!(text.contains("1 failed step"));
        assert_eq!(report.failures(), 1);
    }

    #[test]
    fn test_relaunched_report_is_one_line() {
        assert_eq!(
            Report::relaunched(3).to_string(),
            "The elevated GPTboost window finished with exit code 3.\n"
        );
    }
}

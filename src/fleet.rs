use crate::evaluator::EvaluatedDisk;
use crate::models::issue::Verdict;
use serde::Serialize;

pub const URGENCY_CRITICAL: &str = "REPLACE WITHIN 24-48H";
pub const URGENCY_WARNING: &str = "Monitor/test, replace in 1-4 weeks";

/// One line of the "Action Required" list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionItem {
    pub device:  String,
    pub verdict: Verdict,
    pub urgency: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub healthy:   usize,
    pub warning:   usize,
    pub critical:  usize,
    /// Critical disks first, then warning disks; each tier sorted by device path.
    pub actions:   Vec<ActionItem>,
    pub exit_code: i32,
}

impl FleetSummary {
    pub fn total(&self) -> usize {
        self.healthy + self.warning + self.critical
    }

    pub fn worst(&self) -> Verdict {
        if self.critical > 0 {
            Verdict::Critical
        } else if self.warning > 0 {
            Verdict::Warning
        } else {
            Verdict::Healthy
        }
    }
}

/// Process exit code for the worst verdict seen: 0 healthy, 1 warning, 2 critical.
pub fn exit_code(worst: Verdict) -> i32 {
    match worst {
        Verdict::Healthy  => 0,
        Verdict::Warning  => 1,
        Verdict::Critical => 2,
    }
}

/// Reduce per-disk verdicts into counts, an action list and an exit code.
/// The result does not depend on the order of `disks`.
pub fn summarize(disks: &[EvaluatedDisk]) -> FleetSummary {
    let mut summary = FleetSummary::default();
    let mut critical: Vec<&str> = Vec::new();
    let mut warning: Vec<&str> = Vec::new();

    for d in disks {
        match d.verdict() {
            Verdict::Healthy  => summary.healthy += 1,
            Verdict::Warning  => {
                summary.warning += 1;
                warning.push(&d.disk.device);
            }
            Verdict::Critical => {
                summary.critical += 1;
                critical.push(&d.disk.device);
            }
        }
    }

    critical.sort_unstable();
    warning.sort_unstable();

    let tiers = [
        (Verdict::Critical, URGENCY_CRITICAL, critical),
        (Verdict::Warning, URGENCY_WARNING, warning),
    ];
    for (verdict, urgency, devices) in tiers {
        summary.actions.extend(devices.into_iter().map(|device| ActionItem {
            device: device.to_string(),
            verdict,
            urgency,
        }));
    }

    summary.exit_code = exit_code(summary.worst());
    summary
}

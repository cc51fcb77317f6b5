use serde::Serialize;

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Warning  => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// Overall disk verdict. Ordered: Healthy < Warning < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Healthy  => "HEALTHY",
            Verdict::Warning  => "WARNING",
            Verdict::Critical => "CRITICAL",
        }
    }

    /// Fold one more finding into the verdict. Never lowers it.
    pub fn escalate(self, severity: Severity) -> Verdict {
        self.max(Verdict::from(severity))
    }
}

impl From<Severity> for Verdict {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Warning  => Verdict::Warning,
            Severity::Critical => Verdict::Critical,
        }
    }
}

/// One flagged finding on one disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity:    Severity,
    pub attribute:   String,
    /// Which field triggered, e.g. `VALUE=42` or `RAW=12`.
    pub value:       String,
    pub explanation: String,
    pub action:      String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_ordering() {
        assert!(Verdict::Healthy < Verdict::Warning);
        assert!(Verdict::Warning < Verdict::Critical);
        assert_eq!(Verdict::default(), Verdict::Healthy);
    }

    #[test]
    fn test_escalate_never_downgrades() {
        let sequences = [
            vec![Severity::Critical, Severity::Warning],
            vec![Severity::Warning, Severity::Warning, Severity::Critical],
            vec![Severity::Warning, Severity::Critical, Severity::Warning],
        ];
        for seq in &sequences {
            let mut v = Verdict::Healthy;
            for s in seq {
                let next = v.escalate(*s);
                assert!(next >= v);
                v = next;
            }
            assert_eq!(v, Verdict::from(*seq.iter().max().unwrap()));
        }
    }

    #[test]
    fn test_warning_leaves_critical_alone() {
        assert_eq!(Verdict::Critical.escalate(Severity::Warning), Verdict::Critical);
        assert_eq!(Verdict::Healthy.escalate(Severity::Warning), Verdict::Warning);
    }
}

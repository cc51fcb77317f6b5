use crate::models::device::{DiskRecord, Manufacturer};
use crate::models::issue::{Issue, Severity, Verdict};
use crate::models::smart::SmartAttribute;
use crate::rules::{AttributeRule, RuleDatabase, ValueCheck, RAW_READ_ERROR_RATE};
use serde::Serialize;

const HEADROOM_CRITICAL: i32 = 10;
const HEADROOM_WARNING: i32 = 20;

/// Issues found on one disk plus the verdict they add up to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub issues:  Vec<Issue>,
    pub verdict: Verdict,
}

impl Evaluation {
    fn push(&mut self, issue: Issue) {
        self.verdict = self.verdict.escalate(issue.severity);
        self.issues.push(issue);
    }
}

/// A disk together with the result of evaluating it.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedDisk {
    pub disk:       DiskRecord,
    pub evaluation: Evaluation,
}

impl EvaluatedDisk {
    pub fn new(disk: DiskRecord, rules: &RuleDatabase) -> Self {
        let evaluation = evaluate(&disk, rules);
        Self { disk, evaluation }
    }

    pub fn verdict(&self) -> Verdict {
        self.evaluation.verdict
    }
}

/// How the normalized value of an attribute is judged on a given drive.
enum ValueStrategy {
    Absolute(ValueCheck),
    /// Distance to the device's own threshold instead of a fixed floor.
    Headroom,
}

/// Some vendors ship drives whose normalized value starts well below 100,
/// so the generic floor would flag brand-new disks.
fn uses_headroom(id: u32, maker: Manufacturer) -> bool {
    match maker {
        Manufacturer::Seagate => id == RAW_READ_ERROR_RATE,
        Manufacturer::WesternDigital
        | Manufacturer::Toshiba
        | Manufacturer::Samsung
        | Manufacturer::Micron
        | Manufacturer::Hgst
        | Manufacturer::Unknown => false,
    }
}

fn value_strategy(id: u32, rule: &AttributeRule, maker: Manufacturer) -> Option<ValueStrategy> {
    let check = rule.value_check?;
    if uses_headroom(id, maker) {
        Some(ValueStrategy::Headroom)
    } else {
        Some(ValueStrategy::Absolute(check))
    }
}

/// Apply every applicable rule to one disk, in ascending attribute id order.
/// Pure: the same disk and rule database always yield the same evaluation.
pub fn evaluate(disk: &DiskRecord, rules: &RuleDatabase) -> Evaluation {
    let maker = disk.manufacturer();
    let mut eval = Evaluation::default();

    for (id, rule) in rules.iter() {
        let attr = match disk.attributes.get(&id) {
            Some(a) => a,
            None    => continue,
        };
        if !rule.applicability.applies_to(disk.media) {
            continue;
        }

        match value_strategy(id, rule, maker) {
            Some(ValueStrategy::Headroom)        => check_headroom(attr, rule, &mut eval),
            Some(ValueStrategy::Absolute(check)) => check_value(attr, rule, check, &mut eval),
            None                                 => {}
        }

        if let Some(threshold) = rule.raw_threshold {
            check_raw(attr, rule, threshold, &mut eval);
        }
    }

    eval
}

fn check_headroom(attr: &SmartAttribute, rule: &AttributeRule, eval: &mut Evaluation) {
    let headroom = attr.headroom();
    let value = format!(
        "VALUE={} (headroom: {} from THRESH={})",
        attr.value, headroom, attr.thresh
    );
    if headroom < HEADROOM_CRITICAL {
        eval.push(Issue {
            severity:    Severity::Critical,
            attribute:   attr.name.clone(),
            value,
            explanation: "Approaching failure threshold - excessive read errors".to_string(),
            action:      rule.action_critical.to_string(),
        });
    } else if headroom < HEADROOM_WARNING {
        eval.push(Issue {
            severity:    Severity::Warning,
            attribute:   attr.name.clone(),
            value,
            explanation: "Read error rate increasing but still acceptable for Seagate".to_string(),
            action:      "Monitor monthly, verify backups exist".to_string(),
        });
    }
}

fn check_value(attr: &SmartAttribute, rule: &AttributeRule, check: ValueCheck, eval: &mut Evaluation) {
    // A disk already judged CRITICAL does not collect generic value warnings.
    let severity = if attr.value <= check.critical {
        Severity::Critical
    } else if attr.value <= check.warning && eval.verdict != Verdict::Critical {
        Severity::Warning
    } else {
        return;
    };
    let (explanation, action) = match severity {
        Severity::Critical => (rule.explanation_critical, rule.action_critical),
        Severity::Warning  => (rule.explanation_warning, rule.action_warning),
    };
    eval.push(Issue {
        severity,
        attribute:   attr.name.clone(),
        value:       format!("VALUE={}", attr.value),
        explanation: explanation.to_string(),
        action:      action.to_string(),
    });
}

fn check_raw(attr: &SmartAttribute, rule: &AttributeRule, threshold: u64, eval: &mut Evaluation) {
    // Unparseable raw text means the rule does not apply here.
    let raw = match attr.raw_counter() {
        Some(r) => r,
        None    => return,
    };
    if raw > threshold {
        eval.push(Issue {
            severity:    Severity::Critical,
            attribute:   attr.name.clone(),
            value:       format!("RAW={}", raw),
            explanation: rule.explanation_critical.to_string(),
            action:      rule.action_critical.to_string(),
        });
    }
}

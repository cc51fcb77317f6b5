use crate::models::device::MediaType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

pub const RAW_READ_ERROR_RATE: u32 = 1;
pub const POWER_ON_HOURS: u32 = 9;
pub const TEMPERATURE_CELSIUS: u32 = 194;

/// Which media a rule makes sense for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Applicability {
    #[serde(rename = "any")]
    Any,
    /// Head, spindle and other mechanical attributes.
    #[serde(rename = "hdd")]
    RotationalOnly,
    #[serde(rename = "ssd")]
    SolidStateOnly,
}

impl Applicability {
    pub fn applies_to(&self, media: MediaType) -> bool {
        match self {
            Applicability::Any            => true,
            Applicability::RotationalOnly => media.is_rotational(),
            Applicability::SolidStateOnly => !media.is_rotational(),
        }
    }
}

/// Cutoffs on the normalized value. `critical < warning` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueCheck {
    pub critical: u16,
    pub warning:  u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRule {
    pub name:                 &'static str,
    pub value_check:          Option<ValueCheck>,
    /// Critical when the leading raw counter is strictly greater than this.
    pub raw_threshold:        Option<u64>,
    pub explanation_critical: &'static str,
    pub explanation_warning:  &'static str,
    pub action_critical:      &'static str,
    pub action_warning:       &'static str,
    pub applicability:        Applicability,
}

impl AttributeRule {
    /// New rule with the generic value cutoffs (critical ≤ 10, warning ≤ 50)
    /// and no raw check.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            value_check:          Some(ValueCheck { critical: 10, warning: 50 }),
            raw_threshold:        None,
            explanation_critical: "",
            explanation_warning:  "",
            action_critical:      "",
            action_warning:       "",
            applicability:        Applicability::Any,
        }
    }

    /// Collected for display only; never raises an issue by itself.
    pub fn informational(mut self) -> Self {
        self.value_check = None;
        self.raw_threshold = None;
        self
    }

    pub fn value_thresholds(mut self, critical: u16, warning: u16) -> Self {
        self.value_check = Some(ValueCheck { critical, warning });
        self
    }

    pub fn raw_threshold(mut self, threshold: u64) -> Self {
        self.raw_threshold = Some(threshold);
        self
    }

    pub fn critical(mut self, explanation: &'static str, action: &'static str) -> Self {
        self.explanation_critical = explanation;
        self.action_critical = action;
        self
    }

    pub fn warning(mut self, explanation: &'static str, action: &'static str) -> Self {
        self.explanation_warning = explanation;
        self.action_warning = action;
        self
    }

    pub fn hdd_only(mut self) -> Self {
        self.applicability = Applicability::RotationalOnly;
        self
    }

    pub fn is_informational(&self) -> bool {
        self.value_check.is_none() && self.raw_threshold.is_none()
    }
}

/// A per-attribute adjustment read from the config file.
///
/// ```toml
/// [[rules.overrides]]
/// id            = 5
/// raw_threshold = 20
/// applies_to    = "hdd"   # "any", "hdd" or "ssd"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOverride {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<Applicability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_critical: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_warning: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_raw: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_threshold: Option<u64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("rule {id}: critical cutoff {critical} must be below warning cutoff {warning}")]
    InvertedThresholds { id: u32, critical: u16, warning: u16 },

    #[error("rule {id}: raw check enabled without a raw_threshold")]
    MissingRawThreshold { id: u32 },
}

/// Immutable id → rule lookup, iterated in ascending id order.
///
/// Each monitored attribute id maps to an [`AttributeRule`] describing which
/// field to inspect, where the cutoffs sit, and what to tell the operator.
/// Ids without a rule are not evaluated.
#[derive(Debug, Clone)]
pub struct RuleDatabase {
    rules: BTreeMap<u32, AttributeRule>,
}

impl RuleDatabase {
    pub fn standard() -> Self {
        let rules = [
            (1, AttributeRule::new("Raw_Read_Error_Rate")
                .value_thresholds(10, 80)
                .critical("Excessive read errors - data corruption risk imminent",
                          "IMMEDIATE backup + replace within 24-48h")
                .warning("Drive is correcting read errors (normal wear, but monitor)",
                         "Run extended SMART test monthly, verify backups")
                .hdd_only()),
            (5, AttributeRule::new("Reallocated_Sector_Ct")
                .raw_threshold(10)
                .critical("10+ bad sectors remapped - drive is failing",
                          "Replace disk NOW. Data loss imminent.")
                .warning("1-10 bad sectors found and remapped",
                         "Acceptable if stable. Run extended test monthly.")),
            (7, AttributeRule::new("Seek_Error_Rate")
                .value_thresholds(30, 70)
                .critical("Head positioning failures - mechanical wear severe",
                          "Replace within 1 week")
                .warning("Seek errors increasing (mechanical degradation)",
                         "Monitor weekly, plan replacement in 1-3 months")
                .hdd_only()),
            (9, AttributeRule::new("Power_On_Hours")
                .informational()
                .warning("Disk age reference (not a failure indicator)", "")),
            (10, AttributeRule::new("Spin_Retry_Count")
                .raw_threshold(0)
                .critical("Spindle motor struggling to start - imminent failure",
                          "Replace IMMEDIATELY (motor failure)")
                .hdd_only()),
            (184, AttributeRule::new("End-to-End_Error")
                .raw_threshold(0)
                .critical("Data path errors detected (firmware/controller issue)",
                          "Replace within 48h - data integrity compromised")),
            (187, AttributeRule::new("Reported_Uncorrect")
                .raw_threshold(0)
                .critical("Uncorrectable errors detected",
                          "Backup immediately, replace within 24h")),
            (188, AttributeRule::new("Command_Timeout")
                .value_thresholds(1, 50)
                .critical("Massive command timeouts (cable/power/controller failure)",
                          "Check SATA cable, PSU rails, controller. If OK -> replace disk")
                .warning("Some command timeouts detected",
                         "Monitor. Try different SATA cable first.")),
            (193, AttributeRule::new("Load_Cycle_Count")
                .value_thresholds(5, 20)
                .critical("Head parking mechanism exhausted - mechanical failure imminent",
                          "Replace within 1-4 weeks")
                .warning("Approaching head parking cycle limit",
                         "Disable APM (hdparm -B 255) or plan replacement")
                .hdd_only()),
            (194, AttributeRule::new("Temperature_Celsius")
                .informational()
                .warning("Disk temperature (monitoring only)", "")),
            (197, AttributeRule::new("Current_Pending_Sector")
                .raw_threshold(0)
                .critical("Sectors waiting to be remapped - active failure",
                          "Backup NOW. Replace within 24h.")),
            (198, AttributeRule::new("Offline_Uncorrectable")
                .raw_threshold(0)
                .critical("Uncorrectable sectors found during offline scan",
                          "Replace within 48h")),
        ];
        Self { rules: rules.into_iter().collect() }
    }

    /// Standard rules adjusted by config overrides. Unknown ids are skipped.
    pub fn with_overrides(overrides: &[RuleOverride]) -> Result<Self, RuleError> {
        let mut db = Self::standard();
        for ov in overrides {
            let rule = match db.rules.get_mut(&ov.id) {
                Some(r) => r,
                None    => {
                    warn!(id = ov.id, "override for unmonitored attribute ignored");
                    continue;
                }
            };
            apply_override(ov, rule)?;
            debug!(id = ov.id, ?rule, "rule overridden");
        }
        Ok(db)
    }

    pub fn get(&self, id: u32) -> Option<&AttributeRule> {
        self.rules.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &AttributeRule)> {
        self.rules.iter().map(|(id, r)| (*id, r))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

fn apply_override(ov: &RuleOverride, rule: &mut AttributeRule) -> Result<(), RuleError> {
    if let Some(applicability) = ov.applies_to {
        rule.applicability = applicability;
    }

    if ov.check_value == Some(false) {
        rule.value_check = None;
    } else if ov.check_value == Some(true)
        || ov.value_critical.is_some()
        || ov.value_warning.is_some()
    {
        let base = rule.value_check.unwrap_or(ValueCheck { critical: 10, warning: 50 });
        let critical = ov.value_critical.unwrap_or(base.critical);
        let warning  = ov.value_warning.unwrap_or(base.warning);
        if critical >= warning {
            return Err(RuleError::InvertedThresholds { id: ov.id, critical, warning });
        }
        rule.value_check = Some(ValueCheck { critical, warning });
    }

    match (ov.check_raw, ov.raw_threshold) {
        (Some(false), _)         => rule.raw_threshold = None,
        (_, Some(t))             => rule.raw_threshold = Some(t),
        (Some(true), None)       => {
            if rule.raw_threshold.is_none() {
                return Err(RuleError::MissingRawThreshold { id: ov.id });
            }
        }
        (None, None)             => {}
    }
    Ok(())
}

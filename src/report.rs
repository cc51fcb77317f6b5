use crate::config::DevicesConfig;
use crate::evaluator::EvaluatedDisk;
use crate::fleet::FleetSummary;
use crate::models::issue::{Severity, Verdict};
use crate::rules::RuleDatabase;
use crate::util::human::{fmt_bytes, fmt_thousands};
use crossterm::style::{style, Color, Stylize};
use serde_json::json;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// List every monitored attribute, not just the flagged ones.
    pub verbose:       bool,
    /// Summary only.
    pub quiet:         bool,
    /// Show only disks with a CRITICAL verdict.
    pub critical_only: bool,
    /// Emit ANSI colors.
    pub color:         bool,
}

struct Painter {
    enabled: bool,
}

impl Painter {
    fn paint(&self, text: &str, color: Color) -> String {
        if self.enabled { style(text).with(color).to_string() } else { text.to_string() }
    }

    fn bold(&self, text: &str) -> String {
        if self.enabled { style(text).bold().to_string() } else { text.to_string() }
    }

    fn verdict(&self, v: Verdict) -> String {
        self.paint(v.label(), verdict_color(v))
    }
}

fn verdict_color(v: Verdict) -> Color {
    match v {
        Verdict::Healthy  => Color::Green,
        Verdict::Warning  => Color::Yellow,
        Verdict::Critical => Color::Red,
    }
}

fn verdict_mark(v: Verdict) -> &'static str {
    match v {
        Verdict::Healthy  => "✓",
        Verdict::Warning  => "⚠",
        Verdict::Critical => "✗",
    }
}

fn shown<'a>(disks: &'a [EvaluatedDisk], opts: &ReportOptions) -> impl Iterator<Item = &'a EvaluatedDisk> {
    let critical_only = opts.critical_only;
    disks.iter().filter(move |d| !critical_only || d.verdict() == Verdict::Critical)
}

/// Generate the human-readable health report.
pub fn generate(
    scanned: &[String],
    disks:   &[EvaluatedDisk],
    summary: &FleetSummary,
    rules:   &RuleDatabase,
    devices: &DevicesConfig,
    opts:    &ReportOptions,
) -> String {
    let p = Painter { enabled: opts.color };
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z");
    let mut out = String::new();

    out.push_str("═══════════════════════════════════════════════\n");
    out.push_str(&format!("  {} - {}\n", p.bold("DISK HEALTH REPORT"), now));
    out.push_str("═══════════════════════════════════════════════\n\n");
    out.push_str(&format!("Found {} disk(s): {}\n", scanned.len(), scanned.join(", ")));

    if !opts.quiet {
        for d in shown(disks, opts) {
            out.push('\n');
            out.push_str(&disk_section(d, rules, devices, opts, &p));
        }
    }

    out.push('\n');
    out.push_str(&summary_section(summary, &p));
    out
}

fn disk_section(
    ed:      &EvaluatedDisk,
    rules:   &RuleDatabase,
    devices: &DevicesConfig,
    opts:    &ReportOptions,
    p:       &Painter,
) -> String {
    let d = &ed.disk;
    let verdict = ed.verdict();
    let mut out = String::new();

    let name = match devices.alias(&d.device) {
        Some(a) => format!("{} [{}]", d.device, a),
        None    => d.device.clone(),
    };
    let cap = d.capacity_bytes.map(fmt_bytes).unwrap_or_else(|| "Unknown".to_string());
    out.push_str(&format!(
        "{} {}\n",
        p.paint(verdict_mark(verdict), verdict_color(verdict)),
        p.bold(&format!("{} - {} ({})", name, d.model, cap)),
    ));
    out.push_str(&format!("{}\n", p.paint(&"─".repeat(47), verdict_color(verdict))));

    out.push_str(&format!(
        "Type: {} | Power-On: {}h ({:.1} years) | Temp: {}°C\n",
        d.media.label(), fmt_thousands(d.power_on_hours), d.age_years(), d.temperature,
    ));
    out.push_str(&format!(
        "Serial: {} | Vendor: {} | SMART Health: {} | Our Analysis: {}\n",
        d.serial,
        d.manufacturer().label(),
        p.paint(d.smart_health.label(), verdict_color(verdict)),
        p.verdict(verdict),
    ));

    if ed.evaluation.issues.is_empty() {
        out.push_str(&format!("{}\n", p.paint("✓ All monitored attributes healthy", Color::Green)));
    } else {
        out.push('\n');
        for issue in &ed.evaluation.issues {
            let (mark, color) = match issue.severity {
                Severity::Critical => ("✗", Color::Red),
                Severity::Warning  => ("⚠", Color::Yellow),
            };
            out.push_str(&format!(
                "{}\n",
                p.paint(&format!("{} [{}] {} ({})", mark, issue.severity.label(), issue.attribute, issue.value), color),
            ));
            out.push_str(&format!("   ├─ {}\n", issue.explanation));
            out.push_str(&format!("   └─ Action: {}\n", issue.action));
        }
    }

    if opts.verbose && !d.attributes.is_empty() {
        out.push_str("\nMonitored Attributes:\n");
        for a in d.attributes.values() {
            let rule = match rules.get(a.id) {
                Some(r) => r,
                None    => continue,
            };
            let note = if rule.is_informational() { " (info)" } else { "" };
            out.push_str(&format!(
                "  {:>3} {:<25} VALUE={:>3} THRESH={:>3} RAW={}{}\n",
                a.id, a.name, a.value, a.thresh, a.raw, note
            ));
        }
    }
    out
}

fn summary_section(s: &FleetSummary, p: &Painter) -> String {
    let mut out = String::new();
    out.push_str(&format!("── {} ─────────────────────────────────────\n", p.bold("SUMMARY")));
    out.push_str(&format!("  {}   {} disk(s)\n", p.paint("Healthy ", Color::Green), s.healthy));
    out.push_str(&format!("  {}   {} disk(s)\n", p.paint("Warning ", Color::Yellow), s.warning));
    out.push_str(&format!("  {}   {} disk(s)\n", p.paint("Critical", Color::Red), s.critical));

    if s.total() == 0 {
        out.push_str("\nNo evaluable disks found.\n");
    }

    if !s.actions.is_empty() {
        out.push_str(&format!("\n{}\n", p.bold("Action Required:")));
        for a in &s.actions {
            out.push_str(&format!(
                "  {} {}: {}\n",
                p.paint(verdict_mark(a.verdict), verdict_color(a.verdict)),
                a.device,
                a.urgency,
            ));
        }
    }
    out
}

/// Machine-readable form of the same report.
pub fn to_json(disks: &[EvaluatedDisk], summary: &FleetSummary, opts: &ReportOptions) -> serde_json::Result<String> {
    let shown: Vec<&EvaluatedDisk> = shown(disks, opts).collect();
    let doc = json!({
        "diskdoctor_version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Local::now().to_rfc3339(),
        "disks":     shown,
        "summary":   summary,
    });
    serde_json::to_string_pretty(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::summarize;
    use crate::models::device::{disk, MediaType};
    use crate::models::smart::attr;

    fn fleet() -> Vec<EvaluatedDisk> {
        let rules = RuleDatabase::standard();
        vec![
            EvaluatedDisk::new(disk("/dev/sda", "WDC WD40EFRX", MediaType::Hdd, vec![
                attr(5, "Reallocated_Sector_Ct", 100, 10, "42"),
            ]), &rules),
            EvaluatedDisk::new(disk("/dev/sdb", "WDC WD40EFRX", MediaType::Hdd, vec![
                attr(188, "Command_Timeout", 40, 0, "0"),
            ]), &rules),
            EvaluatedDisk::new(disk("/dev/sdc", "Samsung SSD 870 EVO", MediaType::Ssd, vec![
                attr(9, "Power_On_Hours", 99, 0, "1234"),
            ]), &rules),
        ]
    }

    fn scanned() -> Vec<String> {
        vec!["/dev/sda".into(), "/dev/sdb".into(), "/dev/sdc".into()]
    }

    #[test]
    fn test_report_lists_issues_and_actions() {
        let disks = fleet();
        let summary = summarize(&disks);
        let text = generate(&scanned(), &disks, &summary, &RuleDatabase::standard(),
                            &DevicesConfig::default(), &ReportOptions::default());

        assert!(text.contains("Found 3 disk(s): /dev/sda, /dev/sdb, /dev/sdc"));
        assert!(text.contains("[CRITICAL] Reallocated_Sector_Ct (RAW=42)"));
        assert!(text.contains("└─ Action: Replace disk NOW. Data loss imminent."));
        assert!(text.contains("[WARNING] Command_Timeout (VALUE=40)"));
        assert!(text.contains("✓ All monitored attributes healthy"));

        let crit = text.find("/dev/sda: REPLACE WITHIN 24-48H").unwrap();
        let warn = text.find("/dev/sdb: Monitor/test, replace in 1-4 weeks").unwrap();
        assert!(crit < warn);
        // Plain text when colors are off.
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_quiet_and_critical_only() {
        let disks = fleet();
        let summary = summarize(&disks);
        let rules = RuleDatabase::standard();
        let devices = DevicesConfig::default();

        let quiet = generate(&scanned(), &disks, &summary, &rules, &devices,
                             &ReportOptions { quiet: true, ..Default::default() });
        assert!(!quiet.contains("Our Analysis"));
        assert!(quiet.contains("SUMMARY"));

        let crit = generate(&scanned(), &disks, &summary, &rules, &devices,
                            &ReportOptions { critical_only: true, ..Default::default() });
        assert!(crit.contains("Reallocated_Sector_Ct"));
        assert!(!crit.contains("Command_Timeout (VALUE=40)"));
        // The summary still covers every disk.
        assert!(crit.contains("/dev/sdb: Monitor/test"));
    }

    #[test]
    fn test_verbose_lists_monitored_attributes_and_alias() {
        let disks = fleet();
        let summary = summarize(&disks);
        let mut devices = DevicesConfig::default();
        devices.aliases.insert("sdc".into(), "scratch".into());
        let text = generate(&scanned(), &disks, &summary, &RuleDatabase::standard(), &devices,
                            &ReportOptions { verbose: true, ..Default::default() });
        assert!(text.contains("Monitored Attributes:"));
        assert!(text.contains("RAW=1234 (info)"));
        assert!(text.contains("RAW=42\n"));
        assert!(text.contains("/dev/sdc [scratch]"));
    }

    #[test]
    fn test_empty_fleet_report() {
        let summary = summarize(&[]);
        let text = generate(&[], &[], &summary, &RuleDatabase::standard(),
                            &DevicesConfig::default(), &ReportOptions::default());
        assert!(text.contains("No evaluable disks found."));
        assert!(!text.contains("Action Required"));
    }

    #[test]
    fn test_json_output() {
        let disks = fleet();
        let summary = summarize(&disks);
        let text = to_json(&disks, &summary, &ReportOptions::default()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["summary"]["exit_code"], 2);
        assert_eq!(v["summary"]["critical"], 1);
        assert_eq!(v["disks"].as_array().unwrap().len(), 3);
        assert_eq!(v["disks"][0]["evaluation"]["verdict"], "CRITICAL");
        assert_eq!(v["disks"][0]["evaluation"]["issues"][0]["severity"], "CRITICAL");
        assert_eq!(v["disks"][0]["disk"]["media"], "HDD");
        assert_eq!(v["summary"]["actions"][1]["urgency"], "Monitor/test, replace in 1-4 weeks");
    }
}

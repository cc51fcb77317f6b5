mod collectors;
mod config;
mod evaluator;
mod fleet;
mod logging;
mod models;
mod report;
mod rules;
mod util;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use collectors::{lsblk, smart as smart_collector};
use config::Config;
use evaluator::EvaluatedDisk;
use models::device::DiskRecord;
use report::ReportOptions;
use rules::RuleDatabase;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "diskdoctor",
    about = "SMART disk health analyzer: replace-now or monitor verdicts",
    version,
    after_help = "Exit codes:\n  0 = all disks healthy\n  1 = warnings detected (act within 1-4 weeks)\n  2 = critical issues (replace within 24-48h)"
)]
struct Cli {
    /// Show every monitored SMART attribute
    #[arg(short, long)]
    verbose: bool,

    /// Summary only
    #[arg(short, long)]
    quiet: bool,

    /// Show only disks with critical issues (exit code still covers all disks)
    #[arg(long)]
    critical: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Evaluate saved `smartctl --json -a` captures instead of live devices
    #[arg(long, value_name = "FILE", num_args = 1..)]
    input: Vec<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Print config file path and current values, then exit
    #[arg(long)]
    print_config: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Verbose diagnostics on stderr
    #[arg(long)]
    debug: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<clap_complete::Shell>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "diskdoctor", &mut io::stdout());
        return Ok(());
    }

    let cfg = match &cli.config_file {
        Some(path) => Config::load_from(path)?,
        None       => Config::load(),
    };
    if cli.print_config {
        return run_print_config(&cfg, cli.config_file.clone());
    }

    let rules = RuleDatabase::with_overrides(&cfg.rules.overrides)
        .context("invalid [[rules.overrides]] entry")?;
    debug!(rules = rules.len(), "rule database ready");

    let (scanned, records) = if cli.input.is_empty() {
        require_root()?;
        collect_live(&cfg)?
    } else {
        load_inputs(&cli.input)
    };

    let disks: Vec<EvaluatedDisk> = records
        .into_iter()
        .map(|d| EvaluatedDisk::new(d, &rules))
        .collect();
    let summary = fleet::summarize(&disks);
    info!(
        healthy = summary.healthy,
        warning = summary.warning,
        critical = summary.critical,
        "evaluation complete"
    );

    let opts = ReportOptions {
        verbose:       cli.verbose,
        quiet:         cli.quiet,
        critical_only: cli.critical,
        color:         !cli.no_color && !cli.json && io::stdout().is_terminal(),
    };

    let mut stdout = io::stdout();
    if cli.json {
        writeln!(stdout, "{}", report::to_json(&disks, &summary, &opts)?)?;
    } else {
        write!(stdout, "{}", report::generate(&scanned, &disks, &summary, &rules, &cfg.devices, &opts))?;
    }
    stdout.flush()?;

    std::process::exit(summary.exit_code);
}

fn require_root() -> Result<()> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        bail!("must run as root (use sudo), or pass --input with saved smartctl captures");
    }
    Ok(())
}

/// Discover local disks and read each one. Devices that cannot be read are
/// dropped with a warning; a missing smartctl aborts the run.
fn collect_live(cfg: &Config) -> Result<(Vec<String>, Vec<DiskRecord>)> {
    let scanned = lsblk::discover(&cfg.devices.exclude);
    let timeout = cfg.general.smartctl_timeout();
    let mut records = Vec::new();

    for device in &scanned {
        let output = match smart_collector::run_smartctl(&cfg.general.smartctl_path, device, timeout) {
            Ok(o)  => o,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("skipping {}", e);
                continue;
            }
        };
        match smart_collector::parse_smart_json(device, &output) {
            Ok(d)  => records.push(d),
            Err(e) => warn!("skipping {}", e),
        }
    }
    Ok((scanned, records))
}

fn load_inputs(paths: &[PathBuf]) -> (Vec<String>, Vec<DiskRecord>) {
    let mut scanned = Vec::new();
    let mut records = Vec::new();
    for path in paths {
        match smart_collector::load_capture(path) {
            Ok(d)  => {
                scanned.push(d.device.clone());
                records.push(d);
            }
            Err(e) => {
                scanned.push(path.display().to_string());
                warn!("skipping {}: {}", path.display(), e);
            }
        }
    }
    (scanned, records)
}

fn run_print_config(cfg: &Config, explicit: Option<PathBuf>) -> Result<()> {
    let path = explicit
        .or_else(Config::config_path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("Config: {}", path);
    println!();
    println!("[general]");
    println!("  smartctl_path        = {}", cfg.general.smartctl_path);
    println!("  smartctl_timeout_sec = {}", cfg.general.smartctl_timeout_sec);
    println!();
    println!("[devices]");
    println!("  exclude = {:?}", cfg.devices.exclude);
    if cfg.devices.aliases.is_empty() {
        println!("  aliases = (none)");
    } else {
        let mut aliases: Vec<_> = cfg.devices.aliases.iter().collect();
        aliases.sort();
        for (k, v) in aliases {
            println!("  alias: {} → {}", k, v);
        }
    }
    println!();
    println!("[rules]");
    let rules = RuleDatabase::with_overrides(&cfg.rules.overrides)?;
    for (id, rule) in rules.iter() {
        let value = match rule.value_check {
            Some(v) => format!("crit<={} warn<={}", v.critical, v.warning),
            None    => "-".to_string(),
        };
        let raw = match rule.raw_threshold {
            Some(t) => format!("crit>{}", t),
            None    => "-".to_string(),
        };
        println!("  {:>3} {:<23} value {:<20} raw {:<8} {:?}", id, rule.name, value, raw, rule.applicability);
    }
    Ok(())
}

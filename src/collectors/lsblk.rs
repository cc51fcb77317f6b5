use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Physical disks to check, as sorted `/dev/...` paths.
///
/// Asks `lsblk` first and falls back to scanning `/dev` when it is missing.
/// Only SATA/SAS (`sdX`) and NVMe namespaces (`nvmeXnY`) are kept; partitions,
/// loop and device-mapper nodes never match.
pub fn discover(exclude: &[String]) -> Vec<String> {
    let names = match run_lsblk() {
        Ok(n)  => n,
        Err(e) => {
            warn!("lsblk failed ({:#}), scanning /dev instead", e);
            scan_dev(Path::new("/dev"))
        }
    };

    let mut disks: Vec<String> = names
        .into_iter()
        .filter(|n| is_disk_name(n))
        .filter(|n| !is_excluded(n, exclude))
        .map(|n| format!("/dev/{}", n))
        .collect();
    disks.sort();
    disks.dedup();
    debug!(?disks, "discovered disks");
    disks
}

/// Run `lsblk --json --nodeps` and return the names of whole-disk devices.
fn run_lsblk() -> Result<Vec<String>> {
    let out = Command::new("lsblk")
        .args(["--json", "--nodeps", "-o", "NAME,TYPE"])
        .output()
        .context("lsblk not found")?;

    let v: Value = serde_json::from_slice(&out.stdout)?;
    Ok(parse_lsblk(&v))
}

fn parse_lsblk(v: &Value) -> Vec<String> {
    let devices = match v["blockdevices"].as_array() {
        Some(d) => d,
        None    => return Vec::new(),
    };

    devices.iter().filter_map(|dev| {
        if dev["type"].as_str() != Some("disk") { return None; }
        let name = dev["name"].as_str()?.trim();
        if name.is_empty() { None } else { Some(name.to_string()) }
    }).collect()
}

fn scan_dev(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(e)  => e,
        Err(e) => {
            warn!("cannot read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|e| e.ok())
        .filter(|e| is_block_device(&e.path()))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect()
}

fn is_block_device(path: &Path) -> bool {
    use nix::sys::stat::{stat, SFlag};
    match stat(path) {
        Ok(st) => SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT == SFlag::S_IFBLK,
        Err(_) => false,
    }
}

/// `sd[a-z]` or `nvme[0-9]n[0-9]`.
pub fn is_disk_name(name: &str) -> bool {
    let b = name.as_bytes();
    if let Some(rest) = name.strip_prefix("sd") {
        return rest.len() == 1 && b[2].is_ascii_lowercase();
    }
    if let Some(rest) = name.strip_prefix("nvme") {
        let r = rest.as_bytes();
        return r.len() == 3 && r[0].is_ascii_digit() && r[1] == b'n' && r[2].is_ascii_digit();
    }
    false
}

/// Exclude patterns are exact names or a prefix ending in `*`.
pub fn is_excluded(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pat| {
        if let Some(p) = pat.strip_suffix('*') { name.starts_with(p) }
        else { pat == name }
    })
}

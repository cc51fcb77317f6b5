use crate::collectors::CollectError;
use crate::models::device::{DiskRecord, MediaType};
use crate::models::smart::{SmartAttribute, SmartHealth};
use crate::rules::{POWER_ON_HOURS, TEMPERATURE_CELSIUS};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// smartctl exit-status bits meaning "nothing useful was read".
const EXIT_CMDLINE_ERROR: u64 = 0b01;
const EXIT_OPEN_FAILED: u64   = 0b10;

/// Run `smartctl --json=c -a <device>`, killing it after `timeout`.
/// Returns the raw stdout; smartctl sets non-zero exit bits even on success,
/// so the status is left for the parser to interpret.
pub fn run_smartctl(smartctl: &str, device: &str, timeout: Duration) -> Result<Vec<u8>, CollectError> {
    debug!(device, smartctl, "running smartctl");
    let mut child = Command::new(smartctl)
        .args(["--json=c", "-a", device])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => CollectError::ToolMissing(smartctl.to_string()),
            _                   => CollectError::Io(e),
        })?;

    // Drain stdout on a separate thread so a large report cannot fill the pipe
    // and stall the child while we wait on it.
    let mut stdout = child.stdout.take()
        .ok_or_else(|| CollectError::Io(std::io::Error::other("smartctl stdout not captured")))?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            break;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            let _ = reader.join();
            return Err(CollectError::Timeout { device: device.to_string(), secs: timeout.as_secs() });
        }
        thread::sleep(Duration::from_millis(50));
    }

    match reader.join() {
        Ok(out) => Ok(out?),
        Err(_)  => Err(CollectError::Io(std::io::Error::other("smartctl reader thread panicked"))),
    }
}

/// Parse `smartctl --json` output for `device`.
pub fn parse_smart_json(device: &str, data: &[u8]) -> Result<DiskRecord, CollectError> {
    let v: Value = serde_json::from_slice(data)
        .map_err(|source| CollectError::Json { device: device.to_string(), source })?;
    parse_value(device, &v)
}

/// Load a saved `smartctl --json -a` capture. The device path comes from the
/// capture itself, falling back to the file name.
pub fn load_capture(path: &Path) -> Result<DiskRecord, CollectError> {
    let data = fs::read(path)?;
    let fallback = path.display().to_string();
    let v: Value = serde_json::from_slice(&data)
        .map_err(|source| CollectError::Json { device: fallback.clone(), source })?;
    let device = v["device"]["name"].as_str().unwrap_or(&fallback).to_string();
    parse_value(&device, &v)
}

fn parse_value(device: &str, v: &Value) -> Result<DiskRecord, CollectError> {
    check_exit_status(device, v)?;

    let is_nvme = device.contains("nvme") || v["device"]["type"].as_str() == Some("nvme");

    let smart_enabled = match v["smart_support"]["enabled"].as_bool() {
        Some(e) => e,
        None if is_nvme => true,
        None => {
            return Err(CollectError::SmartUnavailable {
                device: device.to_string(),
                reason: "no SMART support reported".to_string(),
            })
        }
    };
    if v["smart_support"]["available"].as_bool() == Some(false) {
        return Err(CollectError::SmartUnavailable {
            device: device.to_string(),
            reason: "device lacks SMART capability".to_string(),
        });
    }
    if !smart_enabled {
        return Err(CollectError::SmartDisabled { device: device.to_string() });
    }

    let rotation_rate = if is_nvme {
        "N/A (NVMe)".to_string()
    } else {
        match v["rotation_rate"].as_u64() {
            Some(0)   => "Solid State Device".to_string(),
            Some(rpm) => format!("{} rpm", rpm),
            None      => "Unknown".to_string(),
        }
    };
    let media = if is_nvme { MediaType::Nvme } else { MediaType::infer(device, Some(rotation_rate.as_str())) };

    let smart_health = match v["smart_status"]["passed"].as_bool() {
        Some(true)  => SmartHealth::Passed,
        Some(false) => SmartHealth::Failed,
        None        => SmartHealth::Unknown,
    };

    let attributes = parse_ata_attributes(v);

    let power_on_hours = attributes.get(&POWER_ON_HOURS)
        .and_then(|a| a.raw_counter())
        .or_else(|| v["power_on_time"]["hours"].as_u64())
        .unwrap_or(0);
    let temperature = attributes.get(&TEMPERATURE_CELSIUS)
        .and_then(|a| a.raw_counter())
        .and_then(|t| i32::try_from(t).ok())
        .or_else(|| v["temperature"]["current"].as_i64().and_then(|t| i32::try_from(t).ok()))
        .unwrap_or(0);

    Ok(DiskRecord {
        device:         device.to_string(),
        model:          str_or(&v["model_name"], "Unknown"),
        serial:         str_or(&v["serial_number"], "Unknown"),
        capacity_bytes: v["user_capacity"]["bytes"].as_u64(),
        media,
        rotation_rate,
        smart_enabled,
        smart_health,
        attributes,
        power_on_hours,
        temperature,
    })
}

fn check_exit_status(device: &str, v: &Value) -> Result<(), CollectError> {
    let status = v["smartctl"]["exit_status"].as_u64().unwrap_or(0);
    if status & (EXIT_CMDLINE_ERROR | EXIT_OPEN_FAILED) == 0 {
        return Ok(());
    }
    let reason = v["smartctl"]["messages"]
        .as_array()
        .map(|msgs| {
            msgs.iter()
                .filter_map(|m| m["string"].as_str())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("smartctl exit status {}", status));
    Err(CollectError::SmartUnavailable { device: device.to_string(), reason })
}

fn parse_ata_attributes(v: &Value) -> BTreeMap<u32, SmartAttribute> {
    let table = match v["ata_smart_attributes"]["table"].as_array() {
        Some(t) => t,
        None    => return BTreeMap::new(),
    };

    table.iter().filter_map(|entry| {
        let id    = u32::try_from(entry["id"].as_u64()?).ok()?;
        let name  = entry["name"].as_str().unwrap_or("Unknown").to_string();
        let flags = entry["flags"]["string"].as_str().unwrap_or("").trim().to_string();
        let value  = u16_of(&entry["value"]);
        let worst  = u16_of(&entry["worst"]);
        let thresh = u16_of(&entry["thresh"]);
        let raw = match entry["raw"]["string"].as_str() {
            Some(s) => s.trim().to_string(),
            None    => entry["raw"]["value"].as_u64().map(|r| r.to_string()).unwrap_or_default(),
        };
        let when_failed = entry["when_failed"].as_str().unwrap_or("").to_string();

        Some((id, SmartAttribute { id, name, flags, value, worst, thresh, raw, when_failed }))
    }).collect()
}

fn u16_of(v: &Value) -> u16 {
    v.as_u64().and_then(|n| u16::try_from(n).ok()).unwrap_or(0)
}

fn str_or(v: &Value, default: &str) -> String {
    v.as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hdd_capture() -> Value {
        json!({
            "smartctl": {"version": [7, 3], "exit_status": 0},
            "device": {"name": "/dev/sda", "type": "sat"},
            "model_name": "ST4000NM0035-1V4107",
            "serial_number": "ZC1A2B3C",
            "user_capacity": {"blocks": 7814037168u64, "bytes": 4000787030016u64},
            "rotation_rate": 7200,
            "smart_support": {"available": true, "enabled": true},
            "smart_status": {"passed": true},
            "ata_smart_attributes": {"table": [
                {"id": 1, "name": "Raw_Read_Error_Rate", "value": 83, "worst": 64, "thresh": 44,
                 "when_failed": "", "flags": {"string": "POSR-- "},
                 "raw": {"value": 215457680, "string": "215457680"}},
                {"id": 5, "name": "Reallocated_Sector_Ct", "value": 100, "worst": 100, "thresh": 10,
                 "when_failed": "", "flags": {"string": "PO--CK "},
                 "raw": {"value": 0, "string": "0"}},
                {"id": 9, "name": "Power_On_Hours", "value": 61, "worst": 61, "thresh": 0,
                 "when_failed": "", "flags": {"string": "-O--CK "},
                 "raw": {"value": 34512, "string": "34512"}},
                {"id": 194, "name": "Temperature_Celsius", "value": 38, "worst": 52, "thresh": 0,
                 "when_failed": "", "flags": {"string": "-O---K "},
                 "raw": {"value": 270582939686u64, "string": "38 (0 18 0 0 0)"}}
            ]},
            "power_on_time": {"hours": 34512},
            "temperature": {"current": 38}
        })
    }

    fn parse(v: &Value) -> Result<DiskRecord, CollectError> {
        parse_smart_json("/dev/sda", v.to_string().as_bytes())
    }

    #[test]
    fn test_parse_hdd_capture() {
        let d = parse(&hdd_capture()).unwrap();
        assert_eq!(d.device, "/dev/sda");
        assert_eq!(d.model, "ST4000NM0035-1V4107");
        assert_eq!(d.serial, "ZC1A2B3C");
        assert_eq!(d.capacity_bytes, Some(4_000_787_030_016));
        assert_eq!(d.media, MediaType::Hdd);
        assert_eq!(d.rotation_rate, "7200 rpm");
        assert_eq!(d.smart_health, SmartHealth::Passed);
        assert_eq!(d.attributes.len(), 4);
        assert_eq!(d.power_on_hours, 34512);
        assert_eq!(d.temperature, 38);

        let a = &d.attributes[&1];
        assert_eq!((a.value, a.worst, a.thresh), (83, 64, 44));
        assert_eq!(a.flags, "POSR--");
        assert_eq!(d.attributes[&194].raw, "38 (0 18 0 0 0)");
    }

    #[test]
    fn test_parse_ssd_and_failed_health() {
        let mut v = hdd_capture();
        v["rotation_rate"] = json!(0);
        v["smart_status"]["passed"] = json!(false);
        let d = parse(&v).unwrap();
        assert_eq!(d.media, MediaType::Ssd);
        assert_eq!(d.rotation_rate, "Solid State Device");
        assert_eq!(d.smart_health, SmartHealth::Failed);
    }

    #[test]
    fn test_parse_nvme_without_ata_table() {
        let v = json!({
            "smartctl": {"exit_status": 0},
            "device": {"name": "/dev/nvme0n1", "type": "nvme"},
            "model_name": "Samsung SSD 980 PRO 1TB",
            "serial_number": "S5GXNF0R123456",
            "smart_status": {"passed": true},
            "power_on_time": {"hours": 1203},
            "temperature": {"current": 41}
        });
        let d = parse_smart_json("/dev/nvme0n1", v.to_string().as_bytes()).unwrap();
        assert_eq!(d.media, MediaType::Nvme);
        assert_eq!(d.rotation_rate, "N/A (NVMe)");
        assert!(d.attributes.is_empty());
        assert_eq!(d.power_on_hours, 1203);
        assert_eq!(d.temperature, 41);
        assert_eq!(d.capacity_bytes, None);
    }

    #[test]
    fn test_smart_disabled_is_not_evaluable() {
        let mut v = hdd_capture();
        v["smart_support"]["enabled"] = json!(false);
        assert!(matches!(parse(&v), Err(CollectError::SmartDisabled { .. })));
    }

    #[test]
    fn test_smart_unsupported() {
        let mut v = hdd_capture();
        v["smart_support"] = json!({"available": false, "enabled": false});
        assert!(matches!(parse(&v), Err(CollectError::SmartUnavailable { .. })));

        let mut v = hdd_capture();
        v.as_object_mut().unwrap().remove("smart_support");
        assert!(matches!(parse(&v), Err(CollectError::SmartUnavailable { .. })));
    }

    #[test]
    fn test_open_failure_reports_smartctl_message() {
        let v = json!({
            "smartctl": {
                "exit_status": 2,
                "messages": [{"string": "Smartctl open device: /dev/sdq failed: No such device", "severity": "error"}]
            }
        });
        match parse(&v) {
            Err(CollectError::SmartUnavailable { reason, .. }) => assert!(reason.contains("No such device")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_warning_exit_bits_still_parse() {
        // Bit 3 = "disk failing", bit 6 = "error log has records".
        let mut v = hdd_capture();
        v["smartctl"]["exit_status"] = json!(0b100_1000);
        assert!(parse(&v).is_ok());
    }

    #[test]
    fn test_garbage_output() {
        let err = parse_smart_json("/dev/sda", b"smartctl: command line error").unwrap_err();
        assert!(matches!(err, CollectError::Json { .. }));
    }

    #[test]
    fn test_missing_raw_string_falls_back_to_value() {
        let mut v = hdd_capture();
        v["ata_smart_attributes"]["table"][1]["raw"] = json!({"value": 17});
        let d = parse(&v).unwrap();
        assert_eq!(d.attributes[&5].raw, "17");
    }

    #[test]
    fn test_power_on_hours_falls_back_when_raw_is_packed() {
        let mut v = hdd_capture();
        v["ata_smart_attributes"]["table"][2]["raw"]["string"] = json!("34512h+05m+10.123s");
        let d = parse(&v).unwrap();
        assert_eq!(d.power_on_hours, 34512);
    }

    #[test]
    fn test_load_capture_uses_embedded_device_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        fs::write(&path, hdd_capture().to_string()).unwrap();
        let d = load_capture(&path).unwrap();
        assert_eq!(d.device, "/dev/sda");
    }

    #[test]
    fn test_missing_tool() {
        let err = run_smartctl("/nonexistent/smartctl", "/dev/sda", Duration::from_secs(1)).unwrap_err();
        assert!(err.is_fatal());
    }
}

use crate::models::smart::{SmartAttribute, SmartHealth};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    #[serde(rename = "HDD")]
    Hdd,
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "NVMe")]
    Nvme,
}

impl MediaType {
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Hdd  => "HDD",
            MediaType::Ssd  => "SSD",
            MediaType::Nvme => "NVMe",
        }
    }

    pub fn is_rotational(&self) -> bool {
        match self {
            MediaType::Hdd => true,
            MediaType::Ssd | MediaType::Nvme => false,
        }
    }

    /// Classify from the `Rotation Rate` text and the device path.
    /// An NVMe path wins over whatever the rotation field says.
    pub fn infer(device: &str, rotation_rate: Option<&str>) -> Self {
        if device.contains("nvme") {
            return MediaType::Nvme;
        }
        match rotation_rate {
            Some(r) if r.contains("Solid State Device") || r.contains("SSD") => MediaType::Ssd,
            _ => MediaType::Hdd,
        }
    }
}

/// Drive vendors we can tell apart from the model string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Manufacturer {
    Seagate,
    WesternDigital,
    Toshiba,
    Samsung,
    Micron,
    Hgst,
    Unknown,
}

impl Manufacturer {
    /// Best-effort vendor detection. Checks run in order and the first hit wins.
    pub fn detect(model: &str) -> Self {
        if model.starts_with("ST") {
            Manufacturer::Seagate
        } else if model.starts_with("WDC") || model.starts_with("WD") {
            Manufacturer::WesternDigital
        } else if model.starts_with("TOSHIBA") || model.starts_with("Toshiba") {
            Manufacturer::Toshiba
        } else if model.contains("Samsung") {
            Manufacturer::Samsung
        } else if model.contains("Crucial") || model.contains("Micron") {
            Manufacturer::Micron
        } else if model.starts_with("HGST") || model.starts_with("Hitachi") {
            Manufacturer::Hgst
        } else {
            Manufacturer::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Manufacturer::Seagate        => "Seagate",
            Manufacturer::WesternDigital => "Western Digital",
            Manufacturer::Toshiba        => "Toshiba",
            Manufacturer::Samsung        => "Samsung",
            Manufacturer::Micron         => "Micron",
            Manufacturer::Hgst           => "HGST/Hitachi",
            Manufacturer::Unknown        => "Unknown",
        }
    }
}

/// One physical disk as read from a single `smartctl` run.
#[derive(Debug, Clone, Serialize)]
pub struct DiskRecord {
    pub device:         String,
    pub model:          String,
    pub serial:         String,
    pub capacity_bytes: Option<u64>,
    pub media:          MediaType,
    pub rotation_rate:  String,
    pub smart_enabled:  bool,
    pub smart_health:   SmartHealth,
    /// Attribute id → row, iterated in ascending id order.
    pub attributes:     BTreeMap<u32, SmartAttribute>,
    pub power_on_hours: u64,
    pub temperature:    i32,
}

impl DiskRecord {
    pub fn manufacturer(&self) -> Manufacturer {
        Manufacturer::detect(&self.model)
    }

    pub fn age_years(&self) -> f64 {
        self.power_on_hours as f64 / 8760.0
    }
}

#[cfg(test)]
pub(crate) fn disk(device: &str, model: &str, media: MediaType, attrs: Vec<SmartAttribute>) -> DiskRecord {
    DiskRecord {
        device:         device.to_string(),
        model:          model.to_string(),
        serial:         "TESTSERIAL".to_string(),
        capacity_bytes: Some(4_000_787_030_016),
        media,
        rotation_rate:  match media {
            MediaType::Hdd  => "7200 rpm".to_string(),
            MediaType::Ssd  => "Solid State Device".to_string(),
            MediaType::Nvme => "N/A (NVMe)".to_string(),
        },
        smart_enabled:  true,
        smart_health:   SmartHealth::Passed,
        attributes:     attrs.into_iter().map(|a| (a.id, a)).collect(),
        power_on_hours: 0,
        temperature:    0,
    }
}

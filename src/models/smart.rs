use serde::Serialize;

/// The drive's own overall self-assessment, as reported by `smartctl -H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SmartHealth {
    Passed,
    Failed,
    Unknown,
}

impl SmartHealth {
    pub fn label(&self) -> &'static str {
        match self {
            SmartHealth::Passed  => "PASSED",
            SmartHealth::Failed  => "FAILED",
            SmartHealth::Unknown => "UNKNOWN",
        }
    }
}

/// One ATA SMART attribute row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmartAttribute {
    pub id:          u32,
    pub name:        String,
    pub flags:       String,
    pub value:       u16,
    pub worst:       u16,
    pub thresh:      u16,
    /// Raw counter text as printed by the drive, e.g. `"35 (Min/Max 20/45)"`.
    pub raw:         String,
    pub when_failed: String,
}

impl SmartAttribute {
    /// Leading integer of the raw text. None for `"N/A"`, empty, or packed
    /// formats such as `"12345h+06m"`.
    pub fn raw_counter(&self) -> Option<u64> {
        self.raw.split_whitespace().next()?.parse().ok()
    }

    /// Distance between the normalized value and the device's failure threshold.
    pub fn headroom(&self) -> i32 {
        i32::from(self.value) - i32::from(self.thresh)
    }
}

#[cfg(test)]
pub(crate) fn attr(id: u32, name: &str, value: u16, thresh: u16, raw: &str) -> SmartAttribute {
    SmartAttribute {
        id,
        name:        name.to_string(),
        flags:       "0x000f".to_string(),
        value,
        worst:       value,
        thresh,
        raw:         raw.to_string(),
        when_failed: "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_counter_plain() {
        assert_eq!(attr(5, "Reallocated_Sector_Ct", 100, 10, "12").raw_counter(), Some(12));
    }

    #[test]
    fn test_raw_counter_packed_temperature() {
        let a = attr(194, "Temperature_Celsius", 35, 0, "35 (Min/Max 20/45)");
        assert_eq!(a.raw_counter(), Some(35));
    }

    #[test]
    fn test_raw_counter_malformed() {
        assert_eq!(attr(5, "x", 100, 10, "N/A").raw_counter(), None);
        assert_eq!(attr(5, "x", 100, 10, "").raw_counter(), None);
        assert_eq!(attr(5, "x", 100, 10, "   ").raw_counter(), None);
        assert_eq!(attr(9, "x", 100, 0, "12345h+06m+01.234s").raw_counter(), None);
        assert_eq!(attr(5, "x", 100, 10, "-3").raw_counter(), None);
    }

    #[test]
    fn test_headroom_can_go_negative() {
        assert_eq!(attr(1, "Raw_Read_Error_Rate", 85, 80, "0").headroom(), 5);
        assert_eq!(attr(1, "Raw_Read_Error_Rate", 40, 44, "0").headroom(), -4);
    }
}

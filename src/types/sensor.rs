//! IoT telemetry frames ingested by C2 and retained in C1's per-trainset
//! ring buffer (spec §3/§4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anomaly classification tags attached by C2's telemetry transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyTag {
    HighTemperature,
    ExcessiveVibration,
    CriticalBrakeWear,
    PantographPressureAnomaly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    pub trainset_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub vibration_mm_s: f64,
    pub brake_wear_pct: f64,
    pub pantograph_pressure_bar: f64,
    #[serde(default)]
    pub anomaly_tags: Vec<AnomalyTag>,
}

/// Thresholds beyond which a raw telemetry reading is tagged anomalous.
pub mod thresholds {
    pub const HIGH_TEMPERATURE_C: f64 = 85.0;
    pub const EXCESSIVE_VIBRATION_MM_S: f64 = 12.0;
    pub const CRITICAL_BRAKE_WEAR_PCT: f64 = 90.0;
    pub const PANTOGRAPH_PRESSURE_LOW_BAR: f64 = 4.5;
    pub const PANTOGRAPH_PRESSURE_HIGH_BAR: f64 = 9.5;
}

impl SensorFrame {
    /// Classify this raw reading against the fixed thresholds, mirroring how
    /// C2's telemetry transformer tags frames on ingest.
    #[must_use]
    pub fn classify(mut self) -> Self {
        let mut tags = Vec::new();
        if self.temperature_c > thresholds::HIGH_TEMPERATURE_C {
            tags.push(AnomalyTag::HighTemperature);
        }
        if self.vibration_mm_s > thresholds::EXCESSIVE_VIBRATION_MM_S {
            tags.push(AnomalyTag::ExcessiveVibration);
        }
        if self.brake_wear_pct > thresholds::CRITICAL_BRAKE_WEAR_PCT {
            tags.push(AnomalyTag::CriticalBrakeWear);
        }
        if self.pantograph_pressure_bar < thresholds::PANTOGRAPH_PRESSURE_LOW_BAR
            || self.pantograph_pressure_bar > thresholds::PANTOGRAPH_PRESSURE_HIGH_BAR
        {
            tags.push(AnomalyTag::PantographPressureAnomaly);
        }
        self.anomaly_tags = tags;
        self
    }

    #[must_use]
    pub fn is_anomalous(&self) -> bool {
        !self.anomaly_tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(trainset_id: &str) -> SensorFrame {
        SensorFrame {
            trainset_id: trainset_id.into(),
            timestamp: Utc::now(),
            temperature_c: 40.0,
            vibration_mm_s: 3.0,
            brake_wear_pct: 20.0,
            pantograph_pressure_bar: 7.0,
            anomaly_tags: Vec::new(),
        }
    }

    #[test]
    fn normal_reading_has_no_tags() {
        let frame = baseline("t1").classify();
        assert!(!frame.is_anomalous());
    }

    #[test]
    fn overheated_brake_and_vibration_all_tag() {
        let mut frame = baseline("t1");
        frame.temperature_c = 90.0;
        frame.vibration_mm_s = 15.0;
        frame.brake_wear_pct = 95.0;
        let frame = frame.classify();
        assert_eq!(frame.anomaly_tags.len(), 3);
        assert!(frame.anomaly_tags.contains(&AnomalyTag::HighTemperature));
        assert!(frame.anomaly_tags.contains(&AnomalyTag::ExcessiveVibration));
        assert!(frame.anomaly_tags.contains(&AnomalyTag::CriticalBrakeWear));
    }

    #[test]
    fn pantograph_pressure_anomaly_both_directions() {
        let mut low = baseline("t1");
        low.pantograph_pressure_bar = 2.0;
        assert!(low
            .classify()
            .anomaly_tags
            .contains(&AnomalyTag::PantographPressureAnomaly));

        let mut high = baseline("t1");
        high.pantograph_pressure_bar = 11.0;
        assert!(high
            .classify()
            .anomaly_tags
            .contains(&AnomalyTag::PantographPressureAnomaly));
    }
}

//! C1 — Fleet State Store.
//!
//! The single-writer source of truth for trainsets, job cards, branding
//! contracts, clearances, bays, and per-trainset sensor history. Every
//! mutation goes through [`FleetStore::apply`] or
//! [`FleetStore::append_sensor_frame`]; readers take an immutable
//! [`FleetSnapshot`] clone, mirroring the teacher's `InMemoryDAL` pattern of
//! guarding shared state behind a single lock and handing out owned copies.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config;
use crate::error::StoreError;
use crate::types::{
    Bay, BrandingContract, Clearance, Conflict, ContendingValue, Department, JobCard, ResolutionKind, SensorFrame,
    Trainset,
};

/// A single field-level update arriving from C2, tagged with its source and
/// the instant it was observed.
#[derive(Debug, Clone)]
pub struct Delta {
    pub trainset_id: String,
    pub field: DeltaField,
    pub source: SourceMeta,
}

#[derive(Debug, Clone)]
pub enum DeltaField {
    Status(crate::types::TrainsetStatus),
    MileageKm(f64),
    FitnessScore(f64),
    FitnessExpiry { department: Department, expires_at: DateTime<Utc> },
    LastMaintenance(DateTime<Utc>),
    NextMaintenance(DateTime<Utc>),
    EnergyConsumptionKwh(f64),
    CurrentBay(Option<String>),
    JobCard(JobCard),
    BrandingContract(BrandingContract),
    Clearance(Clearance),
}

impl DeltaField {
    /// Discriminant used to key the per-field conflict window (spec §4.1):
    /// two deltas only conflict if they target the same field path.
    fn field_path(&self) -> String {
        match self {
            DeltaField::Status(_) => "status".to_string(),
            DeltaField::MileageKm(_) => "mileage_km".to_string(),
            DeltaField::FitnessScore(_) => "fitness_score".to_string(),
            DeltaField::FitnessExpiry { department, .. } => format!("fitness_expiry:{department:?}"),
            DeltaField::LastMaintenance(_) => "last_maintenance".to_string(),
            DeltaField::NextMaintenance(_) => "next_maintenance".to_string(),
            DeltaField::EnergyConsumptionKwh(_) => "energy_consumption_kwh".to_string(),
            DeltaField::CurrentBay(_) => "current_bay".to_string(),
            DeltaField::JobCard(j) => format!("job_card:{}", j.id),
            DeltaField::BrandingContract(b) => format!("branding_contract:{}", b.id),
            DeltaField::Clearance(c) => format!("clearance:{:?}", c.department),
        }
    }

    /// Human-readable representation of the value carried, used as the
    /// `value` of a [`ContendingValue`] (spec §3's contending-values list).
    fn value_repr(&self) -> String {
        match self {
            DeltaField::Status(s) => format!("{s:?}"),
            DeltaField::MileageKm(m) | DeltaField::FitnessScore(m) | DeltaField::EnergyConsumptionKwh(m) => {
                m.to_string()
            }
            DeltaField::FitnessExpiry { expires_at, .. } => expires_at.to_rfc3339(),
            DeltaField::LastMaintenance(dt) | DeltaField::NextMaintenance(dt) => dt.to_rfc3339(),
            DeltaField::CurrentBay(bay) => bay.clone().unwrap_or_else(|| "none".to_string()),
            DeltaField::JobCard(j) => format!("{}:{:?}:{}", j.id, j.priority, j.open),
            DeltaField::BrandingContract(b) => format!("{}:{}", b.id, b.exposure_hours_actual),
            DeltaField::Clearance(c) => format!("{}", c.cleared),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceMeta {
    pub name: String,
    pub priority: i32,
    pub timestamp: DateTime<Utc>,
    /// Set for manual overrides (spec §4.2): while `Utc::now() < expiry`,
    /// this write outranks any later automatic write to the same field.
    pub manual_override_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct LastWrite {
    source: SourceMeta,
    value: String,
}

/// An owned, internally-consistent copy of fleet state for readers (C3-C9).
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    pub trainsets: Vec<Trainset>,
    pub job_cards: Vec<JobCard>,
    pub branding_contracts: Vec<BrandingContract>,
    pub clearances: Vec<Clearance>,
    pub bays: Vec<Bay>,
    pub taken_at: DateTime<Utc>,
}

impl FleetSnapshot {
    #[must_use]
    pub fn open_job_cards(&self, trainset_id: &str) -> Vec<JobCard> {
        self.job_cards
            .iter()
            .filter(|j| j.trainset_id == trainset_id && j.open)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn trainset(&self, id: &str) -> Option<&Trainset> {
        self.trainsets.iter().find(|t| t.id == id)
    }
}

struct Inner {
    trainsets: HashMap<String, Trainset>,
    job_cards: HashMap<String, JobCard>,
    branding_contracts: HashMap<String, BrandingContract>,
    clearances: Vec<Clearance>,
    bays: HashMap<String, Bay>,
    /// Last applied write per `(trainset_id, field_path)`, for the per-field
    /// conflict window and manual-override precedence.
    last_write: HashMap<(String, String), LastWrite>,
    sensor_history: HashMap<String, VecDeque<SensorFrame>>,
    conflicts: Vec<Conflict>,
}

/// The single-writer fleet state store.
pub struct FleetStore {
    inner: RwLock<Inner>,
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                trainsets: HashMap::new(),
                job_cards: HashMap::new(),
                branding_contracts: HashMap::new(),
                clearances: Vec::new(),
                bays: HashMap::new(),
                last_write: HashMap::new(),
                sensor_history: HashMap::new(),
                conflicts: Vec::new(),
            }),
        }
    }

    /// Seed the store with an initial fleet (used by fixture loading and tests).
    pub fn seed(&self, trainsets: Vec<Trainset>, bays: Vec<Bay>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        for t in trainsets {
            inner.trainsets.insert(t.id.clone(), t);
        }
        for b in bays {
            inner.bays.insert(b.id.clone(), b);
        }
    }

    /// Apply a single delta from the ingestion fabric, resolving a conflict
    /// if another source already wrote this field within the conflict
    /// window (spec §4.2: higher priority wins, ties broken by latest
    /// timestamp; an unexpired manual override always wins).
    pub fn apply(&self, delta: Delta) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        if !inner.trainsets.contains_key(&delta.trainset_id)
            && !matches!(delta.field, DeltaField::JobCard(_) | DeltaField::BrandingContract(_) | DeltaField::Clearance(_))
        {
            return Err(StoreError::UnknownTrainset(delta.trainset_id));
        }

        let field_path = delta.field.field_path();
        let key = (delta.trainset_id.clone(), field_path.clone());
        let now = delta.source.timestamp;

        if let Some(prev) = inner.last_write.get(&key).cloned() {
            if let Some(expiry) = prev.source.manual_override_expiry {
                if now < expiry && prev.source.name != delta.source.name {
                    tracing::info!(
                        trainset_id = %delta.trainset_id,
                        field = %field_path,
                        "manual override still in effect, dropping later delta"
                    );
                    return Ok(());
                }
            }

            let window_secs = config::get().ingestion.conflict_window_secs;
            let gap = (delta.source.timestamp - prev.source.timestamp).num_seconds().abs();
            if gap <= window_secs && prev.source.name != delta.source.name {
                let new_value = delta.field.value_repr();
                let winner_is_new = {
                    let winner = resolve_conflict(&prev.source, &delta.source);
                    std::ptr::eq(winner, &delta.source)
                };

                let resolution = if delta.source.manual_override_expiry.is_some() {
                    ResolutionKind::Manual
                } else if prev.source.priority != delta.source.priority {
                    ResolutionKind::AutoPriority
                } else {
                    ResolutionKind::AutoTimestamp
                };

                let resolved_value = if winner_is_new { new_value.clone() } else { prev.value.clone() };

                let conflict = Conflict {
                    id: Uuid::new_v4().to_string(),
                    trainset_id: delta.trainset_id.clone(),
                    field_path: field_path.clone(),
                    contending_values: vec![
                        ContendingValue {
                            source_id: prev.source.name.clone(),
                            value: prev.value.clone(),
                            priority: prev.source.priority,
                            timestamp: prev.source.timestamp,
                        },
                        ContendingValue {
                            source_id: delta.source.name.clone(),
                            value: new_value,
                            priority: delta.source.priority,
                            timestamp: delta.source.timestamp,
                        },
                    ],
                    resolution,
                    resolved_value: Some(resolved_value),
                    timestamp: delta.source.timestamp,
                };

                tracing::warn!(
                    trainset_id = %delta.trainset_id,
                    field = %field_path,
                    source_a = %prev.source.name,
                    source_b = %delta.source.name,
                    "ingestion conflict resolved"
                );
                inner.conflicts.push(conflict);

                if !winner_is_new {
                    // Losing delta is recorded as a conflict but not applied.
                    return Ok(());
                }
            }
        }

        let value = delta.field.value_repr();
        apply_field(&mut inner, &delta)?;
        inner.last_write.insert(
            key,
            LastWrite {
                source: delta.source,
                value,
            },
        );
        Ok(())
    }

    /// Append a sensor frame to the trainset's ring buffer, evicting the
    /// oldest entry once [`SENSOR_RING_SIZE`](config::defaults::SENSOR_RING_SIZE)
    /// is exceeded.
    pub fn append_sensor_frame(&self, frame: SensorFrame) {
        let ring_size = config::get().ingestion.sensor_ring_size;
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let ring = inner
            .sensor_history
            .entry(frame.trainset_id.clone())
            .or_insert_with(VecDeque::new);
        ring.push_back(frame);
        while ring.len() > ring_size {
            ring.pop_front();
        }
    }

    #[must_use]
    pub fn sensor_history(&self, trainset_id: &str) -> Vec<SensorFrame> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .sensor_history
            .get(trainset_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Take an immutable point-in-time copy of fleet state.
    #[must_use]
    pub fn snapshot(&self) -> FleetSnapshot {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        FleetSnapshot {
            trainsets: inner.trainsets.values().cloned().collect(),
            job_cards: inner.job_cards.values().cloned().collect(),
            branding_contracts: inner.branding_contracts.values().cloned().collect(),
            clearances: inner.clearances.clone(),
            bays: inner.bays.values().cloned().collect(),
            taken_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn conflicts(&self) -> Vec<Conflict> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.conflicts.clone()
    }

    /// Write a completed plan's bay assignments back into the store so the
    /// bay-occupancy invariant stays consistent between cycles.
    pub fn commit_bay_assignment(&self, trainset_id: &str, bay_id: Option<&str>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(t) = inner.trainsets.get_mut(trainset_id) {
            t.current_bay = bay_id.map(ToString::to_string);
        } else {
            return Err(StoreError::UnknownTrainset(trainset_id.to_string()));
        }
        if let Some(id) = bay_id {
            if let Some(b) = inner.bays.get_mut(id) {
                b.occupied_by = Some(trainset_id.to_string());
            } else {
                return Err(StoreError::UnknownBay(id.to_string()));
            }
        }
        Ok(())
    }
}

fn resolve_conflict<'a>(a: &'a SourceMeta, b: &'a SourceMeta) -> &'a SourceMeta {
    if a.priority != b.priority {
        if a.priority > b.priority {
            a
        } else {
            b
        }
    } else if a.timestamp >= b.timestamp {
        a
    } else {
        b
    }
}

fn apply_field(inner: &mut Inner, delta: &Delta) -> Result<(), StoreError> {
    match &delta.field {
        DeltaField::Status(s) => {
            if let Some(t) = inner.trainsets.get_mut(&delta.trainset_id) {
                t.status = *s;
            }
        }
        DeltaField::MileageKm(m) => {
            if let Some(t) = inner.trainsets.get_mut(&delta.trainset_id) {
                t.mileage_km = *m;
            }
        }
        DeltaField::FitnessScore(score) => {
            if let Some(t) = inner.trainsets.get_mut(&delta.trainset_id) {
                t.fitness_score = *score;
            }
        }
        DeltaField::FitnessExpiry { department, expires_at } => {
            if let Some(t) = inner.trainsets.get_mut(&delta.trainset_id) {
                match department {
                    Department::Rollingstock => t.fitness_expiry.rolling_stock = *expires_at,
                    Department::Signalling => t.fitness_expiry.signalling = *expires_at,
                    Department::Telecom => t.fitness_expiry.telecom = *expires_at,
                }
            }
        }
        DeltaField::LastMaintenance(dt) => {
            if let Some(t) = inner.trainsets.get_mut(&delta.trainset_id) {
                t.last_maintenance = *dt;
            }
        }
        DeltaField::NextMaintenance(dt) => {
            if let Some(t) = inner.trainsets.get_mut(&delta.trainset_id) {
                t.next_maintenance = *dt;
            }
        }
        DeltaField::EnergyConsumptionKwh(e) => {
            if let Some(t) = inner.trainsets.get_mut(&delta.trainset_id) {
                t.energy_consumption_kwh = *e;
            }
        }
        DeltaField::CurrentBay(bay) => {
            if let Some(t) = inner.trainsets.get_mut(&delta.trainset_id) {
                t.current_bay = bay.clone();
            }
        }
        DeltaField::JobCard(j) => {
            inner.job_cards.insert(j.id.clone(), j.clone());
        }
        DeltaField::BrandingContract(b) => {
            inner.branding_contracts.insert(b.id.clone(), b.clone());
        }
        DeltaField::Clearance(c) => {
            inner.clearances.retain(|existing| {
                !(existing.trainset_id == c.trainset_id && existing.department == c.department)
            });
            inner.clearances.push(c.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FitnessCertificateExpiry, TrainsetStatus};

    fn ensure_config() {
        if !config::is_initialized() {
            config::init(config::EngineConfig::default());
        }
    }

    fn source(name: &str, priority: i32, timestamp: DateTime<Utc>) -> SourceMeta {
        SourceMeta {
            name: name.to_string(),
            priority,
            timestamp,
            manual_override_expiry: None,
        }
    }

    fn sample_trainset(id: &str) -> Trainset {
        let now = Utc::now();
        let expiry = now + chrono::Duration::days(30);
        Trainset {
            id: id.to_string(),
            status: TrainsetStatus::Available,
            mileage_km: 1000.0,
            fitness_score: 8.0,
            fitness_expiry: FitnessCertificateExpiry {
                rolling_stock: expiry,
                signalling: expiry,
                telecom: expiry,
            },
            last_maintenance: now - chrono::Duration::days(30),
            next_maintenance: now + chrono::Duration::days(60),
            energy_consumption_kwh: 50.0,
            current_bay: None,
        }
    }

    #[test]
    fn apply_updates_mileage() {
        ensure_config();
        let store = FleetStore::new();
        store.seed(vec![sample_trainset("t1")], vec![]);
        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::MileageKm(2000.0),
                source: source("maintenance-export", 5, Utc::now()),
            })
            .unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.trainset("t1").unwrap().mileage_km, 2000.0);
    }

    #[test]
    fn conflicting_writes_within_window_are_resolved_by_priority() {
        ensure_config();
        let store = FleetStore::new();
        store.seed(vec![sample_trainset("t1")], vec![]);
        let now = Utc::now();

        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::MileageKm(1111.0),
                source: source("low-priority", 1, now),
            })
            .unwrap();
        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::MileageKm(2222.0),
                source: source("high-priority", 9, now + chrono::Duration::seconds(1)),
            })
            .unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.trainset("t1").unwrap().mileage_km, 2222.0);
        assert_eq!(store.conflicts().len(), 1);
        assert_eq!(store.conflicts()[0].resolution, ResolutionKind::AutoPriority);
    }

    #[test]
    fn writes_outside_window_do_not_conflict() {
        ensure_config();
        let store = FleetStore::new();
        store.seed(vec![sample_trainset("t1")], vec![]);
        let now = Utc::now();

        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::MileageKm(1111.0),
                source: source("source-a", 5, now),
            })
            .unwrap();
        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::MileageKm(2222.0),
                source: source("source-b", 1, now + chrono::Duration::seconds(30)),
            })
            .unwrap();

        assert_eq!(store.conflicts().len(), 0);
        assert_eq!(store.snapshot().trainset("t1").unwrap().mileage_km, 2222.0);
    }

    #[test]
    fn writes_to_different_fields_never_conflict() {
        ensure_config();
        let store = FleetStore::new();
        store.seed(vec![sample_trainset("t1")], vec![]);
        let now = Utc::now();

        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::MileageKm(1111.0),
                source: source("source-a", 1, now),
            })
            .unwrap();
        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::EnergyConsumptionKwh(500.0),
                source: source("source-b", 9, now),
            })
            .unwrap();

        assert_eq!(store.conflicts().len(), 0);
    }

    #[test]
    fn unexpired_manual_override_blocks_later_automatic_write() {
        ensure_config();
        let store = FleetStore::new();
        store.seed(vec![sample_trainset("t1")], vec![]);
        let now = Utc::now();

        let mut manual_source = source("manual-override", 10, now);
        manual_source.manual_override_expiry = Some(now + chrono::Duration::hours(1));
        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::Status(TrainsetStatus::Maintenance),
                source: manual_source,
            })
            .unwrap();

        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::Status(TrainsetStatus::Available),
                source: source("telemetry", 1, now + chrono::Duration::minutes(10)),
            })
            .unwrap();

        assert_eq!(store.snapshot().trainset("t1").unwrap().status, TrainsetStatus::Maintenance);
    }

    #[test]
    fn expired_manual_override_allows_later_automatic_write() {
        ensure_config();
        let store = FleetStore::new();
        store.seed(vec![sample_trainset("t1")], vec![]);
        let now = Utc::now();

        let mut manual_source = source("manual-override", 10, now);
        manual_source.manual_override_expiry = Some(now + chrono::Duration::minutes(1));
        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::Status(TrainsetStatus::Maintenance),
                source: manual_source,
            })
            .unwrap();

        store
            .apply(Delta {
                trainset_id: "t1".into(),
                field: DeltaField::Status(TrainsetStatus::Available),
                source: source("telemetry", 1, now + chrono::Duration::hours(2)),
            })
            .unwrap();

        assert_eq!(store.snapshot().trainset("t1").unwrap().status, TrainsetStatus::Available);
    }

    #[test]
    fn sensor_ring_buffer_drops_oldest() {
        ensure_config();
        let store = FleetStore::new();
        let ring_size = config::get().ingestion.sensor_ring_size;
        for i in 0..(ring_size + 10) {
            store.append_sensor_frame(SensorFrame {
                trainset_id: "t1".into(),
                timestamp: Utc::now(),
                temperature_c: i as f64,
                vibration_mm_s: 0.0,
                brake_wear_pct: 0.0,
                pantograph_pressure_bar: 7.0,
                anomaly_tags: Vec::new(),
            });
        }
        assert_eq!(store.sensor_history("t1").len(), ring_size);
    }

    #[test]
    fn unknown_trainset_rejects_status_delta() {
        ensure_config();
        let store = FleetStore::new();
        let result = store.apply(Delta {
            trainset_id: "ghost".into(),
            field: DeltaField::MileageKm(1.0),
            source: source("x", 1, Utc::now()),
        });
        assert!(matches!(result, Err(StoreError::UnknownTrainset(_))));
    }
}

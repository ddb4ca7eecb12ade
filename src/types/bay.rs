//! Stabling yard geometry: bays are addressed by `(track, position)` and
//! sorted in that order when the stabling optimizer assigns placements
//! (spec §4.6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BayType {
    Stabling,
    Inspection,
    Maintenance,
    Cleaning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bay {
    pub id: String,
    pub track: u32,
    pub position: u32,
    pub bay_type: BayType,
    pub occupied_by: Option<String>,
}

impl Bay {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.occupied_by.is_none()
    }
}

/// Sort key used everywhere bays must be placed deterministically:
/// `(track asc, position asc)`.
#[must_use]
pub fn sort_key(bay: &Bay) -> (u32, u32) {
    (bay.track, bay.position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_orders_track_then_position() {
        let a = Bay {
            id: "a".into(),
            track: 1,
            position: 2,
            bay_type: BayType::Stabling,
            occupied_by: None,
        };
        let b = Bay {
            id: "b".into(),
            track: 1,
            position: 1,
            bay_type: BayType::Stabling,
            occupied_by: None,
        };
        let c = Bay {
            id: "c".into(),
            track: 0,
            position: 9,
            bay_type: BayType::Stabling,
            occupied_by: None,
        };
        let mut bays = vec![a.clone(), b.clone(), c.clone()];
        bays.sort_by_key(sort_key);
        assert_eq!(bays.iter().map(|x| x.id.clone()).collect::<Vec<_>>(), vec!["c", "b", "a"]);
    }
}

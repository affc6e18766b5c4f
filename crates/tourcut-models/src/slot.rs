//! The fourteen-slot timeline template.
//!
//! A tour video is assembled from fourteen fixed-duration clips, each
//! taken from one of three recorded scenes and one of two camera
//! angles. The catalog below describes the template; positions on the
//! recorded footage live in [`crate::SlotSelection`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of slots in the template.
pub const SLOT_COUNT: usize = 14;

/// A recorded scene of the flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SceneId {
    Cruising,
    Chase,
    Arrival,
}

impl SceneId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneId::Cruising => "cruising",
            SceneId::Chase => "chase",
            SceneId::Arrival => "arrival",
        }
    }

    /// All scenes in template order.
    pub fn all() -> [SceneId; 3] {
        [SceneId::Cruising, SceneId::Chase, SceneId::Arrival]
    }

    /// Parse from the snake_case form used in paths and routes.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cruising" => Some(SceneId::Cruising),
            "chase" => Some(SceneId::Chase),
            "arrival" => Some(SceneId::Arrival),
            _ => None,
        }
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the two cameras mounted on the aircraft.
///
/// Serialized as the bare integer (1 or 2) to match the footage file
/// naming and the render job file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "u8", into = "u8")]
pub enum CameraAngle {
    Cam1,
    Cam2,
}

impl CameraAngle {
    pub fn as_u8(&self) -> u8 {
        match self {
            CameraAngle::Cam1 => 1,
            CameraAngle::Cam2 => 2,
        }
    }
}

impl From<CameraAngle> for u8 {
    fn from(angle: CameraAngle) -> u8 {
        angle.as_u8()
    }
}

impl TryFrom<u8> for CameraAngle {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CameraAngle::Cam1),
            2 => Ok(CameraAngle::Cam2),
            other => Err(format!("invalid camera angle: {}", other)),
        }
    }
}

impl fmt::Display for CameraAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Static description of one template slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SlotConfig {
    /// Slot number, 1-based, unique across the template
    pub number: u8,
    /// Scene the clip is cut from
    pub scene: SceneId,
    /// Camera angle the clip is cut from
    pub camera: CameraAngle,
    /// Fixed clip duration in seconds
    pub duration: f64,
    /// Display color for the editing UI (cosmetic only)
    pub color: String,
}

/// Two slots whose clips must butt against each other in the final
/// video: the follow's window starts exactly where the lead's ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeamlessPair {
    pub lead: u8,
    pub follow: u8,
}

/// Catalog validation errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Duplicate slot number: {0}")]
    DuplicateSlot(u8),

    #[error("Slot {0} duration {1} outside allowed range 0.5..=3.3")]
    DurationOutOfRange(u8, f64),

    #[error("Pair references unknown slot {0}")]
    UnknownSlot(u8),

    #[error("Pair members {lead} and {follow} are in different scenes")]
    CrossScenePair { lead: u8, follow: u8 },

    #[error("Slot {0} appears in more than one pair role")]
    PairConflict(u8),

    #[error("Slot {0} is both a follow and a lead; chained pairs are not supported")]
    ChainedPair(u8),
}

/// The slot template: fourteen slots plus the seamless pairs among
/// them. Propagation through a pair is one level deep, which the
/// validator enforces by rejecting chains.
#[derive(Debug, Clone)]
pub struct SlotCatalog {
    slots: Vec<SlotConfig>,
    pairs: Vec<SeamlessPair>,
}

impl SlotCatalog {
    /// Build a catalog, validating slot uniqueness, duration bounds,
    /// and pair structure.
    pub fn new(slots: Vec<SlotConfig>, pairs: Vec<SeamlessPair>) -> Result<Self, CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for slot in &slots {
            if !seen.insert(slot.number) {
                return Err(CatalogError::DuplicateSlot(slot.number));
            }
            if !(0.5..=3.3).contains(&slot.duration) {
                return Err(CatalogError::DurationOutOfRange(slot.number, slot.duration));
            }
        }

        let mut leads = std::collections::HashSet::new();
        let mut follows = std::collections::HashSet::new();
        for pair in &pairs {
            let lead = slots
                .iter()
                .find(|s| s.number == pair.lead)
                .ok_or(CatalogError::UnknownSlot(pair.lead))?;
            let follow = slots
                .iter()
                .find(|s| s.number == pair.follow)
                .ok_or(CatalogError::UnknownSlot(pair.follow))?;
            if lead.scene != follow.scene {
                return Err(CatalogError::CrossScenePair {
                    lead: pair.lead,
                    follow: pair.follow,
                });
            }
            if !leads.insert(pair.lead) {
                return Err(CatalogError::PairConflict(pair.lead));
            }
            if !follows.insert(pair.follow) {
                return Err(CatalogError::PairConflict(pair.follow));
            }
        }
        // One-level cascade only: a follow may not lead another pair.
        for pair in &pairs {
            if leads.contains(&pair.follow) {
                return Err(CatalogError::ChainedPair(pair.follow));
            }
            if follows.contains(&pair.lead) {
                return Err(CatalogError::ChainedPair(pair.lead));
            }
        }

        Ok(Self { slots, pairs })
    }

    /// The studio's standard fourteen-slot template.
    pub fn standard() -> Self {
        let slot = |number, scene, camera, duration: f64, color: &str| SlotConfig {
            number,
            scene,
            camera,
            duration,
            color: color.to_string(),
        };

        let slots = vec![
            slot(1, SceneId::Cruising, CameraAngle::Cam1, 1.30, "#4f8ef7"),
            slot(2, SceneId::Cruising, CameraAngle::Cam2, 1.20, "#4f8ef7"),
            slot(3, SceneId::Cruising, CameraAngle::Cam1, 1.30, "#7bb0ff"),
            slot(4, SceneId::Cruising, CameraAngle::Cam2, 2.00, "#2f6fd8"),
            slot(5, SceneId::Cruising, CameraAngle::Cam1, 1.61, "#2f6fd8"),
            slot(6, SceneId::Cruising, CameraAngle::Cam2, 2.30, "#7bb0ff"),
            slot(7, SceneId::Cruising, CameraAngle::Cam1, 0.79, "#a8c8ff"),
            slot(8, SceneId::Chase, CameraAngle::Cam2, 1.23, "#f7a34f"),
            slot(9, SceneId::Chase, CameraAngle::Cam1, 2.00, "#d88a2f"),
            slot(10, SceneId::Chase, CameraAngle::Cam2, 1.50, "#d88a2f"),
            slot(11, SceneId::Chase, CameraAngle::Cam1, 2.40, "#ffc107"),
            slot(12, SceneId::Arrival, CameraAngle::Cam2, 1.60, "#5fbf6e"),
            slot(13, SceneId::Arrival, CameraAngle::Cam1, 2.10, "#3f9f4e"),
            slot(14, SceneId::Arrival, CameraAngle::Cam2, 3.30, "#3f9f4e"),
        ];
        let pairs = vec![
            SeamlessPair { lead: 1, follow: 2 },
            SeamlessPair { lead: 4, follow: 5 },
            SeamlessPair { lead: 9, follow: 10 },
            SeamlessPair { lead: 13, follow: 14 },
        ];

        // The constants above satisfy every validation rule; an error
        // here is unreachable.
        match Self::new(slots, pairs) {
            Ok(catalog) => catalog,
            Err(_) => unreachable!("standard catalog constants are valid"),
        }
    }

    /// All slots in template order.
    pub fn slots(&self) -> &[SlotConfig] {
        &self.slots
    }

    /// All seamless pairs.
    pub fn pairs(&self) -> &[SeamlessPair] {
        &self.pairs
    }

    /// Look up a slot by number.
    pub fn get(&self, number: u8) -> Option<&SlotConfig> {
        self.slots.iter().find(|s| s.number == number)
    }

    /// Slots belonging to one scene, in template order.
    pub fn scene_slots(&self, scene: SceneId) -> Vec<&SlotConfig> {
        self.slots.iter().filter(|s| s.scene == scene).collect()
    }

    /// The pair this slot leads, if any.
    pub fn pair_led_by(&self, number: u8) -> Option<&SeamlessPair> {
        self.pairs.iter().find(|p| p.lead == number)
    }

    /// The pair this slot follows in, if any.
    pub fn pair_following(&self, number: u8) -> Option<&SeamlessPair> {
        self.pairs.iter().find(|p| p.follow == number)
    }

    /// Whether the slot is a pair follow (its position is derived
    /// from its lead rather than placed independently).
    pub fn is_follow(&self, number: u8) -> bool {
        self.pair_following(number).is_some()
    }

    /// Sum of clip durations for one scene.
    pub fn scene_total_duration(&self, scene: SceneId) -> f64 {
        self.scene_slots(scene).iter().map(|s| s.duration).sum()
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_shape() {
        let catalog = SlotCatalog::standard();
        assert_eq!(catalog.slots().len(), SLOT_COUNT);
        assert_eq!(catalog.scene_slots(SceneId::Cruising).len(), 7);
        assert_eq!(catalog.scene_slots(SceneId::Chase).len(), 4);
        assert_eq!(catalog.scene_slots(SceneId::Arrival).len(), 3);
        assert_eq!(catalog.pairs().len(), 4);
    }

    #[test]
    fn test_cruising_block_duration() {
        let catalog = SlotCatalog::standard();
        let total = catalog.scene_total_duration(SceneId::Cruising);
        assert!((total - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_camera_angles_alternate() {
        let catalog = SlotCatalog::standard();
        for pair in catalog.pairs() {
            let lead = catalog.get(pair.lead).unwrap();
            let follow = catalog.get(pair.follow).unwrap();
            assert_ne!(lead.camera, follow.camera, "pair {}-{}", pair.lead, pair.follow);
        }
    }

    #[test]
    fn test_pair_lookup() {
        let catalog = SlotCatalog::standard();
        assert_eq!(catalog.pair_led_by(1).map(|p| p.follow), Some(2));
        assert!(catalog.pair_led_by(3).is_none());
        assert!(catalog.is_follow(14));
        assert!(!catalog.is_follow(13));
    }

    #[test]
    fn test_rejects_chained_pairs() {
        let slots = SlotCatalog::standard().slots().to_vec();
        let pairs = vec![
            SeamlessPair { lead: 1, follow: 2 },
            SeamlessPair { lead: 2, follow: 3 },
        ];
        let err = SlotCatalog::new(slots, pairs).unwrap_err();
        assert!(matches!(err, CatalogError::ChainedPair(2)));
    }

    #[test]
    fn test_rejects_duplicate_slot() {
        let mut slots = SlotCatalog::standard().slots().to_vec();
        slots[1].number = 1;
        let err = SlotCatalog::new(slots, vec![]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSlot(1)));
    }

    #[test]
    fn test_camera_angle_serde() {
        let json = serde_json::to_string(&CameraAngle::Cam2).unwrap();
        assert_eq!(json, "2");
        let angle: CameraAngle = serde_json::from_str("1").unwrap();
        assert_eq!(angle, CameraAngle::Cam1);
        assert!(serde_json::from_str::<CameraAngle>("3").is_err());
    }
}

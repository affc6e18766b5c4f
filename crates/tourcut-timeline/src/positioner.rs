//! Slot placement: initial spread, drag repositioning, reclamping.

use serde::Serialize;
use thiserror::Error;
use tourcut_models::{SceneId, SlotCatalog, SlotSelection};

/// Seconds held back from the end of a long scene so the spread never
/// runs into the final moments of the footage.
const RESERVE_SECONDS: f64 = 5.0;

/// Fraction of a short scene that remains usable; whichever of the
/// two reserves leaves more footage wins.
const USABLE_FRACTION: f64 = 0.9;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Unknown slot number: {0}")]
    UnknownSlot(u8),

    #[error("Scene duration must be positive, got {0}")]
    InvalidSceneDuration(f64),
}

/// One applied placement: slot number plus the window start actually
/// written (after clamping).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedSlot {
    pub slot_number: u8,
    pub window_start: f64,
}

/// Places slot windows on recorded footage.
///
/// All three operations clamp every start they emit into
/// `[0, max(0, scene_duration - slot_duration)]`, so a window never
/// extends past the end of the footage.
#[derive(Debug, Clone)]
pub struct TimelinePositioner {
    catalog: SlotCatalog,
}

impl TimelinePositioner {
    pub fn new(catalog: SlotCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SlotCatalog {
        &self.catalog
    }

    /// Spread a scene's slots evenly across freshly recorded footage.
    ///
    /// Lead and independent slots are walked in template order with a
    /// uniform gap between them; a pair's follow butts directly
    /// against its lead. Only meaningful while the scene's slots are
    /// still unpositioned; callers check that before invoking.
    pub fn initial_spread(
        &self,
        scene: SceneId,
        scene_duration: f64,
    ) -> Result<Vec<PlacedSlot>, TimelineError> {
        if !(scene_duration > 0.0) {
            return Err(TimelineError::InvalidSceneDuration(scene_duration));
        }

        let slots = self.catalog.scene_slots(scene);
        let usable = (scene_duration - RESERVE_SECONDS).max(scene_duration * USABLE_FRACTION);
        let total: f64 = slots.iter().map(|s| s.duration).sum();
        let anchors = slots
            .iter()
            .filter(|s| !self.catalog.is_follow(s.number))
            .count();
        let gap = if anchors > 0 {
            (usable - total) / anchors as f64
        } else {
            0.0
        };

        let mut placed = Vec::with_capacity(slots.len());
        let mut cursor = 0.0;
        for slot in &slots {
            if self.catalog.is_follow(slot.number) {
                continue;
            }
            placed.push(PlacedSlot {
                slot_number: slot.number,
                window_start: self.clamp_start(cursor, slot.duration, scene_duration),
            });
            cursor += slot.duration;
            if let Some(pair) = self.catalog.pair_led_by(slot.number) {
                let follow = self
                    .catalog
                    .get(pair.follow)
                    .ok_or(TimelineError::UnknownSlot(pair.follow))?;
                placed.push(PlacedSlot {
                    slot_number: follow.number,
                    window_start: self.clamp_start(cursor, follow.duration, scene_duration),
                });
                cursor += follow.duration;
            }
            cursor += gap;
        }

        placed.sort_by_key(|p| p.slot_number);
        Ok(placed)
    }

    /// Apply a drag: clamp the requested start into range and, when
    /// the slot leads a seamless pair, re-place the follow directly
    /// after it (clamped the same way). The cascade is one level; a
    /// follow dragged directly moves alone.
    pub fn reposition(
        &self,
        slot_number: u8,
        requested_start: f64,
        scene_duration: f64,
    ) -> Result<Vec<PlacedSlot>, TimelineError> {
        if !(scene_duration > 0.0) {
            return Err(TimelineError::InvalidSceneDuration(scene_duration));
        }
        let slot = self
            .catalog
            .get(slot_number)
            .ok_or(TimelineError::UnknownSlot(slot_number))?;

        let start = self.clamp_start(requested_start, slot.duration, scene_duration);
        let mut moves = vec![PlacedSlot {
            slot_number,
            window_start: start,
        }];

        if let Some(pair) = self.catalog.pair_led_by(slot_number) {
            let follow = self
                .catalog
                .get(pair.follow)
                .ok_or(TimelineError::UnknownSlot(pair.follow))?;
            moves.push(PlacedSlot {
                slot_number: follow.number,
                window_start: self.clamp_start(
                    start + slot.duration,
                    follow.duration,
                    scene_duration,
                ),
            });
        }

        Ok(moves)
    }

    /// Pull out-of-range positioned selections back into range after
    /// a scene duration change. In-range selections and sentinels are
    /// untouched, so the operation is idempotent and never re-spreads.
    pub fn reclamp(
        &self,
        selections: &[SlotSelection],
        scene_duration: f64,
    ) -> Result<Vec<PlacedSlot>, TimelineError> {
        if !(scene_duration > 0.0) {
            return Err(TimelineError::InvalidSceneDuration(scene_duration));
        }

        let mut moves = Vec::new();
        for sel in selections {
            let Some(start) = sel.window_start else {
                continue;
            };
            let slot = self
                .catalog
                .get(sel.slot_number)
                .ok_or(TimelineError::UnknownSlot(sel.slot_number))?;
            let clamped = self.clamp_start(start, slot.duration, scene_duration);
            if clamped != start {
                moves.push(PlacedSlot {
                    slot_number: sel.slot_number,
                    window_start: clamped,
                });
            }
        }
        Ok(moves)
    }

    fn clamp_start(&self, requested: f64, slot_duration: f64, scene_duration: f64) -> f64 {
        let max_start = (scene_duration - slot_duration).max(0.0);
        requested.clamp(0.0, max_start)
    }
}

impl Default for TimelinePositioner {
    fn default() -> Self {
        Self::new(SlotCatalog::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_models::RecordingId;

    const EPS: f64 = 1e-9;

    fn positioner() -> TimelinePositioner {
        TimelinePositioner::default()
    }

    fn start_of(placed: &[PlacedSlot], slot: u8) -> f64 {
        placed
            .iter()
            .find(|p| p.slot_number == slot)
            .map(|p| p.window_start)
            .unwrap()
    }

    #[test]
    fn test_spread_cruising_60s() {
        let p = positioner();
        let placed = p.initial_spread(SceneId::Cruising, 60.0).unwrap();
        assert_eq!(placed.len(), 7);

        // usable = max(60-5, 60*0.9) = 55; gap = (55 - 10.5) / 5 = 8.9
        assert!((start_of(&placed, 1) - 0.0).abs() < EPS);
        assert!((start_of(&placed, 2) - 1.3).abs() < EPS);
        assert!((start_of(&placed, 3) - 11.4).abs() < EPS);
        assert!((start_of(&placed, 4) - 21.6).abs() < EPS);
        assert!((start_of(&placed, 5) - 23.6).abs() < EPS);
        assert!((start_of(&placed, 6) - 34.11).abs() < EPS);
        assert!((start_of(&placed, 7) - 45.31).abs() < EPS);
    }

    #[test]
    fn test_spread_windows_fit_scene() {
        let p = positioner();
        for (scene, duration) in [
            (SceneId::Cruising, 60.0),
            (SceneId::Chase, 45.0),
            (SceneId::Arrival, 30.0),
        ] {
            let placed = p.initial_spread(scene, duration).unwrap();
            for pl in &placed {
                let slot = p.catalog().get(pl.slot_number).unwrap();
                assert!(pl.window_start >= 0.0);
                assert!(
                    pl.window_start + slot.duration <= duration + EPS,
                    "slot {} at {} overruns {}s scene",
                    pl.slot_number,
                    pl.window_start,
                    duration
                );
            }
        }
    }

    #[test]
    fn test_spread_follow_butts_against_lead() {
        let p = positioner();
        let placed = p.initial_spread(SceneId::Cruising, 60.0).unwrap();
        for pair in p.catalog().pairs() {
            let lead = p.catalog().get(pair.lead).unwrap();
            if lead.scene != SceneId::Cruising {
                continue;
            }
            let lead_start = start_of(&placed, pair.lead);
            let follow_start = start_of(&placed, pair.follow);
            assert!((follow_start - (lead_start + lead.duration)).abs() < EPS);
        }
    }

    #[test]
    fn test_spread_is_deterministic() {
        let p = positioner();
        let a = p.initial_spread(SceneId::Chase, 47.5).unwrap();
        let b = p.initial_spread(SceneId::Chase, 47.5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_spread_preserves_template_order() {
        let p = positioner();
        let placed = p.initial_spread(SceneId::Chase, 45.0).unwrap();
        let starts: Vec<f64> = placed.iter().map(|pl| pl.window_start).collect();
        for pair in starts.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_spread_rejects_bad_duration() {
        let p = positioner();
        assert!(p.initial_spread(SceneId::Cruising, 0.0).is_err());
        assert!(p.initial_spread(SceneId::Cruising, -3.0).is_err());
        assert!(p.initial_spread(SceneId::Cruising, f64::NAN).is_err());
    }

    #[test]
    fn test_reposition_clamps_to_scene_end() {
        let p = positioner();
        // Slot 3 is 1.3s; dragging to 59.5 on a 60s scene lands at 58.7.
        let moves = p.reposition(3, 59.5, 60.0).unwrap();
        assert_eq!(moves.len(), 1);
        assert!((moves[0].window_start - 58.7).abs() < EPS);
    }

    #[test]
    fn test_reposition_clamps_negative_to_zero() {
        let p = positioner();
        let moves = p.reposition(6, -4.0, 60.0).unwrap();
        assert!((moves[0].window_start - 0.0).abs() < EPS);
    }

    #[test]
    fn test_reposition_cascades_to_follow() {
        let p = positioner();
        // Slot 1 (1.3s) leads slot 2 (1.2s).
        let moves = p.reposition(1, 10.0, 60.0).unwrap();
        assert_eq!(moves.len(), 2);
        assert!((start_of(&moves, 1) - 10.0).abs() < EPS);
        assert!((start_of(&moves, 2) - 11.3).abs() < EPS);
    }

    #[test]
    fn test_reposition_cascade_clamps_follow() {
        let p = positioner();
        // Slot 4 (2.0s) clamps to 58.0 on a 60s scene; its follow
        // slot 5 (1.61s) would start at 60.0 and clamps to 58.39.
        let moves = p.reposition(4, 59.0, 60.0).unwrap();
        assert!((start_of(&moves, 4) - 58.0).abs() < EPS);
        assert!((start_of(&moves, 5) - 58.39).abs() < EPS);
    }

    #[test]
    fn test_reposition_follow_moves_alone() {
        let p = positioner();
        let moves = p.reposition(2, 20.0, 60.0).unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].slot_number, 2);
    }

    #[test]
    fn test_reposition_unknown_slot() {
        let p = positioner();
        assert!(matches!(
            p.reposition(99, 1.0, 60.0),
            Err(TimelineError::UnknownSlot(99))
        ));
    }

    #[test]
    fn test_reclamp_pulls_overrun_back() {
        let p = positioner();
        let rec = RecordingId::new();
        // Slot 7 (0.79s) at 59.2 on a scene now only 45s long.
        let selections = vec![SlotSelection::sentinel(rec, 7).with_start(59.2)];
        let moves = p.reclamp(&selections, 45.0).unwrap();
        assert_eq!(moves.len(), 1);
        assert!((moves[0].window_start - 44.21).abs() < EPS);
    }

    #[test]
    fn test_reclamp_leaves_in_range_alone() {
        let p = positioner();
        let rec = RecordingId::new();
        let selections = vec![
            SlotSelection::sentinel(rec.clone(), 1).with_start(5.0),
            SlotSelection::sentinel(rec.clone(), 3).with_start(43.0),
            SlotSelection::sentinel(rec, 7).with_start(59.2),
        ];
        let moves = p.reclamp(&selections, 60.0).unwrap();
        assert!(moves.is_empty());
    }

    #[test]
    fn test_reclamp_skips_sentinels_and_is_idempotent() {
        let p = positioner();
        let rec = RecordingId::new();
        let mut selections = vec![
            SlotSelection::sentinel(rec.clone(), 1),
            SlotSelection::sentinel(rec.clone(), 7).with_start(59.2),
        ];
        let moves = p.reclamp(&selections, 45.0).unwrap();
        assert_eq!(moves.len(), 1);

        // Apply and reclamp again: nothing left to move.
        selections[1].window_start = Some(moves[0].window_start);
        let again = p.reclamp(&selections, 45.0).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_short_scene_spread_still_fits() {
        let p = positioner();
        // 12s scene: usable = max(7, 10.8) = 10.8, barely above the
        // 10.5s cruising block.
        let placed = p.initial_spread(SceneId::Cruising, 12.0).unwrap();
        for pl in &placed {
            let slot = p.catalog().get(pl.slot_number).unwrap();
            assert!(pl.window_start >= 0.0);
            assert!(pl.window_start + slot.duration <= 12.0 + EPS);
        }
    }
}

//! Assembles the fixed-length light sequence for one render cycle.

use tracing::warn;

use crate::model::{LightMetadata, Rgb};
use crate::resolve::ResolvedStation;

/// A (color, metadata) pair at one sequence index. Rebuilt every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightEntry {
    pub color: Rgb,
    /// Present only for positions backed by a configured station.
    pub metadata: Option<LightMetadata>,
}

/// Densely indexed color sequence, one entry per physical LED.
pub type LightSequence = Vec<LightEntry>;

/// Build a sequence of exactly `light_count` entries.
///
/// Every slot starts as the fault color, which covers LED positions with
/// no binding at all (decorative or unused indices). Resolved entries
/// overwrite their slot; if two target the same index the later one wins.
/// Out-of-range indices are dropped here; load-time validation is where
/// they get rejected loudly.
pub fn build(light_count: usize, fault_color: Rgb, resolved: &[ResolvedStation]) -> LightSequence {
    let mut sequence = vec![
        LightEntry {
            color: fault_color,
            metadata: None,
        };
        light_count
    ];

    for station in resolved {
        let Some(slot) = sequence.get_mut(station.index) else {
            warn!(
                station = %station.metadata.name,
                led = station.index,
                count = light_count,
                "binding outside the strip, skipping"
            );
            continue;
        };

        *slot = LightEntry {
            color: station.color,
            metadata: Some(station.metadata.clone()),
        };
    }

    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Classification;

    const FAULT: Rgb = Rgb::new(255, 255, 0);

    fn resolved(name: &str, index: usize, color: Rgb) -> ResolvedStation {
        ResolvedStation {
            index,
            classification: Classification::Unmatched,
            color,
            metadata: LightMetadata {
                icon: "icon".to_string(),
                name: name.to_string(),
            },
        }
    }

    #[test]
    fn output_length_always_matches_light_count() {
        for count in [0, 1, 7, 50] {
            let sequence = build(count, FAULT, &[]);
            assert_eq!(sequence.len(), count);
        }
    }

    #[test]
    fn unbound_slots_hold_the_fault_color() {
        let green = Rgb::new(0, 255, 0);
        let sequence = build(5, FAULT, &[resolved("KSEA", 2, green)]);

        for (i, entry) in sequence.iter().enumerate() {
            if i == 2 {
                assert_eq!(entry.color, green);
                assert_eq!(entry.metadata.as_ref().map(|m| m.name.as_str()), Some("KSEA"));
            } else {
                assert_eq!(entry.color, FAULT);
                assert!(entry.metadata.is_none());
            }
        }
    }

    #[test]
    fn out_of_range_entries_are_dropped() {
        let sequence = build(3, FAULT, &[resolved("KSEA", 3, Rgb::new(0, 255, 0))]);
        assert_eq!(sequence.len(), 3);
        assert!(sequence.iter().all(|e| e.color == FAULT));
    }

    #[test]
    fn later_entry_wins_on_duplicate_index() {
        let first = resolved("KSEA", 3, Rgb::new(0, 255, 0));
        let second = resolved("KPDX", 3, Rgb::new(255, 0, 0));
        let sequence = build(5, FAULT, &[first, second]);

        assert_eq!(sequence[3].color, Rgb::new(255, 0, 0));
        assert_eq!(
            sequence[3].metadata.as_ref().map(|m| m.name.as_str()),
            Some("KPDX")
        );
    }
}

//! Edit plan types produced by the AI resolver.
//!
//! The external service returns loosely-shaped JSON; the planner
//! crate converts it into these tagged variants, and `EditPlan::resolve`
//! is the single validation gate the filter-graph compiler relies on.
//! Nothing downstream ever sees an unvalidated plan.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::StagedAsset;

/// One instruction in an edit plan.
///
/// Unknown operation types or extra fields are rejected at
/// deserialization rather than passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum EditOperation {
    /// Keep only `start..end` of one clip. `end` omitted means to the
    /// end of the clip.
    Trim {
        clip_index: usize,
        start: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        end: Option<f64>,
    },
    /// Playback order of clip indices. Clips not listed are dropped
    /// from the output.
    Reorder { order: Vec<usize> },
    /// Crossfade between two clips at their shared boundary.
    Crossfade { between: [usize; 2], duration: f64 },
    /// Mix an overlay track into the merged audio, ducking the
    /// original audio by `duck_db` (non-positive) under the overlay.
    AudioOverlay { start: f64, duck_db: f64 },
}

/// Audio overlay request supplied at enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AudioOverlaySpec {
    /// Staged overlay track
    pub asset: StagedAsset,
    /// Offset into the output where the overlay starts, in seconds
    pub start_secs: f64,
    /// Attenuation applied to the original audio, dB (0 = unchanged)
    pub duck_db: f64,
}

/// An ordered edit plan, as resolved from the AI service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EditPlan {
    pub operations: Vec<EditOperation>,
}

/// One clip slot in a validated plan, in playback order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClip {
    /// Index into the staged clip set
    pub source_index: usize,
    /// Trim start, seconds
    pub start: Option<f64>,
    /// Trim end, seconds; `None` = end of clip
    pub end: Option<f64>,
}

/// A validated plan the compiler can consume directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPlan {
    /// Clips in playback order with their trims applied
    pub clips: Vec<ResolvedClip>,
    /// Crossfade durations keyed by (earlier, later) source index
    pub crossfades: Vec<([usize; 2], f64)>,
    /// Overlay timing from the plan, overriding the enqueue default
    pub audio_start: Option<f64>,
    /// Ducking from the plan, overriding the enqueue default
    pub audio_duck_db: Option<f64>,
}

impl ResolvedPlan {
    /// Crossfade duration for the boundary between playback positions
    /// `pos` and `pos + 1`, if the plan requested one for that pair.
    pub fn crossfade_at(&self, pos: usize) -> Option<f64> {
        let a = self.clips.get(pos)?.source_index;
        let b = self.clips.get(pos + 1)?.source_index;
        self.crossfades
            .iter()
            .find(|(pair, _)| (pair[0] == a && pair[1] == b) || (pair[0] == b && pair[1] == a))
            .map(|(_, d)| *d)
    }
}

/// Plan rejected before compilation.
#[derive(Debug, Error)]
pub enum PlanValidationError {
    #[error("no staged clips to edit")]
    EmptyClipSet,

    #[error("{count} clips exceeds the supported maximum of {max}")]
    TooManyClips { count: usize, max: usize },

    #[error("clip index {index} out of range for {clip_count} staged clips")]
    ClipIndexOutOfRange { index: usize, clip_count: usize },

    #[error("trim end {end}s is earlier than start {start}s for clip {clip_index}")]
    EndBeforeStart {
        clip_index: usize,
        start: f64,
        end: f64,
    },

    #[error("trim start cannot be negative (clip {clip_index}, start {start}s)")]
    NegativeStart { clip_index: usize, start: f64 },

    #[error("crossfade duration must be positive, got {duration}s")]
    NonPositiveCrossfade { duration: f64 },

    #[error("audio duck must be non-positive dB, got {duck_db}")]
    PositiveDuck { duck_db: f64 },

    #[error("audio overlay start cannot be negative, got {start}s")]
    NegativeOverlayStart { start: f64 },
}

impl EditPlan {
    /// Validate the plan against `clip_count` staged clips and
    /// flatten it into playback order.
    ///
    /// Out-of-range indices are rejected outright; duplicate reorder
    /// entries are dropped, and an empty reorder falls back to upload
    /// order. Later operations of the same kind win.
    pub fn resolve(
        &self,
        clip_count: usize,
        max_clips: usize,
    ) -> Result<ResolvedPlan, PlanValidationError> {
        if clip_count == 0 {
            return Err(PlanValidationError::EmptyClipSet);
        }
        if clip_count > max_clips {
            return Err(PlanValidationError::TooManyClips {
                count: clip_count,
                max: max_clips,
            });
        }

        let check_index = |index: usize| {
            if index >= clip_count {
                Err(PlanValidationError::ClipIndexOutOfRange { index, clip_count })
            } else {
                Ok(())
            }
        };

        let mut order: Vec<usize> = (0..clip_count).collect();
        let mut trims: Vec<(Option<f64>, Option<f64>)> = vec![(None, None); clip_count];
        let mut crossfades: Vec<([usize; 2], f64)> = Vec::new();
        let mut audio_start = None;
        let mut audio_duck_db = None;

        for op in &self.operations {
            match op {
                EditOperation::Trim {
                    clip_index,
                    start,
                    end,
                } => {
                    check_index(*clip_index)?;
                    if *start < 0.0 {
                        return Err(PlanValidationError::NegativeStart {
                            clip_index: *clip_index,
                            start: *start,
                        });
                    }
                    if let Some(end) = end {
                        if *end < *start {
                            return Err(PlanValidationError::EndBeforeStart {
                                clip_index: *clip_index,
                                start: *start,
                                end: *end,
                            });
                        }
                    }
                    trims[*clip_index] = (Some(*start), *end);
                }
                EditOperation::Reorder { order: requested } => {
                    let mut cleaned = Vec::with_capacity(requested.len());
                    for &index in requested {
                        check_index(index)?;
                        if !cleaned.contains(&index) {
                            cleaned.push(index);
                        }
                    }
                    if !cleaned.is_empty() {
                        order = cleaned;
                    }
                }
                EditOperation::Crossfade { between, duration } => {
                    check_index(between[0])?;
                    check_index(between[1])?;
                    if *duration <= 0.0 || !duration.is_finite() {
                        return Err(PlanValidationError::NonPositiveCrossfade {
                            duration: *duration,
                        });
                    }
                    crossfades.push((*between, *duration));
                }
                EditOperation::AudioOverlay { start, duck_db } => {
                    if *duck_db > 0.0 {
                        return Err(PlanValidationError::PositiveDuck { duck_db: *duck_db });
                    }
                    if *start < 0.0 {
                        return Err(PlanValidationError::NegativeOverlayStart { start: *start });
                    }
                    audio_start = Some(*start);
                    audio_duck_db = Some(*duck_db);
                }
            }
        }

        let clips = order
            .into_iter()
            .map(|source_index| {
                let (start, end) = trims[source_index];
                ResolvedClip {
                    source_index,
                    start,
                    end,
                }
            })
            .collect();

        Ok(ResolvedPlan {
            clips,
            crossfades,
            audio_start,
            audio_duck_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(ops: Vec<EditOperation>) -> EditPlan {
        EditPlan { operations: ops }
    }

    #[test]
    fn test_default_order_without_reorder() {
        let resolved = plan(vec![]).resolve(3, 3).unwrap();
        let order: Vec<usize> = resolved.clips.iter().map(|c| c.source_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_reorder_and_trim() {
        let resolved = plan(vec![
            EditOperation::Trim {
                clip_index: 0,
                start: 0.0,
                end: Some(5.0),
            },
            EditOperation::Reorder { order: vec![1, 0] },
        ])
        .resolve(2, 3)
        .unwrap();

        assert_eq!(resolved.clips[0].source_index, 1);
        assert_eq!(resolved.clips[1].source_index, 0);
        assert_eq!(resolved.clips[1].end, Some(5.0));
        assert_eq!(resolved.clips[0].start, None);
    }

    #[test]
    fn test_clip_index_out_of_range_rejected() {
        let err = plan(vec![EditOperation::Trim {
            clip_index: 3,
            start: 0.0,
            end: None,
        }])
        .resolve(2, 3)
        .unwrap_err();
        assert!(matches!(
            err,
            PlanValidationError::ClipIndexOutOfRange { index: 3, .. }
        ));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let err = plan(vec![EditOperation::Trim {
            clip_index: 0,
            start: 5.0,
            end: Some(2.0),
        }])
        .resolve(1, 3)
        .unwrap_err();
        assert!(matches!(err, PlanValidationError::EndBeforeStart { .. }));
    }

    #[test]
    fn test_too_many_clips_rejected() {
        let err = plan(vec![]).resolve(4, 3).unwrap_err();
        assert!(matches!(
            err,
            PlanValidationError::TooManyClips { count: 4, max: 3 }
        ));
    }

    #[test]
    fn test_empty_clip_set_rejected() {
        assert!(matches!(
            plan(vec![]).resolve(0, 3),
            Err(PlanValidationError::EmptyClipSet)
        ));
    }

    #[test]
    fn test_reorder_duplicates_dropped() {
        let resolved = plan(vec![EditOperation::Reorder {
            order: vec![1, 1, 0],
        }])
        .resolve(2, 3)
        .unwrap();
        let order: Vec<usize> = resolved.clips.iter().map(|c| c.source_index).collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_positive_duck_rejected() {
        let err = plan(vec![EditOperation::AudioOverlay {
            start: 4.0,
            duck_db: 3.0,
        }])
        .resolve(1, 3)
        .unwrap_err();
        assert!(matches!(err, PlanValidationError::PositiveDuck { .. }));
    }

    #[test]
    fn test_crossfade_lookup_by_boundary() {
        let resolved = plan(vec![
            EditOperation::Reorder { order: vec![1, 0] },
            EditOperation::Crossfade {
                between: [0, 1],
                duration: 0.5,
            },
        ])
        .resolve(2, 3)
        .unwrap();

        // Boundary is (1, 0) in playback order; the (0, 1) pair matches
        // regardless of direction.
        assert_eq!(resolved.crossfade_at(0), Some(0.5));
    }

    #[test]
    fn test_unknown_operation_fields_rejected() {
        let raw = r#"{"type": "trim", "clip_index": 0, "start": 1.0, "frames": 12}"#;
        assert!(serde_json::from_str::<EditOperation>(raw).is_err());

        let raw = r#"{"type": "explode", "clip_index": 0}"#;
        assert!(serde_json::from_str::<EditOperation>(raw).is_err());
    }
}

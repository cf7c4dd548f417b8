//! Reconciliation of frame geometry into one regular slice grid.
//!
//! Frames of a segmentation only cover the slices where a segment is
//! present, in no particular order, and may repeat positions for different
//! segments. The reconciler collects the distinct positions, checks that all
//! frames share one orientation and one spacing, orders the positions along
//! the slice normal and inserts the positions of empty slices so that the
//! result is uniformly spaced.

use std::fmt;

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::enums::ToleranceTier;
use crate::error::SegError;
use crate::frame::{FrameInfo, SharedGroup};
use crate::orientation::OrientationMatrix;

/// Upper bound on the number of slices a segmentation may expand to.
pub const MAX_SLICES: usize = 16_384;

/// Recoverable irregularity met while filling slice gaps.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    /// A gap closed on the next real position only within a widened tolerance.
    WidenedTolerance {
        tier: ToleranceTier,
        residual: f64,
        next: Point3<f64>,
    },
    /// A gap ended shorter than the slice spacing.
    IrregularGap { residual: f64, next: Point3<f64> },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::WidenedTolerance { tier, residual, next } => write!(
                f,
                "slice gap before ({}, {}, {}) closed with tolerance {} (residual {residual:e})",
                next.x,
                next.y,
                next.z,
                tier.epsilon()
            ),
            DecodeWarning::IrregularGap { residual, next } => write!(
                f,
                "slice gap before ({}, {}, {}) is irregular (residual {residual:e})",
                next.x, next.y, next.z
            ),
        }
    }
}

/// Distinct positions, orientation and spacing gathered from all frames.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameScan {
    pub positions: Vec<Point3<f64>>,
    pub orientation: [f64; 6],
    pub spacing: [f64; 3],
}

#[derive(Debug, Clone)]
pub struct ReconciledGeometry {
    pub orientation: OrientationMatrix,
    pub spacing: [f64; 3],
    /// Real and inserted positions, ordered along the slice normal.
    pub positions: Vec<Point3<f64>>,
    pub inserted: usize,
    pub warnings: Vec<DecodeWarning>,
}

impl ReconciledGeometry {
    pub fn slice_index(&self, position: &Point3<f64>) -> Option<usize> {
        self.positions.iter().position(|p| p == position)
    }
}

pub fn scan_frames(frames: &[FrameInfo], shared: &SharedGroup) -> Result<FrameScan, SegError> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut orientation = shared.image_orientation;
    let mut spacing = shared.spacing;

    for frame in frames {
        if !positions.contains(&frame.image_position) {
            positions.push(frame.image_position);
        }
        if let Some(frame_orientation) = frame.image_orientation {
            match orientation {
                None => orientation = Some(frame_orientation),
                Some(reference) if !close(&reference, &frame_orientation) => {
                    return Err(SegError::MultiOrientationUnsupported);
                }
                Some(_) => {}
            }
        }
        if let Some(frame_spacing) = frame.spacing {
            match spacing {
                None => spacing = Some(frame_spacing),
                Some(reference) if !close(&reference, &frame_spacing) => {
                    return Err(SegError::MultiSpacingUnsupported);
                }
                Some(_) => {}
            }
        }
    }

    let spacing = spacing.ok_or(SegError::MissingSpacing)?;
    let orientation = orientation.ok_or(SegError::MissingOrientation)?;
    Ok(FrameScan {
        positions,
        orientation,
        spacing,
    })
}

fn close(a: &[f64], b: &[f64]) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(a, b)| (a - b).abs() <= ToleranceTier::REAL_WORLD_EPSILON)
}

/// Order the scanned positions and fill the gaps between them.
pub fn reconcile(scan: FrameScan) -> Result<ReconciledGeometry, SegError> {
    let FrameScan {
        mut positions,
        orientation,
        mut spacing,
    } = scan;
    let orientation = OrientationMatrix::from_cosines(&orientation);
    let inverse = orientation
        .inverse()
        .ok_or(SegError::DegenerateOrientation)?;

    let sort_key = |position: &Point3<f64>| inverse.multiply_point(position).z;
    positions.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));

    let normal = orientation.column(2).normalize();
    if let Some(inferred) = inferred_slice_spacing(&positions, &normal, spacing[2]) {
        if (inferred - spacing[2]).abs() > ToleranceTier::REAL_WORLD_EPSILON {
            debug!(
                declared = spacing[2],
                inferred, "Using slice spacing inferred from frame positions"
            );
            spacing[2] = inferred;
        }
    }
    if spacing[2] <= ToleranceTier::REAL_WORLD_EPSILON {
        return Err(SegError::UnsupportedTagValue {
            tag: "SpacingBetweenSlices",
            value: spacing[2].to_string(),
        });
    }
    check_slice_count(&positions, &normal, spacing[2])?;

    let mut filled = Vec::with_capacity(positions.len());
    let mut warnings = Vec::new();
    if let Some(&first) = positions.first() {
        filled.push(first);
        for pair in positions.windows(2) {
            let (previous, next) = (pair[0], pair[1]);
            fill_gap(&first, &previous, &next, &normal, spacing[2], &mut filled, &mut warnings)?;
            filled.push(next);
        }
    }
    let inserted = filled.len() - positions.len();
    debug!(
        real = positions.len(),
        inserted,
        orientation = %orientation.orientation_code(),
        "Reconciled slice positions"
    );

    Ok(ReconciledGeometry {
        orientation,
        spacing,
        positions: filled,
        inserted,
        warnings,
    })
}

/// Smallest distance along the normal between consecutive positions.
///
/// A single gap cannot tell a missing slice from the spacing itself, so with
/// two positions the distance only replaces a declared spacing it undercuts.
fn inferred_slice_spacing(
    positions: &[Point3<f64>],
    normal: &Vector3<f64>,
    declared: f64,
) -> Option<f64> {
    let mut distances = positions
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).dot(normal).abs())
        .filter(|distance| *distance > ToleranceTier::REAL_WORLD_EPSILON);
    match positions.len() {
        0 | 1 => None,
        2 => distances.next().filter(|distance| *distance < declared),
        _ => distances.min_by(f64::total_cmp),
    }
}

/// Fail before filling when the gaps would expand past [`MAX_SLICES`].
fn check_slice_count(
    positions: &[Point3<f64>],
    normal: &Vector3<f64>,
    spacing: f64,
) -> Result<(), SegError> {
    let expected = positions
        .windows(2)
        .map(|pair| ((pair[1] - pair[0]).dot(normal).abs() / spacing).round().max(1.0))
        .sum::<f64>()
        + 1.0;
    if expected > MAX_SLICES as f64 {
        return Err(SegError::SliceCountExceeded {
            slices: expected,
            limit: MAX_SLICES,
        });
    }
    Ok(())
}

/// Push the positions missing between `previous` and `next`. Inserted
/// positions lie on the line through `first` along `normal`, at multiples
/// of `spacing`.
fn fill_gap(
    first: &Point3<f64>,
    previous: &Point3<f64>,
    next: &Point3<f64>,
    normal: &Vector3<f64>,
    spacing: f64,
    filled: &mut Vec<Point3<f64>>,
    warnings: &mut Vec<DecodeWarning>,
) -> Result<(), SegError> {
    let mut step = ((previous - first).dot(normal) / spacing).round();
    let mut distance = (next - previous).norm();
    loop {
        let residual = distance - spacing;
        // a tier as wide as half a slice would swallow whole slices
        let accepted =
            ToleranceTier::classify(residual).filter(|tier| tier.epsilon() < spacing / 2.0);
        if let Some(tier) = accepted {
            if tier != ToleranceTier::Base {
                let warning = DecodeWarning::WidenedTolerance {
                    tier,
                    residual,
                    next: *next,
                };
                warn!("{warning}");
                warnings.push(warning);
            }
            return Ok(());
        }
        if residual < 0.0 {
            let warning = DecodeWarning::IrregularGap {
                residual,
                next: *next,
            };
            warn!("{warning}");
            warnings.push(warning);
            return Ok(());
        }

        step += 1.0;
        let inserted = first + normal * (spacing * step);
        let inserted_distance = (next - inserted).norm();
        if !(inserted_distance < distance) {
            return Err(SegError::IntermediatePositionDivergence {
                previous: distance,
                current: inserted_distance,
            });
        }
        filled.push(inserted);
        distance = inserted_distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const AXIAL: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    fn frame(z: f64) -> FrameInfo {
        FrameInfo {
            ref_segment_number: 1,
            image_position: Point3::new(0.0, 0.0, z),
            image_orientation: None,
            spacing: None,
            dimension_index_values: Vec::new(),
            source_instance_uids: Vec::new(),
        }
    }

    fn shared(spacing: f64) -> SharedGroup {
        SharedGroup {
            image_orientation: Some(AXIAL),
            spacing: Some([1.0, 1.0, spacing]),
            ref_segment_number: None,
        }
    }

    fn scan(zs: &[f64], spacing: f64) -> FrameScan {
        let frames: Vec<_> = zs.iter().map(|&z| frame(z)).collect();
        scan_frames(&frames, &shared(spacing)).unwrap()
    }

    fn zs(geometry: &ReconciledGeometry) -> Vec<f64> {
        geometry.positions.iter().map(|p| p.z).collect()
    }

    #[test]
    fn duplicate_positions_are_merged() {
        let scan = scan(&[0.0, 1.0, 0.0, 1.0], 1.0);
        assert_eq!(scan.positions.len(), 2);
    }

    #[test]
    fn positions_are_sorted_along_normal() {
        let geometry = reconcile(scan(&[3.0, 1.0, 2.0, 0.0], 1.0)).unwrap();
        assert_eq!(zs(&geometry), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(geometry.inserted, 0);
        assert!(geometry.warnings.is_empty());
    }

    #[test]
    fn flipped_normal_reverses_order() {
        let frames = vec![frame(0.0), frame(1.0), frame(2.0)];
        let shared = SharedGroup {
            // row x, column -y: normal points to -z
            image_orientation: Some([1.0, 0.0, 0.0, 0.0, -1.0, 0.0]),
            ..shared(1.0)
        };
        let geometry = reconcile(scan_frames(&frames, &shared).unwrap()).unwrap();
        assert_eq!(zs(&geometry), vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn uniform_input_needs_no_filling() {
        let geometry = reconcile(scan(&[0.0, 2.5, 5.0, 7.5], 2.5)).unwrap();
        assert_eq!(geometry.inserted, 0);
        assert_eq!(geometry.positions.len(), 4);
    }

    #[test]
    fn single_gap_uses_declared_spacing() {
        let geometry = reconcile(scan(&[0.0, 4.0], 2.0)).unwrap();
        assert_eq!(zs(&geometry), vec![0.0, 2.0, 4.0]);
        assert_eq!(geometry.inserted, 1);
        assert_eq!(geometry.spacing[2], 2.0);
    }

    #[test]
    fn observed_spacing_overrides_declared() {
        let geometry = reconcile(scan(&[0.0, 1.5, 3.0, 6.0], 1.0)).unwrap();
        assert_abs_diff_eq!(geometry.spacing[2], 1.5);
        assert_eq!(zs(&geometry), vec![0.0, 1.5, 3.0, 4.5, 6.0]);
        assert_eq!(geometry.inserted, 1);
    }

    #[test]
    fn inserted_positions_lie_on_first_line() {
        let at = |z: f64| FrameInfo {
            image_position: Point3::new(1.5, -2.0, z),
            ..frame(0.0)
        };
        let frames = vec![at(0.25), at(0.75), at(2.25)];
        let geometry = reconcile(scan_frames(&frames, &shared(0.5)).unwrap()).unwrap();
        assert_eq!(geometry.positions.len(), 5);
        assert_eq!(geometry.inserted, 2);
        for position in &geometry.positions {
            assert_eq!(position.x, 1.5);
            assert_eq!(position.y, -2.0);
            let steps = (position.z - 0.25) / 0.5;
            assert_abs_diff_eq!(steps, steps.round(), epsilon = 1e-12);
        }
    }

    #[test]
    fn short_single_gap_overrides_declared() {
        let geometry = reconcile(scan(&[0.0, 2.5], 5.0)).unwrap();
        assert_abs_diff_eq!(geometry.spacing[2], 2.5);
        assert_eq!(zs(&geometry), vec![0.0, 2.5]);
        assert_eq!(geometry.inserted, 0);
        assert!(geometry.warnings.is_empty());
    }

    #[test]
    fn huge_gap_is_rejected() {
        let result = reconcile(scan(&[0.0, 5000.0], 0.001));
        assert!(matches!(
            result,
            Err(SegError::SliceCountExceeded { limit: MAX_SLICES, .. })
        ));
    }

    #[test]
    fn fine_spacing_fills_every_slice() {
        let geometry = reconcile(scan(&[0.0, 0.01], 0.001)).unwrap();
        assert_eq!(geometry.positions.len(), 11);
        assert_eq!(geometry.inserted, 9);
        for (index, position) in geometry.positions.iter().enumerate() {
            assert_abs_diff_eq!(position.z, index as f64 * 0.001, epsilon = 1e-12);
        }
    }

    #[test]
    fn widened_tolerance_is_reported() {
        let geometry = reconcile(scan(&[0.0, 2.0005], 2.0)).unwrap();
        assert_eq!(geometry.inserted, 0);
        assert!(matches!(
            geometry.warnings.as_slice(),
            [DecodeWarning::WidenedTolerance { tier: ToleranceTier::Wide, .. }]
        ));

        let geometry = reconcile(scan(&[0.0, 2.005], 2.0)).unwrap();
        assert!(matches!(
            geometry.warnings.as_slice(),
            [DecodeWarning::WidenedTolerance { tier: ToleranceTier::Widest, .. }]
        ));
    }

    #[test]
    fn short_remainder_is_irregular() {
        let geometry = reconcile(scan(&[0.0, 5.0], 2.0)).unwrap();
        assert_eq!(zs(&geometry), vec![0.0, 2.0, 4.0, 5.0]);
        assert!(matches!(
            geometry.warnings.as_slice(),
            [DecodeWarning::IrregularGap { .. }]
        ));
    }

    #[test]
    fn diverging_gap_is_fatal() {
        // next position lies behind the normal direction after sorting
        let frames = vec![
            frame(0.0),
            FrameInfo {
                image_position: Point3::new(50.0, 0.0, 1.0),
                ..frame(0.0)
            },
        ];
        let result = reconcile(scan_frames(&frames, &shared(10.0)).unwrap());
        assert!(matches!(
            result,
            Err(SegError::IntermediatePositionDivergence { .. })
        ));
    }

    #[test]
    fn differing_orientation_is_rejected() {
        let frames = vec![
            FrameInfo {
                image_orientation: Some(AXIAL),
                ..frame(0.0)
            },
            FrameInfo {
                image_orientation: Some([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]),
                ..frame(1.0)
            },
        ];
        let shared = SharedGroup {
            image_orientation: None,
            ..shared(1.0)
        };
        assert!(matches!(
            scan_frames(&frames, &shared),
            Err(SegError::MultiOrientationUnsupported)
        ));
    }

    #[test]
    fn differing_spacing_is_rejected() {
        let frames = vec![
            FrameInfo {
                spacing: Some([1.0, 1.0, 1.0]),
                ..frame(0.0)
            },
            FrameInfo {
                spacing: Some([0.5, 0.5, 1.0]),
                ..frame(1.0)
            },
        ];
        let shared = SharedGroup {
            spacing: None,
            ..shared(1.0)
        };
        assert!(matches!(
            scan_frames(&frames, &shared),
            Err(SegError::MultiSpacingUnsupported)
        ));
    }

    #[test]
    fn missing_geometry_is_reported() {
        let frames = vec![frame(0.0)];
        assert!(matches!(
            scan_frames(&frames, &SharedGroup::default()),
            Err(SegError::MissingSpacing)
        ));
        let only_spacing = SharedGroup {
            spacing: Some([1.0, 1.0, 1.0]),
            ..SharedGroup::default()
        };
        assert!(matches!(
            scan_frames(&frames, &only_spacing),
            Err(SegError::MissingOrientation)
        ));
    }

    #[test]
    fn parallel_cosines_are_degenerate() {
        let scan = FrameScan {
            positions: vec![Point3::origin()],
            orientation: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            spacing: [1.0, 1.0, 1.0],
        };
        assert!(matches!(reconcile(scan), Err(SegError::DegenerateOrientation)));
    }
}

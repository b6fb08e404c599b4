//! Simply-Supported Beam Analysis
//!
//! Static-equilibrium analysis for a single-span beam with a pinned support
//! at the left end (A) and a roller at the right end (B), carrying discrete
//! point loads.
//!
//! ## Sign Convention
//! - Loads: downward positive (kN)
//! - Reactions: upward positive (kN)
//! - Positive moment: sagging (kNm)
//!
//! ## Crossing Convention
//! Shear and moment at a position `x` account only for loads strictly left
//! of `x` (`position < x`). A sample exactly at a load position therefore
//! still carries the pre-drop shear; the jump is captured by the extra grid
//! points at `position ± 1e-6`. Consumers depend on these sample values, so
//! the strict inequality must not be "fixed" to `<=`.
//!
//! ## Example
//! ```rust
//! use beam_core::analysis::{analyze, PointLoad};
//!
//! // 10 kN at 3 m: span stays at the 10 m default
//! let solution = analyze(&[PointLoad::new(3.0, 10.0)]);
//! assert!((solution.r_a_kn - 7.0).abs() < 1e-9);
//! assert!((solution.r_b_kn - 3.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{BeamError, BeamResult};
use crate::schema::{self, AnalysisMode};
use crate::table::DataTable;

/// Minimum beam span (m); also the span of an unloaded beam
pub const DEFAULT_SPAN_M: f64 = 10.0;

/// Evenly spaced base grid size for diagram sampling
const BASE_SAMPLES: usize = 500;

/// Offset applied on both sides of each load position so the shear step
/// renders as a vertical jump instead of a ramp
const DISCONTINUITY_EPS: f64 = 1e-6;

/// A concentrated downward force at a single position along the beam
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLoad {
    /// Distance from support A (m)
    pub position_m: f64,
    /// Magnitude (kN), downward positive
    pub magnitude_kn: f64,
}

impl PointLoad {
    /// Create a point load
    pub fn new(position_m: f64, magnitude_kn: f64) -> Self {
        PointLoad {
            position_m,
            magnitude_kn,
        }
    }
}

/// Derived span and support reactions for one load collection
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Reactions {
    /// Beam span (m): at least [`DEFAULT_SPAN_M`], and at least 1 m beyond
    /// the furthest load
    pub span_m: f64,
    /// Reaction at the pinned support A (kN)
    pub r_a_kn: f64,
    /// Reaction at the roller support B (kN)
    pub r_b_kn: f64,
}

impl Reactions {
    /// Solve global equilibrium for a set of point loads.
    ///
    /// `R_B = Σ(P·a) / L` (moments about A), `R_A = ΣP − R_B`. An empty
    /// collection yields the default span with zero reactions.
    pub fn solve(loads: &[PointLoad]) -> Self {
        let max_position = loads
            .iter()
            .map(|l| l.position_m)
            .fold(f64::NAN, f64::max);

        let span_m = if loads.is_empty() {
            DEFAULT_SPAN_M
        } else {
            // f64::max ignores a NaN operand, so unparseable positions do
            // not poison the span
            DEFAULT_SPAN_M.max(max_position + 1.0)
        };

        let mut sum_forces = 0.0;
        let mut sum_moments = 0.0;
        for load in loads {
            sum_forces += load.magnitude_kn;
            sum_moments += load.magnitude_kn * load.position_m;
        }

        let r_b_kn = sum_moments / span_m;
        let r_a_kn = sum_forces - r_b_kn;

        Reactions {
            span_m,
            r_a_kn,
            r_b_kn,
        }
    }
}

/// One sampled point of the shear and moment diagrams
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramPoint {
    /// Position along the beam (m)
    pub x_m: f64,
    /// Shear force (kN)
    pub shear_kn: f64,
    /// Bending moment (kNm)
    pub moment_knm: f64,
}

/// Assembled analysis result: sampled diagrams plus reactions.
///
/// In plot-only mode the reactions carry the `0.0` sentinel meaning "not
/// computed" and the points come verbatim from the input table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamSolution {
    /// Diagram samples, ascending in x
    pub points: Vec<DiagramPoint>,
    /// Reaction at support A (kN); `0.0` in plot-only mode
    pub r_a_kn: f64,
    /// Reaction at support B (kN); `0.0` in plot-only mode
    pub r_b_kn: f64,
}

impl BeamSolution {
    /// Largest finite |shear| over the samples (0 when none)
    pub fn max_abs_shear_kn(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.shear_kn.abs())
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }

    /// Largest finite moment over the samples (0 when none)
    pub fn max_moment_knm(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.moment_knm)
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }
}

/// Shear and moment at a single position.
///
/// Each sample is evaluated independently by accumulating over the full
/// load collection (no running state between samples); the grid is not
/// contiguous, so an incremental sweep would drift.
pub fn shear_moment_at(x_m: f64, loads: &[PointLoad], r_a_kn: f64) -> (f64, f64) {
    let mut shear = r_a_kn;
    let mut moment = r_a_kn * x_m;
    for load in loads {
        if load.position_m < x_m {
            shear -= load.magnitude_kn;
            moment -= load.magnitude_kn * (x_m - load.position_m);
        }
    }
    (shear, moment)
}

/// Build the sampling grid for the diagrams.
///
/// 500 evenly spaced points over `[0, span]` inclusive, augmented with each
/// load position and `position ± 1e-6`, deduplicated by exact equality,
/// clipped to `[0, span]`, sorted ascending.
pub fn sample_positions(span_m: f64, load_positions: &[f64]) -> Vec<f64> {
    let mut grid: Vec<f64> = (0..BASE_SAMPLES)
        .map(|i| span_m * i as f64 / (BASE_SAMPLES - 1) as f64)
        .collect();

    for &position in load_positions {
        grid.push(position);
        grid.push(position - DISCONTINUITY_EPS);
        grid.push(position + DISCONTINUITY_EPS);
    }

    // Clipping also discards NaN positions (comparisons are false)
    grid.retain(|&x| (0.0..=span_m).contains(&x));
    grid.sort_by(f64::total_cmp);
    grid.dedup();
    grid
}

/// Full analysis of a point-load collection: sort, solve reactions, sample.
pub fn analyze(loads: &[PointLoad]) -> BeamSolution {
    let mut sorted = loads.to_vec();
    sorted.sort_by(|a, b| a.position_m.total_cmp(&b.position_m));

    let reactions = Reactions::solve(&sorted);
    let positions: Vec<f64> = sorted.iter().map(|l| l.position_m).collect();
    let grid = sample_positions(reactions.span_m, &positions);

    let points = grid
        .iter()
        .map(|&x_m| {
            let (shear_kn, moment_knm) = shear_moment_at(x_m, &sorted, reactions.r_a_kn);
            DiagramPoint {
                x_m,
                shear_kn,
                moment_knm,
            }
        })
        .collect();

    BeamSolution {
        points,
        r_a_kn: reactions.r_a_kn,
        r_b_kn: reactions.r_b_kn,
    }
}

/// Pass externally supplied diagram arrays through unchanged, sorted
/// ascending by x. No resampling, no recomputation, zero-reaction sentinel.
pub fn passthrough(x_m: &[f64], shear_kn: &[f64], moment_knm: &[f64]) -> BeamSolution {
    let mut points: Vec<DiagramPoint> = x_m
        .iter()
        .zip(shear_kn.iter())
        .zip(moment_knm.iter())
        .map(|((&x_m, &shear_kn), &moment_knm)| DiagramPoint {
            x_m,
            shear_kn,
            moment_knm,
        })
        .collect();
    points.sort_by(|a, b| a.x_m.total_cmp(&b.x_m));

    BeamSolution {
        points,
        r_a_kn: 0.0,
        r_b_kn: 0.0,
    }
}

/// Result Assembler: produce a [`BeamSolution`] from a mapped table.
///
/// In [`AnalysisMode::Calculate`] the canonical loads columns are extracted
/// and analyzed; in [`AnalysisMode::PlotOnly`] the canonical result columns
/// pass through. The table must already have been validated, so a missing
/// canonical column here is a computation failure, not a schema error.
pub fn solve_table(table: &DataTable, mode: AnalysisMode) -> BeamResult<BeamSolution> {
    match mode {
        AnalysisMode::Calculate => {
            let positions = required_column(table, schema::COL_POSITION)?;
            let magnitudes = required_column(table, schema::COL_LOAD)?;
            let loads: Vec<PointLoad> = positions
                .into_iter()
                .zip(magnitudes)
                .map(|(position_m, magnitude_kn)| PointLoad::new(position_m, magnitude_kn))
                .collect();
            Ok(analyze(&loads))
        }
        AnalysisMode::PlotOnly => {
            let x = required_column(table, schema::COL_X)?;
            let shear = required_column(table, schema::COL_SHEAR)?;
            let moment = required_column(table, schema::COL_MOMENT)?;
            Ok(passthrough(&x, &shear, &moment))
        }
    }
}

fn required_column(table: &DataTable, name: &str) -> BeamResult<Vec<f64>> {
    table.numeric_column(name).ok_or_else(|| {
        BeamError::computation_failed(
            "column extraction",
            format!("mapped table has no '{}' column", name),
        )
    })
}

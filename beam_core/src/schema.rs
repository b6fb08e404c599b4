//! # Column Schema Mapping
//!
//! Users name their columns freely ("Location (m)", "P (kN)", "Shear Force
//! (kN)", ...). This module reclassifies a loaded table's headers into one
//! of two canonical schemas, decides the analysis mode from the result, and
//! rejects tables that resolve to neither schema.
//!
//! Mapping is an explicit, ordered rule list: for each canonical target the
//! first unclaimed header whose lower-cased, trimmed name satisfies the
//! rule's predicate is renamed. At most one header maps to each target;
//! later matches are ignored. Unmapped tables pass through unchanged and
//! are caught by [`validate`].

use serde::{Deserialize, Serialize};

use crate::errors::{BeamError, BeamResult};
use crate::table::DataTable;

/// Canonical position column for a loads table
pub const COL_POSITION: &str = "Position (m)";
/// Canonical magnitude column for a loads table
pub const COL_LOAD: &str = "Load (kN)";
/// Canonical position column for a results table
pub const COL_X: &str = "x";
/// Canonical shear column for a results table
pub const COL_SHEAR: &str = "shear";
/// Canonical moment column for a results table
pub const COL_MOMENT: &str = "moment";

/// How the engine treats a mapped table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    /// Point loads in, statics computation required
    Calculate,
    /// Precomputed shear/moment results, pass through to the diagrams
    PlotOnly,
}

impl AnalysisMode {
    /// Schema-driven mode selection on mapped canonical columns.
    ///
    /// `PlotOnly` iff both a `shear`-named and a `moment`-named column
    /// exist (case-insensitive substring). A loads-like column alongside
    /// them does not change the outcome.
    pub fn detect(headers: &[String]) -> Self {
        let has_shear = headers.iter().any(|h| h.to_lowercase().contains("shear"));
        let has_moment = headers.iter().any(|h| h.to_lowercase().contains("moment"));
        if has_shear && has_moment {
            AnalysisMode::PlotOnly
        } else {
            AnalysisMode::Calculate
        }
    }
}

/// Predicate over a lower-cased, trimmed header name
type HeaderPredicate = fn(&str) -> bool;

/// One mapping rule: the first unclaimed header satisfying `applies` is
/// renamed to `canonical`.
struct MappingRule {
    canonical: &'static str,
    applies: HeaderPredicate,
}

/// Rules for a results table, in priority order. The x target gets two
/// rules: exact names first, then the dimensioned "x (m)" form as a
/// fallback so it cannot shadow a plain `x` column.
const RESULT_RULES: &[MappingRule] = &[
    MappingRule {
        canonical: COL_X,
        applies: |h| matches!(h, "x" | "pos" | "distance"),
    },
    MappingRule {
        canonical: COL_X,
        applies: |h| h.contains("x (m)"),
    },
    MappingRule {
        canonical: COL_SHEAR,
        applies: |h| h.contains("shear"),
    },
    MappingRule {
        canonical: COL_MOMENT,
        applies: |h| h.contains("moment"),
    },
];

/// Rules for a loads table, in priority order. The `shear` exclusion keeps
/// a stray results column from being claimed as a position or load.
const LOAD_RULES: &[MappingRule] = &[
    MappingRule {
        canonical: COL_POSITION,
        applies: |h| {
            ["pos", "loc", "dist", "x (m)"].iter().any(|k| h.contains(k)) && !h.contains("shear")
        },
    },
    MappingRule {
        canonical: COL_LOAD,
        applies: |h| {
            ["load", "force", "weight", "p (kn)"].iter().any(|k| h.contains(k))
                && !h.contains("shear")
        },
    },
];

/// Does any header mark this as a table of precomputed results?
fn is_results_table(lower: &[String]) -> bool {
    lower
        .iter()
        .any(|h| h.contains("shear force") || h.contains("shear") || h == "v")
}

/// Trim all header names, then reclassify them into canonical columns.
///
/// Returns the applied `(original, canonical)` renames and logs them for
/// observability. Never fails: a table matching no rule is returned
/// unchanged and rejected later by [`validate`].
pub fn map_columns(table: &mut DataTable) -> Vec<(String, String)> {
    table.trim_headers();

    let lower: Vec<String> = table
        .headers()
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let rules = if is_results_table(&lower) {
        RESULT_RULES
    } else {
        LOAD_RULES
    };

    let mut claimed = vec![false; lower.len()];
    let mut applied: Vec<(usize, &'static str)> = Vec::new();

    for rule in rules {
        if applied.iter().any(|(_, c)| *c == rule.canonical) {
            continue;
        }
        let hit = lower
            .iter()
            .enumerate()
            .find(|(i, h)| !claimed[*i] && (rule.applies)(h.as_str()));
        if let Some((index, _)) = hit {
            claimed[index] = true;
            applied.push((index, rule.canonical));
        }
    }

    let mut renames = Vec::new();
    for (index, canonical) in applied {
        let original = table.headers()[index].clone();
        if original != canonical {
            table.rename_header(index, canonical);
        }
        renames.push((original, canonical.to_string()));
    }

    if !renames.is_empty() {
        log::info!("column mapping applied: {:?}", renames);
    }

    renames
}

/// Check that the mapped table resolves to one of the canonical schemas and
/// return the analysis mode.
///
/// Requires either `{Position (m), Load (kN)}` or `{shear, moment}` to be
/// present exactly; otherwise rejects with an error naming the required
/// schemas and the headers actually found.
pub fn validate(table: &DataTable) -> BeamResult<AnalysisMode> {
    let has_load_cols =
        table.column_index(COL_POSITION).is_some() && table.column_index(COL_LOAD).is_some();
    let has_result_cols =
        table.column_index(COL_SHEAR).is_some() && table.column_index(COL_MOMENT).is_some();

    if !(has_load_cols || has_result_cols) {
        return Err(BeamError::schema_unrecognized(table.headers()));
    }

    Ok(AnalysisMode::detect(table.headers()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn table_with_headers(headers: &[&str]) -> DataTable {
        let row = headers.iter().map(|_| Cell::Number(1.0)).collect();
        DataTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            vec![row],
        )
    }

    #[test]
    fn test_result_headers_map_to_canonical() {
        let mut table = table_with_headers(&["X (m)", "Shear Force (kN)", "Moment (kNm)"]);
        map_columns(&mut table);

        assert_eq!(table.headers(), &["x", "shear", "moment"]);
        assert_eq!(validate(&table).unwrap(), AnalysisMode::PlotOnly);
    }

    #[test]
    fn test_plain_x_wins_over_dimensioned_fallback() {
        let mut table = table_with_headers(&["Position (m)", "x", "shear", "moment"]);
        map_columns(&mut table);
        // Exact x claims the target; the loads-like column is untouched
        assert_eq!(table.headers(), &["Position (m)", "x", "shear", "moment"]);
        assert_eq!(validate(&table).unwrap(), AnalysisMode::PlotOnly);
    }

    #[test]
    fn test_result_x_maps_by_exact_name() {
        let mut table = table_with_headers(&["x", "Shear (kN)", "Bending Moment"]);
        map_columns(&mut table);
        assert_eq!(table.headers(), &["x", "shear", "moment"]);
    }

    #[test]
    fn test_load_headers_map_to_canonical() {
        let mut table = table_with_headers(&[" Location (m) ", "Weight (kN)"]);
        let renames = map_columns(&mut table);

        assert_eq!(table.headers(), &[COL_POSITION, COL_LOAD]);
        assert_eq!(renames.len(), 2);
        assert_eq!(validate(&table).unwrap(), AnalysisMode::Calculate);
    }

    #[test]
    fn test_x_meters_header_is_a_loads_position() {
        let mut table = table_with_headers(&["X (m)", "P (kN)"]);
        map_columns(&mut table);
        assert_eq!(table.headers(), &[COL_POSITION, COL_LOAD]);
    }

    #[test]
    fn test_first_match_wins_per_target() {
        let mut table = table_with_headers(&["Position", "Distance", "Load", "Force"]);
        map_columns(&mut table);
        assert_eq!(table.headers(), &[COL_POSITION, "Distance", COL_LOAD, "Force"]);
    }

    #[test]
    fn test_position_header_not_claimed_twice() {
        // A single header matching both rule sets maps once, to the
        // higher-priority target
        let mut table = table_with_headers(&["load position", "extra"]);
        map_columns(&mut table);
        assert_eq!(table.headers(), &[COL_POSITION, "extra"]);
    }

    #[test]
    fn test_mode_is_schema_driven() {
        // Result columns win even with a loads-like column present
        let headers: Vec<String> = ["Position (m)", "x", "shear", "moment"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert_eq!(AnalysisMode::detect(&headers), AnalysisMode::PlotOnly);
    }

    #[test]
    fn test_mode_calculate_without_result_columns() {
        let headers: Vec<String> = ["Position (m)", "Load (kN)"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert_eq!(AnalysisMode::detect(&headers), AnalysisMode::Calculate);
    }

    #[test]
    fn test_lone_v_header_selects_result_rules() {
        let mut table = table_with_headers(&["x", "V", "Moment"]);
        map_columns(&mut table);
        // "V" marks the table as results, but only x and moment have
        // matching rules ("V" itself contains no "shear")
        assert_eq!(table.headers(), &["x", "V", "moment"]);
    }

    #[test]
    fn test_unmapped_table_rejected_with_found_headers() {
        let mut table = table_with_headers(&["Alpha", "Beta"]);
        let renames = map_columns(&mut table);
        assert!(renames.is_empty());
        assert_eq!(table.headers(), &["Alpha", "Beta"]);

        let err = validate(&table).unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_UNRECOGNIZED");
        assert!(err.to_string().contains("Alpha, Beta"));
    }

    #[test]
    fn test_headers_are_trimmed_even_when_unmapped() {
        let mut table = table_with_headers(&["  Alpha  ", "Beta"]);
        map_columns(&mut table);
        assert_eq!(table.headers(), &["Alpha", "Beta"]);
    }
}

//! # Report Generation
//!
//! Renders the analysis report as a PDF using Typst.
//!
//! ## Architecture
//!
//! - The Typst template is embedded as a string constant
//! - Data is injected via string substitution before compilation
//! - Output is raw PDF bytes (`Vec<u8>`), written atomically by
//!   [`save_report`]
//!
//! The report contains a beam-configuration figure (a user-supplied image,
//! or a default schematic drawn with native Typst shapes), the input data
//! table (first 30 rows, numbers to two decimals), a results summary, and
//! area-filled shear and moment diagrams. Diagram samples are filtered to
//! finite values here, at the rendering boundary; the engine never drops
//! samples itself.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use once_cell::sync::Lazy;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::analysis::BeamSolution;
use crate::errors::{BeamError, BeamResult};
use crate::table::{Cell, DataTable};

/// Maximum input rows shown in the report's data table
const MAX_TABLE_ROWS: usize = 30;

/// Diagram plot area (pt)
const PLOT_WIDTH_PT: f64 = 420.0;
const PLOT_HEIGHT_PT: f64 = 150.0;

/// Fonts available to the embedded compiler, loaded once per process
static FONTS: Lazy<Vec<Font>> = Lazy::new(|| {
    let mut fonts = Vec::new();
    for font_bytes in typst_assets::fonts() {
        let buffer = Bytes::new(font_bytes.to_vec());
        for font in Font::iter(buffer) {
            fonts.push(font);
        }
    }
    fonts
});

/// Verify the renderer is usable.
///
/// Called before any file processing so a broken rendering setup is
/// reported without producing partial artifacts.
pub fn preflight() -> BeamResult<()> {
    if FONTS.is_empty() {
        return Err(BeamError::RenderingUnavailable {
            reason: "no fonts available to the embedded Typst compiler".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Typst World Implementation
// ============================================================================

/// A minimal Typst world: one main source plus in-memory assets (the
/// optional beam image) served through the virtual file system.
struct PdfWorld {
    main: Source,
    book: LazyHash<FontBook>,
    library: LazyHash<Library>,
    assets: HashMap<FileId, Bytes>,
}

impl PdfWorld {
    fn new(source: String) -> Self {
        let book = FontBook::from_fonts(FONTS.iter());
        let main_id = FileId::new(None, VirtualPath::new("/main.typ"));

        PdfWorld {
            main: Source::new(main_id, source),
            book: LazyHash::new(book),
            library: LazyHash::new(Library::default()),
            assets: HashMap::new(),
        }
    }

    /// Serve `bytes` at the given virtual path (e.g. "/beam.png")
    fn with_asset(mut self, vpath: &str, bytes: Vec<u8>) -> Self {
        let id = FileId::new(None, VirtualPath::new(vpath));
        self.assets.insert(id, Bytes::new(bytes));
        self
    }
}

impl World for PdfWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        self.assets
            .get(&id)
            .cloned()
            .ok_or_else(|| FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        FONTS.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(
            now.format("%Y").to_string().parse().ok()?,
            now.format("%m").to_string().parse().ok()?,
            now.format("%d").to_string().parse().ok()?,
        )
    }
}

// ============================================================================
// Report Template
// ============================================================================

const REPORT_TEMPLATE: &str = r##"
#set page(
  paper: "a4",
  margin: (top: 1in, bottom: 1in, left: 1in, right: 1in),
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #v(4pt)
    #grid(
      columns: (1fr, 1fr),
      align(left)[#text(size: 9pt)[Automated Beam Analyzer]],
      align(right)[#text(size: 9pt)[Page #counter(page).display()]],
    )
  ]
)

#set text(size: 11pt)

#align(center)[
  #block(width: 100%, fill: rgb("#f0f0f0"), inset: 12pt, radius: 4pt)[
    #text(size: 18pt, weight: "bold")[Structural Analysis Report]
    #v(4pt)
    #text(size: 11pt)[Automated Beam Analyzer: {{DATE}}]
  ]
]

#v(12pt)

== Introduction

This report presents the structural analysis of a simply supported beam.

=== Beam Description

{{BEAM_FIGURE}}

#v(12pt)
#line(length: 100%, stroke: 0.5pt)
#v(8pt)

== Data Table

#table(
  columns: {{TABLE_COLUMN_COUNT}},
  inset: 6pt,
  stroke: 0.5pt,
  table.header({{TABLE_HEADER}}),
{{TABLE_ROWS}}
)
{{TABLE_NOTE}}

#v(12pt)
#line(length: 100%, stroke: 0.5pt)
#v(8pt)

== Analysis

=== Results Summary

#table(
  columns: (1fr, auto, auto),
  inset: 8pt,
  stroke: 0.5pt,
  align: (left, right, left),
  table.header([*Quantity*], [*Value*], [*Unit*]),
  [Reaction at A (R#sub[A])], [{{R_A}}], [kN],
  [Reaction at B (R#sub[B])], [{{R_B}}], [kN],
  [Maximum |V|], [{{MAX_SHEAR}}], [kN],
  [Maximum M], [{{MAX_MOMENT}}], [kNm],
)

=== Shear Force Diagram

{{SHEAR_DIAGRAM}}

=== Bending Moment Diagram

{{MOMENT_DIAGRAM}}

#v(24pt)
#text(size: 9pt, fill: gray)[
  Generated by Beamsmith \
  Calculations should be verified by a licensed professional engineer.
]
"##;

/// Default beam schematic: gray rectangle beam, pinned triangle at the left
/// support, roller circle at the right.
const DEFAULT_BEAM_FIGURE: &str = r##"#figure(
  box(width: 360pt, height: 84pt)[
    #place(top + center, dy: 8pt, text(size: 9pt)[Simply Supported Beam (Default)])
    #place(top + left, dx: 30pt, dy: 36pt, rect(width: 300pt, height: 12pt, fill: luma(211), stroke: 0.5pt + black))
    #place(top + left, dx: 22pt, dy: 48pt, polygon(fill: black, (8pt, 0pt), (0pt, 14pt), (16pt, 14pt)))
    #place(top + left, dx: 321pt, dy: 52pt, circle(radius: 5pt, fill: black))
  ],
  caption: [Beam Configuration],
)"##;

// ============================================================================
// Rendering
// ============================================================================

/// Render the analysis report to PDF bytes.
///
/// # Arguments
///
/// * `table` - The mapped input table, in original row order
/// * `solution` - The assembled analysis result
/// * `beam_image` - Optional path to a beam-configuration image; when absent
///   the default schematic is drawn instead
pub fn render_report(
    table: &DataTable,
    solution: &BeamSolution,
    beam_image: Option<&Path>,
) -> BeamResult<Vec<u8>> {
    let shear_series: Vec<(f64, f64)> = solution
        .points
        .iter()
        .map(|p| (p.x_m, p.shear_kn))
        .collect();
    let moment_series: Vec<(f64, f64)> = solution
        .points
        .iter()
        .map(|p| (p.x_m, p.moment_knm))
        .collect();

    let (figure_markup, image_asset) = match beam_image {
        Some(path) => {
            let bytes = fs::read(path).map_err(|e| {
                BeamError::file_error("read beam image", path.display().to_string(), e.to_string())
            })?;
            let vpath = image_vpath(path);
            let markup = format!(
                "#figure(\n  image(\"{}\", width: 80%),\n  caption: [Beam Configuration],\n)",
                vpath
            );
            (markup, Some((vpath, bytes)))
        }
        None => (DEFAULT_BEAM_FIGURE.to_string(), None),
    };

    let table_note = if table.row_count() > MAX_TABLE_ROWS {
        format!(
            "#text(size: 9pt, fill: gray)[Showing the first {} of {} rows.]",
            MAX_TABLE_ROWS,
            table.row_count()
        )
    } else {
        String::new()
    };

    let source = REPORT_TEMPLATE
        .replace("{{DATE}}", &Utc::now().format("%Y-%m-%d").to_string())
        .replace("{{BEAM_FIGURE}}", &figure_markup)
        .replace(
            "{{TABLE_COLUMN_COUNT}}",
            &table.headers().len().max(1).to_string(),
        )
        .replace("{{TABLE_HEADER}}", &build_table_header(table))
        .replace("{{TABLE_ROWS}}", &build_table_rows(table))
        .replace("{{TABLE_NOTE}}", &table_note)
        .replace("{{R_A}}", &format!("{:.2}", solution.r_a_kn))
        .replace("{{R_B}}", &format!("{:.2}", solution.r_b_kn))
        .replace("{{MAX_SHEAR}}", &format!("{:.2}", solution.max_abs_shear_kn()))
        .replace("{{MAX_MOMENT}}", &format!("{:.2}", solution.max_moment_knm()))
        .replace(
            "{{SHEAR_DIAGRAM}}",
            &diagram_markup(&shear_series, "blue", "Shear (kN)"),
        )
        .replace(
            "{{MOMENT_DIAGRAM}}",
            &diagram_markup(&moment_series, "red", "Moment (kNm)"),
        );

    let mut world = PdfWorld::new(source);
    if let Some((vpath, bytes)) = image_asset {
        world = world.with_asset(&vpath, bytes);
    }

    let warned = typst::compile(&world);

    let document = warned.output.map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        BeamError::rendering_failed(format!(
            "Typst compilation failed: {}",
            error_msgs.join("; ")
        ))
    })?;

    let pdf_bytes = typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        BeamError::rendering_failed(format!("PDF rendering failed: {}", error_msgs.join("; ")))
    })?;

    Ok(pdf_bytes)
}

/// Write PDF bytes to `path` with atomic-rename semantics.
///
/// The bytes go to `<path>.tmp` first, are synced, then renamed into place.
/// The temp file is removed on every failure path.
pub fn save_report(pdf_bytes: &[u8], path: &Path) -> BeamResult<()> {
    let tmp_path = path.with_extension("pdf.tmp");

    let result = (|| {
        let mut tmp_file = File::create(&tmp_path).map_err(|e| {
            BeamError::file_error(
                "create temp file",
                tmp_path.display().to_string(),
                e.to_string(),
            )
        })?;

        tmp_file.write_all(pdf_bytes).map_err(|e| {
            BeamError::file_error(
                "write temp file",
                tmp_path.display().to_string(),
                e.to_string(),
            )
        })?;

        tmp_file.sync_all().map_err(|e| {
            BeamError::file_error(
                "sync temp file",
                tmp_path.display().to_string(),
                e.to_string(),
            )
        })?;

        fs::rename(&tmp_path, path).map_err(|e| {
            BeamError::file_error("rename to final", path.display().to_string(), e.to_string())
        })
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

// ============================================================================
// Markup Builders
// ============================================================================

/// Virtual path for the embedded beam image, keeping the original extension
/// so the compiler can detect the format
fn image_vpath(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();
    format!("/beam.{}", ext)
}

fn build_table_header(table: &DataTable) -> String {
    table
        .headers()
        .iter()
        .map(|h| format!("[*{}*]", escape_typst(h)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rows for the data table, limited to the first 30 and with numeric cells
/// formatted to two decimals
fn build_table_rows(table: &DataTable) -> String {
    let width = table.headers().len();
    table
        .rows()
        .iter()
        .take(MAX_TABLE_ROWS)
        .map(|row| {
            let cells: Vec<String> = (0..width)
                .map(|i| format!("[{}]", format_cell(row.get(i).unwrap_or(&Cell::Empty))))
                .collect();
            format!("  {},", cells.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Number(value) => format!("{:.2}", value),
        Cell::Text(text) => escape_typst(text),
        Cell::Empty => String::new(),
    }
}

/// Build the markup for one area-filled diagram.
///
/// Samples are filtered to finite values; the survivors are scaled into a
/// fixed plot box and closed back to the zero axis so the fill reads as the
/// area between curve and axis. An empty filtered series still renders the
/// axis rather than failing the report.
fn diagram_markup(series: &[(f64, f64)], color: &str, y_label: &str) -> String {
    let finite: Vec<(f64, f64)> = series
        .iter()
        .copied()
        .filter(|(x, v)| x.is_finite() && v.is_finite())
        .collect();

    let x_min = finite.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let x_max = finite
        .iter()
        .map(|(x, _)| *x)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut y_min = finite.iter().map(|(_, v)| *v).fold(0.0, f64::min);
    let mut y_max = finite.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    if y_max - y_min < f64::EPSILON {
        // Flat series: give the axis some headroom so it sits mid-box
        y_min = -1.0;
        y_max = 1.0;
    }

    let axis_y = y_max / (y_max - y_min) * PLOT_HEIGHT_PT;

    let polygon = if finite.len() >= 2 && x_max > x_min {
        let scale_x = |x: f64| (x - x_min) / (x_max - x_min) * PLOT_WIDTH_PT;
        let scale_y = |v: f64| (y_max - v) / (y_max - y_min) * PLOT_HEIGHT_PT;

        let mut points = Vec::with_capacity(finite.len() + 2);
        points.push(format!("({:.2}pt, {:.2}pt)", scale_x(finite[0].0), axis_y));
        for (x, v) in &finite {
            points.push(format!("({:.2}pt, {:.2}pt)", scale_x(*x), scale_y(*v)));
        }
        let last_x = finite.last().map(|(x, _)| *x).unwrap_or(x_max);
        points.push(format!("({:.2}pt, {:.2}pt)", scale_x(last_x), axis_y));

        format!(
            "#place(top + left, polygon(fill: {color}.lighten(70%), stroke: 1pt + {color}, {}))\n    ",
            points.join(", "),
            color = color,
        )
    } else {
        String::new()
    };

    format!(
        r#"#block(width: 100%, inset: 10pt, stroke: 0.5pt + luma(180))[
  #box(width: {width}pt, height: {height}pt)[
    #place(top + left, dy: {axis_y:.2}pt, line(length: {width}pt, stroke: 0.5pt + luma(120)))
    {polygon}#place(top + right, text(size: 8pt, fill: luma(100))[{y_max:.2}])
    #place(bottom + right, text(size: 8pt, fill: luma(100))[{y_min:.2}])
  ]
  #v(4pt)
  #align(center)[#text(size: 9pt)[{label} vs Position (m)]]
]"#,
        width = PLOT_WIDTH_PT,
        height = PLOT_HEIGHT_PT,
        axis_y = axis_y,
        polygon = polygon,
        y_max = y_max,
        y_min = y_min,
        label = y_label,
    )
}

/// Escape special Typst characters in user-provided text
fn escape_typst(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '*' => "\\*".to_string(),
            '_' => "\\_".to_string(),
            '#' => "\\#".to_string(),
            '$' => "\\$".to_string(),
            '@' => "\\@".to_string(),
            '<' => "\\<".to_string(),
            '>' => "\\>".to_string(),
            '\\' => "\\\\".to_string(),
            '`' => "\\`".to_string(),
            '[' => "\\[".to_string(),
            ']' => "\\]".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, PointLoad};
    use std::env::temp_dir;

    fn loads_table(rows: usize) -> DataTable {
        let data = (0..rows)
            .map(|i| {
                vec![
                    Cell::Number(i as f64 * 0.25),
                    Cell::Number(10.0),
                ]
            })
            .collect();
        DataTable::new(
            vec!["Position (m)".to_string(), "Load (kN)".to_string()],
            data,
        )
    }

    #[test]
    fn test_preflight() {
        assert!(preflight().is_ok());
    }

    #[test]
    fn test_pdf_generation() {
        let table = loads_table(2);
        let solution = analyze(&[PointLoad::new(0.0, 10.0), PointLoad::new(0.25, 10.0)]);

        let pdf = render_report(&table, &solution, None);
        assert!(pdf.is_ok(), "PDF generation failed: {:?}", pdf.err());

        let pdf_bytes = pdf.unwrap();
        assert!(pdf_bytes.starts_with(b"%PDF"), "Output is not a valid PDF");
        assert!(pdf_bytes.len() > 1000, "PDF seems too small");
    }

    #[test]
    fn test_table_rows_limited_to_thirty() {
        let table = loads_table(45);
        let rows = build_table_rows(&table);
        assert_eq!(rows.lines().count(), 30);
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(format_cell(&Cell::Number(3.14159)), "3.14");
        assert_eq!(format_cell(&Cell::Text("2x4 #1".to_string())), "2x4 \\#1");
        assert_eq!(format_cell(&Cell::Empty), "");
    }

    #[test]
    fn test_diagram_filters_non_finite() {
        let series = [
            (0.0, 5.0),
            (1.0, f64::NAN),
            (2.0, -5.0),
            (f64::INFINITY, 1.0),
        ];
        let markup = diagram_markup(&series, "blue", "Shear (kN)");
        assert!(markup.contains("polygon"));
        assert!(!markup.contains("NaN"));
        assert!(!markup.contains("inf"));
    }

    #[test]
    fn test_diagram_with_no_finite_samples_still_renders_axis() {
        let series = [(f64::NAN, f64::NAN), (f64::NAN, f64::NAN)];
        let markup = diagram_markup(&series, "red", "Moment (kNm)");
        assert!(!markup.contains("polygon"));
        assert!(markup.contains("line"));
    }

    #[test]
    fn test_save_report_is_atomic() {
        let path = temp_dir().join("beamsmith_test_report.pdf");
        let tmp_path = path.with_extension("pdf.tmp");

        save_report(b"%PDF-fake", &path).unwrap();

        assert!(path.exists());
        assert!(!tmp_path.exists());

        let _ = fs::remove_file(&path);
    }
}

//! Image datasets described by a CSV manifest.
//!
//! Supported format:
//! - UTF-8, comma-separated, one image per row
//! - Optional header row, recognised by a `path`/`file`/`image` or
//!   `label`/`class`/`target` column name; with a header the columns may
//!   appear in any order, without one the first column is the path and the
//!   second the label
//! - Double-quoted fields with embedded commas are handled
//! - Labels are either all integer class indices, or class names which are
//!   numbered in sorted order
//! - Relative image paths are resolved against the manifest's directory

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::data::dataset::{Dataset, Sample};
use crate::data::image_format::ImageFormat;
use crate::error::{Result, TrainError};

const PATH_COLUMNS: [&str; 4] = ["path", "file", "filename", "image"];
const LABEL_COLUMNS: [&str; 4] = ["label", "class", "target", "category"];

/// Images listed in a CSV manifest, decoded lazily on `get`.
#[derive(Debug, Clone)]
pub struct CsvImageDataset {
    entries: Vec<(PathBuf, usize)>,
    format: ImageFormat,
    num_classes: usize,
    class_names: Option<Vec<String>>,
}

impl CsvImageDataset {
    pub fn from_csv(path: &Path, format: ImageFormat) -> Result<CsvImageDataset> {
        format.validate()?;
        let text = std::fs::read_to_string(path)
            .map_err(|e| TrainError::Data(format!("cannot read manifest '{}': {e}", path.display())))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let dataset = CsvImageDataset::parse(&text, base, format)?;
        info!(
            manifest = %path.display(),
            samples = dataset.len(),
            classes = dataset.num_classes,
            "loaded image manifest"
        );
        Ok(dataset)
    }

    /// Parses manifest text; relative paths are joined onto `base`.
    pub fn parse(text: &str, base: &Path, format: ImageFormat) -> Result<CsvImageDataset> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .peekable();

        let (mut path_col, mut label_col) = (0, 1);
        if let Some((_, first)) = lines.peek() {
            let cells = parse_csv_row(first);
            if let Some((p, l)) = header_columns(&cells) {
                debug!(path_col = p, label_col = l, "manifest has a header row");
                path_col = p;
                label_col = l;
                lines.next();
            }
        }

        let mut rows: Vec<(PathBuf, String)> = Vec::new();
        for (line_no, line) in lines {
            let cells = parse_csv_row(line);
            let (Some(p), Some(l)) = (cells.get(path_col), cells.get(label_col)) else {
                return Err(TrainError::Data(format!(
                    "manifest line {line_no}: expected a path and a label column, got {} column(s)",
                    cells.len()
                )));
            };
            let p = p.trim();
            if p.is_empty() {
                return Err(TrainError::Data(format!("manifest line {line_no}: empty image path")));
            }
            let p = Path::new(p);
            let full = if p.is_absolute() { p.to_path_buf() } else { base.join(p) };
            rows.push((full, l.trim().to_string()));
        }

        if rows.is_empty() {
            return Err(TrainError::Data("manifest contains no data rows".into()));
        }

        let numeric: Option<Vec<usize>> = rows.iter().map(|(_, l)| l.parse::<usize>().ok()).collect();
        let (labels, num_classes, class_names) = match numeric {
            Some(labels) => {
                let num_classes = labels.iter().max().map_or(0, |m| m + 1);
                (labels, num_classes, None)
            }
            None => {
                let names: Vec<String> = rows
                    .iter()
                    .map(|(_, l)| l.clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                let labels = rows
                    .iter()
                    .map(|(_, l)| names.iter().position(|n| n == l).unwrap_or(0))
                    .collect();
                (labels, names.len(), Some(names))
            }
        };

        let entries = rows.into_iter().map(|(p, _)| p).zip(labels).collect();
        Ok(CsvImageDataset { entries, format, num_classes, class_names })
    }

    /// Class names in index order, when the manifest used names.
    pub fn class_names(&self) -> Option<&[String]> {
        self.class_names.as_deref()
    }
}

impl Dataset for CsvImageDataset {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let (path, label) = self
            .entries
            .get(index)
            .ok_or_else(|| TrainError::Data(format!("index {index} out of range for {} samples", self.len())))?;
        let input = self.format.load(path)?;
        Ok(Sample { input, label: *label })
    }

    fn sample_shape(&self) -> Vec<usize> {
        self.format.shape()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

/// Column positions of the path and label columns when `cells` is a header.
fn header_columns(cells: &[String]) -> Option<(usize, usize)> {
    let find = |names: &[&str]| {
        cells
            .iter()
            .position(|c| names.contains(&c.trim().to_ascii_lowercase().as_str()))
    };
    match (find(&PATH_COLUMNS[..]), find(&LABEL_COLUMNS[..])) {
        (Some(p), Some(l)) => Some((p, l)),
        (Some(p), None) => Some((p, if p == 0 { 1 } else { 0 })),
        (None, Some(l)) => Some((if l == 0 { 1 } else { 0 }, l)),
        (None, None) => None,
    }
}

/// Parses a single CSV row, handling double-quoted fields.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                // Escaped quote inside quoted field.
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

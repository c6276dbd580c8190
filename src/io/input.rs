use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use nalgebra::Point3;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::PlannerError;

/// Utility: detect whether the file uses comma or tab as delimiter.
fn detect_delimiter<P: AsRef<Path>>(path: P) -> Result<u8> {
    let file = File::open(&path).with_context(|| {
        format!(
            "failed to open file for delimiter sniffing: {:?}",
            path.as_ref()
        )
    })?;
    let mut reader = BufReader::new(file);
    let mut first_line = String::new();
    reader
        .read_line(&mut first_line)
        .with_context(|| "failed to read first line for delimiter detection")?;

    let tabs = first_line.matches('\t').count();
    let commas = first_line.matches(',').count();

    if tabs > commas {
        Ok(b'\t')
    } else {
        Ok(b',')
    }
}

/// Anything that can resolve a landmark label to a world position.
pub trait PointStore {
    /// Returns the first landmark carrying `label`. With `only_visible`, hidden
    /// markup sets are skipped.
    fn find_point_by_label(
        &self,
        label: &str,
        only_visible: bool,
    ) -> std::result::Result<Point3<f64>, PlannerError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Landmark {
    pub label: String,
    pub position: Point3<f64>,
}

#[derive(Debug, Deserialize)]
struct LandmarkRecord {
    label: String,
    x: f64,
    y: f64,
    z: f64,
}

/// A named markup set, the unit of visibility in the host.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    pub name: String,
    pub visible: bool,
    pub landmarks: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            landmarks: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn push(&mut self, label: impl Into<String>, position: Point3<f64>) {
        self.landmarks.push(Landmark {
            label: label.into(),
            position,
        });
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Reads `label,x,y,z` rows (comma or tab separated, header optional).
    /// Rows that fail to parse are skipped with a warning; a file without a
    /// single valid row is an error.
    pub fn from_csv<P: AsRef<Path>>(path: P, name: impl Into<String>) -> Result<Self> {
        let delim = detect_delimiter(&path)?;
        let file = File::open(&path)
            .with_context(|| format!("failed to open landmark file {:?}", path.as_ref()))?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delim)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(file);

        let mut set = Self::new(name);
        for (row, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("skipping unreadable landmark row {}: {}", row + 1, e);
                    continue;
                }
            };
            match record.deserialize::<LandmarkRecord>(None) {
                Ok(r) => set.push(r.label, Point3::new(r.x, r.y, r.z)),
                // a header line is expected to fail here
                Err(e) if row == 0 => log::debug!("treating first landmark row as header: {}", e),
                Err(e) => log::warn!("skipping invalid landmark row {}: {}", row + 1, e),
            }
        }

        if set.is_empty() {
            bail!("no landmarks found in {:?}", path.as_ref());
        }
        log::info!("loaded {} landmarks into '{}'", set.len(), set.name);
        Ok(set)
    }

    fn find(&self, label: &str) -> Option<Point3<f64>> {
        self.landmarks
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.position)
    }
}

impl PointStore for LandmarkSet {
    fn find_point_by_label(
        &self,
        label: &str,
        only_visible: bool,
    ) -> std::result::Result<Point3<f64>, PlannerError> {
        if only_visible && !self.visible {
            return Err(PlannerError::not_found(label));
        }
        self.find(label).ok_or_else(|| PlannerError::not_found(label))
    }
}

/// Every markup set of a scene, searched in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkStore {
    pub sets: Vec<LandmarkSet>,
}

impl LandmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_set(&mut self, set: LandmarkSet) {
        self.sets.push(set);
    }

    pub fn load_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let name = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "landmarks".to_string());
        let set = LandmarkSet::from_csv(&path, name)?;
        self.add_set(set);
        Ok(())
    }
}

impl PointStore for LandmarkStore {
    fn find_point_by_label(
        &self,
        label: &str,
        only_visible: bool,
    ) -> std::result::Result<Point3<f64>, PlannerError> {
        self.sets
            .iter()
            .filter(|set| !only_visible || set.visible)
            .find_map(|set| set.find(label))
            .ok_or_else(|| PlannerError::not_found(label))
    }
}

/// Parses a free-text list of necrosis offsets such as `"0, 5; 12.5"`.
///
/// Empty tokens are ignored, unparsable ones are skipped with a warning. The
/// result may be empty; the fiber builder then falls back to a single 0 mm
/// offset.
pub fn parse_offsets(text: &str) -> Vec<f64> {
    text.replace(';', ",")
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                log::warn!("ignoring invalid offset '{}'", token);
                None
            }
        })
        .collect()
}

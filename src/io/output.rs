use anyhow::{anyhow, bail, Context};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::processing::{SlicePlanePose, SliceView, TriangulatedSurface};

/// Writes vertices and 1-based triangle faces as Wavefront OBJ.
pub fn write_surface_obj(
    surface: &TriangulatedSurface,
    name: &str,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    if surface.is_empty() {
        bail!("surface '{}' has no triangles", name);
    }
    if !surface.has_valid_faces() {
        bail!("surface '{}' references missing vertices", name);
    }

    let file = File::create(path.as_ref())
        .with_context(|| format!("failed to create {:?}", path.as_ref()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "o {}", name)?;
    for v in &surface.vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for [a, b, c] in &surface.faces {
        writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    writer.flush()?;
    Ok(())
}

/// File-system friendly stem for a scene node name.
pub fn file_stem_for(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "surface".to_string()
    } else {
        stem.to_string()
    }
}

/// Writes every named surface to `output_dir` in parallel, one OBJ per
/// surface, and returns the written paths in input order.
///
/// All surfaces are attempted; failures are reported together.
pub fn write_surfaces_to_dir(
    surfaces: &[(String, TriangulatedSurface)],
    output_dir: impl AsRef<Path>,
) -> anyhow::Result<Vec<PathBuf>> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir).context(format!(
        "Could not create output directory: {:?}",
        output_dir
    ))?;

    let total = surfaces.len();
    let results: Vec<anyhow::Result<PathBuf>> = surfaces
        .par_iter()
        .enumerate()
        .map(|(i, (name, surface))| {
            let obj_name = format!("{:03}_{}.obj", i, file_stem_for(name));
            let obj_path = output_dir.join(&obj_name);
            write_surface_obj(surface, name, &obj_path)
                .map_err(|e| anyhow!("Failed [{}]: {}", obj_name, e))?;
            Ok(obj_path)
        })
        .collect();

    let success_count = results.iter().filter(|r| r.is_ok()).count();
    let fail_count = total - success_count;
    log::info!(
        "OBJ files: {}/{} written to {:?}{}",
        success_count,
        total,
        output_dir,
        if fail_count > 0 {
            format!(", {} failures", fail_count)
        } else {
            String::new()
        }
    );

    if fail_count > 0 {
        let errors = results
            .into_iter()
            .filter_map(|r| r.err())
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Some OBJ exports failed:\n{}", errors);
    }

    results.into_iter().collect()
}

#[derive(Debug, Serialize)]
struct PoseRecord {
    view: SliceView,
    /// Row-major slice-to-world matrix.
    matrix: [[f64; 4]; 4],
    handedness: f64,
}

/// Dumps slice poses as a JSON array of `{view, matrix, handedness}`.
pub fn write_poses_json<'a>(
    poses: impl IntoIterator<Item = &'a SlicePlanePose>,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let records: Vec<PoseRecord> = poses
        .into_iter()
        .map(|p| PoseRecord {
            view: p.view,
            matrix: p.to_rows(),
            handedness: p.handedness(),
        })
        .collect();

    let file = File::create(path.as_ref())
        .with_context(|| format!("failed to create {:?}", path.as_ref()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &records)
        .with_context(|| format!("failed to serialize poses to {:?}", path.as_ref()))?;
    writer.flush()?;
    log::info!("wrote {} slice poses to {:?}", records.len(), path.as_ref());
    Ok(())
}

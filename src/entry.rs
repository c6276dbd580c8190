use anyhow::{Context, Result};
use nalgebra::Point3;
use std::path::{Path, PathBuf};

use crate::config::PlannerConfig;
use crate::io::input::PointStore;
use crate::io::output::{write_poses_json, write_surfaces_to_dir};
use crate::io::scene::{
    contacts_name, default_base_name, electrode_name, fiber_name, necrosis_name,
    DisplayProperties, InMemoryScene, NodeHandle, NodeKind, SceneSink,
};
use crate::io::slice_view::SliceViewSink;
use crate::processing::{
    build_fiber_and_necrosis, build_seeg_electrode, distance_between, suggest_contact_count,
    ElectrodeModel, FiberModel, SlicePlanePose, SlicePoseController, SliceView, TrajectoryLine,
    TrajectoryPoses,
};

/// Result of a LiTT planning run.
#[derive(Debug, Clone)]
pub struct LittOutcome {
    pub base_name: String,
    pub model: FiberModel,
    pub line: NodeHandle,
    pub fiber: NodeHandle,
    pub necroses: Vec<NodeHandle>,
}

/// Result of an SEEG planning run.
#[derive(Debug, Clone)]
pub struct SeegOutcome {
    pub base_name: String,
    pub model: ElectrodeModel,
    pub distance: f64,
    pub suggested_contacts: usize,
    pub contact_count: usize,
    pub line: NodeHandle,
    pub electrode: NodeHandle,
    /// Absent when the electrode has no contacts.
    pub contacts: Option<NodeHandle>,
}

fn resolve_points<S: PointStore + ?Sized>(
    store: &S,
    entry_label: &str,
    target_label: &str,
    only_visible: bool,
) -> Result<(Point3<f64>, Point3<f64>)> {
    let entry = store
        .find_point_by_label(entry_label, only_visible)
        .with_context(|| format!("entry point '{}'", entry_label))?;
    let target = store
        .find_point_by_label(target_label, only_visible)
        .with_context(|| format!("target point '{}'", target_label))?;
    Ok((entry, target))
}

/// Adds the entry → target line and returns its handle with the name it
/// received, which the other nodes of the plan derive theirs from.
fn add_trajectory_line<K: SceneSink + ?Sized>(
    scene: &mut K,
    config: &PlannerConfig,
    line: TrajectoryLine,
    entry_label: &str,
    target_label: &str,
    color: [f64; 3],
) -> (String, NodeHandle) {
    let requested = config
        .scene
        .base_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_base_name(entry_label, target_label));

    let mut display = DisplayProperties::new(NodeKind::Line, color, 1.0);
    if !config.scene.show_line {
        display = display.hidden();
    }
    let handle = scene.add_line(&requested, line, display, config.scene.overwrite);
    let name = scene.node_name(handle).unwrap_or(requested);
    (name, handle)
}

/// Looks up both landmarks, builds fiber and necrosis models and hands them to
/// the scene.
pub fn run_litt<S, K>(
    store: &S,
    scene: &mut K,
    entry_label: &str,
    target_label: &str,
    config: &PlannerConfig,
) -> Result<LittOutcome>
where
    S: PointStore + ?Sized,
    K: SceneSink + ?Sized,
{
    let (entry, target) =
        resolve_points(store, entry_label, target_label, config.scene.search_only_visible)?;
    let litt = &config.litt;
    let model = build_fiber_and_necrosis(
        &entry,
        &target,
        &litt.necrosis_params(),
        &config.mesh.resolution(),
    );

    let overwrite = config.scene.overwrite;
    let (base_name, line) =
        add_trajectory_line(scene, config, model.line, entry_label, target_label, litt.fiber_color);

    let fiber = scene.add_surface(
        &fiber_name(&base_name, litt.fiber_diameter),
        NodeKind::Fiber,
        model.fiber.clone(),
        DisplayProperties::new(NodeKind::Fiber, litt.fiber_color, litt.fiber_opacity),
        overwrite,
    );
    let necroses = model
        .necroses
        .iter()
        .enumerate()
        .map(|(i, surface)| {
            scene.add_surface(
                &necrosis_name(&base_name, i + 1),
                NodeKind::Necrosis,
                surface.clone(),
                DisplayProperties::new(
                    NodeKind::Necrosis,
                    litt.necrosis_color,
                    litt.necrosis_opacity,
                ),
                overwrite,
            )
        })
        .collect();

    log::info!("LiTT plan '{}' ready", base_name);
    Ok(LittOutcome {
        base_name,
        model,
        line,
        fiber,
        necroses,
    })
}

/// Looks up both landmarks and builds an SEEG electrode. The configured contact
/// count is used when set, the suggested one otherwise.
pub fn run_seeg<S, K>(
    store: &S,
    scene: &mut K,
    entry_label: &str,
    target_label: &str,
    config: &PlannerConfig,
) -> Result<SeegOutcome>
where
    S: PointStore + ?Sized,
    K: SceneSink + ?Sized,
{
    let (entry, target) =
        resolve_points(store, entry_label, target_label, config.scene.search_only_visible)?;
    let seeg = &config.seeg;

    let distance = distance_between(&entry, &target);
    let suggested_contacts = suggest_contact_count(
        distance,
        &seeg.allowed_contacts,
        seeg.contact_length,
        seeg.gap_length,
    );
    log::info!(
        "suggestion: {} contacts to cover {:.1} mm",
        suggested_contacts,
        distance
    );
    let contact_count = seeg.contact_count.unwrap_or(suggested_contacts);

    let model = build_seeg_electrode(
        &entry,
        &target,
        &seeg.stack_params(contact_count),
        &config.mesh.resolution(),
    );

    let overwrite = config.scene.overwrite;
    let (base_name, line) =
        add_trajectory_line(scene, config, model.line, entry_label, target_label, seeg.shaft_color);
    let custom = seeg.electrode_name.as_deref();

    let electrode = scene.add_surface(
        &electrode_name(&base_name, contact_count, custom),
        NodeKind::Electrode,
        model.stack.shaft_and_contacts.clone(),
        DisplayProperties::new(NodeKind::Electrode, seeg.shaft_color, 1.0),
        overwrite,
    );
    let contacts = if model.stack.contacts.is_empty() {
        None
    } else {
        Some(scene.add_surface(
            &contacts_name(&base_name, custom),
            NodeKind::Contacts,
            model.stack.contacts.clone(),
            DisplayProperties::new(NodeKind::Contacts, seeg.contact_color, 1.0),
            overwrite,
        ))
    };

    Ok(SeegOutcome {
        base_name,
        model,
        distance,
        suggested_contacts,
        contact_count,
        line,
        electrode,
        contacts,
    })
}

/// Aligns the three slice views with the trajectory and pushes the poses to
/// the host.
pub fn create_mpr<S, V>(
    store: &S,
    controller: &mut SlicePoseController,
    views: &mut V,
    entry_label: &str,
    target_label: &str,
    only_visible: bool,
) -> Result<TrajectoryPoses>
where
    S: PointStore + ?Sized,
    V: SliceViewSink,
{
    let (entry, target) = resolve_points(store, entry_label, target_label, only_visible)?;
    let poses = controller.create_trajectory_poses(&entry, &target);
    views
        .set_poses(poses.iter())
        .context("failed to apply trajectory poses")?;
    log::info!("MPR aligned to {}\u{2192}{}", entry_label, target_label);
    Ok(poses)
}

/// Sets the absolute in-plane rotation of one view and pushes it. Does nothing
/// before [`create_mpr`].
pub fn rotate_view<V: SliceViewSink>(
    controller: &mut SlicePoseController,
    views: &mut V,
    view: SliceView,
    angle_deg: f64,
) -> Result<Option<SlicePlanePose>> {
    let pose = controller.rotate_view_in_plane(view, angle_deg);
    if let Some(pose) = &pose {
        views
            .set_pose(pose)
            .with_context(|| format!("failed to rotate {} view", view))?;
    }
    Ok(pose)
}

/// Spins all three views about the trajectory axis to an absolute angle.
pub fn rotate_mpr<V: SliceViewSink>(
    controller: &mut SlicePoseController,
    views: &mut V,
    angle_deg: f64,
) -> Result<Option<TrajectoryPoses>> {
    let poses = controller.rotate_around_trajectory(angle_deg);
    if let Some(poses) = &poses {
        views
            .set_poses(poses.iter())
            .context("failed to rotate MPR around trajectory")?;
    }
    Ok(poses)
}

pub const POSES_FILE_NAME: &str = "poses.json";

/// Writes every surface of the scene as OBJ and, when poses exist, the slice
/// poses as `poses.json`, all under `output_dir`. Files of an earlier export
/// into the same directory are overwritten.
pub fn export_plan(
    scene: &InMemoryScene,
    controller: &SlicePoseController,
    output_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let output_dir = output_dir.as_ref();
    let mut written = write_surfaces_to_dir(&scene.surfaces(), output_dir)?;

    let poses = controller.current_poses();
    if !poses.is_empty() {
        let path = output_dir.join(POSES_FILE_NAME);
        write_poses_json(poses.iter(), &path)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod entry_tests {
    use super::*;
    use crate::error::PlannerError;
    use crate::io::input::PointStore;
    use crate::io::slice_view::{HostCapabilities, RecordingSliceViews, SliceViewAdapter};
    use crate::utils::test_utils::{coarse_resolution, sample_store};
    use approx::assert_relative_eq;

    fn config() -> PlannerConfig {
        let mut config = PlannerConfig::default();
        let res = coarse_resolution();
        config.mesh.tube_sides = res.tube_sides;
        config.mesh.ellipsoid_u_resolution = res.ellipsoid_u;
        config.mesh.ellipsoid_v_resolution = res.ellipsoid_v;
        config.mesh.cylinder_resolution = res.cylinder_sides;
        config
    }

    fn views() -> RecordingSliceViews {
        RecordingSliceViews::new(
            SliceViewAdapter::negotiate(&HostCapabilities {
                set_matrix: true,
                set_normal_transverse_position: false,
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_litt_names_and_placement() {
        let store = sample_store();
        let mut scene = InMemoryScene::new();
        let mut cfg = config();
        cfg.litt.necrosis_offsets = vec![0.0, 10.0];

        let out = run_litt(&store, &mut scene, "L", "L_1", &cfg).unwrap();
        assert_eq!(out.base_name, "Trajectory L→L_1");
        assert_eq!(
            scene.names(),
            vec![
                "Trajectory L→L_1",
                "Trajectory L→L_1 (fiber Ø4.00mm)",
                "Trajectory L→L_1 (necrosis 1)",
                "Trajectory L→L_1 (necrosis 2)",
            ]
        );
        // default necrosis length 15 => r_major 7.5
        assert_relative_eq!(out.model.necrosis_centers[0].z, 92.5, epsilon = 1e-9);
        assert_relative_eq!(out.model.necrosis_centers[1].z, 82.5, epsilon = 1e-9);

        let line = scene.node(out.line).unwrap();
        assert!(!line.display.visible);
        let fiber = scene.node(out.fiber).unwrap();
        assert_eq!(fiber.display.opacity, 0.85);
        assert_eq!(fiber.display.slice_intersection_thickness, 5);
    }

    #[test]
    fn test_litt_rerun_overwrites_or_suffixes() {
        let store = sample_store();
        let mut scene = InMemoryScene::new();
        let mut cfg = config();
        run_litt(&store, &mut scene, "L", "L_1", &cfg).unwrap();
        run_litt(&store, &mut scene, "L", "L_1", &cfg).unwrap();
        assert_eq!(scene.len(), 3);

        cfg.scene.overwrite = false;
        let out = run_litt(&store, &mut scene, "L", "L_1", &cfg).unwrap();
        assert_eq!(out.base_name, "Trajectory L→L_1 (2)");
        assert_eq!(
            scene.node_name(out.fiber).unwrap(),
            "Trajectory L→L_1 (2) (fiber Ø4.00mm)"
        );
        assert!(scene.contains("Trajectory L→L_1 (2) (necrosis 1)"));
        assert!(!scene.contains("Trajectory L→L_1 (fiber Ø4.00mm) (2)"));
        assert_eq!(scene.len(), 6);

        let third = run_litt(&store, &mut scene, "L", "L_1", &cfg).unwrap();
        assert_eq!(third.base_name, "Trajectory L→L_1 (3)");
        assert!(scene.contains("Trajectory L→L_1 (3) (fiber Ø4.00mm)"));
    }

    #[test]
    fn test_missing_label_surfaces_not_found() {
        let store = sample_store();
        let mut scene = InMemoryScene::new();
        let err = run_litt(&store, &mut scene, "L", "nope", &config()).unwrap_err();
        match err.downcast_ref::<PlannerError>() {
            Some(PlannerError::NotFound { label }) => assert_eq!(label, "nope"),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(scene.is_empty());
    }

    #[test]
    fn test_seeg_uses_suggestion_and_visibility() {
        let store = sample_store();
        let mut scene = InMemoryScene::new();
        let mut cfg = config();
        cfg.scene.search_only_visible = true;
        cfg.scene.show_line = true;

        let out = run_seeg(&store, &mut scene, "A", "A_1", &cfg).unwrap();
        // visible A sits at (60,10,20), A_1 at (20,10,50)
        assert_relative_eq!(out.distance, 50.0, epsilon = 1e-9);
        // 15 contacts: 15*1.5 + 14*2 = 50.5 mm
        assert_eq!(out.suggested_contacts, 15);
        assert_eq!(out.contact_count, 15);
        assert_eq!(out.model.stack.contact_centers.len(), 15);
        assert!(scene.node(out.line).unwrap().display.visible);
        assert!(scene.contains("Trajectory A→A_1 (SEEG 15C)"));
        assert!(scene.contains("Trajectory A→A_1 (contacts)"));
        assert_eq!(scene.node(out.electrode).unwrap().display.slice_intersection_thickness, 4);

        let hidden = store.find_point_by_label("A", false).unwrap();
        assert_relative_eq!(hidden.x, -100.0);
    }

    #[test]
    fn test_seeg_custom_name_and_zero_contacts() {
        let store = sample_store();
        let mut scene = InMemoryScene::new();
        let mut cfg = config();
        cfg.seeg.contact_count = Some(0);
        cfg.seeg.electrode_name = Some("LA".to_string());
        cfg.scene.base_name = Some("Left amygdala".to_string());

        let out = run_seeg(&store, &mut scene, "L", "L_1", &cfg).unwrap();
        assert_eq!(out.contact_count, 0);
        assert!(out.contacts.is_none());
        assert_eq!(scene.names(), vec!["Left amygdala", "LA"]);
    }

    #[test]
    fn test_mpr_round_trip_through_views() {
        let store = sample_store();
        let mut controller = config().mpr.controller();
        let mut sink = views();

        assert!(rotate_view(&mut controller, &mut sink, SliceView::Red, 30.0).unwrap().is_none());
        assert!(sink.history().is_empty());

        let poses = create_mpr(&store, &mut controller, &mut sink, "A", "A_1", true).unwrap();
        assert_eq!(sink.history().len(), 3);
        assert_relative_eq!(poses.red.origin(), Point3::new(40.0, 10.0, 35.0), epsilon = 1e-9);

        let rotated = rotate_view(&mut controller, &mut sink, SliceView::Green, 45.0)
            .unwrap()
            .unwrap();
        assert_eq!(sink.current(SliceView::Green).unwrap().to_pose(), rotated);

        let spun = rotate_mpr(&mut controller, &mut sink, 90.0).unwrap().unwrap();
        assert_eq!(sink.history().len(), 7);
        assert_relative_eq!(spun.red.normal(), poses.red.normal(), epsilon = 1e-12);
    }

    #[test]
    fn test_export_plan_writes_objs_and_poses() {
        let store = sample_store();
        let mut scene = InMemoryScene::new();
        let mut controller = SlicePoseController::new();
        run_litt(&store, &mut scene, "L", "L_1", &config()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = export_plan(&scene, &controller, dir.path()).unwrap();
        assert_eq!(written.len(), 2);

        create_mpr(&store, &mut controller, &mut views(), "L", "L_1", false).unwrap();
        let written = export_plan(&scene, &controller, dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(dir.path().join("poses.json").exists());
    }

    #[test]
    fn test_repeated_export_overwrites_files() {
        let store = sample_store();
        let mut scene = InMemoryScene::new();
        let mut controller = SlicePoseController::new();
        run_litt(&store, &mut scene, "L", "L_1", &config()).unwrap();
        create_mpr(&store, &mut controller, &mut views(), "L", "L_1", false).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let file_names = |paths: &[PathBuf]| -> Vec<String> {
            paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        };
        let first = export_plan(&scene, &controller, dir.path()).unwrap();

        controller.rotate_around_trajectory(45.0).unwrap();
        let second = export_plan(&scene, &controller, dir.path()).unwrap();
        assert_eq!(file_names(&first), file_names(&second));
        assert_eq!(file_names(&second).last().unwrap(), POSES_FILE_NAME);

        let mut on_disk: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        on_disk.sort();
        let mut expected = file_names(&second);
        expected.sort();
        assert_eq!(on_disk, expected);

        let json = std::fs::read_to_string(dir.path().join(POSES_FILE_NAME)).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&json).unwrap();
        let red = controller.pose(SliceView::Red).unwrap();
        let red_view = serde_json::to_value(SliceView::Red).unwrap();
        let record = saved
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["view"] == red_view)
            .unwrap();
        assert_relative_eq!(
            record["matrix"][0][1].as_f64().unwrap(),
            red.matrix[(0, 1)],
            epsilon = 1e-9
        );
    }
}

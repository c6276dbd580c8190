pub mod assembler;
pub mod frame;
pub mod mpr;
pub mod solids;
pub mod surface;
pub mod vector_math;

pub use assembler::{
    build_fiber_and_necrosis, build_seeg_electrode, distance_between, suggest_contact_count,
    ElectrodeModel, FiberModel, NecrosisParams, TrajectoryLine,
};
pub use frame::{rotation_to_align_z_with_axis, Frame};
pub use mpr::{SlicePlanePose, SlicePoseController, SliceView, TrajectoryPoses};
pub use solids::{ContactStack, ContactStackParams, GeometrySpec, MeshResolution};
pub use surface::TriangulatedSurface;

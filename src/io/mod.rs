pub mod input;
pub mod output;
pub mod scene;
pub mod slice_view;

pub use input::{parse_offsets, Landmark, LandmarkSet, LandmarkStore, PointStore};
pub use output::{write_poses_json, write_surface_obj, write_surfaces_to_dir};
pub use scene::{DisplayProperties, InMemoryScene, NodeHandle, NodeKind, SceneSink};
pub use slice_view::{
    HostCapabilities, PoseCommand, PoseEncoding, RecordingSliceViews, SliceViewAdapter,
    SliceViewSink,
};

//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{LabelVolume, NiftiHeaderAttr, ScalarVolume};
pub use crate::error::{LabelError, LabelResult};
pub use crate::voxel::{Label, LabelValue, MaskVoxel};

pub use crate::voronoi::{
    combine_hemispheres, nearest_seed_labels, nearest_seed_transform, voronoi_subparcellate,
    voronoi_subparcellate_as, VoxelSpacing,
};

#[cfg(feature = "rayon")]
pub use crate::voronoi::{par_nearest_seed_transform, par_voronoi_subparcellate};

pub use crate::relabel::{
    relabel_ordinal, relabel_to_structures, RelabelMap, StructureMap, StructureTable,
};

pub use crate::table::{Hemisphere, LabelRecord, LabelTable, TableError};

pub use crate::pipeline::{
    build_label_table, subparcellate_white_matter, used_label_ids, HemisphereIds, PipelineError,
    VoronoiConfig,
};

pub use crate::dataset::{self, home_dataset_dir_with};

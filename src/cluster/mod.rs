//! Clustered light assignment
//!
//! The view frustum is divided into `x * y * z` clusters: screen tiles along
//! x and y, logarithmic depth slices along z. Each frame a compute kernel
//! rebuilds every cluster's list of overlapping lights, which the shading
//! passes then walk instead of the whole light set.

mod diagnostics;
mod engine;
mod grid;
mod layout;
pub mod reference;

pub use diagnostics::{ClusterReadback, ClusterSummary};
pub use engine::{ClusterDispatch, ClusterEngine, CLUSTER_WORKGROUP_SIZE};
pub use grid::{Aabb, ClusterGrid, ClusterGridConfig};
pub use layout::{ClusterHeader, ClusterLayout, ClusterSnapshot, CLUSTER_HEADER_SIZE};

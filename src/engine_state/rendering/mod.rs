//! Rendering-side processing for the voxel engine.
//!
//! The engine never draws anything itself. This module produces the data a renderer
//! consumes: chunk meshes (`meshing`) and the background task that builds them
//! (`tasks`).

pub mod meshing;
pub mod tasks;

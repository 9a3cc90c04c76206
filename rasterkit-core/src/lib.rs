//! # rasterkit-core
//!
//! The layer editing and history engine of a raster image editor. Layers own pixel buffers that grow and
//! shrink with their content, are grouped into a folder structure, and every user-visible mutation of a
//! [`state::document::Document`] is recorded as a reversible [`commands::Change`].

pub mod blend;
pub mod color;
pub mod commands;
pub mod config;
pub mod coords;
pub mod fill;
pub mod id;
pub mod notify;
pub mod pixels;
pub mod state;
pub mod util;

pub use id::RasterID;

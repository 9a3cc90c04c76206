pub mod document;
pub mod layer;
pub mod structure;

pub use document::Document;
pub use layer::{Layer, LayerID};
pub use structure::{GroupID, LayerStructure, StructureID};

pub mod assembler;
pub mod cache;
pub mod config;
pub mod mesh;
pub mod types;

pub use assembler::BinAssembler;
pub use cache::{CacheKey, CacheStats, ResultCache};
pub use config::PipelineConfig;
pub use mesh::{EdgeBuffers, EdgeGroup, FaceBuffers, FaceGroup, ModelMesh};
pub use types::*;

pub mod manager;
pub mod model;

pub use manager::WorkspaceManager;
pub use model::{
    AssemblyStrategy, AudioBlob, InFlight, NarrationMetadata, OutputArtifact, Workspace,
};

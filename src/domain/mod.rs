pub mod narration;
pub mod workspace;

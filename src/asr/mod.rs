pub mod interface;
pub mod transcriber;
pub mod upload;

pub use interface::*;
pub use transcriber::Transcriber;
pub use upload::{stage_audio, StagedUpload};

pub mod interface;
pub mod summarizer;

pub use interface::*;
pub use summarizer::Summarizer;

pub mod analysis;
pub mod llm;

pub use analysis::{AnalysisError, ClaimAnalysis, ClaimAnalysisService};
pub use llm::{OpenAiGenerator, TextGenerator};

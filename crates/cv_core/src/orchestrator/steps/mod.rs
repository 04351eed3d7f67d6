//! Concrete pipeline steps for speech isolation.

mod extract_audio;
mod filter;
mod merge_step;
mod plan;
mod probe;
mod segment;

pub use extract_audio::ExtractAudioStep;
pub use filter::FilterStep;
pub use merge_step::MergeStep;
pub use plan::PlanStep;
pub use probe::ProbeStep;
pub use segment::SegmentStep;

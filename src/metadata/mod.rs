//! Tender metadata: the tracked record model, completeness gating,
//! fragment normalization, fusion, and Phase-2 context assembly.

pub mod completeness;
pub mod context;
pub mod fragment;
pub mod merge;
pub mod record;

pub use completeness::{is_complete, missing_fields, RequiredField};
pub use context::build_analysis_context;
pub use fragment::{normalize_fragment, FragmentExtractor, FragmentSource};
pub use merge::merge_metadata;
pub use record::*;

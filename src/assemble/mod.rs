//! The merge engine.
//!
//! [`Assembler`] validates a run, loads the inputs and hands them to the
//! driver for their specification ([`cdx`] or [`spdx`]). Drivers share the
//! identifier service, the tool/creator/license aggregators and the field
//! merge rules defined here.

pub mod cdx;
mod context;
mod fields;
mod ids;
mod orchestrator;
mod refs;
pub mod spdx;
mod tools;

pub use context::{MergeContext, MergeSettings, MergeStats};
pub use fields::{merge_field, merge_spdx_field, Emptiness};
pub use ids::{IdKind, IdService, Identified};
pub use orchestrator::{AssembleOutcome, Assembler};
pub use refs::ProcessedRefs;
pub use tools::{
    license_refs, max_license_list_version, self_tool, tool_creator, CreatorSet, OtherLicenseSet,
    ToolSet, TOOL_NAME, TOOL_SUPPLIER, TOOL_VERSION,
};

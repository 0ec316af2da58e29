//! Component matching across CycloneDX and SPDX documents.
//!
//! Matching is built on the [`ComponentMatcher`] trait over the
//! format-independent [`ComponentView`](crate::model::ComponentView):
//!
//! - [`PurlMatcher`]: package URL equality (confidence 100)
//! - [`CpeMatcher`]: CPE equality in 2.3 form (confidence 90)
//! - [`NameVersionMatcher`]: normalized name and version (confidence 70)
//! - [`CompositeMatcher`]: the three above in priority order
//!
//! [`ComponentIndex`] narrows the candidates a matcher has to confirm.
//!
//! # Example
//!
//! ```ignore
//! use sbom_assembler::matching::{build_matcher, ComponentIndex, MatcherConfig};
//!
//! let matcher = build_matcher(&MatcherConfig::default());
//! let index = ComponentIndex::build(primary.iter().enumerate().map(|(i, c)| (c, i)));
//! let best = index.find_best_match(&secondary_component, matcher.as_ref());
//! ```

mod composite;
mod config;
mod cpe;
pub mod index;
mod name_version;
mod purl;
mod traits;

pub use composite::{CompositeMatcher, DEFAULT_MIN_CONFIDENCE};
pub use config::{build_matcher, MatcherConfig};
pub use cpe::{normalize_cpe, wildcard_cpe_version, CpeMatcher};
pub use index::ComponentIndex;
pub use name_version::{normalize_name, normalize_version, NameVersionMatcher};
pub use purl::{normalize_purl, strip_purl_version, PurlMatcher};
pub use traits::{CandidateScope, ComponentMatcher, MatchResult, MatchStrategy};

//! Per-merge context and diagnostic counters.

use crate::config::{AppIdentity, MergeMode, MergeStrategy};
use crate::matching::MatcherConfig;
use crate::model::SbomSpec;
use serde::Serialize;
use std::fmt;

/// Non-fatal outcomes of a merge, emitted at debug level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    /// Secondary components matched to a primary component (augment)
    pub matched: usize,
    /// Components added to the output that were not matched
    pub added: usize,
    /// Dangling references dropped while rewriting edges
    pub skipped: usize,
    /// Edges written to the output
    pub added_edges: usize,
    /// Input edges dropped because an endpoint could not be resolved
    pub dropped_edges: usize,
}

impl MergeStats {
    /// Emit the counters at debug level.
    pub fn log(&self) {
        tracing::debug!(
            matched = self.matched,
            added = self.added,
            skipped = self.skipped,
            added_edges = self.added_edges,
            dropped_edges = self.dropped_edges,
            "merge counters"
        );
    }
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "matched={} added={} skipped={} addedEdges={} droppedEdges={}",
            self.matched, self.added, self.skipped, self.added_edges, self.dropped_edges
        )
    }
}

/// Settings the format drivers need, resolved once per merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSettings {
    pub strategy: MergeStrategy,
    pub merge_mode: MergeMode,
    pub matcher: MatcherConfig,
    pub app: AppIdentity,
    pub output_spec: SbomSpec,
    pub output_spec_version: String,
}

impl MergeSettings {
    /// Settings with defaults for everything but the output spec.
    #[must_use]
    pub fn new(strategy: MergeStrategy, output_spec: SbomSpec) -> Self {
        Self {
            strategy,
            merge_mode: MergeMode::default(),
            matcher: MatcherConfig::default(),
            app: AppIdentity::default(),
            output_spec,
            output_spec_version: output_spec.default_output_version().to_string(),
        }
    }
}

/// State carried through one merge: settings in, counters out.
///
/// Logging goes through the ambient `tracing` dispatcher inside the span
/// entered by [`MergeContext::span`].
#[derive(Debug)]
pub struct MergeContext<'a> {
    pub settings: &'a MergeSettings,
    pub stats: MergeStats,
}

impl<'a> MergeContext<'a> {
    #[must_use]
    pub fn new(settings: &'a MergeSettings) -> Self {
        Self {
            settings,
            stats: MergeStats::default(),
        }
    }

    /// Span covering the merge.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "merge",
            strategy = %self.settings.strategy,
            spec = %self.settings.output_spec
        )
    }

    /// Count dangling references dropped from an edge.
    pub fn dangling(&mut self, count: usize) {
        self.stats.skipped += count;
    }
}

//! Topology normalizers: structural clean-up run after loading.
//!
//! | Module | Operation |
//! |---|---|
//! | [containers] | [Taxonomy::elide_containers] |
//! | [smush] | [Taxonomy::smush] |
//! | [elide] | [Taxonomy::elide_redundant_intermediate_taxa] |
//! | [roots] | [Taxonomy::normalize_roots], [Taxonomy::deforestate] |
//! | [select] | [Taxonomy::select], [Taxonomy::select_visible], [Taxonomy::sample], [Taxonomy::chop] |
//! | [ids] | [Taxonomy::assign_new_ids], [Taxonomy::assign_dummy_ids], [Taxonomy::purge_temporary_ids] |
//!
//! [Taxonomy::post_load] runs the structural normalizers and the
//! classification algorithms in their fixed order.

pub mod containers;
pub mod elide;
pub mod ids;
pub mod roots;
pub mod select;
pub mod smush;

pub use select::CopyOptions;

use crate::error::TaxonomyError;
use crate::model::taxonomy::Taxonomy;

/// What [Taxonomy::post_load] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostLoadReport {
    pub containers_emptied: usize,
    pub homonyms_absorbed: usize,
    pub redundant_elided: usize,
    pub roots_moved: usize,
    pub rank_conflicts: usize,
}

impl Taxonomy {
    /// Runs the post-load pipeline:
    /// 1. [Taxonomy::elide_containers]
    /// 2. [Taxonomy::smush]
    /// 3. [Taxonomy::elide_redundant_intermediate_taxa]
    /// 4. [Taxonomy::normalize_roots], or [Taxonomy::deforestate] if configured
    /// 5. [Taxonomy::reset_caches]
    /// 6. [Taxonomy::analyze_rank_conflicts]
    /// 7. [Taxonomy::infer_flags]
    ///
    /// Structure is final after step 4; the classification steps rely on it.
    pub fn post_load(&mut self) -> Result<PostLoadReport, TaxonomyError> {
        let mut report = PostLoadReport {
            containers_emptied: self.elide_containers()?,
            homonyms_absorbed: self.smush()?,
            redundant_elided: self.elide_redundant_intermediate_taxa()?,
            ..PostLoadReport::default()
        };
        if self.config.deforest {
            report.roots_moved = self.deforestate()?;
        } else {
            self.normalize_roots();
        }
        self.reset_caches();
        report.rank_conflicts = self.analyze_rank_conflicts();
        self.infer_flags();

        tracing::info!(taxonomy = %self.name(), ?report, "post-load pipeline finished");
        Ok(report)
    }
}

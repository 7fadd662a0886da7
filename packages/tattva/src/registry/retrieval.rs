//! Per-category retrieval tuning.

use crate::types::{Granularity, RetrievalConfig};

use Granularity::*;

const fn cfg(granularity: Granularity, top_k: usize, translation: bool, comments: bool) -> RetrievalConfig {
    RetrievalConfig {
        granularity,
        top_k,
        include_translation: translation,
        include_comments: comments,
        requires_explanation: true,
    }
}

/// Indexed by category id - 1.
pub(crate) static RETRIEVAL_CONFIGS: [RetrievalConfig; 45] = [
    // 1-15 story
    cfg(Kanda, 50, false, false),
    cfg(Kanda, 30, false, false),
    cfg(Sarga, 20, false, false),
    cfg(SargaRange, 30, false, false),
    cfg(SargaRange, 25, false, false),
    cfg(SargaRange, 30, false, false),
    cfg(Sarga, 15, false, false),
    cfg(SargaRange, 25, false, false),
    cfg(SargaRange, 20, false, false),
    cfg(SargaRange, 30, false, false),
    cfg(SargaRange, 25, false, false),
    cfg(SargaRange, 30, false, false),
    cfg(SargaRange, 35, false, false),
    cfg(SargaRange, 25, false, false),
    cfg(SargaRange, 20, false, false),
    // 16-25 character
    cfg(MultiShloka, 15, false, false),
    cfg(MultiShloka, 10, false, false),
    cfg(MultiShloka, 20, false, false),
    cfg(SargaRange, 25, false, false),
    cfg(MultiShloka, 20, false, false),
    cfg(SargaRange, 20, false, false),
    cfg(SargaRange, 20, false, false),
    cfg(SargaRange, 15, false, false),
    cfg(SargaRange, 20, false, false),
    cfg(SargaRange, 25, false, true),
    // 26-33 dharma
    cfg(MultiShloka, 20, true, false),
    cfg(MultiShloka, 15, true, false),
    cfg(MultiShloka, 15, true, false),
    cfg(MultiShloka, 20, true, false),
    cfg(SargaRange, 20, true, true),
    cfg(SargaRange, 20, true, true),
    cfg(SargaRange, 20, false, false),
    cfg(SargaRange, 20, true, true),
    // 34-40 verse
    cfg(Shloka, 5, true, false),
    cfg(Shloka, 5, true, false),
    cfg(Shloka, 5, true, false),
    cfg(Sarga, 15, true, false),
    cfg(Shloka, 10, true, false),
    cfg(Sarga, 15, true, false),
    cfg(MultiShloka, 15, true, false),
    // 41-43 interpretation
    cfg(Shloka, 10, true, true),
    cfg(Shloka, 10, true, true),
    cfg(Shloka, 10, true, true),
    // 44-45 meta
    cfg(Shloka, 5, false, false),
    cfg(Shloka, 0, false, false),
];

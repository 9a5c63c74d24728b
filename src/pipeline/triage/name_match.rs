use std::collections::BTreeSet;

use super::types::{FuzzyMatcher, InformationIndex};
use super::vocabulary::is_common_symptom;
use crate::models::canonical_disease_name;

/// Partial ratio a disease name must exceed to count as named in the query.
const NAME_MATCH_THRESHOLD: u8 = 90;

/// Information documents scanned when building the disease catalog.
pub const CATALOG_SCAN_LIMIT: usize = 10_000;

// ═══════════════════════════════════════════════════════════
// Fuzzy matching
// ═══════════════════════════════════════════════════════════

/// Best similarity (0–100) between the shorter string and any equally long
/// window of the longer one. Similarity of a window is its longest common
/// subsequence with the shorter string, relative to the shorter length.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    let mut best = 0usize;
    for start in 0..=(long.len() - short.len()) {
        let window = &long[start..start + short.len()];
        best = best.max(lcs_len(short, window));
        if best == short.len() {
            break;
        }
    }
    (100.0 * best as f64 / short.len() as f64).round() as u8
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Default fuzzy matcher backed by [`partial_ratio`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialRatioMatcher;

impl FuzzyMatcher for PartialRatioMatcher {
    fn partial_ratio(&self, a: &str, b: &str) -> u8 {
        partial_ratio(a, b)
    }
}

// ═══════════════════════════════════════════════════════════
// Disease catalog
// ═══════════════════════════════════════════════════════════

/// Canonical names of every disease the information index knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiseaseCatalog {
    names: BTreeSet<String>,
}

impl DiseaseCatalog {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| canonical_disease_name(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    /// Load names from the information index. A failing index yields an
    /// empty catalog; resolution then relies on retrieval alone.
    pub fn load(index: &dyn InformationIndex) -> Self {
        match index.diseases(CATALOG_SCAN_LIMIT) {
            Ok(names) => {
                let catalog = Self::from_names(names);
                tracing::info!(diseases = catalog.len(), "Disease catalog loaded");
                catalog
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load disease catalog, continuing without it");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Find a known disease named (possibly fuzzily) in the query.
///
/// Diseases whose name is itself a common symptom are skipped. Among the
/// qualifying names the longest wins; the first one in catalog order wins
/// a length tie.
pub fn match_disease_name(
    query: &str,
    catalog: &DiseaseCatalog,
    matcher: &dyn FuzzyMatcher,
) -> Option<String> {
    let query_lower = query.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for disease in catalog.iter() {
        let disease_lower = disease.to_lowercase();
        if is_common_symptom(&disease_lower) {
            continue;
        }

        let qualifies = matcher.partial_ratio(&disease_lower, &query_lower) > NAME_MATCH_THRESHOLD
            || query_lower.contains(&format!("bệnh {disease_lower}"));
        if !qualifies {
            continue;
        }

        let len = disease.chars().count();
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((disease, len));
        }
    }

    best.map(|(name, _)| {
        tracing::debug!(disease = name, "Disease named directly in query");
        name.to_string()
    })
}

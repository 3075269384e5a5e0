//! Named rules that pair a search specification with a selector + action,
//! and the scheduler that sweeps candidate pairs through them.

pub mod scheduler;

use serde::{Deserialize, Serialize};

use crate::pair::PairSelectorAndComparator;

pub const UNASSIGNED_RULE_ID: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DupeSearchType {
    OneFileMatchesOneSearch,
    BothFilesMatchOneSearch,
    EachFileMatchesOneSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelDupesPreference {
    Required,
    Allowed,
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub file_search_context_1: Option<String>,
    pub file_search_context_2: Option<String>,
    pub dupe_search_type: DupeSearchType,
    pub pixel_dupes_preference: PixelDupesPreference,
    pub max_hamming_distance: u32,
}

impl Default for SearchSpec {
    fn default() -> Self {
        SearchSpec {
            file_search_context_1: None,
            file_search_context_2: None,
            dupe_search_type: DupeSearchType::OneFileMatchesOneSearch,
            pixel_dupes_preference: PixelDupesPreference::Allowed,
            max_hamming_distance: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    SetBetterAsBetterAndDeleteWorse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStats {
    /// Pairs returned by a search sweep, i.e. matching the rule's `search_spec`,
    /// whether or not they go on to pass the selector/comparator test.
    pub matches: u64,
    pub failed_test: u64,
    pub passed_test: u64,
    pub processed: u64,
}

/// Status of a candidate pair with respect to a rule's search + selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairCandidateStatus {
    DoesNotMatchSearch,
    MatchesButUntested,
    MatchedFailed,
    MatchedPassed,
    NotYetSearched,
}

/// A single auto-resolution job: a search plus a selector/comparator stack
/// plus an action to apply when the selector names a winner.
pub struct Rule<M> {
    id: i64,
    name: String,
    pub search_spec: SearchSpec,
    pub selector_and_comparator: PairSelectorAndComparator<M>,
    pub action: Action,
    pub paused: bool,
    pub stats: RuleStats,
}

impl<M> Clone for Rule<M> {
    fn clone(&self) -> Self {
        Rule {
            id: self.id,
            name: self.name.clone(),
            search_spec: self.search_spec.clone(),
            selector_and_comparator: self.selector_and_comparator.clone(),
            action: self.action,
            paused: self.paused,
            stats: self.stats,
        }
    }
}

impl<M> Rule<M> {
    pub fn new(name: impl Into<String>, selector_and_comparator: PairSelectorAndComparator<M>) -> Self {
        Rule {
            id: UNASSIGNED_RULE_ID,
            name: name.into(),
            search_spec: SearchSpec::default(),
            selector_and_comparator,
            action: Action::SetBetterAsBetterAndDeleteWorse,
            paused: false,
            stats: RuleStats::default(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action_summary(&self) -> String {
        match self.action {
            Action::SetBetterAsBetterAndDeleteWorse => {
                "set winning candidate as better, delete the other".to_string()
            }
        }
    }

    pub fn comparator_summary(&self) -> String {
        format!(
            "{} comparator(s) configured",
            self.selector_and_comparator.len()
        )
    }

    pub fn search_summary(&self) -> String {
        match (
            &self.search_spec.file_search_context_1,
            &self.search_spec.file_search_context_2,
        ) {
            (None, None) => "no search configured".to_string(),
            (Some(a), None) => format!("search: {a}"),
            (Some(a), Some(b)) => format!("search: {a} / {b}"),
            (None, Some(b)) => format!("search: {b}"),
        }
    }

    pub fn rule_summary(&self) -> String {
        format!(
            "{} — {}, {}",
            self.search_summary(),
            self.comparator_summary(),
            self.action_summary()
        )
    }
}

/// One built-in suggested rule for a fresh install, paused by construction.
pub fn default_rule_suggestions<M>() -> Vec<Rule<M>> {
    vec![Rule::new(
        "pixel-perfect jpegs vs pngs",
        PairSelectorAndComparator::new(Vec::new()),
    )
    .with_paused(true)]
}

impl<M> Rule<M> {
    fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

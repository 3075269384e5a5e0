//! Background cooperative loop that sweeps candidate pairs through each
//! non-paused rule's selector and applies the winning action.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::Error;

use super::{PairCandidateStatus, Rule};

/// Cooperative cancellation flag shared between a scheduler loop and
/// whoever owns its lifetime.
#[derive(Clone)]
pub struct CancelFlag(pub Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningStatus {
    Idle,
    Running,
    Paused,
    Unknown,
}

/// Supplies candidate pairs matching a rule's search spec that are in
/// status `matches-but-untested` or `not-yet-searched`, and receives the
/// outcome of testing each pair so it can transition that pair's status
/// and stop handing it back on future sweeps.
///
/// `fetch_batch` fails with `Error::MissingDependency` when an external
/// service or lookup the search relies on is unavailable; the scheduler
/// logs this and skips the rule for the current pass, retrying next sweep.
pub trait CandidateSource<M> {
    fn fetch_batch(&self, rule: &Rule<M>) -> Result<Vec<(M, M)>, Error>;

    fn report_status(&self, rule: &Rule<M>, pair: (&M, &M), status: PairCandidateStatus);
}

/// Applies the rule's action once a selector names a winner.
pub trait ActionExecutor<M> {
    fn apply(&self, rule: &Rule<M>, winner: &M, loser: &M);
}

/// Owns the rule map. One instance per process; the lock guards edits from
/// a configuration UI against the scheduler loop.
pub struct RuleEngine<M> {
    rules: Mutex<HashMap<i64, Rule<M>>>,
    next_id: AtomicI64,
    wake_flag: Mutex<bool>,
    wake_cv: Condvar,
    running: Mutex<HashSet<i64>>,
}

impl<M> RuleEngine<M> {
    pub fn new() -> Self {
        RuleEngine {
            rules: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            wake_flag: Mutex::new(false),
            wake_cv: Condvar::new(),
            running: Mutex::new(HashSet::new()),
        }
    }

    /// Assigns ids to any rule still carrying `UNASSIGNED_RULE_ID`, then
    /// replaces the rule set.
    pub fn set_rules(&self, mut rules: Vec<Rule<M>>) {
        for rule in rules.iter_mut() {
            if rule.id() == super::UNASSIGNED_RULE_ID {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                rule.set_id(id);
            }
        }
        let mut map = self.rules.lock();
        *map = rules.into_iter().map(|r| (r.id(), r)).collect();
    }

    pub fn rule_ids(&self) -> Vec<i64> {
        self.rules.lock().keys().copied().collect()
    }

    /// Snapshot of every configured rule, for a host to list/inspect.
    pub fn get_rules(&self) -> Vec<Rule<M>> {
        self.rules.lock().values().cloned().collect()
    }

    pub fn get_running_status(&self, rule_id: i64) -> RunningStatus {
        if self.running.lock().contains(&rule_id) {
            return RunningStatus::Running;
        }
        match self.rules.lock().get(&rule_id) {
            Some(rule) if rule.is_paused() => RunningStatus::Paused,
            Some(_) => RunningStatus::Idle,
            None => RunningStatus::Unknown,
        }
    }

    fn mark_running(&self, rule_id: i64, running: bool) {
        let mut set = self.running.lock();
        if running {
            set.insert(rule_id);
        } else {
            set.remove(&rule_id);
        }
    }

    /// Notify the scheduler loop to wake immediately instead of waiting out
    /// its sleep.
    pub fn wake(&self) {
        let mut woken = self.wake_flag.lock();
        *woken = true;
        self.wake_cv.notify_all();
    }

    fn wait_for_wake(&self, timeout: Duration) {
        let mut woken = self.wake_flag.lock();
        if !*woken {
            let _ = self.wake_cv.wait_for(&mut woken, timeout);
        }
        *woken = false;
    }

    pub(crate) fn with_rules_mut<F: FnMut(&mut Rule<M>)>(&self, mut f: F) {
        let mut map = self.rules.lock();
        for rule in map.values_mut() {
            f(rule);
        }
    }
}

impl<M> Default for RuleEngine<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches one batch for `rule`, fans the independent selector evaluations
/// out across `rayon`, then applies winning actions and status reports
/// sequentially (both have host-visible side effects).
fn sweep_rule<M: Sync>(
    rule: &mut Rule<M>,
    source: &dyn CandidateSource<M>,
    executor: &dyn ActionExecutor<M>,
) -> Result<(), Error> {
    let batch = source.fetch_batch(rule)?;
    rule.stats.matches += batch.len() as u64;

    let selector = &rule.selector_and_comparator;
    let winners: Vec<Option<bool>> = batch
        .par_iter()
        .map(|(m1, m2)| {
            selector
                .matching_media(m1, m2)
                .map(|winner| std::ptr::eq(winner, m1))
        })
        .collect();

    for ((m1, m2), winner_is_m1) in batch.iter().zip(winners) {
        rule.stats.processed += 1;
        match winner_is_m1 {
            Some(winner_is_m1) => {
                rule.stats.passed_test += 1;
                let (winner, loser) = if winner_is_m1 { (m1, m2) } else { (m2, m1) };
                executor.apply(rule, winner, loser);
                source.report_status(rule, (m1, m2), PairCandidateStatus::MatchedPassed);
            }
            None => {
                rule.stats.failed_test += 1;
                source.report_status(rule, (m1, m2), PairCandidateStatus::MatchedFailed);
            }
        }
    }
    Ok(())
}

/// Runs batches against every non-paused rule until `cancel` is signalled,
/// sleeping between batches and on an externally signalled wake.
pub fn run_scheduler_loop<M: Sync>(
    engine: Arc<RuleEngine<M>>,
    source: Arc<dyn CandidateSource<M> + Send + Sync>,
    executor: Arc<dyn ActionExecutor<M> + Send + Sync>,
    cancel: CancelFlag,
    batch_sleep: Duration,
) {
    while !cancel.is_cancelled() {
        {
            let mut rules = engine.rules.lock();
            for rule in rules.values_mut() {
                if rule.is_paused() {
                    continue;
                }
                let id = rule.id();
                let name = rule.name().to_string();
                engine.mark_running(id, true);
                let result = catch_unwind(AssertUnwindSafe(|| {
                    sweep_rule(rule, source.as_ref(), executor.as_ref())
                }));
                engine.mark_running(id, false);
                match result {
                    Ok(Ok(())) => debug!(rule = %name, "rule batch processed"),
                    Ok(Err(Error::MissingDependency(reason))) => {
                        warn!(rule = %name, %reason, "missing dependency, rule skipped this pass");
                    }
                    Ok(Err(other)) => {
                        warn!(rule = %name, error = %other, "rule batch fetch failed");
                    }
                    Err(_) => warn!(rule = %name, "rule batch panicked, skipping this pass"),
                }
            }
        }

        if cancel.is_cancelled() {
            break;
        }
        engine.wait_for_wake(batch_sleep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::PairSelectorAndComparator;

    #[derive(Clone)]
    struct Media(i32);

    struct NoCandidates;
    impl CandidateSource<Media> for NoCandidates {
        fn fetch_batch(&self, _rule: &Rule<Media>) -> Result<Vec<(Media, Media)>, Error> {
            Ok(Vec::new())
        }
        fn report_status(&self, _rule: &Rule<Media>, _pair: (&Media, &Media), _status: PairCandidateStatus) {}
    }

    struct OneCandidate;
    impl CandidateSource<Media> for OneCandidate {
        fn fetch_batch(&self, _rule: &Rule<Media>) -> Result<Vec<(Media, Media)>, Error> {
            Ok(vec![(Media(1), Media(2))])
        }
        fn report_status(&self, _rule: &Rule<Media>, _pair: (&Media, &Media), _status: PairCandidateStatus) {}
    }

    struct AlwaysMissingDependency;
    impl CandidateSource<Media> for AlwaysMissingDependency {
        fn fetch_batch(&self, _rule: &Rule<Media>) -> Result<Vec<(Media, Media)>, Error> {
            Err(Error::missing_dependency("search index offline"))
        }
        fn report_status(&self, _rule: &Rule<Media>, _pair: (&Media, &Media), _status: PairCandidateStatus) {}
    }

    struct NoopExecutor;
    impl ActionExecutor<Media> for NoopExecutor {
        fn apply(&self, _rule: &Rule<Media>, _winner: &Media, _loser: &Media) {}
    }

    #[test]
    fn set_rules_assigns_ids() {
        let engine: RuleEngine<Media> = RuleEngine::new();
        let rule = Rule::new("r1", PairSelectorAndComparator::new(Vec::new()));
        engine.set_rules(vec![rule]);
        let ids = engine.rule_ids();
        assert_eq!(ids.len(), 1);
        assert_ne!(ids[0], super::super::UNASSIGNED_RULE_ID);
    }

    #[test]
    fn paused_rule_is_reported_paused() {
        let engine: RuleEngine<Media> = RuleEngine::new();
        let mut rule = Rule::new("r1", PairSelectorAndComparator::new(Vec::new()));
        rule.paused = true;
        engine.set_rules(vec![rule]);
        let id = engine.rule_ids()[0];
        assert_eq!(engine.get_running_status(id), RunningStatus::Paused);
    }

    #[test]
    fn unknown_rule_status_is_unknown() {
        let engine: RuleEngine<Media> = RuleEngine::new();
        assert_eq!(engine.get_running_status(999), RunningStatus::Unknown);
    }

    #[test]
    fn sweep_increments_processed_and_match_stats() {
        let engine: RuleEngine<Media> = RuleEngine::new();
        let rule = Rule::new("r1", PairSelectorAndComparator::new(Vec::new()));
        engine.set_rules(vec![rule]);
        engine.with_rules_mut(|rule| {
            sweep_rule(rule, &OneCandidate, &NoopExecutor).unwrap();
        });
        let (processed, matches): (u64, u64) = {
            let mut p = 0;
            let mut m = 0;
            engine.with_rules_mut(|rule| {
                p += rule.stats.processed;
                m += rule.stats.matches;
            });
            (p, m)
        };
        assert_eq!(processed, 1);
        assert_eq!(matches, 1);
    }

    #[test]
    fn sweep_reports_missing_dependency() {
        let engine: RuleEngine<Media> = RuleEngine::new();
        let rule = Rule::new("r1", PairSelectorAndComparator::new(Vec::new()));
        engine.set_rules(vec![rule]);
        engine.with_rules_mut(|rule| {
            let err = sweep_rule(rule, &AlwaysMissingDependency, &NoopExecutor).unwrap_err();
            assert!(matches!(err, Error::MissingDependency(_)));
        });
    }

    #[test]
    fn get_rules_returns_a_snapshot() {
        let engine: RuleEngine<Media> = RuleEngine::new();
        let mut rule = Rule::new("r1", PairSelectorAndComparator::new(Vec::new()));
        rule.stats.matches = 2;
        engine.set_rules(vec![rule]);
        let snapshot = engine.get_rules();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name(), "r1");
        assert_eq!(snapshot[0].stats.matches, 2);
    }

    #[test]
    fn cancel_flag_round_trips() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn no_candidates_leaves_stats_untouched() {
        let engine: RuleEngine<Media> = RuleEngine::new();
        let rule = Rule::new("r1", PairSelectorAndComparator::new(Vec::new()));
        engine.set_rules(vec![rule]);
        engine.with_rules_mut(|rule| {
            sweep_rule(rule, &NoCandidates, &NoopExecutor).unwrap();
        });
        engine.with_rules_mut(|rule| assert_eq!(rule.stats.processed, 0));
    }

    #[test]
    fn running_status_reflects_in_flight_sweep() {
        let engine: RuleEngine<Media> = RuleEngine::new();
        let rule = Rule::new("r1", PairSelectorAndComparator::new(Vec::new()));
        engine.set_rules(vec![rule]);
        let id = engine.rule_ids()[0];
        assert_eq!(engine.get_running_status(id), RunningStatus::Idle);
        engine.mark_running(id, true);
        assert_eq!(engine.get_running_status(id), RunningStatus::Running);
        engine.mark_running(id, false);
        assert_eq!(engine.get_running_status(id), RunningStatus::Idle);
    }
}

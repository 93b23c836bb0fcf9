//! Per-slot set-uicc transaction tracking
//!
//! A slot's transaction is either idle or waiting on one or two family
//! commands. Recording the last outstanding result hands back the collected
//! results and returns the transaction to idle, so a verdict can only be
//! computed from a resolved transaction.

use simsub_core::{AppFamily, Outcome, SubState};

/// Result recorded for one application family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppResult {
    /// No command was issued for this family
    #[default]
    NotApplicable,
    Success,
    Fail,
}

impl AppResult {
    fn from_completion(succeeded: bool) -> Self {
        if succeeded {
            AppResult::Success
        } else {
            AppResult::Fail
        }
    }
}

/// Results collected for both families of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppResults {
    pub three_gpp: AppResult,
    pub three_gpp2: AppResult,
}

impl AppResults {
    fn slot_for(&mut self, family: AppFamily) -> &mut AppResult {
        match family {
            AppFamily::ThreeGpp => &mut self.three_gpp,
            AppFamily::ThreeGpp2 => &mut self.three_gpp2,
        }
    }

    fn applicable(&self) -> impl Iterator<Item = AppResult> {
        [self.three_gpp, self.three_gpp2]
            .into_iter()
            .filter(|r| *r != AppResult::NotApplicable)
    }

    /// Aggregate verdict for the attempt.
    ///
    /// Activation fails only when every applicable family failed; a single
    /// surviving application is enough. Deactivation fails when any
    /// applicable family failed.
    pub fn verdict(&self, desired: SubState) -> Outcome {
        let failed = match desired {
            SubState::Active => {
                let mut applicable = self.applicable().peekable();
                applicable.peek().is_some() && applicable.all(|r| r == AppResult::Fail)
            }
            SubState::Inactive => self.applicable().any(|r| r == AppResult::Fail),
        };

        if failed {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}

/// What recording a completion did to the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Sibling family still outstanding
    Waiting { outstanding: u8 },
    /// Last outstanding result arrived; the transaction is idle again
    Resolved(AppResults),
    /// No request was outstanding for this slot
    Stray,
}

/// Set-uicc transaction state for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetUiccTransaction {
    #[default]
    Idle,
    Pending {
        outstanding: u8,
        results: AppResults,
    },
}

impl SetUiccTransaction {
    /// Account for a command about to be sent.
    ///
    /// Must run before the command goes out so that a fast completion can
    /// never observe an idle transaction.
    pub fn begin_request(&mut self) {
        match self {
            SetUiccTransaction::Idle => {
                *self = SetUiccTransaction::Pending {
                    outstanding: 1,
                    results: AppResults::default(),
                }
            }
            SetUiccTransaction::Pending { outstanding, .. } => {
                *outstanding = outstanding.saturating_add(1);
            }
        }
    }

    /// Record one family's completion
    pub fn record(&mut self, family: AppFamily, succeeded: bool) -> Progress {
        let SetUiccTransaction::Pending {
            outstanding,
            results,
        } = self
        else {
            return Progress::Stray;
        };

        *results.slot_for(family) = AppResult::from_completion(succeeded);
        *outstanding = outstanding.saturating_sub(1);

        if *outstanding > 0 {
            return Progress::Waiting {
                outstanding: *outstanding,
            };
        }

        let resolved = *results;
        *self = SetUiccTransaction::Idle;
        Progress::Resolved(resolved)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SetUiccTransaction::Pending { .. })
    }

    pub fn outstanding(&self) -> u8 {
        match self {
            SetUiccTransaction::Idle => 0,
            SetUiccTransaction::Pending { outstanding, .. } => *outstanding,
        }
    }

    /// Drop any partial results
    pub fn reset(&mut self) {
        *self = SetUiccTransaction::Idle;
    }
}

impl std::fmt::Display for SetUiccTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetUiccTransaction::Idle => f.write_str("idle"),
            SetUiccTransaction::Pending {
                outstanding,
                results,
            } => write!(
                f,
                "pending={} 3gpp={:?} 3gpp2={:?}",
                outstanding, results.three_gpp, results.three_gpp2
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppResult::{Fail, NotApplicable, Success};

    fn results(three_gpp: AppResult, three_gpp2: AppResult) -> AppResults {
        AppResults {
            three_gpp,
            three_gpp2,
        }
    }

    #[test]
    fn test_activation_truth_table() {
        let cases = [
            (Success, Success, Outcome::Success),
            (Success, Fail, Outcome::Success),
            (Fail, Success, Outcome::Success),
            (Fail, Fail, Outcome::Failure),
        ];
        for (a, b, expected) in cases {
            assert_eq!(
                results(a, b).verdict(SubState::Active),
                expected,
                "activate 3gpp={:?} 3gpp2={:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_deactivation_truth_table() {
        let cases = [
            (Success, Success, Outcome::Success),
            (Success, Fail, Outcome::Failure),
            (Fail, Success, Outcome::Failure),
            (Fail, Fail, Outcome::Failure),
        ];
        for (a, b, expected) in cases {
            assert_eq!(
                results(a, b).verdict(SubState::Inactive),
                expected,
                "deactivate 3gpp={:?} 3gpp2={:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_single_family_verdicts() {
        assert_eq!(
            results(Fail, NotApplicable).verdict(SubState::Active),
            Outcome::Failure
        );
        assert_eq!(
            results(NotApplicable, Success).verdict(SubState::Active),
            Outcome::Success
        );
        assert_eq!(
            results(NotApplicable, Fail).verdict(SubState::Inactive),
            Outcome::Failure
        );
        assert_eq!(
            results(NotApplicable, NotApplicable).verdict(SubState::Active),
            Outcome::Success
        );
    }

    #[test]
    fn test_waits_for_both_families() {
        let mut txn = SetUiccTransaction::default();
        txn.begin_request();
        txn.begin_request();
        assert_eq!(txn.outstanding(), 2);

        assert_eq!(
            txn.record(AppFamily::ThreeGpp2, true),
            Progress::Waiting { outstanding: 1 }
        );
        assert!(txn.is_pending());

        let progress = txn.record(AppFamily::ThreeGpp, false);
        assert_eq!(progress, Progress::Resolved(results(Fail, Success)));
        assert_eq!(txn, SetUiccTransaction::Idle);
    }

    #[test]
    fn test_arrival_order_is_irrelevant() {
        let mut forward = SetUiccTransaction::default();
        forward.begin_request();
        forward.begin_request();
        forward.record(AppFamily::ThreeGpp, true);
        let a = forward.record(AppFamily::ThreeGpp2, false);

        let mut reverse = SetUiccTransaction::default();
        reverse.begin_request();
        reverse.begin_request();
        reverse.record(AppFamily::ThreeGpp2, false);
        let b = reverse.record(AppFamily::ThreeGpp, true);

        assert_eq!(a, b);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_resolved_transaction_starts_clean() {
        let mut txn = SetUiccTransaction::default();
        txn.begin_request();
        txn.record(AppFamily::ThreeGpp, false);

        // Next attempt must not see the previous failure
        txn.begin_request();
        let progress = txn.record(AppFamily::ThreeGpp2, true);
        assert_eq!(progress, Progress::Resolved(results(NotApplicable, Success)));
    }

    #[test]
    fn test_stray_completion() {
        let mut txn = SetUiccTransaction::default();
        assert_eq!(txn.record(AppFamily::ThreeGpp, true), Progress::Stray);
        assert_eq!(txn, SetUiccTransaction::Idle);
    }

    #[test]
    fn test_reset_drops_partial_results() {
        let mut txn = SetUiccTransaction::default();
        txn.begin_request();
        txn.begin_request();
        txn.record(AppFamily::ThreeGpp, true);
        txn.reset();
        assert!(!txn.is_pending());
        assert_eq!(txn.to_string(), "idle");
    }
}

//! The shift ledger

use roster_api::{ActiveShift, LeaderboardEntry, RemovalOutcome, SessionRecord, ShiftStatus};
use roster_store::{LedgerState, LedgerStore};
use roster_util::{RosterError, Timestamp, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{DutyState, LedgerError, LedgerResult, active_shift};

/// What a wipe threw away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipeSummary {
    pub active_cleared: usize,
    pub history_cleared: usize,
}

/// Active shifts plus closed shift history, persisted after every change.
///
/// Every mutation runs against a copy of the state. The copy is saved and
/// only then replaces the in-memory state, so a failed save leaves the
/// ledger exactly as it was and the operation can simply be retried.
///
/// The ledger itself is not synchronized; the daemon keeps it behind a
/// single mutex and saves while holding it.
pub struct ShiftLedger {
    state: LedgerState,
    store: Arc<dyn LedgerStore>,
}

impl ShiftLedger {
    /// Load the ledger from `store`
    pub fn open(store: Arc<dyn LedgerStore>) -> LedgerResult<Self> {
        let state = store.load()?;
        info!(
            on_duty = state.active.len(),
            history = state.history.len(),
            "Shift ledger loaded"
        );
        Ok(Self { state, store })
    }

    /// Wrap an already loaded state
    pub fn new(state: LedgerState, store: Arc<dyn LedgerStore>) -> Self {
        Self { state, store }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    pub fn on_duty_count(&self) -> usize {
        self.state.active.len()
    }

    pub fn history_len(&self) -> usize {
        self.state.history.len()
    }

    pub fn duty_state(&self, user_id: &UserId) -> DutyState {
        DutyState::of(&self.state, user_id)
    }

    /// Put a member on duty
    pub fn start_shift(&mut self, user_id: &UserId, now: Timestamp) -> LedgerResult<Timestamp> {
        user_id.validate()?;

        if let DutyState::OnDuty { since } = self.duty_state(user_id) {
            debug!(user_id = %user_id, "Start refused, already on duty");
            return Err(LedgerError::AlreadyOnDuty {
                user_id: user_id.clone(),
                since,
            });
        }

        self.commit(|state| {
            state.active.insert(user_id.clone(), now);
            Ok(())
        })?;

        info!(user_id = %user_id, started_at = %now, "Shift started");
        Ok(now)
    }

    /// Take a member off duty, closing their shift into history
    pub fn stop_shift(&mut self, user_id: &UserId, now: Timestamp) -> LedgerResult<SessionRecord> {
        user_id.validate()?;

        let since = match self.duty_state(user_id) {
            DutyState::OnDuty { since } => since,
            DutyState::OffDuty => {
                debug!(user_id = %user_id, "Stop refused, not on duty");
                return Err(LedgerError::NotOnDuty {
                    user_id: user_id.clone(),
                });
            }
        };

        let end = if now < since {
            warn!(
                user_id = %user_id,
                start = %since,
                now = %now,
                "Shift end precedes its start, closing with zero length"
            );
            since
        } else {
            now
        };
        let record = SessionRecord::closed(user_id.clone(), since, end);

        self.commit(|state| {
            state.active.remove(user_id);
            state.history.push(record.clone());
            Ok(())
        })?;

        info!(
            user_id = %user_id,
            duration_secs = record.duration_secs(),
            "Shift ended"
        );
        Ok(record)
    }

    /// Sum of closed shift lengths; the current shift is not counted
    pub fn total_duty_time(&self, user_id: &UserId) -> f64 {
        self.records_for(user_id).map(SessionRecord::duration_secs).sum()
    }

    /// The member's last `n` records, oldest first
    pub fn recent_history(&self, user_id: &UserId, n: usize) -> Vec<SessionRecord> {
        let records: Vec<&SessionRecord> = self.records_for(user_id).collect();
        let skip = records.len().saturating_sub(n);
        records.into_iter().skip(skip).cloned().collect()
    }

    /// Top `n` members by closed duty time.
    ///
    /// Equal totals keep the order in which the members first appear in
    /// history. Records without a duration are ignored.
    pub fn leaderboard(&self, n: usize) -> Vec<LeaderboardEntry> {
        let mut totals: Vec<(&UserId, f64)> = Vec::new();
        let mut index: HashMap<&UserId, usize> = HashMap::new();

        for record in &self.state.history {
            let Some(duration) = record.duration else {
                continue;
            };
            match index.get(&record.user_id) {
                Some(&i) => totals[i].1 += duration,
                None => {
                    index.insert(&record.user_id, totals.len());
                    totals.push((&record.user_id, duration));
                }
            }
        }

        // sort_by is stable, so ties stay in first-appearance order
        totals.sort_by(|a, b| b.1.total_cmp(&a.1));

        totals
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, (user_id, total_seconds))| LeaderboardEntry {
                rank: i + 1,
                user_id: user_id.clone(),
                total_seconds,
            })
            .collect()
    }

    /// Everyone currently on duty, earliest start first
    pub fn active_shifts(&self, now: Timestamp) -> Vec<ActiveShift> {
        let mut shifts: Vec<ActiveShift> = self
            .state
            .active
            .iter()
            .map(|(user_id, &since)| active_shift(user_id, since, now))
            .collect();
        shifts.sort_by(|a, b| a.started_at.as_secs().total_cmp(&b.started_at.as_secs()));
        shifts
    }

    pub fn shift_status(&self, user_id: &UserId, now: Timestamp) -> ShiftStatus {
        self.duty_state(user_id)
            .to_status(user_id, now, self.total_duty_time(user_id))
    }

    /// Credit a member with a synthetic shift ending now
    pub fn admin_add_time(
        &mut self,
        user_id: &UserId,
        minutes: i64,
        now: Timestamp,
    ) -> LedgerResult<SessionRecord> {
        user_id.validate()?;
        let seconds = minutes_to_seconds(minutes)?;

        let record = SessionRecord {
            user_id: user_id.clone(),
            start: now.minus_secs(seconds),
            end: Some(now),
            duration: Some(seconds),
        };

        self.commit(|state| {
            state.history.push(record.clone());
            Ok(())
        })?;

        info!(user_id = %user_id, minutes, "Duty time added");
        Ok(record)
    }

    /// Take time off the member's most recent shift that can absorb all of it.
    ///
    /// The removal is never spread across several shifts. A shift brought
    /// down to zero is deleted.
    pub fn admin_remove_time(
        &mut self,
        user_id: &UserId,
        minutes: i64,
    ) -> LedgerResult<RemovalOutcome> {
        user_id.validate()?;
        let seconds = minutes_to_seconds(minutes)?;

        let position = self.state.history.iter().rposition(|r| {
            &r.user_id == user_id && r.duration.is_some_and(|d| d >= seconds)
        });
        let Some(position) = position else {
            debug!(user_id = %user_id, minutes, "No shift long enough for removal");
            return Err(LedgerError::NoSuitableShift {
                user_id: user_id.clone(),
                minutes,
            });
        };

        let adjusted = self.commit(|state| {
            let record = &mut state.history[position];
            let remaining = record.duration_secs() - seconds;
            if remaining <= 0.0 {
                state.history.remove(position);
                return Ok(None);
            }
            record.duration = Some(remaining);
            record.end = Some(record.start.plus_secs(remaining));
            Ok(Some(record.clone()))
        })?;

        info!(
            user_id = %user_id,
            minutes,
            deleted = adjusted.is_none(),
            "Duty time removed"
        );
        Ok(RemovalOutcome {
            user_id: user_id.clone(),
            removed_seconds: seconds,
            adjusted,
        })
    }

    /// Drop every open shift and all history
    pub fn wipe(&mut self) -> LedgerResult<WipeSummary> {
        let summary = WipeSummary {
            active_cleared: self.state.active.len(),
            history_cleared: self.state.history.len(),
        };

        self.commit(|state| {
            *state = LedgerState::default();
            Ok(())
        })?;

        warn!(
            active_cleared = summary.active_cleared,
            history_cleared = summary.history_cleared,
            "Ledger wiped"
        );
        Ok(summary)
    }

    fn records_for<'a>(&'a self, user_id: &'a UserId) -> impl Iterator<Item = &'a SessionRecord> {
        self.state
            .history
            .iter()
            .filter(move |r| &r.user_id == user_id)
    }

    /// Apply `change` to a copy, persist the copy, then adopt it
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut LedgerState) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut working = self.state.clone();
        let out = change(&mut working)?;

        if let Err(e) = self.store.save(&working) {
            warn!(error = %e, "Ledger save failed, change discarded");
            return Err(e.into());
        }

        self.state = working;
        Ok(out)
    }
}

fn minutes_to_seconds(minutes: i64) -> LedgerResult<f64> {
    if minutes <= 0 {
        return Err(RosterError::invalid_input(format!(
            "minutes must be positive, got {}",
            minutes
        ))
        .into());
    }
    Ok(minutes as f64 * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_store::MemoryStore;

    fn ts(secs: f64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn make_ledger() -> (ShiftLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = ShiftLedger::open(store.clone()).unwrap();
        (ledger, store)
    }

    #[test]
    fn test_start_then_stop_records_one_shift() {
        let (mut ledger, store) = make_ledger();
        let a = user("1001");

        ledger.start_shift(&a, ts(0.0)).unwrap();
        assert!(ledger.duty_state(&a).is_on_duty());

        let record = ledger.stop_shift(&a, ts(3600.0)).unwrap();
        assert_eq!(record.start, ts(0.0));
        assert_eq!(record.end, Some(ts(3600.0)));
        assert_eq!(record.duration, Some(3600.0));

        assert_eq!(ledger.history_len(), 1);
        assert!(!ledger.state().active.contains_key(&a));
        assert_eq!(ledger.total_duty_time(&a), 3600.0);

        // Both mutations were persisted
        assert_eq!(store.save_count(), 2);
        assert_eq!(&store.snapshot().unwrap(), ledger.state());
    }

    #[test]
    fn test_double_start_is_refused() {
        let (mut ledger, store) = make_ledger();
        let a = user("1001");

        ledger.start_shift(&a, ts(10.0)).unwrap();
        let before = ledger.state().clone();

        let err = ledger.start_shift(&a, ts(20.0)).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyOnDuty { since, .. } if since == ts(10.0)));
        assert!(err.is_expected());
        assert_eq!(ledger.state(), &before);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_stop_when_off_duty_is_refused() {
        let (mut ledger, store) = make_ledger();

        let err = ledger.stop_shift(&user("1001"), ts(10.0)).unwrap_err();
        assert!(matches!(err, LedgerError::NotOnDuty { .. }));
        assert!(ledger.state().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_stop_before_start_clamps_to_zero() {
        let (mut ledger, _) = make_ledger();
        let a = user("1001");

        ledger.start_shift(&a, ts(100.0)).unwrap();
        let record = ledger.stop_shift(&a, ts(90.0)).unwrap();
        assert_eq!(record.duration, Some(0.0));
        assert_eq!(record.end, Some(ts(100.0)));
    }

    #[test]
    fn test_malformed_user_id_is_invalid_input() {
        let (mut ledger, _) = make_ledger();

        let err = ledger.start_shift(&user("not-a-user"), ts(0.0)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert!(ledger.state().is_empty());
    }

    #[test]
    fn test_total_ignores_other_members_and_open_shift() {
        let (mut ledger, _) = make_ledger();
        let a = user("1");
        let b = user("2");

        ledger.start_shift(&a, ts(0.0)).unwrap();
        ledger.stop_shift(&a, ts(100.0)).unwrap();
        ledger.start_shift(&b, ts(0.0)).unwrap();
        ledger.stop_shift(&b, ts(500.0)).unwrap();
        ledger.start_shift(&a, ts(200.0)).unwrap();
        ledger.stop_shift(&a, ts(250.0)).unwrap();
        ledger.start_shift(&a, ts(300.0)).unwrap();

        assert_eq!(ledger.total_duty_time(&a), 150.0);
        assert_eq!(ledger.total_duty_time(&b), 500.0);
        assert_eq!(ledger.total_duty_time(&user("3")), 0.0);
    }

    #[test]
    fn test_recent_history_window() {
        let (mut ledger, _) = make_ledger();
        let a = user("1");
        let b = user("2");

        for i in 0..7 {
            let start = i as f64 * 1000.0;
            ledger.start_shift(&a, ts(start)).unwrap();
            ledger.stop_shift(&a, ts(start + 10.0 + i as f64)).unwrap();
            ledger.start_shift(&b, ts(start)).unwrap();
            ledger.stop_shift(&b, ts(start + 1.0)).unwrap();
        }

        let recent = ledger.recent_history(&a, 5);
        assert_eq!(recent.len(), 5);
        assert!(recent.iter().all(|r| r.user_id == a));
        // Oldest of the window first
        assert_eq!(recent[0].start, ts(2000.0));
        assert_eq!(recent[4].start, ts(6000.0));

        assert_eq!(ledger.recent_history(&a, 100).len(), 7);
        assert!(ledger.recent_history(&a, 0).is_empty());
        assert!(ledger.recent_history(&user("9"), 5).is_empty());
    }

    #[test]
    fn test_leaderboard_top_one() {
        let (mut ledger, _) = make_ledger();
        let a = user("1");
        let b = user("2");

        ledger.start_shift(&a, ts(0.0)).unwrap();
        ledger.stop_shift(&a, ts(3600.0)).unwrap();
        ledger.start_shift(&b, ts(0.0)).unwrap();
        ledger.stop_shift(&b, ts(7200.0)).unwrap();

        let top = ledger.leaderboard(1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].user_id, b);
        assert_eq!(top[0].total_seconds, 7200.0);
        assert_eq!(top[0].rank, 1);
    }

    #[test]
    fn test_leaderboard_ties_keep_first_appearance() {
        let (mut ledger, _) = make_ledger();

        for id in ["30", "10", "20"] {
            ledger.admin_add_time(&user(id), 10, ts(10_000.0)).unwrap();
        }
        ledger.admin_add_time(&user("40"), 20, ts(10_000.0)).unwrap();

        let board = ledger.leaderboard(10);
        let order: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["40", "30", "10", "20"]);
        assert_eq!(board[3].rank, 4);
    }

    #[test]
    fn test_active_shifts_ordered_by_start() {
        let (mut ledger, _) = make_ledger();

        ledger.start_shift(&user("1"), ts(300.0)).unwrap();
        ledger.start_shift(&user("2"), ts(100.0)).unwrap();
        ledger.start_shift(&user("3"), ts(200.0)).unwrap();

        let active = ledger.active_shifts(ts(400.0));
        let order: Vec<&str> = active.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(order, vec!["2", "3", "1"]);
        assert_eq!(active[0].elapsed_seconds, 300.0);
    }

    #[test]
    fn test_shift_status() {
        let (mut ledger, _) = make_ledger();
        let a = user("1");

        ledger.admin_add_time(&a, 1, ts(50.0)).unwrap();
        ledger.start_shift(&a, ts(100.0)).unwrap();

        let status = ledger.shift_status(&a, ts(130.0));
        assert!(status.on_duty);
        assert_eq!(status.started_at, Some(ts(100.0)));
        assert_eq!(status.current_elapsed, Some(30.0));
        assert_eq!(status.total_seconds, 60.0);
    }

    #[test]
    fn test_add_time_synthesizes_record() {
        let (mut ledger, _) = make_ledger();
        let a = user("1");

        let record = ledger.admin_add_time(&a, 30, ts(10_000.0)).unwrap();
        assert_eq!(record.start, ts(8200.0));
        assert_eq!(record.end, Some(ts(10_000.0)));
        assert_eq!(record.duration, Some(1800.0));
        assert!(ledger.state().active.is_empty());
    }

    #[test]
    fn test_add_then_remove_restores_total() {
        let (mut ledger, _) = make_ledger();
        let a = user("1");

        ledger.start_shift(&a, ts(0.0)).unwrap();
        ledger.stop_shift(&a, ts(600.0)).unwrap();
        let before = ledger.total_duty_time(&a);

        ledger.admin_add_time(&a, 30, ts(5000.0)).unwrap();
        let outcome = ledger.admin_remove_time(&a, 30).unwrap();

        assert_eq!(outcome.removed_seconds, 1800.0);
        assert!(outcome.adjusted.is_none());
        assert!((ledger.total_duty_time(&a) - before).abs() < 1e-9);
        assert_eq!(ledger.history_len(), 1);
    }

    #[test]
    fn test_remove_picks_most_recent_qualifying_shift() {
        let (mut ledger, _) = make_ledger();
        let a = user("1");

        ledger.admin_add_time(&a, 60, ts(10_000.0)).unwrap();
        ledger.admin_add_time(&a, 5, ts(20_000.0)).unwrap();

        // The 5 minute shift is newer but too short
        let outcome = ledger.admin_remove_time(&a, 10).unwrap();
        let adjusted = outcome.adjusted.unwrap();
        assert_eq!(adjusted.duration, Some(3000.0));
        assert_eq!(adjusted.end, Some(adjusted.start.plus_secs(3000.0)));
        assert_eq!(ledger.state().history[0], adjusted);
        assert_eq!(ledger.state().history[1].duration, Some(300.0));
    }

    #[test]
    fn test_remove_without_suitable_shift() {
        let (mut ledger, store) = make_ledger();
        let a = user("1");

        ledger.admin_add_time(&a, 10, ts(1000.0)).unwrap();
        ledger.admin_add_time(&a, 10, ts(2000.0)).unwrap();
        let before = ledger.state().clone();

        // 20 minutes exist in total, but no single shift holds them
        let err = ledger.admin_remove_time(&a, 20).unwrap_err();
        assert!(matches!(err, LedgerError::NoSuitableShift { minutes: 20, .. }));
        assert_eq!(ledger.state(), &before);
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn test_non_positive_minutes_rejected() {
        let (mut ledger, _) = make_ledger();
        let a = user("1");

        for minutes in [0, -5] {
            assert!(matches!(
                ledger.admin_add_time(&a, minutes, ts(0.0)),
                Err(LedgerError::InvalidInput(_))
            ));
            assert!(matches!(
                ledger.admin_remove_time(&a, minutes),
                Err(LedgerError::InvalidInput(_))
            ));
        }
        assert!(ledger.state().is_empty());
    }

    #[test]
    fn test_wipe_clears_everything() {
        let (mut ledger, store) = make_ledger();
        let a = user("1");

        ledger.admin_add_time(&a, 10, ts(1000.0)).unwrap();
        ledger.start_shift(&a, ts(2000.0)).unwrap();
        ledger.start_shift(&user("2"), ts(2000.0)).unwrap();

        let summary = ledger.wipe().unwrap();
        assert_eq!(summary.active_cleared, 2);
        assert_eq!(summary.history_cleared, 1);
        assert!(ledger.state().is_empty());
        assert_eq!(ledger.total_duty_time(&a), 0.0);
        assert!(store.snapshot().unwrap().is_empty());

        // Wiping an empty ledger is fine too
        assert_eq!(ledger.wipe().unwrap().history_cleared, 0);
    }

    #[test]
    fn test_failed_save_leaves_state_unchanged() {
        let (mut ledger, store) = make_ledger();
        let a = user("1");

        ledger.start_shift(&a, ts(0.0)).unwrap();
        let before = ledger.state().clone();

        store.set_fail_saves(true);
        let err = ledger.stop_shift(&a, ts(100.0)).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert!(!err.is_expected());
        assert_eq!(ledger.state(), &before);
        assert!(ledger.wipe().is_err());
        assert_eq!(ledger.state(), &before);

        // Retry succeeds once the store recovers
        store.set_fail_saves(false);
        ledger.stop_shift(&a, ts(100.0)).unwrap();
        assert_eq!(ledger.total_duty_time(&a), 100.0);
    }

    #[test]
    fn test_open_reads_existing_state() {
        let mut state = LedgerState::default();
        state.active.insert(user("7"), ts(42.0));
        let store = Arc::new(MemoryStore::with_state(state));

        let ledger = ShiftLedger::open(store).unwrap();
        assert_eq!(ledger.on_duty_count(), 1);
        assert_eq!(
            ledger.duty_state(&user("7")),
            DutyState::OnDuty { since: ts(42.0) }
        );
    }

    #[test]
    fn test_legacy_open_records_count_as_zero() {
        let mut state = LedgerState::default();
        state.history.push(SessionRecord {
            user_id: user("1"),
            start: ts(0.0),
            end: None,
            duration: None,
        });
        let store = Arc::new(MemoryStore::with_state(state));
        let mut ledger = ShiftLedger::open(store).unwrap();

        assert_eq!(ledger.total_duty_time(&user("1")), 0.0);
        assert!(ledger.leaderboard(10).is_empty());
        assert_eq!(ledger.recent_history(&user("1"), 5).len(), 1);
        assert!(matches!(
            ledger.admin_remove_time(&user("1"), 1),
            Err(LedgerError::NoSuitableShift { .. })
        ));
    }
}

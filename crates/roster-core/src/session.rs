//! Per-member duty state

use roster_api::{ActiveShift, ShiftStatus};
use roster_store::LedgerState;
use roster_util::{Timestamp, UserId};

/// Where a member stands right now.
///
/// Not stored anywhere: a member is on duty exactly when the ledger has an
/// open shift for them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DutyState {
    OffDuty,
    OnDuty { since: Timestamp },
}

impl DutyState {
    pub fn of(state: &LedgerState, user_id: &UserId) -> Self {
        match state.active.get(user_id) {
            Some(&since) => DutyState::OnDuty { since },
            None => DutyState::OffDuty,
        }
    }

    pub fn is_on_duty(&self) -> bool {
        matches!(self, DutyState::OnDuty { .. })
    }

    /// Seconds into the current shift, never negative
    pub fn elapsed(&self, now: Timestamp) -> Option<f64> {
        match self {
            DutyState::OnDuty { since } => Some(now.seconds_since(*since).max(0.0)),
            DutyState::OffDuty => None,
        }
    }

    /// Build the status view for `user_id`
    pub fn to_status(&self, user_id: &UserId, now: Timestamp, total_seconds: f64) -> ShiftStatus {
        ShiftStatus {
            user_id: user_id.clone(),
            on_duty: self.is_on_duty(),
            started_at: match self {
                DutyState::OnDuty { since } => Some(*since),
                DutyState::OffDuty => None,
            },
            current_elapsed: self.elapsed(now),
            total_seconds,
        }
    }
}

/// Open shift view, as listed for staff
pub fn active_shift(user_id: &UserId, since: Timestamp, now: Timestamp) -> ActiveShift {
    ActiveShift {
        user_id: user_id.clone(),
        started_at: since,
        elapsed_seconds: now.seconds_since(since).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_member_is_off_duty() {
        let state = LedgerState::default();
        let duty = DutyState::of(&state, &UserId::new("1"));
        assert_eq!(duty, DutyState::OffDuty);
        assert_eq!(duty.elapsed(Timestamp::from_secs(100.0)), None);
    }

    #[test]
    fn open_shift_is_on_duty() {
        let mut state = LedgerState::default();
        state
            .active
            .insert(UserId::new("1"), Timestamp::from_secs(100.0));

        let duty = DutyState::of(&state, &UserId::new("1"));
        assert!(duty.is_on_duty());
        assert_eq!(duty.elapsed(Timestamp::from_secs(160.0)), Some(60.0));

        let status = duty.to_status(&UserId::new("1"), Timestamp::from_secs(160.0), 7.0);
        assert!(status.on_duty);
        assert_eq!(status.started_at, Some(Timestamp::from_secs(100.0)));
        assert_eq!(status.total_seconds, 7.0);
    }

    #[test]
    fn elapsed_is_never_negative() {
        let duty = DutyState::OnDuty {
            since: Timestamp::from_secs(500.0),
        };
        assert_eq!(duty.elapsed(Timestamp::from_secs(400.0)), Some(0.0));
    }
}

//! Role-based access checks

use roster_api::{AccessLevel, Caller, Command};
use roster_config::AccessConfig;
use roster_util::{RoleId, UserId};
use std::collections::HashSet;
use tracing::debug;

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied { reason: String },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }

    fn denied(reason: impl Into<String>) -> Self {
        AccessDecision::Denied {
            reason: reason.into(),
        }
    }
}

/// Decides who may run which ledger operation.
///
/// Admin roles also satisfy staff checks. Role membership comes from the
/// caller as resolved by the chat platform.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    staff_roles: HashSet<RoleId>,
    admin_roles: HashSet<RoleId>,
}

impl AccessPolicy {
    pub fn new(
        staff_roles: impl IntoIterator<Item = RoleId>,
        admin_roles: impl IntoIterator<Item = RoleId>,
    ) -> Self {
        Self {
            staff_roles: staff_roles.into_iter().collect(),
            admin_roles: admin_roles.into_iter().collect(),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.staff_roles.clone(), config.admin_roles.clone())
    }

    pub fn is_admin(&self, caller: &Caller) -> bool {
        self.admin_roles.iter().any(|r| caller.has_role(r))
    }

    pub fn is_staff(&self, caller: &Caller) -> bool {
        self.is_admin(caller) || self.staff_roles.iter().any(|r| caller.has_role(r))
    }

    /// Check `caller` against `level` for an operation on `target`
    pub fn authorize(
        &self,
        caller: &Caller,
        target: Option<&UserId>,
        level: AccessLevel,
    ) -> AccessDecision {
        match level {
            AccessLevel::SelfService => match target {
                Some(target) if *target == caller.user_id => AccessDecision::Granted,
                _ => AccessDecision::denied("You can only do this for yourself"),
            },
            AccessLevel::Staff if self.is_staff(caller) => AccessDecision::Granted,
            AccessLevel::Staff => {
                AccessDecision::denied("You do not have permission to use this command")
            }
            AccessLevel::Admin if self.is_admin(caller) => AccessDecision::Granted,
            AccessLevel::Admin => {
                AccessDecision::denied("Only administrators can use this command")
            }
        }
    }

    /// Check `caller` for `command`, routing it to the level it needs.
    ///
    /// Acting on yourself is self-service; acting on someone else needs
    /// staff (to look) or admin (to change).
    pub fn check_command(&self, caller: &Caller, command: &Command) -> AccessDecision {
        let decision = match required_level(caller, command) {
            None => AccessDecision::Granted,
            Some((level, target)) => self.authorize(caller, target, level),
        };

        if let AccessDecision::Denied { reason } = &decision {
            debug!(
                caller = %caller.user_id,
                command = command.name(),
                reason = %reason,
                "Access denied"
            );
        }
        decision
    }
}

/// Level `command` requires from `caller`, with the member it targets.
/// `None` means anyone may run it.
pub fn required_level<'a>(
    caller: &Caller,
    command: &'a Command,
) -> Option<(AccessLevel, Option<&'a UserId>)> {
    let own_or = |user_id: &'a UserId, other: AccessLevel| {
        if *user_id == caller.user_id {
            (AccessLevel::SelfService, Some(user_id))
        } else {
            (other, Some(user_id))
        }
    };

    match command {
        Command::StartShift { user_id } | Command::StopShift { user_id } => {
            Some(own_or(user_id, AccessLevel::Admin))
        }
        Command::ShiftStatus { user_id }
        | Command::TotalDutyTime { user_id }
        | Command::RecentHistory { user_id, .. } => Some(own_or(user_id, AccessLevel::Staff)),
        Command::ActiveShifts => Some((AccessLevel::Staff, None)),
        Command::AdminAddTime { user_id, .. } | Command::AdminRemoveTime { user_id, .. } => {
            Some((AccessLevel::Admin, Some(user_id)))
        }
        Command::Wipe { .. } => Some((AccessLevel::Admin, None)),
        Command::Leaderboard { .. }
        | Command::SubscribeEvents
        | Command::UnsubscribeEvents
        | Command::GetHealth
        | Command::Ping => None,
    }
}

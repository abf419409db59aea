//! Request handling: trust, caller and access checks, then the ledger

use roster_api::{
    API_VERSION, ClientInfo, Command, ErrorCode, ErrorInfo, Event, HealthStatus, Request,
    Response, ResponsePayload,
};
use roster_config::{LedgerSettings, MAX_QUERY_LIMIT, MIN_QUERY_LIMIT, Policy};
use roster_core::{AccessDecision, AccessPolicy, LedgerError, LedgerEvent, ShiftLedger};
use roster_util::{Clock, RosterError, Timestamp};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// What the daemon does after a request has been handled
#[derive(Debug)]
pub struct Outcome {
    pub response: Response,
    /// Broadcast to subscribers once the ledger lock has been released
    pub event: Option<Event>,
    /// Change to this client's event subscription
    pub subscribe: Option<bool>,
}

impl Outcome {
    fn reply(response: Response) -> Self {
        Self {
            response,
            event: None,
            subscribe: None,
        }
    }
}

struct Rules {
    access: AccessPolicy,
    settings: LedgerSettings,
}

/// Shared by every connection. The ledger sits behind a single mutex that
/// is held across both mutation and save.
pub struct Handler {
    ledger: Arc<Mutex<ShiftLedger>>,
    rules: RwLock<Rules>,
    clock: Arc<dyn Clock>,
}

impl Handler {
    pub fn new(ledger: ShiftLedger, policy: &Policy, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            rules: RwLock::new(Rules {
                access: AccessPolicy::from_config(&policy.access),
                settings: policy.ledger,
            }),
            clock,
        }
    }

    /// Swap in new roles and query defaults
    pub async fn reload(&self, policy: &Policy) {
        let mut rules = self.rules.write().await;
        rules.access = AccessPolicy::from_config(&policy.access);
        rules.settings = policy.ledger;
        info!(
            staff_roles = policy.access.staff_roles.len(),
            admin_roles = policy.access.admin_roles.len(),
            "Access rules reloaded"
        );
    }

    pub fn ledger(&self) -> &Arc<Mutex<ShiftLedger>> {
        &self.ledger
    }

    pub async fn handle(&self, client: &ClientInfo, request: Request) -> Outcome {
        let request_id = request.request_id;

        if request.api_version != API_VERSION {
            return Outcome::reply(Response::error(
                request_id,
                ErrorInfo::new(
                    ErrorCode::InvalidRequest,
                    format!(
                        "Unsupported API version {} (expected {})",
                        request.api_version, API_VERSION
                    ),
                ),
            ));
        }

        if !request.command.touches_ledger() {
            return self.handle_control(client, request_id, request.command).await;
        }

        if let Some(refused) = refuse_untrusted(client, request_id, &request.command) {
            return refused;
        }

        let Some(caller) = request.caller else {
            return Outcome::reply(Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::InvalidRequest, "Ledger commands need a caller"),
            ));
        };
        if let Err(e) = caller.user_id.validate() {
            return Outcome::reply(Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::InvalidInput, e.to_string()),
            ));
        }

        let command = request.command;
        let settings = {
            let rules = self.rules.read().await;
            if let AccessDecision::Denied { reason } = rules.access.check_command(&caller, &command)
            {
                warn!(
                    caller = %caller.user_id,
                    command = command.name(),
                    "Permission denied"
                );
                return Outcome::reply(Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::PermissionDenied, reason),
                ));
            }
            rules.settings
        };

        let name = command.name();
        let result = {
            let mut ledger = self.ledger.lock().await;
            // Read under the lock so timestamps follow commit order
            let now = self.clock.now();
            dispatch(&mut ledger, command, now, settings)
        };

        match result {
            Ok((payload, event)) => {
                debug!(caller = %caller.user_id, command = name, "Command completed");
                Outcome {
                    response: Response::success(request_id, payload),
                    event: event.map(|e| Event::new(e.into_payload(caller.user_id))),
                    subscribe: None,
                }
            }
            Err(e) => {
                if e.is_expected() {
                    debug!(caller = %caller.user_id, command = name, error = %e, "Command refused");
                } else {
                    error!(caller = %caller.user_id, command = name, error = %e, "Command failed");
                }
                Outcome::reply(Response::error(request_id, error_info(&e)))
            }
        }
    }

    /// Commands answered without touching the ledger
    async fn handle_control(
        &self,
        client: &ClientInfo,
        request_id: u64,
        command: Command,
    ) -> Outcome {
        match command {
            Command::Ping => Outcome::reply(Response::success(request_id, ResponsePayload::Pong)),
            Command::GetHealth => {
                let health = self.health().await;
                Outcome::reply(Response::success(
                    request_id,
                    ResponsePayload::Health(health),
                ))
            }
            Command::SubscribeEvents | Command::UnsubscribeEvents => {
                if let Some(refused) = refuse_untrusted(client, request_id, &command) {
                    return refused;
                }
                let subscribe = matches!(command, Command::SubscribeEvents);
                let payload = if subscribe {
                    ResponsePayload::Subscribed {
                        client_id: client.client_id.clone(),
                    }
                } else {
                    ResponsePayload::Unsubscribed
                };
                Outcome {
                    response: Response::success(request_id, payload),
                    event: None,
                    subscribe: Some(subscribe),
                }
            }
            other => {
                error!(command = other.name(), "Ledger command routed as a control command");
                Outcome::reply(Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::InternalError, "Command could not be routed"),
                ))
            }
        }
    }

    async fn health(&self) -> HealthStatus {
        let ledger = self.ledger.lock().await;
        let store_ok = ledger.store_healthy();
        HealthStatus {
            live: true,
            ready: store_ok,
            store_ok,
            on_duty_count: ledger.on_duty_count(),
            history_len: ledger.history_len(),
        }
    }
}

fn refuse_untrusted(client: &ClientInfo, request_id: u64, command: &Command) -> Option<Outcome> {
    if client.trust.can_use_ledger() {
        return None;
    }
    warn!(
        client_id = %client.client_id,
        uid = ?client.uid,
        command = command.name(),
        "Untrusted client refused"
    );
    Some(Outcome::reply(Response::error(
        request_id,
        ErrorInfo::new(
            ErrorCode::UntrustedClient,
            "This connection may only check health",
        ),
    )))
}

type Dispatched = (ResponsePayload, Option<LedgerEvent>);

fn dispatch(
    ledger: &mut ShiftLedger,
    command: Command,
    now: Timestamp,
    settings: LedgerSettings,
) -> Result<Dispatched, LedgerError> {
    let dispatched = match command {
        Command::StartShift { user_id } => {
            let started_at = ledger.start_shift(&user_id, now)?;
            let total_seconds = ledger.total_duty_time(&user_id);
            (
                ResponsePayload::ShiftStarted {
                    user_id: user_id.clone(),
                    started_at,
                    total_seconds,
                },
                Some(LedgerEvent::ShiftStarted {
                    user_id,
                    started_at,
                }),
            )
        }

        Command::StopShift { user_id } => {
            let record = ledger.stop_shift(&user_id, now)?;
            let total_seconds = ledger.total_duty_time(&user_id);
            (
                ResponsePayload::ShiftStopped {
                    record: record.clone(),
                    total_seconds,
                },
                Some(LedgerEvent::ShiftEnded { record }),
            )
        }

        Command::ShiftStatus { user_id } => (
            ResponsePayload::Status(ledger.shift_status(&user_id, now)),
            None,
        ),

        Command::TotalDutyTime { user_id } => {
            let total_seconds = ledger.total_duty_time(&user_id);
            (
                ResponsePayload::TotalDutyTime {
                    user_id,
                    total_seconds,
                },
                None,
            )
        }

        Command::RecentHistory { user_id, limit } => {
            let n = query_limit(limit, settings.history_window)?;
            let records = ledger.recent_history(&user_id, n);
            (ResponsePayload::History { user_id, records }, None)
        }

        Command::Leaderboard { limit } => {
            let n = query_limit(limit, settings.leaderboard_size)?;
            (
                ResponsePayload::Leaderboard {
                    entries: ledger.leaderboard(n),
                },
                None,
            )
        }

        Command::ActiveShifts => (
            ResponsePayload::ActiveShifts {
                shifts: ledger.active_shifts(now),
            },
            None,
        ),

        Command::AdminAddTime { user_id, minutes } => {
            let record = ledger.admin_add_time(&user_id, minutes, now)?;
            (
                ResponsePayload::TimeAdded {
                    record: record.clone(),
                },
                Some(LedgerEvent::TimeAdded { record }),
            )
        }

        Command::AdminRemoveTime { user_id, minutes } => {
            let outcome = ledger.admin_remove_time(&user_id, minutes)?;
            (
                ResponsePayload::TimeRemoved(outcome.clone()),
                Some(LedgerEvent::TimeRemoved(outcome)),
            )
        }

        Command::Wipe { confirm } => {
            if !confirm {
                return Err(RosterError::invalid_input("Wipe must be confirmed").into());
            }
            let summary = ledger.wipe()?;
            (
                ResponsePayload::Wiped {
                    active_cleared: summary.active_cleared,
                    history_cleared: summary.history_cleared,
                },
                Some(LedgerEvent::Wiped(summary)),
            )
        }

        // Answered before the ledger is locked
        Command::SubscribeEvents
        | Command::UnsubscribeEvents
        | Command::GetHealth
        | Command::Ping => {
            return Err(RosterError::invalid_input("Command does not use the ledger").into());
        }
    };

    Ok(dispatched)
}

fn query_limit(requested: Option<usize>, default: usize) -> Result<usize, LedgerError> {
    match requested {
        None => Ok(default),
        Some(n) if (MIN_QUERY_LIMIT..=MAX_QUERY_LIMIT).contains(&n) => Ok(n),
        Some(n) => Err(RosterError::invalid_input(format!(
            "limit must be between {} and {}, got {}",
            MIN_QUERY_LIMIT, MAX_QUERY_LIMIT, n
        ))
        .into()),
    }
}

fn error_info(err: &LedgerError) -> ErrorInfo {
    match err {
        LedgerError::AlreadyOnDuty { .. } => {
            ErrorInfo::new(ErrorCode::AlreadyOnDuty, err.to_string())
        }
        LedgerError::NotOnDuty { .. } => ErrorInfo::new(ErrorCode::NotOnDuty, err.to_string()),
        LedgerError::NoSuitableShift { .. } => {
            ErrorInfo::new(ErrorCode::NoSuitableShift, err.to_string())
        }
        LedgerError::InvalidInput(e) => ErrorInfo::new(ErrorCode::InvalidInput, e.to_string()),
        // Storage details stay in the daemon log
        LedgerError::Storage(_) => ErrorInfo::new(
            ErrorCode::StorageError,
            "Shift data could not be saved, nothing was changed",
        ),
    }
}

//! Integration tests for rosterd
//!
//! These tests drive the ledger, and the request handler in front of it,
//! against the real JSON file store.

use roster_api::{Caller, ClientInfo, ClientTrust, Command, Request, ResponseResult};
use roster_config::parse_config;
use roster_core::{AccessPolicy, LedgerError, ShiftLedger};
use roster_store::{JsonFileStore, LedgerStore, StoreError};
use roster_util::{ManualClock, RoleId, Timestamp, UserId, format_duration};
use rosterd::Handler;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const ADMIN_ROLE: &str = "1385160436046893168";

const CONFIG: &str = r#"
    config_version = 1

    [access]
    staff_roles = ["1384466481831608381"]
    admin_roles = ["1385160436046893168"]

    [ledger]
    history_window = 3
"#;

fn ts(secs: f64) -> Timestamp {
    Timestamp::from_secs(secs)
}

fn open(path: &Path) -> ShiftLedger {
    ShiftLedger::open(Arc::new(JsonFileStore::new(path))).unwrap()
}

#[test]
fn test_config_drives_access() {
    let policy = parse_config(CONFIG).unwrap();
    let access = AccessPolicy::from_config(&policy.access);
    assert_eq!(policy.ledger.history_window, 3);

    let staff = Caller::new(UserId::new("1")).with_roles([RoleId::new("1384466481831608381")]);
    let admin = Caller::new(UserId::new("2")).with_roles([RoleId::new("1385160436046893168")]);

    assert!(access.check_command(&staff, &Command::ActiveShifts).is_granted());
    assert!(
        !access
            .check_command(&staff, &Command::Wipe { confirm: true })
            .is_granted()
    );
    assert!(
        access
            .check_command(&admin, &Command::Wipe { confirm: true })
            .is_granted()
    );
}

#[test]
fn test_shift_lifecycle_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shifts.json");
    let a = UserId::new("1001");

    let mut ledger = open(&path);
    ledger.start_shift(&a, ts(0.0)).unwrap();
    assert!(path.exists());

    let record = ledger.stop_shift(&a, ts(3600.0)).unwrap();
    assert_eq!(record.duration, Some(3600.0));
    assert_eq!(ledger.total_duty_time(&a), 3600.0);
    assert_eq!(format_duration(ledger.total_duty_time(&a)), "1:00:00");

    let on_disk = JsonFileStore::new(&path).load().unwrap();
    assert_eq!(&on_disk, ledger.state());
}

#[test]
fn test_restart_keeps_everything() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shifts.json");
    let a = UserId::new("1");
    let b = UserId::new("2");

    let before = {
        let mut ledger = open(&path);
        ledger.start_shift(&a, ts(100.0)).unwrap();
        ledger.stop_shift(&a, ts(1100.5)).unwrap();
        ledger.admin_add_time(&b, 45, ts(5000.0)).unwrap();
        ledger.start_shift(&b, ts(6000.25)).unwrap();
        ledger.state().clone()
    };

    let ledger = open(&path);
    assert_eq!(ledger.state(), &before);
    assert!(ledger.duty_state(&b).is_on_duty());
    assert_eq!(ledger.total_duty_time(&a), 1000.5);
    assert_eq!(ledger.leaderboard(1)[0].user_id, b);
}

#[test]
fn test_legacy_file_loads_and_is_preserved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shifts.json");
    std::fs::write(
        &path,
        r#"{
    "active": {
        "300": 1700000500.5
    },
    "history": [
        {
            "user_id": "100",
            "start": 1700000000.0,
            "end": 1700003600.0,
            "duration": 3600.0
        },
        {
            "user_id": "200",
            "start": 1700000000.0
        },
        {
            "user_id": "200",
            "start": 1700000000.0,
            "end": 1700007200.0,
            "duration": 7200.0
        }
    ]
}"#,
    )
    .unwrap();

    let mut ledger = open(&path);
    assert_eq!(ledger.history_len(), 3);
    assert_eq!(ledger.total_duty_time(&UserId::new("200")), 7200.0);

    let board = ledger.leaderboard(10);
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].user_id, UserId::new("200"));

    // A write keeps the legacy record untouched
    ledger
        .stop_shift(&UserId::new("300"), ts(1_700_001_000.5))
        .unwrap();
    let reloaded = open(&path);
    assert!(reloaded.state().history[1].is_ongoing());
    assert_eq!(reloaded.history_len(), 4);
}

#[test]
fn test_corrupt_file_blocks_open_until_quarantined() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shifts.json");
    std::fs::write(&path, "{\"active\": {").unwrap();

    let store = Arc::new(JsonFileStore::new(&path));
    let err = match ShiftLedger::open(store.clone()) {
        Ok(_) => panic!("corrupt ledger opened"),
        Err(e) => e,
    };
    assert!(matches!(
        err,
        LedgerError::Storage(StoreError::Corrupt { .. })
    ));
    assert!(!err.is_expected());

    let moved = store.quarantine().unwrap().unwrap();
    assert!(moved.exists());

    let ledger = ShiftLedger::open(store).unwrap();
    assert!(ledger.state().is_empty());
}

#[test]
fn test_wipe_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shifts.json");

    let mut ledger = open(&path);
    ledger.admin_add_time(&UserId::new("1"), 10, ts(1000.0)).unwrap();
    ledger.start_shift(&UserId::new("2"), ts(1000.0)).unwrap();
    ledger.wipe().unwrap();

    let reloaded = open(&path);
    assert!(reloaded.state().is_empty());
    assert_eq!(reloaded.total_duty_time(&UserId::new("1")), 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_lose_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shifts.json");
    let policy = parse_config(CONFIG).unwrap();
    let clock = Arc::new(ManualClock::new(ts(10_000.0)));
    let handler = Arc::new(Handler::new(open(&path), &policy, clock.clone()));
    let client = ClientInfo::new(ClientTrust::Trusted).with_uid(1000);
    let admin = Caller::new(UserId::new("9")).with_roles([RoleId::new(ADMIN_ROLE)]);

    let mut tasks = Vec::new();
    for i in 0..32u32 {
        let handler = handler.clone();
        let client = client.clone();
        let admin = admin.clone();
        let clock = clock.clone();
        tasks.push(tokio::spawn(async move {
            let own = UserId::new((1000 + i).to_string());
            let me = Caller::new(own.clone());
            let steps = [
                (me.clone(), Command::StartShift { user_id: own.clone() }),
                (
                    admin,
                    Command::AdminAddTime {
                        user_id: UserId::new("1"),
                        minutes: 1,
                    },
                ),
                (me, Command::StopShift { user_id: own }),
            ];

            for (n, (caller, command)) in steps.into_iter().enumerate() {
                tokio::task::yield_now().await;
                clock.advance(1.0);
                let request = Request::new(n as u64 + 1, command).with_caller(caller);
                let outcome = handler.handle(&client, request).await;
                assert!(
                    matches!(outcome.response.result, ResponseResult::Ok(_)),
                    "request failed: {:?}",
                    outcome.response
                );
                assert!(outcome.event.is_some());
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let in_memory = handler.ledger().lock().await.state().clone();
    let reloaded = open(&path);
    assert_eq!(reloaded.state(), &in_memory);
    assert_eq!(reloaded.history_len(), 64);
    assert!(reloaded.state().active.is_empty());
    assert_eq!(reloaded.total_duty_time(&UserId::new("1")), 32.0 * 60.0);
    for i in 0..32u32 {
        let own = UserId::new((1000 + i).to_string());
        assert_eq!(reloaded.recent_history(&own, 10).len(), 1);
    }
}

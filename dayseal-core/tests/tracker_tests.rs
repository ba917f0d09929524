//! End-to-end tracker scenarios with in-process relays.

use async_trait::async_trait;
use dayseal_core::{PublishMode, SessionState, Tracker, TrackerConfig, TrackerError};
use dayseal_crypto::Identity;
use dayseal_relay::{Filter, RelayConnection, RelayError, RelayEvent, RelayResult};
use dayseal_types::{AlcoholLevel, DailyRecord, RecordDate, TempGoalDef, TriState};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SECRET: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5";

// ═══════════════════════════════════════════════════════════════════════════
// Fake relay
// ═══════════════════════════════════════════════════════════════════════════

/// Keeps the latest event per author, kind and `d` tag.
struct MemoryRelay {
    url: String,
    accepts: bool,
    stored: Arc<Mutex<Vec<RelayEvent>>>,
}

impl MemoryRelay {
    fn new(name: &str, accepts: bool) -> Arc<Self> {
        Arc::new(Self {
            url: format!("wss://{name}.relay.test"),
            accepts,
            stored: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Shares `other`'s events but rejects every publish.
    fn read_only_view(other: &Arc<Self>, name: &str) -> Arc<Self> {
        Arc::new(Self {
            url: format!("wss://{name}.relay.test"),
            accepts: false,
            stored: Arc::clone(&other.stored),
        })
    }

    fn len(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl RelayConnection for MemoryRelay {
    fn url(&self) -> &str {
        &self.url
    }

    async fn publish(&self, event: &RelayEvent) -> RelayResult<()> {
        if !self.accepts {
            return Err(RelayError::Rejected {
                relay: self.url.clone(),
                message: "blocked: read-only".into(),
            });
        }
        let mut stored = self.stored.lock().unwrap();
        stored.retain(|e| {
            !(e.pubkey == event.pubkey && e.kind == event.kind && e.d_tag() == event.d_tag())
        });
        stored.push(event.clone());
        Ok(())
    }

    async fn query(&self, filter: &Filter) -> RelayResult<Vec<RelayEvent>> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

/// Accepts everything after a fixed delay and stores nothing.
struct SlowRelay {
    delay: Duration,
}

#[async_trait]
impl RelayConnection for SlowRelay {
    fn url(&self) -> &str {
        "wss://slow.relay.test"
    }

    async fn publish(&self, _event: &RelayEvent) -> RelayResult<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn query(&self, _filter: &Filter) -> RelayResult<Vec<RelayEvent>> {
        Ok(Vec::new())
    }
}

fn relays(list: &[&Arc<MemoryRelay>]) -> Vec<Arc<dyn RelayConnection>> {
    list.iter()
        .map(|r| Arc::clone(r) as Arc<dyn RelayConnection>)
        .collect()
}

async fn tracker_with(mode: PublishMode, list: &[&Arc<MemoryRelay>]) -> Tracker {
    let config = TrackerConfig {
        publish_mode: mode,
        ..Default::default()
    };
    Tracker::open_with_relays(config, relays(list)).await.unwrap()
}

fn date(s: &str) -> RecordDate {
    RecordDate::parse(s).unwrap()
}

fn record(d: &str) -> DailyRecord {
    let mut record = DailyRecord::new(date(d));
    record.alcohol = AlcoholLevel::Low;
    record.follow_meal_plan = true;
    record.exercise = true;
    record
}

// ── Session ──────────────────────────────────────────────────────

#[tokio::test]
async fn setup_lock_unlock_and_wrong_pin() {
    let relay = MemoryRelay::new("a", true);
    let tracker = tracker_with(PublishMode::Await, &[&relay]).await;
    assert_eq!(tracker.status().await, SessionState::NoIdentity);

    tracker.setup(SECRET, "1234").await.unwrap();
    let public_id = tracker.public_id().await.unwrap();
    assert_eq!(public_id, Identity::from_secret(SECRET).unwrap().public_id());
    assert_eq!(
        tracker.status().await,
        SessionState::Unlocked {
            public_id: public_id.clone()
        }
    );

    tracker.lock().await;
    assert_eq!(
        tracker.status().await,
        SessionState::Locked {
            public_id: public_id.clone()
        }
    );

    tracker.unlock("1234").await.unwrap();
    assert_eq!(tracker.public_id().await, Some(public_id.clone()));

    tracker.lock().await;
    assert!(matches!(
        tracker.unlock("9999").await,
        Err(TrackerError::IncorrectPin)
    ));
    assert_eq!(tracker.status().await, SessionState::Locked { public_id });
}

#[tokio::test]
async fn second_setup_requires_reset() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    tracker.setup(SECRET, "1234").await.unwrap();
    assert!(matches!(
        tracker.setup(SECRET, "5678").await,
        Err(TrackerError::IdentityExists)
    ));
}

#[tokio::test]
async fn generated_identity_can_be_reentered() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    let secret = tracker.setup_new("2468").await.unwrap();
    assert!(secret.starts_with("nsec1"));
    assert_eq!(
        tracker.public_id().await,
        Some(Identity::from_secret(&secret).unwrap().public_id())
    );
}

#[tokio::test]
async fn reset_clears_identity_and_records() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    tracker.setup(SECRET, "1234").await.unwrap();
    tracker.save_record(&record("2024-03-05")).await.unwrap();
    tracker
        .save_temp_goal(&TempGoalDef::new("read", "Read", date("2024-03-01")).unwrap())
        .await
        .unwrap();

    tracker.reset().await.unwrap();
    assert_eq!(tracker.status().await, SessionState::NoIdentity);
    assert_eq!(tracker.public_id().await, None);
    assert!(matches!(
        tracker.unlock("1234").await,
        Err(TrackerError::NoIdentity)
    ));

    tracker.setup(SECRET, "1234").await.unwrap();
    assert!(tracker.load_all_records().await.unwrap().is_empty());
    assert_eq!(tracker.temp_goals().await.unwrap().len(), 1);
}

// ── Records ──────────────────────────────────────────────────────

#[tokio::test]
async fn saved_record_reloads_exactly_and_by_range() {
    let relay = MemoryRelay::new("a", true);
    let tracker = tracker_with(PublishMode::Await, &[&relay]).await;
    tracker.setup(SECRET, "1234").await.unwrap();

    let mut saved = record("2024-03-05");
    saved.set_temp_goal("no-coffee", TriState::Yes);
    saved.set_temp_goal("read", TriState::NotApplicable);
    tracker.save_record(&saved).await.unwrap();

    assert_eq!(
        tracker.load_record(date("2024-03-05")).await.unwrap(),
        Some(saved.clone())
    );
    assert_eq!(tracker.load_record(date("2024-03-06")).await.unwrap(), None);

    let march = tracker
        .load_records_in_range(date("2024-03-01"), date("2024-03-31"))
        .await
        .unwrap();
    assert_eq!(march, vec![saved.clone()]);

    let month = tracker.load_month(2024, 3).await.unwrap();
    assert_eq!(month.get(&date("2024-03-05")), Some(&saved));
    assert!(tracker.load_month(2024, 4).await.unwrap().is_empty());

    // Await mode published before returning.
    assert_eq!(relay.len(), 1);
}

#[tokio::test]
async fn saving_a_date_twice_keeps_the_latest() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    tracker.setup(SECRET, "1234").await.unwrap();

    let mut r = record("2024-03-05");
    tracker.save_record(&r).await.unwrap();
    r.exercise = false;
    tracker.save_record(&r).await.unwrap();

    let all = tracker.load_all_records().await.unwrap();
    assert_eq!(all, vec![r]);
}

#[tokio::test]
async fn load_all_is_sorted() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    tracker.setup(SECRET, "1234").await.unwrap();
    for d in ["2024-03-05", "2023-12-31", "2024-01-15"] {
        tracker.save_record(&record(d)).await.unwrap();
    }
    let dates: Vec<String> = tracker
        .load_all_records()
        .await
        .unwrap()
        .iter()
        .map(|r| r.date.to_string())
        .collect();
    assert_eq!(dates, ["2023-12-31", "2024-01-15", "2024-03-05"]);
}

#[tokio::test]
async fn record_operations_need_an_unlocked_session() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    assert!(matches!(
        tracker.save_record(&record("2024-03-05")).await,
        Err(TrackerError::NotAuthenticated)
    ));

    tracker.setup(SECRET, "1234").await.unwrap();
    tracker.save_record(&record("2024-03-05")).await.unwrap();
    tracker.lock().await;

    assert!(matches!(
        tracker.load_record(date("2024-03-05")).await,
        Err(TrackerError::NotAuthenticated)
    ));
    assert!(matches!(
        tracker.load_all_records().await,
        Err(TrackerError::NotAuthenticated)
    ));
    assert!(matches!(
        tracker.backup_all(|_, _| {}).await,
        Err(TrackerError::NotAuthenticated)
    ));
    assert!(matches!(
        tracker.restore_from_relays().await,
        Err(TrackerError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn invalid_month_is_rejected() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    tracker.setup(SECRET, "1234").await.unwrap();
    assert!(matches!(
        tracker.load_month(2024, 13).await,
        Err(TrackerError::Types(_))
    ));
}

// ── Backup & restore ─────────────────────────────────────────────

#[tokio::test]
async fn backup_then_restore_on_another_device() {
    let good = MemoryRelay::new("good", true);
    let read_only = MemoryRelay::new("read-only", false);

    let first = tracker_with(PublishMode::Background, &[&read_only, &good]).await;
    first.setup(SECRET, "1234").await.unwrap();
    assert_eq!(first.last_sync_time().await.unwrap(), None);
    for d in ["2024-03-01", "2024-03-02", "2024-03-03"] {
        first.save_record(&record(d)).await.unwrap();
    }

    let mut progress = Vec::new();
    let accepted = first
        .backup_all(|done, total| progress.push((done, total)))
        .await
        .unwrap();
    assert_eq!(accepted, 3);
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert!(first.last_sync_time().await.unwrap().is_some());
    first.close().await.unwrap();
    assert_eq!(good.len(), 3);

    let second = tracker_with(PublishMode::Await, &[&read_only, &good]).await;
    second.setup(SECRET, "4321").await.unwrap();
    assert_eq!(second.restore_from_relays().await.unwrap(), 3);
    assert!(second.last_sync_time().await.unwrap().is_some());

    let restored = second.load_all_records().await.unwrap();
    assert_eq!(
        restored,
        vec![record("2024-03-01"), record("2024-03-02"), record("2024-03-03")]
    );
}

#[tokio::test]
async fn restore_overwrites_local_edits_and_is_idempotent() {
    let relay = MemoryRelay::new("a", true);
    let mirror = MemoryRelay::read_only_view(&relay, "mirror");
    let remote = record("2024-03-05");

    let phone = tracker_with(PublishMode::Await, &[&relay]).await;
    phone.setup(SECRET, "1234").await.unwrap();
    phone.save_record(&remote).await.unwrap();

    // The laptop can read the relay but its own saves are rejected.
    let laptop = tracker_with(PublishMode::Await, &[&mirror]).await;
    laptop.setup(SECRET, "5678").await.unwrap();
    let mut local = remote.clone();
    local.alcohol = AlcoholLevel::High;
    laptop.save_record(&local).await.unwrap();
    assert_eq!(
        laptop.load_record(date("2024-03-05")).await.unwrap(),
        Some(local)
    );

    assert_eq!(laptop.restore_from_relays().await.unwrap(), 1);
    assert_eq!(
        laptop.load_record(date("2024-03-05")).await.unwrap(),
        Some(remote.clone())
    );
    assert_eq!(laptop.restore_from_relays().await.unwrap(), 1);
    assert_eq!(laptop.load_all_records().await.unwrap(), vec![remote]);
}

#[tokio::test]
async fn lock_does_not_wait_for_a_running_backup() {
    let slow: Arc<dyn RelayConnection> = Arc::new(SlowRelay {
        delay: Duration::from_millis(200),
    });
    let config = TrackerConfig {
        publish_mode: PublishMode::Background,
        ..Default::default()
    };
    let tracker = Tracker::open_with_relays(config, vec![slow]).await.unwrap();
    tracker.setup(SECRET, "1234").await.unwrap();
    for day in 1..=5 {
        tracker
            .save_record(&record(&format!("2024-03-{day:02}")))
            .await
            .unwrap();
    }

    let (accepted, locked) = tokio::join!(tracker.backup_all(|_, _| {}), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::timeout(Duration::from_millis(500), tracker.lock())
            .await
            .is_ok()
    });

    assert!(locked, "lock() stalled behind backup_all");
    assert!(matches!(
        tracker.status().await,
        SessionState::Locked { .. }
    ));
    // Events were signed before the lock, so the backup still completes.
    assert_eq!(accepted.unwrap(), 5);
}

#[tokio::test]
async fn restore_with_no_remote_data() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    tracker.setup(SECRET, "1234").await.unwrap();
    assert_eq!(tracker.restore_from_relays().await.unwrap(), 0);
    assert!(tracker.load_all_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn close_drains_background_publishes() {
    let relay = MemoryRelay::new("a", true);
    let tracker = tracker_with(PublishMode::Background, &[&relay]).await;
    tracker.setup(SECRET, "1234").await.unwrap();
    for day in 1..=5 {
        tracker
            .save_record(&record(&format!("2024-04-{day:02}")))
            .await
            .unwrap();
    }
    tracker.close().await.unwrap();
    assert_eq!(relay.len(), 5);
}

#[tokio::test]
async fn failing_relays_do_not_fail_saves() {
    let rejecting = MemoryRelay::new("a", false);
    let tracker = tracker_with(PublishMode::Await, &[&rejecting]).await;
    tracker.setup(SECRET, "1234").await.unwrap();
    tracker.save_record(&record("2024-03-05")).await.unwrap();
    assert_eq!(
        tracker.backup_all(|_, _| {}).await.unwrap(),
        0
    );
    assert!(tracker.load_record(date("2024-03-05")).await.unwrap().is_some());
}

// ── Temporary goals & scoring ────────────────────────────────────

#[tokio::test]
async fn temp_goals_are_managed_while_locked() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;

    let mut goal = TempGoalDef::new("no-coffee", "No coffee", date("2024-03-01")).unwrap();
    tracker.save_temp_goal(&goal).await.unwrap();
    goal.end_date = Some(date("2024-03-10"));
    tracker.save_temp_goal(&goal).await.unwrap();

    assert_eq!(tracker.temp_goals().await.unwrap(), vec![goal.clone()]);
    assert_eq!(
        tracker.active_temp_goals(date("2024-03-05")).await.unwrap(),
        vec![goal]
    );
    assert!(tracker.active_temp_goals(date("2024-03-11")).await.unwrap().is_empty());

    assert!(tracker.remove_temp_goal("no-coffee").await.unwrap());
    assert!(!tracker.remove_temp_goal("no-coffee").await.unwrap());
}

#[tokio::test]
async fn removing_a_goal_keeps_historical_answers() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    tracker.setup(SECRET, "1234").await.unwrap();
    tracker
        .save_temp_goal(&TempGoalDef::new("read", "Read", date("2024-03-01")).unwrap())
        .await
        .unwrap();

    let mut r = record("2024-03-05");
    r.set_temp_goal("read", TriState::Yes);
    tracker.save_record(&r).await.unwrap();
    tracker.remove_temp_goal("read").await.unwrap();

    let loaded = tracker.load_record(date("2024-03-05")).await.unwrap().unwrap();
    assert_eq!(loaded.temp_goal("read"), TriState::Yes);
}

#[tokio::test]
async fn day_score_uses_stored_goals() {
    let tracker = tracker_with(PublishMode::Await, &[&MemoryRelay::new("a", true)]).await;
    let mut perfect = DailyRecord::new(date("2024-03-05"));
    perfect.follow_meal_plan = true;
    perfect.ten_thousand_steps = true;
    perfect.exercise = true;
    assert!((tracker.day_score(&perfect).await.unwrap() - 1.0).abs() < 1e-9);

    tracker
        .save_temp_goal(&TempGoalDef::new("read", "Read", date("2024-03-01")).unwrap())
        .await
        .unwrap();
    perfect.set_temp_goal("read", TriState::No);
    // Base questions carry 0.95, the failed goal 0.05.
    assert!((tracker.day_score(&perfect).await.unwrap() - 0.95).abs() < 1e-9);
}

// ── Persistence ──────────────────────────────────────────────────

#[tokio::test]
async fn reopened_store_starts_locked() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrackerConfig {
        db_path: Some(dir.path().join("dayseal.duckdb")),
        publish_mode: PublishMode::Await,
        ..Default::default()
    };
    let relay = MemoryRelay::new("a", true);

    let tracker = Tracker::open_with_relays(config.clone(), relays(&[&relay]))
        .await
        .unwrap();
    tracker.setup(SECRET, "1234").await.unwrap();
    tracker.save_record(&record("2024-03-05")).await.unwrap();
    let public_id = tracker.public_id().await.unwrap();
    tracker.close().await.unwrap();

    let reopened = Tracker::open_with_relays(config, relays(&[&relay]))
        .await
        .unwrap();
    assert_eq!(reopened.status().await, SessionState::Locked { public_id });
    reopened.unlock("1234").await.unwrap();
    assert_eq!(
        reopened.load_record(date("2024-03-05")).await.unwrap(),
        Some(record("2024-03-05"))
    );
}

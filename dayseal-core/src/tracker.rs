//! The tracker facade used by the presentation layer.

use crate::config::{PublishMode, TrackerConfig};
use crate::error::{TrackerError, TrackerResult};
use crate::publisher::{PublisherHandle, spawn_publisher};
use crate::records::RecordBook;
use crate::run_blocking;
use crate::session::{AuthSession, SessionState};
use chrono::{DateTime, Utc};
use dayseal_crypto::Identity;
use dayseal_relay::{RelayConnection, RelayEvent, RelaySync};
use dayseal_storage::LocalStore;
use dayseal_types::{
    DailyRecord, RecordDate, ScoringPolicy, SyncMeta, TempGoalDef, WeightedScoring, month_range,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// One user's tracker: local encrypted records, the auth session and relay
/// backup.
///
/// Record operations need an unlocked session and fail with
/// [`TrackerError::NotAuthenticated`] otherwise. Temporary goal
/// definitions are not secret and are available while locked.
pub struct Tracker {
    store: LocalStore,
    session: RwLock<AuthSession>,
    records: RecordBook,
    sync: RelaySync,
    publish_mode: PublishMode,
    publisher: Option<(PublisherHandle, JoinHandle<()>)>,
    scoring: Arc<dyn ScoringPolicy>,
}

impl Tracker {
    /// Opens the store and connects to the configured relays over WebSocket.
    pub async fn open(config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        let sync = RelaySync::new(config.relay.clone())?;
        Self::assemble(config, sync).await
    }

    /// Like [`Tracker::open`] with the relays supplied by the caller.
    pub async fn open_with_relays(
        config: TrackerConfig,
        relays: Vec<Arc<dyn RelayConnection>>,
    ) -> TrackerResult<Self> {
        config.validate()?;
        let sync = RelaySync::with_relays(config.relay.clone(), relays)?;
        Self::assemble(config, sync).await
    }

    async fn assemble(config: TrackerConfig, sync: RelaySync) -> TrackerResult<Self> {
        let store = match config.db_path.clone() {
            Some(path) => run_blocking(move || Ok(LocalStore::open(&path)?)).await?,
            None => LocalStore::open_in_memory()?,
        };
        let session = AuthSession::open(store.clone()).await?;
        let publisher = match config.publish_mode {
            PublishMode::Background => {
                Some(spawn_publisher(sync.clone(), config.publish_queue_capacity))
            }
            PublishMode::Await => None,
        };
        info!(relays = sync.relay_urls().len(), mode = ?config.publish_mode, "tracker opened");
        Ok(Self {
            records: RecordBook::new(store.clone()),
            store,
            session: RwLock::new(session),
            sync,
            publish_mode: config.publish_mode,
            publisher,
            scoring: Arc::new(WeightedScoring::default()),
        })
    }

    /// Replaces the default [`WeightedScoring`].
    pub fn with_scoring(mut self, scoring: Arc<dyn ScoringPolicy>) -> Self {
        self.scoring = scoring;
        self
    }

    // ── Session ──────────────────────────────────────────────────

    pub async fn status(&self) -> SessionState {
        self.session.read().await.state()
    }

    /// Portable public encoding, visible while locked.
    pub async fn public_id(&self) -> Option<String> {
        self.session.read().await.public_id().map(str::to_string)
    }

    pub async fn setup(&self, secret: &str, pin: &str) -> TrackerResult<()> {
        self.session.write().await.setup(secret, pin).await
    }

    /// Sets up a freshly generated identity and returns its secret encoding
    /// for the user to back up.
    pub async fn setup_new(&self, pin: &str) -> TrackerResult<Zeroizing<String>> {
        let secret = Identity::generate().secret_encoding()?;
        self.setup(&secret, pin).await?;
        Ok(secret)
    }

    pub async fn unlock(&self, pin: &str) -> TrackerResult<()> {
        self.session.write().await.unlock(pin).await
    }

    pub async fn lock(&self) {
        self.session.write().await.lock();
    }

    /// Deletes the identity and all local records. Goal definitions and
    /// sync metadata are kept.
    pub async fn reset(&self) -> TrackerResult<()> {
        self.session.write().await.reset().await
    }

    // ── Records ──────────────────────────────────────────────────

    /// Stores `record` locally, then publishes it per the publish mode.
    /// Only local failures are returned.
    pub async fn save_record(&self, record: &DailyRecord) -> TrackerResult<()> {
        let event = {
            let session = self.session.read().await;
            let identity = session.identity()?;
            let sealed = self.records.save(identity, record).await?;
            self.sync.prepare(&sealed, identity)?
        };
        self.dispatch(event).await;
        Ok(())
    }

    async fn dispatch(&self, event: RelayEvent) {
        match (&self.publish_mode, &self.publisher) {
            (PublishMode::Background, Some((handle, _))) => {
                if let Err(e) = handle.submit(event).await {
                    warn!("could not queue relay publish: {e}");
                }
            }
            _ => {
                let report = self.sync.broadcast(&event).await;
                if !report.is_accepted() {
                    warn!(event = %event.id, "publish reached no relay");
                }
            }
        }
    }

    pub async fn load_record(&self, date: RecordDate) -> TrackerResult<Option<DailyRecord>> {
        let session = self.session.read().await;
        self.records.load(session.identity()?, date).await
    }

    pub async fn load_records_in_range(
        &self,
        start: RecordDate,
        end: RecordDate,
    ) -> TrackerResult<Vec<DailyRecord>> {
        let session = self.session.read().await;
        self.records.load_range(session.identity()?, start, end).await
    }

    pub async fn load_month(
        &self,
        year: i32,
        month: u32,
    ) -> TrackerResult<BTreeMap<RecordDate, DailyRecord>> {
        let (start, end) = month_range(year, month)?;
        let records = self.load_records_in_range(start, end).await?;
        Ok(records.into_iter().map(|r| (r.date, r)).collect())
    }

    /// Every record in date order.
    pub async fn load_all_records(&self) -> TrackerResult<Vec<DailyRecord>> {
        let session = self.session.read().await;
        self.records.load_all(session.identity()?).await
    }

    // ── Relay backup ─────────────────────────────────────────────

    /// Publishes every local record, one at a time. Returns how many at
    /// least one relay accepted. The session is not held during network
    /// I/O, so the user can lock mid-backup.
    pub async fn backup_all<F>(&self, on_progress: F) -> TrackerResult<usize>
    where
        F: FnMut(usize, usize) + Send,
    {
        // The session guard is released before any network I/O.
        let events = {
            let session = self.session.read().await;
            let identity = session.identity()?;
            let sealed = self.records.sealed_all().await?;
            self.sync.prepare_all(&sealed, identity)
        };
        info!(records = events.len(), "backup started");
        let accepted = self.sync.broadcast_all(&events, on_progress).await;
        self.touch_last_sync().await?;
        Ok(accepted)
    }

    /// Fetches this identity's records from the relays and upserts them,
    /// replacing local records for the same dates.
    pub async fn restore_from_relays(&self) -> TrackerResult<usize> {
        let public = {
            let session = self.session.read().await;
            *session.identity()?.public_key()
        };
        info!("restore started");
        let fetched = self.sync.fetch_all(&public).await;
        let merged = self.records.merge(fetched).await?;
        self.touch_last_sync().await?;
        info!(merged, "restore finished");
        Ok(merged)
    }

    pub async fn last_sync_time(&self) -> TrackerResult<Option<DateTime<Utc>>> {
        let store = self.store.clone();
        let meta = run_blocking(move || Ok(store.get_sync_meta()?)).await?;
        Ok(meta.and_then(|m| DateTime::from_timestamp_millis(m.last_sync_time)))
    }

    async fn touch_last_sync(&self) -> TrackerResult<()> {
        let store = self.store.clone();
        let meta = SyncMeta {
            last_sync_time: Utc::now().timestamp_millis(),
        };
        run_blocking(move || Ok(store.set_sync_meta(meta)?)).await
    }

    // ── Temporary goals ──────────────────────────────────────────

    /// Creates or edits a goal definition. The id is the key.
    pub async fn save_temp_goal(&self, goal: &TempGoalDef) -> TrackerResult<()> {
        let store = self.store.clone();
        let goal = goal.clone();
        run_blocking(move || Ok(store.put_temp_goal(&goal)?)).await
    }

    /// Deletes a definition. Answers already in records are untouched.
    pub async fn remove_temp_goal(&self, id: &str) -> TrackerResult<bool> {
        let store = self.store.clone();
        let id = id.to_string();
        run_blocking(move || Ok(store.delete_temp_goal(&id)?)).await
    }

    pub async fn temp_goals(&self) -> TrackerResult<Vec<TempGoalDef>> {
        let store = self.store.clone();
        run_blocking(move || Ok(store.temp_goals()?)).await
    }

    /// Goals that apply on `date`.
    pub async fn active_temp_goals(&self, date: RecordDate) -> TrackerResult<Vec<TempGoalDef>> {
        Ok(self
            .temp_goals()
            .await?
            .into_iter()
            .filter(|g| g.is_active_on(date))
            .collect())
    }

    /// Scores `record` against the stored goal definitions.
    pub async fn day_score(&self, record: &DailyRecord) -> TrackerResult<f64> {
        let goals = self.temp_goals().await?;
        Ok(self.scoring.day_score(record, &goals))
    }

    // ── Shutdown ─────────────────────────────────────────────────

    /// Waits for queued background publishes, then shuts the worker down.
    pub async fn close(mut self) -> TrackerResult<()> {
        if let Some((handle, task)) = self.publisher.take() {
            handle.stop().await?;
            task.await?;
        }
        self.session.write().await.lock();
        info!("tracker closed");
        Ok(())
    }
}

//! Daily records and their sealed forms.

use crate::date::RecordDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Singleton key of the sealed identity record.
pub const IDENTITY_RECORD_ID: &str = "primary";

/// How much alcohol was consumed on a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlcoholLevel {
    High,
    Medium,
    Low,
    #[default]
    None,
}

/// Answer to a temporary goal for one day.
///
/// Persisted as `true` / `false` / `null` so payloads stay readable by
/// older clients. `NotApplicable` excludes the goal from scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriState {
    Yes,
    No,
    #[default]
    NotApplicable,
}

impl TriState {
    pub fn as_option(self) -> Option<bool> {
        match self {
            TriState::Yes => Some(true),
            TriState::No => Some(false),
            TriState::NotApplicable => None,
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => TriState::Yes,
            Some(false) => TriState::No,
            None => TriState::NotApplicable,
        }
    }
}

impl Serialize for TriState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TriState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<bool>::deserialize(deserializer).map(TriState::from)
    }
}

/// One day's answers. At most one per date; the date is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: RecordDate,
    pub alcohol: AlcoholLevel,
    pub follow_meal_plan: bool,
    pub eat_sugar: bool,
    pub ten_thousand_steps: bool,
    pub exercise: bool,
    /// Answers to temporary goals, keyed by goal id. Absent in payloads
    /// written before temporary goals existed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub temp_goals: BTreeMap<String, TriState>,
}

impl DailyRecord {
    /// A blank record with the same defaults the entry form starts from.
    pub fn new(date: RecordDate) -> Self {
        Self {
            date,
            alcohol: AlcoholLevel::None,
            follow_meal_plan: false,
            eat_sugar: false,
            ten_thousand_steps: false,
            exercise: false,
            temp_goals: BTreeMap::new(),
        }
    }

    /// Answer for a temporary goal; unanswered goals read as `NotApplicable`.
    pub fn temp_goal(&self, id: &str) -> TriState {
        self.temp_goals.get(id).copied().unwrap_or_default()
    }

    pub fn set_temp_goal(&mut self, id: impl Into<String>, answer: TriState) {
        self.temp_goals.insert(id.into(), answer);
    }
}

/// Encrypted form of a [`DailyRecord`] as stored locally and published to
/// relays. The date stays in plaintext because it is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedRecord {
    pub date: RecordDate,
    /// Versioned self-encryption payload, base64.
    pub ciphertext: String,
}

/// Persisted identity secret, wrapped under a PIN-derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedIdentity {
    pub id: String,
    /// AES-GCM ciphertext of the portable secret encoding, base64.
    pub encrypted_secret: String,
    pub salt: String,
    pub iv: String,
    /// Portable public encoding. Not secret.
    pub public_id: String,
}

/// Sync bookkeeping. Singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    /// Unix time in milliseconds of the last completed backup or restore.
    pub last_sync_time: i64,
}

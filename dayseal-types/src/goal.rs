//! Temporary goal definitions.

use crate::date::RecordDate;
use crate::error::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};

const MAX_GOAL_ID_LEN: usize = 64;

/// An ad hoc tracked behavior, active from its creation date until its
/// optional end date (inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempGoalDef {
    /// Slug identifier. Immutable once created; answers in historical
    /// records refer to it.
    pub id: String,
    pub label: String,
    pub short_label: String,
    #[serde(default)]
    pub streak_label: String,
    pub created_date: RecordDate,
    #[serde(default)]
    pub end_date: Option<RecordDate>,
}

impl TempGoalDef {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        created_date: RecordDate,
    ) -> TypesResult<Self> {
        let label = label.into();
        let def = Self {
            id: id.into(),
            short_label: label.clone(),
            streak_label: String::new(),
            label,
            created_date,
            end_date: None,
        };
        def.validate()?;
        Ok(def)
    }

    /// Checks the id slug and that the end date does not precede the start.
    pub fn validate(&self) -> TypesResult<()> {
        if !is_valid_goal_id(&self.id) {
            return Err(TypesError::InvalidGoalId(self.id.clone()));
        }
        if let Some(end) = self.end_date {
            if end < self.created_date {
                return Err(TypesError::InvalidGoalRange {
                    id: self.id.clone(),
                    start: self.created_date.to_string(),
                    end: end.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Whether the goal applies on `date`.
    pub fn is_active_on(&self, date: RecordDate) -> bool {
        self.created_date <= date && self.end_date.is_none_or(|end| date <= end)
    }
}

/// Lowercase ASCII letters, digits and inner hyphens; 1 to 64 chars.
pub fn is_valid_goal_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_GOAL_ID_LEN
        && !id.starts_with('-')
        && !id.ends_with('-')
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Goals active on `date`, in the order given.
pub fn active_temp_goals(defs: &[TempGoalDef], date: RecordDate) -> Vec<&TempGoalDef> {
    defs.iter().filter(|d| d.is_active_on(date)).collect()
}

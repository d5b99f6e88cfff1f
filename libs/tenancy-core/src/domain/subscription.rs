use crate::CoreError;
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEntry {
    pub id: String,
    pub tenant_id: String,
    pub expiry_date: DateTime<Utc>,
    pub is_demo: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum SubscriptionError {
    #[error("Core Error: {0}")]
    Core(#[from] CoreError),
    #[error("Subscription cannot be backdated (current: {current}, requested: {requested})")]
    Backdated {
        current: DateTime<Utc>,
        requested: DateTime<Utc>,
    },
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

/// `now` plus a whole number of calendar months.
pub fn months_from(now: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>, SubscriptionError> {
    now.checked_add_months(Months::new(months))
        .ok_or_else(|| SubscriptionError::InvalidDuration(format!("{} months", months)))
}

impl SubscriptionEntry {
    pub fn for_months(
        tenant_id: impl Into<String>,
        months: u32,
        is_demo: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, SubscriptionError> {
        if months == 0 {
            return Err(SubscriptionError::InvalidDuration(
                "Duration must be at least one month".into(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            expiry_date: months_from(now, months)?,
            is_demo,
        })
    }

    pub fn demo_for_days(
        tenant_id: impl Into<String>,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, SubscriptionError> {
        if days == 0 {
            return Err(SubscriptionError::InvalidDuration(
                "Duration must be at least one day".into(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            expiry_date: now + Duration::days(i64::from(days)),
            is_demo: true,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date > now
    }

    /// Moves the expiry forward. Anything not strictly later is rejected and
    /// leaves the entry untouched.
    pub fn renew(&mut self, new_expiry: DateTime<Utc>) -> Result<(), SubscriptionError> {
        if new_expiry <= self.expiry_date {
            return Err(SubscriptionError::Backdated {
                current: self.expiry_date,
                requested: new_expiry,
            });
        }
        self.expiry_date = new_expiry;
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job sent to the admin of a freshly provisioned tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeNotification {
    pub tenant_id: String,
    pub tenant_name: String,
    pub admin_email: String,
    pub subscription_expiry: DateTime<Utc>,
    pub site_url: String,
}

impl WelcomeNotification {
    pub fn subject(&self) -> &'static str {
        "Subscription Created"
    }
}

//! Desk configuration

use stripe_pay_core::DashboardUrl;

/// Connection settings for the stripe-pay server
#[derive(Clone, Debug)]
pub struct DeskConfig {
    /// Server base URL
    pub base_url: String,

    /// API token, sent as `Authorization: token <value>`
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Link target for "View Stripe Session"
    pub dashboard: DashboardUrl,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            token: None,
            timeout_secs: 30,
            dashboard: DashboardUrl::default(),
        }
    }
}

impl DeskConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("STRIPE_PAY_URL").unwrap_or(defaults.base_url);
        let token = std::env::var("STRIPE_PAY_TOKEN").ok().filter(|t| !t.is_empty());
        let timeout_secs = std::env::var("STRIPE_PAY_TIMEOUT")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        let dashboard = DashboardUrl {
            template: std::env::var("STRIPE_DASHBOARD_URL").unwrap_or(defaults.dashboard.template),
            account: std::env::var("STRIPE_CONNECTED_ACCOUNT").unwrap_or_default(),
        };

        Self {
            base_url,
            token,
            timeout_secs,
            dashboard,
        }
    }
}

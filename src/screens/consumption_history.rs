use std::sync::Arc;

use crate::adapters::api::BillingApi;
use crate::domain::models::Consumption;
use crate::screens::Alerter;

pub struct ConsumptionHistoryScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    pub history: Vec<Consumption>,
    busy: bool,
}

impl ConsumptionHistoryScreen {
    pub async fn init(api: Arc<dyn BillingApi>, alerts: Arc<dyn Alerter>) -> Self {
        let mut screen = Self {
            api,
            alerts,
            history: Vec::new(),
            busy: false,
        };
        screen.load().await;
        screen
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn load(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        match self.api.consumption_history().await {
            Ok(history) => self.history = history,
            Err(error) => {
                self.alerts.alert(
                    "Error",
                    &format!("Unable to load consumption history: {error}"),
                );
            }
        }
        self.busy = false;
    }

    /// Total volume across the loaded readings, for the summary header.
    pub fn total_volume(&self) -> f64 {
        self.history.iter().map(|entry| entry.volume).sum()
    }
}

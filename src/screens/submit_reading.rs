use std::sync::Arc;

use chrono::Utc;

use crate::adapters::api::{ApiError, BillingApi};
use crate::domain::models::{Meter, NewReading};
use crate::screens::{Alerter, Navigator};

pub struct SubmitReadingScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    navigator: Arc<dyn Navigator>,
    pub meters: Vec<Meter>,
    pub selected_meter: Option<i64>,
    pub value: f64,
    busy: bool,
}

impl SubmitReadingScreen {
    pub async fn init(
        api: Arc<dyn BillingApi>,
        alerts: Arc<dyn Alerter>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let mut screen = Self {
            api,
            alerts,
            navigator,
            meters: Vec::new(),
            selected_meter: None,
            value: 0.0,
            busy: false,
        };
        screen.load_meters().await;
        screen
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn load_meters(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        match self.api.my_meters().await {
            Ok(meters) => {
                // A single meter needs no picker interaction.
                if meters.len() == 1 {
                    self.selected_meter = Some(meters[0].id);
                }
                self.meters = meters;
            }
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to load your meters: {error}"));
            }
        }
        self.busy = false;
    }

    pub async fn submit(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        self.try_submit().await;
        self.busy = false;
    }

    async fn try_submit(&mut self) {
        let Some(meter_id) = self.selected_meter else {
            self.alerts
                .alert("Meter Required", "Please select a meter first.");
            return;
        };

        let reading = NewReading {
            meter_id,
            value: self.value,
            date: Utc::now(),
        };

        match self.api.submit_reading(&reading).await {
            Ok(()) => {
                self.alerts
                    .alert("Reading Submitted", "Your consumption reading was registered.");
                self.navigator.back();
            }
            Err(ApiError::Rejected { message, .. }) => {
                self.alerts.alert("Error", &message);
            }
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to submit reading: {error}"));
            }
        }
    }
}

use std::sync::Arc;

use crate::adapters::api::{ApiError, BillingApi};
use crate::domain::models::{MeterStatus, TariffBracket};
use crate::screens::Alerter;

/// Meter request status plus the public tariff table. The two sections load
/// independently: one failing must not blank the other.
pub struct RatesStatusScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    pub meters: Vec<MeterStatus>,
    pub tariffs: Vec<TariffBracket>,
    busy: bool,
}

impl RatesStatusScreen {
    pub async fn init(api: Arc<dyn BillingApi>, alerts: Arc<dyn Alerter>) -> Self {
        let mut screen = Self {
            api,
            alerts,
            meters: Vec::new(),
            tariffs: Vec::new(),
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
        self.load_meters().await;
        self.load_tariffs().await;
        self.busy = false;
    }

    async fn load_meters(&mut self) {
        match self.api.meter_status().await {
            Ok(meters) => self.meters = meters,
            // No registered meters is an ordinary state for this screen.
            Err(ApiError::Rejected { status: 404, .. }) => self.meters.clear(),
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to load meter status: {error}"));
            }
        }
    }

    async fn load_tariffs(&mut self) {
        match self.api.tariff_brackets().await {
            Ok(tariffs) => self.tariffs = tariffs,
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to load tariff rates: {error}"));
            }
        }
    }
}

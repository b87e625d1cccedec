use std::sync::Arc;

use crate::adapters::api::{ApiError, BillingApi};
use crate::domain::models::{UpdatePassword, UpdateProfile};
use crate::screens::Alerter;

pub struct ProfileScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub profile_image_path: Option<String>,
    pub current_password: String,
    pub new_password: String,
    busy: bool,
}

impl ProfileScreen {
    pub async fn init(api: Arc<dyn BillingApi>, alerts: Arc<dyn Alerter>) -> Self {
        let mut screen = Self {
            api,
            alerts,
            full_name: String::new(),
            email: String::new(),
            phone_number: String::new(),
            address: String::new(),
            profile_image_path: None,
            current_password: String::new(),
            new_password: String::new(),
            busy: false,
        };
        screen.busy = true;
        screen.load().await;
        screen.busy = false;
        screen
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    async fn load(&mut self) {
        match self.api.profile().await {
            Ok(profile) => {
                self.full_name = profile.full_name;
                self.email = profile.email;
                self.phone_number = profile.phone_number;
                self.address = profile.address;
                self.profile_image_path = profile.profile_image_path;
            }
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to load your profile: {error}"));
            }
        }
    }

    /// Saves the editable fields, then reloads so the screen shows exactly
    /// what the server stored.
    pub async fn save(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        self.try_save().await;
        self.busy = false;
    }

    async fn try_save(&mut self) {
        if self.full_name.trim().is_empty() {
            self.alerts
                .alert("Name Required", "Please enter your full name.");
            return;
        }

        let update = UpdateProfile {
            full_name: self.full_name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            address: self.address.trim().to_string(),
        };

        match self.api.update_profile(&update).await {
            Ok(()) => {
                self.alerts.alert("Profile Saved", "Your profile was updated.");
                self.load().await;
            }
            Err(ApiError::Rejected { message, .. }) => {
                self.alerts.alert("Error", &message);
            }
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to save profile: {error}"));
            }
        }
    }

    pub async fn change_password(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        self.try_change_password().await;
        self.busy = false;
    }

    async fn try_change_password(&mut self) {
        if self.current_password.is_empty() {
            self.alerts
                .alert("Password Required", "Please enter your current password.");
            return;
        }
        if self.new_password.len() < 6 {
            self.alerts.alert(
                "Password Too Short",
                "The new password must be at least 6 characters long.",
            );
            return;
        }

        let update = UpdatePassword {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        };

        match self.api.update_password(&update).await {
            Ok(true) => {
                self.alerts
                    .alert("Password Changed", "Your password was updated.");
                self.current_password.clear();
                self.new_password.clear();
            }
            Ok(false) => {
                self.alerts.alert(
                    "Password Not Changed",
                    "Please check your current password and try again.",
                );
            }
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to change password: {error}"));
            }
        }
    }
}

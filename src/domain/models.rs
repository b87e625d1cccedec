use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire status shared by invoices and meter requests: 0 pending, 1 approved,
/// 2 rejected. Codes outside the contract are carried through untouched so
/// rendering can fall back to a neutral label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Unknown(i64),
}

impl From<i64> for RequestStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Approved,
            2 => Self::Rejected,
            other => Self::Unknown(other),
        }
    }
}

impl From<RequestStatus> for i64 {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => 0,
            RequestStatus::Approved => 1,
            RequestStatus::Rejected => 2,
            RequestStatus::Unknown(code) => code,
        }
    }
}

impl RequestStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Unknown(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub issue_date: DateTime<Utc>,
    pub total_amount: f64,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterStatus {
    pub id: i64,
    pub installation_address: String,
    pub request_date: DateTime<Utc>,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meter {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    pub meter_id: i64,
    pub date: DateTime<Utc>,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    pub meter_id: i64,
    pub value: f64,
    pub date: DateTime<Utc>,
}

/// A pricing bracket; `max_volume` is absent on the open-ended last bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffBracket {
    pub min_volume: f64,
    #[serde(default)]
    pub max_volume: Option<f64>,
    pub price_per_cubic_meter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub profile_image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmail {
    pub current_password: String,
    pub new_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileImage {
    pub profile_image_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPassword {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPassword {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousMeterRequest {
    pub name: String,
    pub email: String,
    pub address: String,
    pub nif: String,
    pub phone_number: String,
}

/// Error envelope some endpoints return as `{"message": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

pub mod deep_link;
pub mod models;
pub mod tariff;

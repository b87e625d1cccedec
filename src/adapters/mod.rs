pub mod api;
pub mod db;
pub mod preferences;
pub mod token_vault;

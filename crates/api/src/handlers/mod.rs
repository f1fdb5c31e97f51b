pub mod data;
pub mod export;
pub mod health;
pub mod status;

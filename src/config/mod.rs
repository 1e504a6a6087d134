// src/config/mod.rs
pub mod ai;
pub mod bot;
pub mod lists;

pub use ai::AiConfig;
pub use bot::{BotConfig, StoreBackend};

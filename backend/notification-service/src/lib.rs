pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
pub use services::{
    HttpPushGateway, NoopPushGateway, NotificationEventHandler, NotificationService, PushGateway,
};

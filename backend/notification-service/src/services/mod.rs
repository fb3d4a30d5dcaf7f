pub mod consumer;
pub mod notification_service;
pub mod push;

pub use consumer::NotificationEventHandler;
pub use notification_service::NotificationService;
pub use push::{HttpPushGateway, NoopPushGateway, PushGateway};

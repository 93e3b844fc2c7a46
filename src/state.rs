use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::services::locks::LockPolicy;
use crate::services::notifications::NotificationDispatcher;
use crate::services::payments::PaymentProcessor;
use crate::services::pricing::DiscountPolicy;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentProcessor>,
    pub discounts: Box<dyn DiscountPolicy>,
    pub notifier: NotificationDispatcher,
}

impl AppState {
    pub fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| AppError::Storage("database connection mutex poisoned".into()))
    }

    pub fn lock_policy(&self) -> LockPolicy {
        LockPolicy::from_config(&self.config)
    }
}

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::images::ImageLimits;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
        }
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }

    pub fn image_limits(&self) -> ImageLimits {
        ImageLimits {
            max_per_booking: self.config.max_images_per_booking,
            max_bytes: self.config.max_image_bytes,
        }
    }
}

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::services::{AttemptService, CatalogService, LearningPathService, ReviewService};
use crate::store::Stores;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    stores: Stores,
    learning_path: LearningPathService,
    reviews: ReviewService,
    attempts: AttemptService,
    catalog: CatalogService,
}

impl AppState {
    pub fn new(config: Config, stores: Stores) -> Self {
        Self::with_clock(config, stores, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            learning_path: LearningPathService::new(stores.clone(), Arc::clone(&clock)),
            reviews: ReviewService::new(stores.clone(), clock, config.practice_batch_size),
            attempts: AttemptService::new(stores.clone()),
            catalog: CatalogService::new(stores.clone()),
            stores,
            config: Arc::new(config),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn learning_path(&self) -> &LearningPathService {
        &self.learning_path
    }

    pub fn reviews(&self) -> &ReviewService {
        &self.reviews
    }

    pub fn attempts(&self) -> &AttemptService {
        &self.attempts
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }
}

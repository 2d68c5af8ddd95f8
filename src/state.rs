use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::database::Store;
use crate::services::ResponseRepository;

/// Shared handler state. Everything here is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub auth: AuthService,
    pub responses: ResponseRepository,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let auth = AuthService::new(store.clone(), &config.security);
        let responses = ResponseRepository::new(store.clone(), config.cascade.clone());
        Self {
            config: Arc::new(config),
            store,
            auth,
            responses,
        }
    }
}

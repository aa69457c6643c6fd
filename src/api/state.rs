use std::sync::Arc;

use crate::{config::Settings, service::ServiceContext};

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServiceContext>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(services: Arc<ServiceContext>, settings: Arc<Settings>) -> Self {
        Self { services, settings }
    }
}

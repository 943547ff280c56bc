use crate::{config::Config, engine::DeliveryEngine};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: DeliveryEngine,
    pub config: Arc<Config>,
}

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::AppCfg;
use crate::session::Sessions;
use crate::stores::Stores;
use crate::templates::Templates;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<AppCfg>,
    pub backend: Backend,
    pub stores: Arc<Stores>,
    pub sessions: Sessions,
    pub templates: Templates,
}

impl AppState {
    pub fn new(cfg: AppCfg, backend: Backend, templates: Templates) -> Self {
        let stores = Stores::new(backend.clone(), &cfg);
        Self {
            cfg: Arc::new(cfg),
            backend,
            stores: Arc::new(stores),
            sessions: Sessions::new(),
            templates,
        }
    }
}

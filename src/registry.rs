use crate::controller::Controller;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The routing table of controllers, built once at startup.
///
/// Controllers are stored under the lowercase form of their namespace path
/// (`/`-separated, e.g. `admin/widgets`), so lookups are case-insensitive
/// by construction. Registering a name twice replaces the earlier
/// controller.
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl ControllerRegistry {
    pub fn new() -> ControllerRegistry {
        ControllerRegistry {
            controllers: HashMap::new(),
        }
    }

    pub fn register<C>(&mut self, name: &str, controller: C)
    where
        C: Controller + 'static,
    {
        self.register_arc(name, Arc::new(controller));
    }

    pub fn register_arc(&mut self, name: &str, controller: Arc<dyn Controller>) {
        let key = name.to_lowercase();
        if self.controllers.insert(key.clone(), controller).is_some() {
            warn!(controller = %key, "replaced an existing controller registration");
        } else {
            debug!(controller = %key, total = self.controllers.len(), "controller registered");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn Controller>> {
        self.controllers.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

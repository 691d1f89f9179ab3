use super::{ComponentState, GestureEngine};
use std::collections::HashMap;
use tracing::{debug, info};

impl GestureEngine {
    /// Update component state
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let mut states = self.component_states.lock().await;
        states.insert(component.to_string(), state.clone());
        debug!("Component '{}' state changed to: {:?}", component, state);
    }

    /// Get component state
    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        let states = self.component_states.lock().await;
        states.get(component).cloned()
    }

    /// Get all component states
    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        let states = self.component_states.lock().await;
        states.clone()
    }

    /// Log every component's state, sorted by name
    pub(super) async fn log_component_states(&self) {
        let states = self.component_states.lock().await;
        let mut names: Vec<&String> = states.keys().collect();
        names.sort();
        for name in names {
            info!("  {}: {:?}", name, states[name]);
        }
    }
}

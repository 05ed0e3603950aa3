use super::{ComponentState, RelayOrchestrator};
use std::collections::HashMap;
use tracing::debug;

impl RelayOrchestrator {
    /// Update component state
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let mut states = self.component_states.lock().await;
        states.insert(component.to_string(), state);
        debug!("Component '{}' state changed to: {:?}", component, state);
    }

    /// Move a component to `to` only if it is still in `from`
    pub(super) async fn transition_component_state(
        &self,
        component: &str,
        from: ComponentState,
        to: ComponentState,
    ) -> bool {
        let mut states = self.component_states.lock().await;
        match states.get_mut(component) {
            Some(state) if *state == from => {
                *state = to;
                debug!("Component '{}' state changed to: {:?}", component, to);
                true
            }
            _ => false,
        }
    }

    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        let states = self.component_states.lock().await;
        states.get(component).copied()
    }

    /// Snapshot of every component's state
    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        let states = self.component_states.lock().await;
        states.clone()
    }

    /// Components currently running
    pub async fn running_components(&self) -> usize {
        let states = self.component_states.lock().await;
        states
            .values()
            .filter(|state| **state == ComponentState::Running)
            .count()
    }
}

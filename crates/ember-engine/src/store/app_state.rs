use std::sync::atomic::{AtomicBool, Ordering};

/// Application-level flags written by game logic.
#[derive(Debug, Default)]
pub struct AppState {
    should_quit: AtomicBool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the loop to terminate after the current frame.
    pub fn request_quit(&self) {
        self.should_quit.store(true, Ordering::Release);
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit.load(Ordering::Acquire)
    }
}

/// Read-only capability the loop controller uses once per frame.
pub trait StateAccess {
    /// Whether the application asked to quit. A store without an
    /// [`AppState`] is not asking to quit.
    fn quit_requested(&self) -> bool;
}

/// Keyed store: one value per type, set once, shared by reference.
///
/// Values are immutable once inserted; mutable flags use interior
/// mutability (see [`AppState`]).
pub struct AppStore {
    values: state::TypeMap![Send + Sync],
}

impl AppStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            values: <state::TypeMap![Send + Sync]>::new(),
        }
    }

    /// A store holding a fresh [`AppState`].
    pub fn with_app_state() -> Self {
        let store = Self::new();
        store.insert(AppState::new());
        store
    }

    /// Inserts `value` unless a value of that type is already present.
    /// Returns whether the value was inserted.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) -> bool {
        self.values.set(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.try_get::<T>()
    }

    /// Convenience for game code: requests quit if an [`AppState`] exists.
    pub fn request_quit(&self) -> bool {
        match self.get::<AppState>() {
            Some(app) => {
                app.request_quit();
                true
            }
            None => false,
        }
    }
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateAccess for AppStore {
    fn quit_requested(&self) -> bool {
        self.get::<AppState>().is_some_and(AppState::should_quit)
    }
}

impl<S: StateAccess + ?Sized> StateAccess for std::sync::Arc<S> {
    fn quit_requested(&self) -> bool {
        (**self).quit_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_app_state_is_not_quitting() {
        let store = AppStore::new();
        assert!(!store.quit_requested());
        assert!(!store.request_quit());
        assert!(!store.quit_requested());
    }

    #[test]
    fn quit_flag_is_observed_through_the_store() {
        let store = AppStore::with_app_state();
        assert!(!store.quit_requested());

        store.get::<AppState>().unwrap().request_quit();
        assert!(store.quit_requested());
    }

    #[test]
    fn values_are_set_once() {
        let store = AppStore::with_app_state();
        assert!(!store.insert(AppState::new()));
        assert!(store.insert(42u32));
        assert_eq!(store.get::<u32>(), Some(&42));
    }
}

//! Process-wide application state.
//!
//! The store is a typed map shared by reference. The loop reads it once per
//! frame through [`StateAccess`]; game code writes to the values it holds.

mod app_state;

pub use app_state::{AppState, AppStore, StateAccess};

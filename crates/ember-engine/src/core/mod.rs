//! Game-facing contracts.
//!
//! This module defines the interface between the runtime and the game built
//! on top of it. A game populates the hierarchy and physics world once at
//! startup; from then on it acts through entity behaviors and the store.

mod ctx;
mod game;

pub use ctx::GameInit;
pub use game::Game;

use anyhow::Result;

use super::ctx::GameInit;
use crate::store::AppStore;

/// Game contract implemented by higher layers.
pub trait Game {
    /// Runs once, after the hierarchy and physics world exist. An error is a
    /// fatal startup failure.
    fn init(&mut self, ctx: &mut GameInit<'_>) -> Result<()>;

    /// Runs during teardown, before the hierarchy and physics world go away.
    fn deinit(&mut self, store: &AppStore) {
        let _ = store;
    }
}

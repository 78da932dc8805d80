use super::{Hierarchy, TraverseCtx};
use crate::scene::Traversal;

/// Runs the frame's single traversal.
pub fn collect_frame<H, P>(hierarchy: &mut H, physics: &mut P, simulate_now: bool, dt: f32) -> Traversal
where
    H: Hierarchy<P> + ?Sized,
{
    let traversal = hierarchy.traverse(TraverseCtx {
        simulate_now,
        dt,
        physics,
    });

    debug_assert!(
        traversal.keys_consistent(),
        "traversal emitted out-of-order or mismatched draw keys"
    );

    log::trace!(
        "traversal: {} drawables, {} receivers",
        traversal.drawables.len(),
        traversal.receivers.len()
    );

    traversal
}

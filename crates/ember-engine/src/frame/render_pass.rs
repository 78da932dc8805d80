use super::{AcquireError, Release, RenderBackend};
use crate::paint::Color;
use crate::scene::DrawableEntity;

/// Per-pass counters.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PassStats {
    pub submitted: usize,
    pub skipped: usize,
}

/// Acquired render target. Discards on drop unless committed.
struct ScopedTarget<'a, R: RenderBackend + ?Sized> {
    backend: &'a mut R,
    committed: bool,
}

impl<'a, R: RenderBackend + ?Sized> ScopedTarget<'a, R> {
    fn acquire(backend: &'a mut R) -> Result<Self, AcquireError> {
        backend.acquire()?;
        Ok(Self {
            backend,
            committed: false,
        })
    }

    fn backend(&mut self) -> &mut R {
        &mut *self.backend
    }

    fn commit(mut self) {
        self.committed = true;
        self.backend.release(Release::Commit);
    }
}

impl<R: RenderBackend + ?Sized> Drop for ScopedTarget<'_, R> {
    fn drop(&mut self) {
        if !self.committed {
            self.backend.release(Release::Discard);
        }
    }
}

/// Clears, draws `drawables` back to front and commits.
///
/// A drawable that fails is logged and skipped. If acquiring the target
/// fails nothing is drawn and the error is returned so the caller can drop
/// the frame.
pub fn run_render_pass<R>(
    backend: &mut R,
    clear: Color,
    drawables: &[DrawableEntity],
) -> Result<PassStats, AcquireError>
where
    R: RenderBackend + ?Sized,
{
    let mut target = ScopedTarget::acquire(backend)?;
    let mut stats = PassStats::default();

    target.backend().clear(clear);

    for d in drawables {
        match target.backend().draw(d) {
            Ok(()) => stats.submitted += 1,
            Err(err) => {
                stats.skipped += 1;
                log::warn!("skipping draw of entity {}: {err}", d.id);
            }
        }
    }

    target.commit();
    Ok(stats)
}

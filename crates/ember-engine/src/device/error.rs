use crate::frame::AcquireError;

/// Response to a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Out of memory. The frame is dropped like any other acquire failure.
    OutOfMemory,
}

impl SurfaceErrorAction {
    pub fn into_acquire_error(self) -> AcquireError {
        match self {
            SurfaceErrorAction::Reconfigured => AcquireError::Reconfigured,
            SurfaceErrorAction::SkipFrame => AcquireError::Timeout,
            SurfaceErrorAction::OutOfMemory => AcquireError::OutOfMemory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_maps_to_a_dropped_frame() {
        assert!(matches!(
            SurfaceErrorAction::Reconfigured.into_acquire_error(),
            AcquireError::Reconfigured
        ));
        assert!(matches!(
            SurfaceErrorAction::SkipFrame.into_acquire_error(),
            AcquireError::Timeout
        ));
        assert!(matches!(
            SurfaceErrorAction::OutOfMemory.into_acquire_error(),
            AcquireError::OutOfMemory
        ));
    }
}

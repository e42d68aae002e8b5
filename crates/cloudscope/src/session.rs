//! Insertion session state machine.
//!
//! A session covers the placement of one volume, from the moment it is
//! created until it is dropped or cancelled. All transitions go through
//! [`InsertionSession::dispatch`].

use cloudscope_core::{Mat4, Vec3, VolumeHandle};

/// Divisor applied to the view-space depth when sizing a volume during placement.
pub const DEFAULT_PLACEMENT_DEPTH_DIVISOR: f32 = 5.0;

/// Lifecycle state of an insertion session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The volume follows the pointer.
    Inserting,
    /// The user released the pointer.
    Dropped,
    /// The session was aborted.
    Cancelled,
}

/// Inputs driving a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionInput {
    /// The pointer moved while dragging.
    Drag {
        /// Point-cloud intersection under the pointer, if any.
        hit: Option<Vec3>,
        /// View matrix of the active camera.
        view: Mat4,
    },
    /// The pointer was released.
    Drop,
    /// The session must stop.
    Cancel,
}

/// Result of dispatching an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The volume was moved and resized.
    Placed,
    /// Nothing under the pointer; the volume kept its transform.
    Unchanged,
    /// The session ended with this input.
    Finished(SessionState),
    /// The session had already ended.
    Ignored,
}

/// Placement of a single volume.
#[derive(Debug, Clone)]
pub struct InsertionSession {
    volume: VolumeHandle,
    state: SessionState,
    depth_divisor: f32,
}

impl InsertionSession {
    /// Starts a session for `volume`.
    pub fn new(volume: VolumeHandle, depth_divisor: f32) -> Self {
        Self {
            volume,
            state: SessionState::Inserting,
            depth_divisor,
        }
    }

    /// Returns the volume being placed.
    #[must_use]
    pub fn volume(&self) -> &VolumeHandle {
        &self.volume
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true while the volume is being placed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Inserting
    }

    /// Applies an input to the session.
    pub fn dispatch(&mut self, input: SessionInput) -> SessionOutcome {
        if !self.is_active() {
            return SessionOutcome::Ignored;
        }

        match input {
            SessionInput::Drag { hit: None, .. } => SessionOutcome::Unchanged,
            SessionInput::Drag {
                hit: Some(point),
                view,
            } => {
                let mut volume = self.volume.borrow_mut();
                volume.set_position(point);
                let factor = placement_scale(view, volume.position(), self.depth_divisor);
                volume.transform_mut().set_uniform_scale(factor);
                SessionOutcome::Placed
            }
            SessionInput::Drop => self.finish(SessionState::Dropped),
            SessionInput::Cancel => self.finish(SessionState::Cancelled),
        }
    }

    /// Cancels the session. Returns `false` if it had already ended.
    pub fn cancel(&mut self) -> bool {
        matches!(
            self.dispatch(SessionInput::Cancel),
            SessionOutcome::Finished(_)
        )
    }

    fn finish(&mut self, state: SessionState) -> SessionOutcome {
        log::debug!("insertion of volume {} ended: {:?}", self.volume.id(), state);
        self.state = state;
        SessionOutcome::Finished(state)
    }
}

/// Scale that keeps a placed volume at a roughly constant screen size.
///
/// This is the absolute view-space depth of `world` divided by `divisor`,
/// not a perspective-correct size.
#[must_use]
pub fn placement_scale(view: Mat4, world: Vec3, divisor: f32) -> f32 {
    (view.transform_point3(world).z / divisor).abs()
}

#[cfg(test)]
mod tests {
    use cloudscope_core::{Camera, Volume, VolumeKind};

    use super::*;

    fn session() -> InsertionSession {
        InsertionSession::new(
            VolumeHandle::new(Volume::new(VolumeKind::Box)),
            DEFAULT_PLACEMENT_DEPTH_DIVISOR,
        )
    }

    fn view() -> Mat4 {
        Camera::new(1.0)
            .looking_at(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO)
            .view_matrix()
    }

    #[test]
    fn test_drag_with_hit_places_volume() {
        let mut s = session();
        let outcome = s.dispatch(SessionInput::Drag {
            hit: Some(Vec3::new(1.0, 2.0, -5.0)),
            view: view(),
        });
        assert_eq!(outcome, SessionOutcome::Placed);

        let volume = s.volume().borrow();
        assert_eq!(volume.position(), Vec3::new(1.0, 2.0, -5.0));
        // depth 25 / 5
        assert!((volume.scale() - Vec3::splat(5.0)).length() < 1e-4);
    }

    #[test]
    fn test_drag_without_hit_keeps_transform() {
        let mut s = session();
        s.volume().borrow_mut().set_position(Vec3::new(3.0, 3.0, 3.0));
        let outcome = s.dispatch(SessionInput::Drag {
            hit: None,
            view: view(),
        });
        assert_eq!(outcome, SessionOutcome::Unchanged);
        assert_eq!(s.volume().borrow().position(), Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(s.volume().borrow().scale(), Vec3::ONE);
    }

    #[test]
    fn test_drop_ends_session() {
        let mut s = session();
        assert_eq!(
            s.dispatch(SessionInput::Drop),
            SessionOutcome::Finished(SessionState::Dropped)
        );
        assert!(!s.is_active());
        assert_eq!(s.dispatch(SessionInput::Drop), SessionOutcome::Ignored);
        assert!(!s.cancel());
        assert_eq!(s.state(), SessionState::Dropped);
    }

    #[test]
    fn test_ended_session_ignores_drags() {
        let mut s = session();
        assert!(s.cancel());
        let outcome = s.dispatch(SessionInput::Drag {
            hit: Some(Vec3::ZERO),
            view: view(),
        });
        assert_eq!(outcome, SessionOutcome::Ignored);
        assert_eq!(s.volume().borrow().scale(), Vec3::ONE);
        assert_eq!(s.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_placement_scale_uses_absolute_depth() {
        let scale = placement_scale(view(), Vec3::ZERO, 5.0);
        assert!((scale - 4.0).abs() < 1e-5);
        // Behind the camera the depth is positive but the scale stays positive
        let behind = placement_scale(view(), Vec3::new(0.0, 0.0, 30.0), 5.0);
        assert!((behind - 2.0).abs() < 1e-5);
    }
}

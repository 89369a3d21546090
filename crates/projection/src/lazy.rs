//! Build-once holder for a model's projection map.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

/// Lifecycle of a lazily built projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionState {
    Unbuilt,
    Building,
    Ready,
}

impl ProjectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ProjectionState::Building,
            2 => ProjectionState::Ready,
            _ => ProjectionState::Unbuilt,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ProjectionState::Unbuilt => 0,
            ProjectionState::Building => 1,
            ProjectionState::Ready => 2,
        }
    }
}

/// Double-checked lazy cell.
///
/// Readers of a published value never lock. The first caller to miss takes
/// the build lock, rechecks, and runs the build; callers racing it block on
/// the lock and then see the published value. A failed build leaves the cell
/// `Unbuilt` so a later request can retry.
#[derive(Debug)]
pub struct LazyProjection<T> {
    value: OnceCell<T>,
    state: AtomicU8,
    build_lock: Mutex<()>,
}

impl<T> LazyProjection<T> {
    pub const fn new() -> Self {
        Self {
            value: OnceCell::new(),
            state: AtomicU8::new(0),
            build_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> ProjectionState {
        ProjectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// The published value, if any.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn get_or_try_build<E>(&self, build: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        // A panicking builder never published anything, so the guard
        // protects no state worth refusing over.
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        self.set_state(ProjectionState::Building);
        match build() {
            Ok(built) => {
                let value = self.value.get_or_init(|| built);
                self.set_state(ProjectionState::Ready);
                Ok(value)
            }
            Err(e) => {
                self.set_state(ProjectionState::Unbuilt);
                Err(e)
            }
        }
    }

    fn set_state(&self, state: ProjectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

impl<T> Default for LazyProjection<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! # Reset Controller Module
//!
//! Watches one button and requests a pose reset on each press.
//!
//! Resets are edge-triggered: only a released → pressed transition counts.
//! Repeated "pressed" reports while the button is held (key autorepeat) are
//! ignored. Presses are queued during a pump and collected by the tracker
//! with [`ResetController::take_pending`] before it integrates.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::source::{SharedButton, SourceResolver, SubscriptionId};

/// Which button resets the pose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetButton {
    /// Name of the button device.
    pub source: String,
    /// Button index on that device.
    pub button: usize,
}

impl ResetButton {
    #[must_use]
    pub fn new(source: impl Into<String>, button: usize) -> Self {
        Self {
            source: source.into(),
            button,
        }
    }
}

/// Edge detector for the reset button.
pub struct ResetController {
    binding: Option<(SharedButton, SubscriptionId)>,
    pending: Rc<Cell<u32>>,
}

impl std::fmt::Debug for ResetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetController")
            .field("active", &self.is_active())
            .field("pending", &self.pending.get())
            .finish()
    }
}

impl Default for ResetController {
    fn default() -> Self {
        Self::inert()
    }
}

impl ResetController {
    /// A controller that never fires and subscribes to nothing.
    #[must_use]
    pub fn inert() -> Self {
        Self {
            binding: None,
            pending: Rc::new(Cell::new(0)),
        }
    }

    /// Subscribes to the configured button, or stays inert when `button`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the button device cannot be resolved.
    pub fn setup(button: Option<&ResetButton>, resolver: &mut dyn SourceResolver) -> Result<Self> {
        let Some(button) = button else {
            return Ok(Self::inert());
        };

        let source = resolver.button(&button.source)?;
        let pending = Rc::new(Cell::new(0));
        let queue = Rc::clone(&pending);
        let mut was_pressed = false;
        let id = source.borrow_mut().subscribe(
            button.button,
            Box::new(move |pressed| {
                if pressed && !was_pressed {
                    queue.set(queue.get() + 1);
                }
                was_pressed = pressed;
            }),
        );

        debug!("Reset bound to {} button {}", button.source, button.button);

        Ok(Self {
            binding: Some((source, id)),
            pending,
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.binding.is_some()
    }

    #[must_use]
    pub fn source(&self) -> Option<&SharedButton> {
        self.binding.as_ref().map(|(source, _)| source)
    }

    /// Returns and clears the number of presses seen since the last call.
    pub fn take_pending(&self) -> u32 {
        self.pending.replace(0)
    }

    /// Unsubscribes from the button. Safe to call more than once.
    pub fn teardown(&mut self) {
        let Some((source, id)) = self.binding.take() else {
            return;
        };

        let borrowed = source.try_borrow_mut();
        match borrowed {
            Ok(mut source) => {
                source.unsubscribe(id);
                debug!("Reset button unbound");
            }
            Err(_) => warn!("Reset button source busy during teardown, subscription leaked"),
        };
    }
}

impl Drop for ResetController {
    fn drop(&mut self) {
        self.teardown();
    }
}

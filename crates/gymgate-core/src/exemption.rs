//! Handoff exemption registry.
//!
//! A screen about to launch the camera or photo picker registers an exemption
//! so the background/foreground cycle caused by the external app is not
//! treated as a security event.
//!
//! The registry is owned by the [`crate::Gate`]. Screens can only *set* the
//! flag; clearing happens inside the gate's visibility monitor, in the same
//! step that decides whether to force a logout. The flag therefore cannot be
//! reset by UI completion callbacks racing the OS resume event.
//!
//! # Known limitation
//!
//! The exemption is not scoped to a particular handoff. If a screen sets it
//! and the user leaves the app some other way before the handoff starts (home
//! button, app switcher), the next return to the foreground still skips
//! re-authentication once.

/// Single pending exemption, consumed at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExemptionRegistry {
    pending: bool,
}

impl ExemptionRegistry {
    /// Create a registry with no pending exemption.
    pub fn new() -> Self {
        Self { pending: false }
    }

    /// Set or withdraw the exemption. Idempotent.
    ///
    /// Setting `true` before launching an external capture flow is the calling
    /// convention. Callers must not set `false` after the flow returns; the
    /// visibility monitor consumes the flag itself.
    pub fn set_exempt(&mut self, on: bool) {
        if self.pending != on {
            tracing::debug!(pending = on, "handoff exemption updated");
        }
        self.pending = on;
    }

    /// Whether an exemption is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Read and clear the flag in one step. Returns the value before clearing.
    pub(crate) fn consume(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

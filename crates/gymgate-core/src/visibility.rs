//! Host visibility signal.

/// Foreground/background state of the running application, as reported by
/// the host OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// App is on screen and receives input.
    #[default]
    Foreground,
    /// App is suspended behind another app or the home screen.
    Background,
}

impl Visibility {
    /// True for [`Visibility::Foreground`].
    pub fn is_foreground(self) -> bool {
        self == Self::Foreground
    }
}

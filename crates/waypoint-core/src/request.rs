//! Transition requests as built by callers.

/// Desired end state of a scene transition.
///
/// Names are taken as given; blanks and surrounding whitespace are tolerated
/// and removed when the request is canonicalised into a
/// [`TransitionContext`](crate::context::TransitionContext).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Scenes to add, in the order they should be loaded.
    pub scenes_to_load: Vec<String>,
    /// Scenes to remove, in the order they should be unloaded.
    pub scenes_to_unload: Vec<String>,
    /// Scene to bring to the foreground. Empty keeps the current one.
    pub target_active_scene: String,
    /// Whether to conceal/reveal around the scene work.
    pub use_fade: bool,
    /// Named visual profile for the fade.
    pub fade_profile: Option<String>,
}

impl TransitionRequest {
    /// Creates a request without a fade profile.
    #[must_use]
    pub fn new<L, U, S>(
        scenes_to_load: L,
        scenes_to_unload: U,
        target_active_scene: impl Into<String>,
        use_fade: bool,
    ) -> Self
    where
        L: IntoIterator<Item = S>,
        U: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scenes_to_load: scenes_to_load.into_iter().map(Into::into).collect(),
            scenes_to_unload: scenes_to_unload.into_iter().map(Into::into).collect(),
            target_active_scene: target_active_scene.into(),
            use_fade,
            fade_profile: None,
        }
    }

    /// Sets the fade profile name.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.fade_profile = Some(profile.into());
        self
    }
}

//! Canonical transition context and its correlation signature.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::request::TransitionRequest;

/// Order-preserving, trimmed, blank-free, deduplicated form of a request.
///
/// Two contexts built from equal content compare equal, hash equal and
/// carry the same signature, no matter which subsystem built them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionContext {
    scenes_to_load: Vec<String>,
    scenes_to_unload: Vec<String>,
    target_active_scene: String,
    use_fade: bool,
    fade_profile: Option<String>,
    signature: String,
}

impl TransitionContext {
    /// Canonicalises a request.
    #[must_use]
    pub fn from_request(request: &TransitionRequest) -> Self {
        Self::build(
            normalize_names(&request.scenes_to_load),
            normalize_names(&request.scenes_to_unload),
            request.target_active_scene.trim().to_owned(),
            request.use_fade,
            request
                .fade_profile
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned),
        )
    }

    /// Returns a copy with replaced scene lists and a recomputed signature.
    #[must_use]
    pub fn with_scenes(&self, scenes_to_load: &[String], scenes_to_unload: &[String]) -> Self {
        Self::build(
            normalize_names(scenes_to_load),
            normalize_names(scenes_to_unload),
            self.target_active_scene.clone(),
            self.use_fade,
            self.fade_profile.clone(),
        )
    }

    /// Returns a copy with the fade profile set when none was requested.
    #[must_use]
    pub fn with_default_profile(&self, profile: Option<&str>) -> Self {
        let Some(profile) = profile.map(str::trim).filter(|p| !p.is_empty()) else {
            return self.clone();
        };
        if self.fade_profile.is_some() {
            return self.clone();
        }
        Self::build(
            self.scenes_to_load.clone(),
            self.scenes_to_unload.clone(),
            self.target_active_scene.clone(),
            self.use_fade,
            Some(profile.to_owned()),
        )
    }

    fn build(
        scenes_to_load: Vec<String>,
        scenes_to_unload: Vec<String>,
        target_active_scene: String,
        use_fade: bool,
        fade_profile: Option<String>,
    ) -> Self {
        let signature = compute_signature(
            &scenes_to_load,
            &scenes_to_unload,
            &target_active_scene,
            use_fade,
            fade_profile.as_deref(),
        );
        Self {
            scenes_to_load,
            scenes_to_unload,
            target_active_scene,
            use_fade,
            fade_profile,
            signature,
        }
    }

    /// Scenes to add.
    #[must_use]
    pub fn scenes_to_load(&self) -> &[String] {
        &self.scenes_to_load
    }

    /// Scenes to remove.
    #[must_use]
    pub fn scenes_to_unload(&self) -> &[String] {
        &self.scenes_to_unload
    }

    /// Foreground target; empty when the current scene is kept.
    #[must_use]
    pub fn target_active_scene(&self) -> &str {
        &self.target_active_scene
    }

    /// True when a foreground scene was requested.
    #[must_use]
    pub fn has_target(&self) -> bool {
        !self.target_active_scene.is_empty()
    }

    #[must_use]
    pub fn use_fade(&self) -> bool {
        self.use_fade
    }

    #[must_use]
    pub fn fade_profile(&self) -> Option<&str> {
        self.fade_profile.as_deref()
    }

    /// Correlation signature shared by every event about this transition.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl std::fmt::Display for TransitionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.signature)
    }
}

/// Trims names, drops blanks and keeps the first occurrence of duplicates.
#[must_use]
pub fn normalize_names(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() || out.iter().any(|seen| seen == trimmed) {
            continue;
        }
        out.push(trimmed.to_owned());
    }
    out
}

/// Renders the signature, e.g. `load=[A|B];unload=[C];active=A;fade=true;profile=Soft`.
#[must_use]
pub fn compute_signature(
    scenes_to_load: &[String],
    scenes_to_unload: &[String],
    target_active_scene: &str,
    use_fade: bool,
    fade_profile: Option<&str>,
) -> String {
    let mut signature = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        signature,
        "load=[{}];unload=[{}];active={};fade={};profile={}",
        scenes_to_load.join("|"),
        scenes_to_unload.join("|"),
        target_active_scene,
        use_fade,
        fade_profile.unwrap_or_default(),
    );
    signature
}

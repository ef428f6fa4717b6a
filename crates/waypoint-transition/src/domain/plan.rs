//! Resolving a canonical context against what is already loaded.

use waypoint_core::context::TransitionContext;

/// Drops work that is already done or forbidden.
///
/// - scenes in `is_loaded` leave the load list;
/// - scenes not loaded leave the unload list;
/// - the scene that will be in the foreground (`foreground`) never stays in
///   the unload list.
///
/// The returned context carries a signature for the resolved lists.
#[must_use]
pub fn resolve_plan(
    context: &TransitionContext,
    is_loaded: impl Fn(&str) -> bool,
    foreground: &str,
) -> TransitionContext {
    let to_load: Vec<String> = context
        .scenes_to_load()
        .iter()
        .filter(|scene| !is_loaded(scene))
        .cloned()
        .collect();
    let to_unload: Vec<String> = context
        .scenes_to_unload()
        .iter()
        .filter(|scene| scene.as_str() != foreground && is_loaded(scene))
        .cloned()
        .collect();
    context.with_scenes(&to_load, &to_unload)
}

/// The scene that ends up in the foreground: the target, or the current
/// active scene when no target was requested.
#[must_use]
pub fn foreground_scene<'a>(context: &'a TransitionContext, current_active: &'a str) -> &'a str {
    if context.has_target() {
        context.target_active_scene()
    } else {
        current_active
    }
}

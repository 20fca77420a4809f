//! Interaction events that can trigger animations
//!
//! The component layer translates its native events (pointer, intersection,
//! scroll, lifecycle) into these before handing them to trigger bindings.

/// An interaction or lifecycle event delivered to a trigger binding
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TriggerEvent {
    /// The element was mounted into the scene
    Mount,
    /// The element was removed from the scene
    Unmount,
    PointerEnter,
    PointerLeave,
    Click,
    /// The element entered (`true`) or left (`false`) the viewport
    Visibility(bool),
    /// Scroll position changed; `progress` is the scroll fraction (0.0 to 1.0)
    Scroll { progress: f32 },
}

impl TriggerEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            TriggerEvent::Mount => "mount",
            TriggerEvent::Unmount => "unmount",
            TriggerEvent::PointerEnter => "pointer_enter",
            TriggerEvent::PointerLeave => "pointer_leave",
            TriggerEvent::Click => "click",
            TriggerEvent::Visibility(_) => "visibility",
            TriggerEvent::Scroll { .. } => "scroll",
        }
    }
}

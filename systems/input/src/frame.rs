//! Device state sampled once per frame.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use throne_defence_core::Vec2;

/// Keyboard keys the game reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Escape key.
    Escape,
    /// Letter or digit key, stored upper-case.
    Char(char),
}

impl Key {
    /// Key printing `c`, case-insensitive.
    #[must_use]
    pub fn char(c: char) -> Self {
        Self::Char(c.to_ascii_uppercase())
    }
}

/// Mouse buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
}

/// Axis-aligned rectangle in screen coordinates, bounds inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    /// Lower-left corner.
    pub min: Vec2,
    /// Upper-right corner.
    pub max: Vec2,
}

impl ScreenRect {
    /// Rectangle spanned by two corners in any order.
    #[must_use]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Reports whether `point` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Transition of a key or button within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputPhase {
    /// Went down this frame.
    Down,
    /// Is down this frame. Also used for cursor-position conditions that hold.
    Held,
    /// Went up this frame.
    Up,
}

/// Snapshot of keyboard and mouse state for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputFrame {
    /// Cursor position in screen coordinates.
    pub cursor: Vec2,
    keys: BTreeSet<(Key, InputPhase)>,
    buttons: BTreeSet<(MouseButton, InputPhase)>,
}

impl InputFrame {
    /// Frame with the cursor at `cursor` and nothing pressed.
    #[must_use]
    pub fn new(cursor: Vec2) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }

    /// Records a key going down. A key that goes down is also held.
    #[must_use]
    pub fn key_pressed(mut self, key: Key) -> Self {
        let _ = self.keys.insert((key, InputPhase::Down));
        let _ = self.keys.insert((key, InputPhase::Held));
        self
    }

    /// Records a key going up.
    #[must_use]
    pub fn key_released(mut self, key: Key) -> Self {
        let _ = self.keys.insert((key, InputPhase::Up));
        self
    }

    /// Records a button going down. A button that goes down is also held.
    #[must_use]
    pub fn button_pressed(mut self, button: MouseButton) -> Self {
        let _ = self.buttons.insert((button, InputPhase::Down));
        let _ = self.buttons.insert((button, InputPhase::Held));
        self
    }

    /// Records a button kept down from an earlier frame.
    #[must_use]
    pub fn button_held(mut self, button: MouseButton) -> Self {
        let _ = self.buttons.insert((button, InputPhase::Held));
        self
    }

    /// Records a button going up.
    #[must_use]
    pub fn button_released(mut self, button: MouseButton) -> Self {
        let _ = self.buttons.insert((button, InputPhase::Up));
        self
    }

    /// Reports whether `key` went through `phase` this frame.
    #[must_use]
    pub fn key(&self, key: Key, phase: InputPhase) -> bool {
        self.keys.contains(&(key, phase))
    }

    /// Reports whether `button` went through `phase` this frame.
    #[must_use]
    pub fn button(&self, button: MouseButton, phase: InputPhase) -> bool {
        self.buttons.contains(&(button, phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressing_implies_holding() {
        let frame = InputFrame::new(Vec2::ZERO)
            .key_pressed(Key::char('q'))
            .button_released(MouseButton::Left);

        assert!(frame.key(Key::Char('Q'), InputPhase::Down));
        assert!(frame.key(Key::Char('Q'), InputPhase::Held));
        assert!(!frame.key(Key::Escape, InputPhase::Down));
        assert!(frame.button(MouseButton::Left, InputPhase::Up));
        assert!(!frame.button(MouseButton::Left, InputPhase::Held));
    }

    #[test]
    fn rectangles_include_their_edges() {
        let rect = ScreenRect::from_corners(Vec2::new(10.0, 0.0), Vec2::new(0.0, 5.0));
        assert!(rect.contains(Vec2::new(10.0, 5.0)));
        assert!(rect.contains(Vec2::new(3.0, 2.0)));
        assert!(!rect.contains(Vec2::new(10.5, 2.0)));
    }
}

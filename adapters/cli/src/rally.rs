use std::{collections::VecDeque, error::Error, fmt};

use throne_defence_core::Vec2;
use throne_defence_system_bootstrap::SessionConfig;
use throne_defence_system_input::{InputFrame, MouseButton};
use tracing::warn;

/// Separates the two coordinates of a rally point.
const FIELD_DELIMITER: char = ',';

/// Extra ground around the minion spawns covered by the selection box.
const BOX_MARGIN: f32 = 1.0;

/// Errors that can occur while parsing a rally point.
#[derive(Debug, PartialEq)]
pub(crate) enum RallyParseError {
    /// The argument was empty or contained only whitespace.
    Empty,
    /// The argument did not contain exactly two coordinates.
    WrongArity(String),
    /// A coordinate was not a finite number.
    InvalidCoordinate(String),
}

impl fmt::Display for RallyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "rally point was empty"),
            Self::WrongArity(value) => write!(f, "expected 'x,z' but got '{value}'"),
            Self::InvalidCoordinate(value) => {
                write!(f, "could not parse coordinate '{value}'")
            }
        }
    }
}

impl Error for RallyParseError {}

/// Parses a ground point written as `x,z`.
pub(crate) fn parse_point(value: &str) -> Result<Vec2, RallyParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RallyParseError::Empty);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let (Some(x), Some(z), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RallyParseError::WrongArity(trimmed.to_owned()));
    };
    Ok(Vec2::new(parse_coordinate(x)?, parse_coordinate(z)?))
}

fn parse_coordinate(value: &str) -> Result<f32, RallyParseError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|coordinate| coordinate.is_finite())
        .ok_or_else(|| RallyParseError::InvalidCoordinate(value.trim().to_owned()))
}

/// Input frames that box-select the starting minions and send them to `rally`.
///
/// The frames assume a camera that maps screen points one-to-one onto the
/// ground. The drag lasts long enough not to count as a click.
pub(crate) fn script(config: &SessionConfig, rally: Vec2) -> VecDeque<InputFrame> {
    let mut spawns = config.minion_spawns.iter().copied();
    let Some(first) = spawns.next() else {
        warn!("no starting minions to rally");
        return VecDeque::new();
    };
    let (min, max) = spawns.fold((first, first), |(min, max), point| {
        (min.min(point), max.max(point))
    });
    let (min, max) = (min - Vec2::splat(BOX_MARGIN), max + Vec2::splat(BOX_MARGIN));

    let held_frames = config.single_click_delay_ms / config.tick_ms.max(1) + 1;
    let mut frames = VecDeque::new();
    frames.push_back(InputFrame::new(min).button_pressed(MouseButton::Left));
    for _ in 0..held_frames {
        frames.push_back(InputFrame::new(max).button_held(MouseButton::Left));
    }
    frames.push_back(InputFrame::new(max).button_released(MouseButton::Left));
    frames.push_back(InputFrame::new(rally).button_pressed(MouseButton::Right));
    frames
}

use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn perpendicular(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Whether moving in this direction increases the coordinate along its axis.
    pub fn is_forward(self) -> bool { matches!(self, Direction::Right | Direction::Down) }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    Horizontal,
    Vertical,
    HorizontalStack,
    VerticalStack,
}

impl From<Orientation> for LayoutKind {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => LayoutKind::Horizontal,
            Orientation::Vertical => LayoutKind::Vertical,
        }
    }
}

impl LayoutKind {
    pub fn stacked(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => LayoutKind::HorizontalStack,
            Orientation::Vertical => LayoutKind::VerticalStack,
        }
    }

    pub fn is_stacked(self) -> bool {
        matches!(self, LayoutKind::HorizontalStack | LayoutKind::VerticalStack)
    }

    pub fn orientation(self) -> Orientation {
        use LayoutKind::*;
        match self {
            Horizontal | HorizontalStack => Orientation::Horizontal,
            Vertical | VerticalStack => Orientation::Vertical,
        }
    }

    /// Same stacking, other axis.
    pub fn toggled_orientation(self) -> Self {
        let orientation = self.orientation().perpendicular();
        if self.is_stacked() {
            LayoutKind::stacked(orientation)
        } else {
            LayoutKind::from(orientation)
        }
    }
}

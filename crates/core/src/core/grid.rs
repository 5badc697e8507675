//! Grid state, cell groups and the click wire format.
//!
//! The backend owns the real grid; the client only ever holds the last frame it
//! received. Frames are JSON arrays of `GRID_H` rows of `GRID_W` colour strings,
//! indexed `[row][column]`. Colours are opaque CSS colour strings; the frame
//! keeps them verbatim and [`GridView`](crate::layout::GridView) decides what
//! is safe to paint.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const GRID_W: usize = 8;
pub const GRID_H: usize = 8;

/// Colour the backend reports for an unlit button.
pub const UNLIT: &str = "#000";

/// The UI region a click came from. Encoded on the wire as `0`, `1`, `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Group {
    Grid,
    Top,
    Side,
}

impl Group {
    pub fn all() -> &'static [Group] {
        &[Group::Grid, Group::Top, Group::Side]
    }

    /// Columns and rows of cells in this region.
    pub fn dims(self) -> (usize, usize) {
        match self {
            Group::Grid => (GRID_W, GRID_H),
            Group::Top => (GRID_W, 1),
            Group::Side => (1, GRID_H),
        }
    }
}

impl From<Group> for u8 {
    fn from(g: Group) -> u8 {
        match g {
            Group::Grid => 0,
            Group::Top => 1,
            Group::Side => 2,
        }
    }
}

impl TryFrom<u8> for Group {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            0 => Ok(Group::Grid),
            1 => Ok(Group::Top),
            2 => Ok(Group::Side),
            other => Err(format!("unknown cell group {other}")),
        }
    }
}

/// A single button press. Built per click, sent immediately, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClickEvent {
    pub group: Group,
    pub x: u32,
    pub y: u32,
}

const CLICK_SELECTOR: &str = "click";

// Field order is part of the protocol: the plugin matches the body byte-for-byte
// against `{"selector":"click","group":%d,"x":%d,"y":%d}`.
#[derive(Serialize, Deserialize)]
struct ClickBody<'a> {
    selector: &'a str,
    group: Group,
    x: u32,
    y: u32,
}

impl ClickEvent {
    /// Validates `(x, y)` against the group's extent.
    pub fn new(group: Group, x: u32, y: u32) -> Result<Self> {
        let (w, h) = group.dims();
        if x as usize >= w || y as usize >= h {
            return Err(Error::Coordinate { group, x, y });
        }
        Ok(Self { group, x, y })
    }

    pub fn grid(x: u32, y: u32) -> Result<Self> {
        Self::new(Group::Grid, x, y)
    }

    pub fn top(x: u32) -> Result<Self> {
        Self::new(Group::Top, x, 0)
    }

    pub fn side(y: u32) -> Result<Self> {
        Self::new(Group::Side, 0, y)
    }

    /// JSON body for `POST /update`.
    pub fn to_body(&self) -> Result<String> {
        let body = ClickBody {
            selector: CLICK_SELECTOR,
            group: self.group,
            x: self.x,
            y: self.y,
        };
        Ok(serde_json::to_string(&body)?)
    }

    /// Inverse of [`ClickEvent::to_body`], as the plugin parses it.
    #[cfg(test)]
    pub(crate) fn from_body(raw: &str) -> Result<Self> {
        let body: ClickBody<'_> = serde_json::from_str(raw)?;
        if body.selector != CLICK_SELECTOR {
            return Err(Error::Shape(format!(
                "unexpected selector {:?}",
                body.selector
            )));
        }
        Self::new(body.group, body.x, body.y)
    }
}

/// One full frame of button colours, `[row][column]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GridState {
    cells: [[String; GRID_W]; GRID_H],
}

impl GridState {
    /// Every cell set to `colour`.
    pub fn filled(colour: &str) -> Self {
        Self {
            cells: std::array::from_fn(|_| std::array::from_fn(|_| colour.to_string())),
        }
    }

    /// Decode a frame body. Anything that is not exactly `GRID_H` rows of
    /// `GRID_W` strings is rejected.
    pub fn from_json(raw: &str) -> Result<Self> {
        let rows: Vec<Vec<String>> = serde_json::from_str(raw)?;
        Self::try_from(rows)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Colour at `(x, y)`; `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<&str> {
        self.cells.get(y)?.get(x).map(String::as_str)
    }

    /// `(x, y, colour)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &str)> + '_ {
        self.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .map(move |(x, colour)| (x, y, colour.as_str()))
        })
    }
}

impl Default for GridState {
    fn default() -> Self {
        Self::filled(UNLIT)
    }
}

impl TryFrom<Vec<Vec<String>>> for GridState {
    type Error = Error;

    fn try_from(rows: Vec<Vec<String>>) -> Result<Self> {
        if rows.len() != GRID_H {
            return Err(Error::Shape(format!(
                "expected {GRID_H} rows, got {}",
                rows.len()
            )));
        }

        let mut state = GridState::default();
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != GRID_W {
                return Err(Error::Shape(format!(
                    "row {y}: expected {GRID_W} cells, got {}",
                    row.len()
                )));
            }
            for (x, colour) in row.into_iter().enumerate() {
                state.cells[y][x] = colour;
            }
        }
        Ok(state)
    }
}

impl<'de> Deserialize<'de> for GridState {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rows = Vec::<Vec<String>>::deserialize(deserializer)?;
        GridState::try_from(rows).map_err(serde::de::Error::custom)
    }
}

/// The plugin's button palette: `value == 0` is unlit, otherwise hue sweeps
/// green (0.0) through amber to red (1.0) in four levels per channel.
pub fn palette_colour(hue: f32, value: f32) -> String {
    if value == 0.0 {
        return UNLIT.to_string();
    }

    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let level = |c: f32| ((c * 3.0).round_ties_even() as i32).clamp(0, 3) as usize;

    let r = level(2.0 * hue);
    let g = level(2.0 * (1.0 - hue));

    let mut out = String::with_capacity(4);
    out.push('#');
    out.push(DIGITS[r * 5] as char);
    out.push(DIGITS[g * 5] as char);
    out.push('0');
    out
}

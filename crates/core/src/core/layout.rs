//! Grid view builder: the three button tables and the per-cell colour model.
//!
//! This is the platform-neutral half of the page. The browser crate walks a
//! [`GridLayout`] to emit DOM tables and keeps a [`GridView`] in a signal; both
//! are plain data so the layout can be unit-tested on the host.

use tracing::debug;

use crate::grid::{ClickEvent, Group, GridState, GRID_H, GRID_W};

/// Something that can show a grid frame.
pub trait GridSink {
    fn apply(&mut self, frame: &GridState);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSpec {
    pub click: ClickEvent,
    pub class: &'static str,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub group: Group,
    pub class: &'static str,
    pub rows: Vec<Vec<CellSpec>>,
}

impl TableSpec {
    fn build(group: Group) -> Self {
        let (w, h) = group.dims();
        let rows = (0..h as u32)
            .map(|y| {
                (0..w as u32)
                    .map(|x| CellSpec {
                        click: ClickEvent { group, x, y },
                        class: cell_class(group),
                        label: cell_label(group, x, y),
                    })
                    .collect()
            })
            .collect();

        Self {
            group,
            class: table_class(group),
            rows,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellSpec> + '_ {
        self.rows.iter().flatten()
    }
}

fn table_class(group: Group) -> &'static str {
    match group {
        Group::Grid => "grid",
        Group::Top => "row",
        Group::Side => "column",
    }
}

fn cell_class(group: Group) -> &'static str {
    match group {
        Group::Grid => "gridButton",
        Group::Top => "topButton",
        Group::Side => "sideButton",
    }
}

// Top and side buttons are numbered from 1 like the hardware; grid pads are blank.
fn cell_label(group: Group, x: u32, y: u32) -> Option<String> {
    match group {
        Group::Grid => None,
        Group::Top => Some((x + 1).to_string()),
        Group::Side => Some((y + 1).to_string()),
    }
}

/// Outer 2×2 container:
///
/// ```text
/// | top    | (empty) |   row class "expand-width"
/// | grid   | side    |   row class "expand-height", grid cell class "expand"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    pub top: TableSpec,
    pub grid: TableSpec,
    pub side: TableSpec,
}

impl GridLayout {
    pub const TOP_ROW_CLASS: &'static str = "expand-width";
    pub const MAIN_ROW_CLASS: &'static str = "expand-height";
    pub const GRID_PARENT_CLASS: &'static str = "expand";

    pub fn build() -> Self {
        Self {
            top: TableSpec::build(Group::Top),
            grid: TableSpec::build(Group::Grid),
            side: TableSpec::build(Group::Side),
        }
    }

    pub fn table(&self, group: Group) -> &TableSpec {
        match group {
            Group::Grid => &self.grid,
            Group::Top => &self.top,
            Group::Side => &self.side,
        }
    }

    /// The click a cell at `(x, y)` of `group` emits, if that cell exists.
    pub fn click_at(&self, group: Group, x: u32, y: u32) -> Option<ClickEvent> {
        self.table(group)
            .rows
            .get(y as usize)?
            .get(x as usize)
            .map(|c| c.click)
    }
}

/// Background colour of every main-grid cell, as last painted.
///
/// `None` until the first frame lands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridView {
    backgrounds: [[Option<String>; GRID_W]; GRID_H],
    frames: u64,
}

impl GridView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background(&self, x: usize, y: usize) -> Option<&str> {
        self.backgrounds.get(y)?.get(x)?.as_deref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// A colour that can only ever be a single `background-color` value.
///
/// Anything that could close the declaration or open another one is refused.
fn is_paintable(colour: &str) -> bool {
    let forbidden = |c: char| {
        matches!(c, ';' | ':' | '{' | '}' | '"' | '\\' | '<' | '>') || c.is_control()
    };
    !colour.trim().is_empty() && !colour.chars().any(forbidden)
}

impl GridSink for GridView {
    /// Cells whose colour is not paintable keep their previous background.
    fn apply(&mut self, frame: &GridState) {
        for (x, y, colour) in frame.iter() {
            if is_paintable(colour) {
                self.backgrounds[y][x] = Some(colour.to_string());
            } else {
                debug!("Ignoring colour {:?} for cell ({}, {})", colour, x, y);
            }
        }
        self.frames += 1;
    }
}

impl<S: GridSink + ?Sized> GridSink for &mut S {
    fn apply(&mut self, frame: &GridState) {
        (**self).apply(frame);
    }
}

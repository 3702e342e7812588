//! Overworld hex map with fog of war.
//!
//! Cells use axial coordinates. Exploration is two-tier: a cell that has ever
//! been within sight stays explored, while visibility is recomputed on every
//! move.

use crate::config::MapConfig;
use crate::dice::Dice;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axial hex coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Hex grid distance.
    pub fn distance(&self, other: &HexCoord) -> i32 {
        hex_distance(*self, *other)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// `(|dq| + |dq + dr| + |dr|) / 2`
pub fn hex_distance(a: HexCoord, b: HexCoord) -> i32 {
    let dq = a.q - b.q;
    let dr = a.r - b.r;
    (dq.abs() + (dq + dr).abs() + dr.abs()) / 2
}

/// Overworld terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    Grass,
    Forest,
    Mountain,
    Water,
    Castle,
    Village,
    Desert,
    Swamp,
}

impl TerrainType {
    /// Display name of the terrain.
    pub fn name(&self) -> &'static str {
        match self {
            TerrainType::Grass => "grass",
            TerrainType::Forest => "forest",
            TerrainType::Mountain => "mountain",
            TerrainType::Water => "water",
            TerrainType::Castle => "castle",
            TerrainType::Village => "village",
            TerrainType::Desert => "desert",
            TerrainType::Swamp => "swamp",
        }
    }

    /// Landmarks are safe: encounters never trigger on them.
    pub fn is_landmark(&self) -> bool {
        matches!(self, TerrainType::Village | TerrainType::Castle)
    }

    /// Terrain from the two noise signals, before landmark placement.
    pub fn from_noise(elevation: f64, moisture: f64) -> Self {
        let terrain = if elevation > 1.0 {
            TerrainType::Mountain
        } else if elevation > 0.5 {
            TerrainType::Forest
        } else if elevation < -1.0 {
            TerrainType::Water
        } else {
            TerrainType::Grass
        };

        match terrain {
            TerrainType::Grass if moisture > 1.0 => TerrainType::Swamp,
            TerrainType::Grass if moisture < -1.0 => TerrainType::Desert,
            other => other,
        }
    }
}

impl fmt::Display for TerrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single overworld cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexCell {
    pub q: i32,
    pub r: i32,
    pub terrain: TerrainType,
    pub is_explored: bool,
    pub is_visible: bool,
    pub has_encounter: bool,
}

impl HexCell {
    /// An unexplored cell with no encounter.
    pub fn new(coord: HexCoord, terrain: TerrainType) -> Self {
        Self {
            q: coord.q,
            r: coord.r,
            terrain,
            is_explored: false,
            is_visible: false,
            has_encounter: false,
        }
    }

    /// Axial coordinate of this cell.
    pub fn coord(&self) -> HexCoord {
        HexCoord::new(self.q, self.r)
    }
}

/// Result of a single overworld step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Destination more than one hex away; nothing changed.
    TooFar,
    /// No cell at the destination; nothing changed.
    OffMap,
    /// The move happened and fog was updated. `encounter` carries the terrain
    /// of the battle to start, if one triggered.
    Moved { encounter: Option<TerrainType> },
}

/// The overworld: a `width x height` block of cells in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldMap {
    width: i32,
    height: i32,
    cells: Vec<HexCell>,
}

impl WorldMap {
    /// Wrap pre-built cells. `cells` must be row-major and `width * height` long.
    pub fn from_cells(width: i32, height: i32, cells: Vec<HexCell>) -> Self {
        debug_assert_eq!(cells.len(), (width.max(0) * height.max(0)) as usize);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Generate terrain, landmarks and encounters for the configured size.
    pub fn generate(config: &MapConfig, dice: &mut Dice) -> Self {
        let (width, height) = (config.width.max(1), config.height.max(1));
        let mut cells = Vec::with_capacity((width * height) as usize);

        for r in 0..height {
            for q in 0..width {
                let (qf, rf) = (q as f64, r as f64);
                let elevation = (qf * 0.5).sin() + (rf * 0.5).cos();
                let moisture = (qf * 0.3).cos() + (rf * 0.3).sin();
                let mut terrain = TerrainType::from_noise(elevation, moisture);

                // Landmark rolls are drawn for every cell to keep the
                // sequence independent of the terrain.
                let village = dice.chance(config.village_chance);
                let castle = dice.chance(config.castle_chance);
                if village && terrain == TerrainType::Grass {
                    terrain = TerrainType::Village;
                }
                if castle && terrain == TerrainType::Mountain {
                    terrain = TerrainType::Castle;
                }

                let mut cell = HexCell::new(HexCoord::new(q, r), terrain);
                cell.has_encounter = dice.chance(config.encounter_chance);
                cells.push(cell);
            }
        }

        tracing::debug!(width, height, "generated overworld");
        Self {
            width,
            height,
            cells,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    fn index(&self, coord: HexCoord) -> Option<usize> {
        let in_bounds = (0..self.width).contains(&coord.q) && (0..self.height).contains(&coord.r);
        in_bounds.then(|| (coord.r * self.width + coord.q) as usize)
    }

    /// The cell at `coord`, or `None` off the map.
    pub fn cell(&self, coord: HexCoord) -> Option<&HexCell> {
        self.index(coord).and_then(|i| self.cells.get(i))
    }

    pub fn cell_mut(&mut self, coord: HexCoord) -> Option<&mut HexCell> {
        self.index(coord).and_then(move |i| self.cells.get_mut(i))
    }

    /// Reveal every cell within `radius` of `center` and hide the rest.
    ///
    /// Hidden cells keep their explored flag.
    pub fn update_visibility(&mut self, center: HexCoord, radius: i32) {
        for cell in &mut self.cells {
            if cell.coord().distance(&center) <= radius {
                cell.is_explored = true;
                cell.is_visible = true;
            } else {
                cell.is_visible = false;
            }
        }
    }

    /// Move one hex from `from` to `to`.
    ///
    /// On success the fog is recomputed around `to`. An encounter flag on a
    /// non-landmark destination is consumed and reported.
    pub fn step(&mut self, from: HexCoord, to: HexCoord, sight_radius: i32) -> StepOutcome {
        if from.distance(&to) > 1 {
            return StepOutcome::TooFar;
        }
        if self.cell(to).is_none() {
            return StepOutcome::OffMap;
        }

        self.update_visibility(to, sight_radius);

        let encounter = self.cell_mut(to).and_then(|cell| {
            if cell.has_encounter && !cell.terrain.is_landmark() {
                cell.has_encounter = false;
                Some(cell.terrain)
            } else {
                None
            }
        });

        StepOutcome::Moved { encounter }
    }

    /// Cells ever seen.
    pub fn explored_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_explored).count()
    }

    /// Cells in sight right now.
    pub fn visible_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_visible).count()
    }
}

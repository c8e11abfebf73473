//! Bounded 2-D grid holding named numeric layers.
//!
//! All layers share the grid's step (`rows x cols`). Cells are `Option<f64>`
//! where `None` is the null value. Layers are stored in a flat row-major
//! `Vec` and addressed either by name or by the [`LayerId`] handle returned
//! when the layer is added, so hot paths never look names up.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::Position;
use crate::error::{SimError, SimResult};

/// Real-valued map extents of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    fn validate(&self) -> SimResult<()> {
        let finite = [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.north <= self.south || self.east <= self.west {
            return Err(SimError::InvalidBounds {
                north: self.north,
                south: self.south,
                east: self.east,
                west: self.west,
            });
        }
        Ok(())
    }
}

/// Neighbourhood used when listing adjacent cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

const FOUR_OFFSETS: [(isize, isize); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];
const EIGHT_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];

impl Connectivity {
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &FOUR_OFFSETS,
            Connectivity::Eight => &EIGHT_OFFSETS,
        }
    }
}

/// Handle to a layer inside one [`Grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(usize);

/// Initial contents for [`Grid::add_layer`].
#[derive(Debug, Clone)]
pub enum LayerInit {
    /// Every cell set to the same value.
    Fill(Option<f64>),
    /// Row-major cells, must hold exactly `rows * cols` values.
    Cells(Vec<Option<f64>>),
}

/// Self-describing copy of one layer, exchanged with a layer store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    pub bounds: Bounds,
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<Option<f64>>,
}

impl LayerData {
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col]
        } else {
            None
        }
    }

    /// Values as nested rows, mostly for display and tests.
    pub fn to_rows(&self) -> Vec<Vec<Option<f64>>> {
        self.cells.chunks(self.cols).map(|r| r.to_vec()).collect()
    }
}

struct Layer {
    name: String,
    cells: Vec<Option<f64>>,
}

/// Bounded coordinate space with named layers of identical dimensions.
pub struct Grid {
    bounds: Option<Bounds>,
    rows: usize,
    cols: usize,
    connectivity: Connectivity,
    layers: Vec<Layer>,
    names: HashMap<String, LayerId>,
}

impl Grid {
    /// Create an empty grid without bounds.
    pub fn new() -> Self {
        Self {
            bounds: None,
            rows: 0,
            cols: 0,
            connectivity: Connectivity::default(),
            layers: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Create a grid and set its bounds in one go.
    pub fn with_bounds(bounds: Bounds, rows: usize, cols: usize) -> SimResult<Self> {
        let mut grid = Self::new();
        grid.set_bounds(bounds, rows, cols)?;
        Ok(grid)
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Set extents and step. Once layers exist the step may not change.
    pub fn set_bounds(&mut self, bounds: Bounds, rows: usize, cols: usize) -> SimResult<()> {
        if rows == 0 || cols == 0 {
            return Err(SimError::InvalidStep { rows, cols });
        }
        bounds.validate()?;
        if !self.layers.is_empty() && (rows != self.rows || cols != self.cols) {
            return Err(SimError::StepChanged {
                expected_rows: self.rows,
                expected_cols: self.cols,
                rows,
                cols,
            });
        }
        self.bounds = Some(bounds);
        self.rows = rows;
        self.cols = cols;
        Ok(())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Cell size as (north-south, east-west) map units.
    pub fn resolution(&self) -> Option<(f64, f64)> {
        self.bounds.map(|b| {
            (
                (b.north - b.south) / self.rows as f64,
                (b.east - b.west) / self.cols as f64,
            )
        })
    }

    /// Length of the grid diagonal in cells.
    pub fn diagonal(&self) -> f64 {
        ((self.rows * self.rows + self.cols * self.cols) as f64).sqrt()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Cell containing a map coordinate, if it lies inside the bounds.
    pub fn cell_at(&self, northing: f64, easting: f64) -> Option<Position> {
        let b = self.bounds?;
        let (ns, ew) = self.resolution()?;
        if northing > b.north || northing <= b.south || easting < b.west || easting >= b.east {
            return None;
        }
        let row = (((b.north - northing) / ns).floor() as usize).min(self.rows - 1);
        let col = (((easting - b.west) / ew).floor() as usize).min(self.cols - 1);
        Some(Position::new(row, col))
    }

    /// Map coordinate (northing, easting) of a cell centre.
    pub fn cell_center(&self, pos: Position) -> Option<(f64, f64)> {
        let b = self.bounds?;
        let (ns, ew) = self.resolution()?;
        Some((
            b.north - (pos.row as f64 + 0.5) * ns,
            b.west + (pos.col as f64 + 0.5) * ew,
        ))
    }

    /// Add a layer. An existing layer of the same name is replaced only when
    /// `overwrite` is set.
    pub fn add_layer(&mut self, name: &str, init: LayerInit, overwrite: bool) -> SimResult<LayerId> {
        if self.bounds.is_none() {
            return Err(SimError::MissingBounds(name.to_string()));
        }
        let expected = self.rows * self.cols;
        let cells = match init {
            LayerInit::Fill(value) => vec![value; expected],
            LayerInit::Cells(cells) => {
                if cells.len() != expected {
                    return Err(SimError::DimensionMismatch {
                        layer: name.to_string(),
                        expected,
                        found: cells.len(),
                    });
                }
                cells
            }
        };

        if let Some(&id) = self.names.get(name) {
            if !overwrite {
                return Err(SimError::LayerExists(name.to_string()));
            }
            self.layers[id.0].cells = cells;
            return Ok(id);
        }

        let id = LayerId(self.layers.len());
        self.layers.push(Layer {
            name: name.to_string(),
            cells,
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Add a layer from a store record, checking its step against the grid.
    pub fn import_layer(&mut self, name: &str, data: LayerData, overwrite: bool) -> SimResult<LayerId> {
        if self.bounds.is_some() && (data.rows != self.rows || data.cols != self.cols) {
            return Err(SimError::DimensionMismatch {
                layer: name.to_string(),
                expected: self.rows * self.cols,
                found: data.rows * data.cols,
            });
        }
        self.add_layer(name, LayerInit::Cells(data.cells), overwrite)
    }

    /// Copy a layer out as a store record.
    pub fn export_layer(&self, name: &str) -> SimResult<LayerData> {
        let id = self.require(name)?;
        let bounds = self
            .bounds
            .ok_or_else(|| SimError::MissingBounds(name.to_string()))?;
        Ok(LayerData {
            bounds,
            rows: self.rows,
            cols: self.cols,
            cells: self.layers[id.0].cells.clone(),
        })
    }

    pub fn layer_id(&self, name: &str) -> Option<LayerId> {
        self.names.get(name).copied()
    }

    pub fn layer_name(&self, id: LayerId) -> &str {
        &self.layers[id.0].name
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.layers.iter().map(|l| l.name.as_str())
    }

    pub fn cells(&self, id: LayerId) -> &[Option<f64>] {
        &self.layers[id.0].cells
    }

    pub fn require(&self, name: &str) -> SimResult<LayerId> {
        self.layer_id(name)
            .ok_or_else(|| SimError::MissingLayer(name.to_string()))
    }

    pub fn get(&self, name: &str, row: usize, col: usize) -> SimResult<Option<f64>> {
        let id = self.require(name)?;
        self.value(id, Position::new(row, col))
    }

    pub fn set(&mut self, name: &str, row: usize, col: usize, value: Option<f64>) -> SimResult<()> {
        let id = self.require(name)?;
        self.set_value(id, Position::new(row, col), value)
    }

    pub fn value(&self, id: LayerId, pos: Position) -> SimResult<Option<f64>> {
        let idx = self.index(pos)?;
        Ok(self.layers[id.0].cells[idx])
    }

    pub fn set_value(&mut self, id: LayerId, pos: Position, value: Option<f64>) -> SimResult<()> {
        let idx = self.index(pos)?;
        self.layers[id.0].cells[idx] = value;
        Ok(())
    }

    /// Adjacent in-bounds cells in random order. The offsets are shuffled
    /// up front, bounds are checked lazily as the iterator is consumed.
    pub fn neighbors<R: Rng + ?Sized>(
        &self,
        pos: Position,
        rng: &mut R,
    ) -> impl Iterator<Item = Position> + '_ {
        let mut offsets = self.connectivity.offsets().to_vec();
        offsets.shuffle(rng);
        offsets
            .into_iter()
            .filter_map(move |(dr, dc)| pos.offset(dr, dc))
            .filter(move |p| self.contains(*p))
    }

    /// Exponential half-life decay clamped at `floor`.
    ///
    /// Each non-null cell becomes `max(floor, v / 2^(1 / half_life))`.
    /// A non-positive `half_life` leaves the layer untouched.
    pub fn decay(&mut self, id: LayerId, half_life: f64, floor: f64, parallel: bool) {
        if half_life <= 0.0 || !half_life.is_finite() {
            return;
        }
        let factor = 2f64.powf(-1.0 / half_life);
        let decay_cell = |cell: &mut Option<f64>| {
            if let Some(v) = cell {
                *v = (*v * factor).max(floor);
            }
        };
        let cells = &mut self.layers[id.0].cells;
        if parallel {
            cells.par_iter_mut().for_each(decay_cell);
        } else {
            cells.iter_mut().for_each(decay_cell);
        }
    }

    /// Pull every non-null cell of `id` into `[lo, hi]`.
    pub fn clamp(&mut self, id: LayerId, lo: f64, hi: f64, parallel: bool) {
        let clamp_cell = |cell: &mut Option<f64>| {
            if let Some(v) = cell {
                *v = v.max(lo).min(hi);
            }
        };
        let cells = &mut self.layers[id.0].cells;
        if parallel {
            cells.par_iter_mut().for_each(clamp_cell);
        } else {
            cells.iter_mut().for_each(clamp_cell);
        }
    }

    /// Name-based form of [`Grid::decay`].
    pub fn decay_layer(&mut self, name: &str, half_life: f64, floor: f64) -> SimResult<()> {
        let id = self.require(name)?;
        self.decay(id, half_life, floor, true);
        Ok(())
    }

    fn index(&self, pos: Position) -> SimResult<usize> {
        if !self.contains(pos) {
            return Err(SimError::OutOfBounds {
                row: pos.row,
                col: pos.col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(pos.row * self.cols + pos.col)
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

//! Synthetic demo landscape and a coarse text rendering of layers.

use antpath_core::prelude::*;

/// Map units per cell in the demo landscape.
const CELL_SIZE: f64 = 10.0;

/// Ramp used by [`render`], lowest to highest.
const SHADES: &[u8] = b" .:-=+*#%@";

pub struct Landscape {
    pub sites: LayerData,
    pub cost: LayerData,
}

/// A cost valley running west to east, split by a north-south ridge with a
/// single pass, and one site at each end of the valley.
///
/// Ridge cells carry a negative cost, which the default lower cost limit of
/// zero makes impassable.
pub fn valley(rows: usize, cols: usize) -> Landscape {
    let bounds = Bounds::new(rows as f64 * CELL_SIZE, 0.0, cols as f64 * CELL_SIZE, 0.0);
    let mid = rows / 2;
    let ridge = cols / 2;
    let pass = rows / 4;

    let mut cost = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let value = if c == ridge && r != pass {
                -1.0
            } else {
                let off_axis = (r as f64 - mid as f64).abs() / rows as f64;
                1.0 + 8.0 * off_axis * off_axis
            };
            cost.push(Some(value));
        }
    }

    let mut sites = vec![None; rows * cols];
    sites[mid * cols + 1] = Some(1.0);
    sites[mid * cols + cols.saturating_sub(2)] = Some(2.0);

    Landscape {
        sites: LayerData {
            bounds,
            rows,
            cols,
            cells: sites,
        },
        cost: LayerData {
            bounds,
            rows,
            cols,
            cells: cost,
        },
    }
}

/// Render a layer as rows of shade characters scaled between its finite
/// minimum and maximum. Null cells render as `?`.
pub fn render(layer: &LayerData) -> String {
    let finite = layer.cells.iter().flatten().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    let span = if hi > lo { hi - lo } else { 1.0 };
    let top = (SHADES.len() - 1) as f64;

    let mut out = String::with_capacity((layer.cols + 1) * layer.rows);
    for row in layer.cells.chunks(layer.cols.max(1)) {
        for cell in row {
            let ch = match cell {
                Some(v) if v.is_finite() => {
                    // log scale
                    let t = ((v - lo) / span * 1000.0).ln_1p() / 1001f64.ln();
                    SHADES[(t * top).round().clamp(0.0, top) as usize] as char
                }
                _ => '?',
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valley_shape() {
        let land = valley(8, 10);
        assert_eq!(land.cost.cells.len(), 80);
        let sites: Vec<_> = (0..80).filter(|&i| land.sites.cells[i].is_some()).collect();
        assert_eq!(sites, vec![4 * 10 + 1, 4 * 10 + 8]);
        // ridge blocked except at the pass
        assert_eq!(land.cost.value(0, 5), Some(-1.0));
        assert!(land.cost.value(2, 5).unwrap() > 0.0);
    }

    #[test]
    fn test_render_extremes() {
        let layer = LayerData {
            bounds: Bounds::new(1.0, 0.0, 3.0, 0.0),
            rows: 1,
            cols: 3,
            cells: vec![Some(0.0), None, Some(5.0)],
        };
        assert_eq!(render(&layer), " ?@\n");
    }
}

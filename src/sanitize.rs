//! Z removal and coordinate truncation.
//!
//! Truncation rounds half away from zero on the scaled value:
//! `round(v * 10^n) / 10^n`. Dividing by an exact power of ten gives the
//! double nearest to the decimal result, so its shortest rendering has at
//! most `n` fractional digits, and rounding a rounded value again is a no-op.

use crate::model::{Coord, FeatureCollection, Geometry};
use crate::report::Rewritten;

/// Decimal places kept when none are given. About a centimetre in degrees.
pub const DEFAULT_DECIMAL_PLACES: u32 = 7;

/// Powers of ten that an `f64` represents exactly
const POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// Above this every `f64` is an integer, so there is nothing left to round
const MAX_FRACTIONAL: f64 = 4_503_599_627_370_496.0; // 2^52

/// Round `value` to `decimal_places` fractional digits
pub fn round_ordinate(value: f64, decimal_places: u32) -> f64 {
    let Some(&factor) = POW10.get(decimal_places as usize) else {
        return value;
    };
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= MAX_FRACTIONAL {
        return value;
    }
    let rounded = scaled.round() / factor;
    // no negative zero in the output
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn drop_z(c: Coord) -> Coord {
    Coord { z: None, ..c }
}

pub fn truncate_coord(c: Coord, decimal_places: u32) -> Coord {
    Coord {
        x: round_ordinate(c.x, decimal_places),
        y: round_ordinate(c.y, decimal_places),
        z: c.z.map(|z| round_ordinate(z, decimal_places)),
    }
}

/// Copy of `geometry` with only x and y in every position
pub fn remove_z(geometry: &Geometry) -> Geometry {
    geometry.map_coords(drop_z)
}

/// Copy of `geometry` with every ordinate rounded to `decimal_places`
pub fn truncate(geometry: &Geometry, decimal_places: u32) -> Geometry {
    geometry.map_coords(|c| truncate_coord(c, decimal_places))
}

fn rewrite_all(mut collection: FeatureCollection, f: impl Fn(Coord) -> Coord) -> Rewritten {
    let mut touched = Vec::new();
    for (i, feature) in collection.features.iter_mut().enumerate() {
        let mut changed = false;
        feature.geometry.map_coords_in_place(|c| {
            let next = f(*c);
            if next != *c {
                *c = next;
                changed = true;
            }
        });
        if changed {
            // a bounding box computed from the old positions no longer holds
            feature.bbox = None;
            touched.push(i);
        }
    }
    if !touched.is_empty() {
        collection.bbox = None;
    }
    Rewritten {
        collection,
        touched,
    }
}

/// Strip the Z ordinate from every feature
pub fn remove_z_all(collection: FeatureCollection) -> Rewritten {
    rewrite_all(collection, drop_z)
}

/// Round every ordinate of every feature to `decimal_places`
pub fn truncate_all(collection: FeatureCollection, decimal_places: u32) -> Rewritten {
    rewrite_all(collection, |c| truncate_coord(c, decimal_places))
}

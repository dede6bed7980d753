//! Recursive descent over the coordinates of a [`Geometry`].
//!
//! Every rewrite of positions in this crate goes through these functions,
//! which preserve the variant, nesting and ordering of the input exactly.

use std::convert::Infallible;

use crate::model::{Coord, Geometry};

impl Geometry {
    /// Build a new geometry with every position replaced by `f(position)`
    pub fn map_coords(&self, mut f: impl FnMut(Coord) -> Coord) -> Geometry {
        match self.try_map_coords(&mut |c| Ok::<_, Infallible>(f(c))) {
            Ok(g) => g,
            Err(never) => match never {},
        }
    }

    /// Fallible version of [`Geometry::map_coords`]. Stops at the first error.
    pub fn try_map_coords<E, F>(&self, f: &mut F) -> Result<Geometry, E>
    where
        F: FnMut(Coord) -> Result<Coord, E>,
    {
        Ok(match self {
            Geometry::Point(c) => Geometry::Point(f(*c)?),
            Geometry::LineString(line) => Geometry::LineString(map_seq(line, f)?),
            Geometry::MultiPoint(points) => Geometry::MultiPoint(map_seq(points, f)?),
            Geometry::Polygon(rings) => Geometry::Polygon(map_nested(rings, f)?),
            Geometry::MultiLineString(lines) => Geometry::MultiLineString(map_nested(lines, f)?),
            Geometry::MultiPolygon(polygons) => Geometry::MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| map_nested(rings, f))
                    .collect::<Result<_, _>>()?,
            ),
            Geometry::GeometryCollection(members) => Geometry::GeometryCollection(
                members
                    .iter()
                    .map(|g| g.try_map_coords(f))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Rewrite every position in place, reusing the existing storage
    pub fn map_coords_in_place(&mut self, mut f: impl FnMut(&mut Coord)) {
        self.visit_mut(&mut f)
    }

    fn visit_mut<F: FnMut(&mut Coord)>(&mut self, f: &mut F) {
        match self {
            Geometry::Point(c) => f(c),
            Geometry::LineString(seq) | Geometry::MultiPoint(seq) => seq.iter_mut().for_each(f),
            Geometry::Polygon(nested) | Geometry::MultiLineString(nested) => {
                nested.iter_mut().flatten().for_each(f)
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter_mut().flatten().flatten().for_each(f)
            }
            Geometry::GeometryCollection(members) => {
                members.iter_mut().for_each(|g| g.visit_mut(f))
            }
        }
    }

    /// Visit every position in document order, stopping at the first error
    pub fn try_for_each_coord<E>(
        &self,
        mut f: impl FnMut(&Coord) -> Result<(), E>,
    ) -> Result<(), E> {
        self.visit(&mut f)
    }

    fn visit<E, F: FnMut(&Coord) -> Result<(), E>>(&self, f: &mut F) -> Result<(), E> {
        match self {
            Geometry::Point(c) => f(c),
            Geometry::LineString(seq) | Geometry::MultiPoint(seq) => seq.iter().try_for_each(f),
            Geometry::Polygon(nested) | Geometry::MultiLineString(nested) => {
                nested.iter().flatten().try_for_each(f)
            }
            Geometry::MultiPolygon(polygons) => polygons.iter().flatten().flatten().try_for_each(f),
            Geometry::GeometryCollection(members) => {
                members.iter().try_for_each(|g| g.visit(f))
            }
        }
    }

    pub fn for_each_coord(&self, mut f: impl FnMut(&Coord)) {
        let _ = self.try_for_each_coord(|c| {
            f(c);
            Ok::<_, Infallible>(())
        });
    }

    pub fn coord_count(&self) -> usize {
        let mut n = 0;
        self.for_each_coord(|_| n += 1);
        n
    }
}

fn map_seq<E, F>(seq: &[Coord], f: &mut F) -> Result<Vec<Coord>, E>
where
    F: FnMut(Coord) -> Result<Coord, E>,
{
    seq.iter().map(|c| f(*c)).collect()
}

fn map_nested<E, F>(nested: &[Vec<Coord>], f: &mut F) -> Result<Vec<Vec<Coord>>, E>
where
    F: FnMut(Coord) -> Result<Coord, E>,
{
    nested.iter().map(|seq| map_seq(seq, f)).collect()
}

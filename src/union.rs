//! Geometric union (dissolve) of a group of geometries.
//!
//! Input geometries are flattened into points, lines and polygons. Each kind
//! is combined on its own and the output is sorted by a total order over the
//! ordinates, so the result does not depend on the order of the input.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use geo::{BooleanOps, BoundingRect, LineString, MultiPolygon, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, warn};

use crate::model::{Coord, Geometry};

#[derive(Default)]
struct Parts {
    points: Vec<Coord>,
    lines: Vec<Vec<Coord>>,
    polygons: Vec<Vec<Vec<Coord>>>,
}

impl Parts {
    fn collect(&mut self, geometry: &Geometry) {
        match geometry {
            Geometry::Point(c) => self.points.push(*c),
            Geometry::MultiPoint(points) => self.points.extend_from_slice(points),
            Geometry::LineString(line) => self.lines.push(line.clone()),
            Geometry::MultiLineString(lines) => self.lines.extend(lines.iter().cloned()),
            Geometry::Polygon(rings) => self.polygons.push(rings.clone()),
            Geometry::MultiPolygon(polygons) => self.polygons.extend(polygons.iter().cloned()),
            Geometry::GeometryCollection(members) => {
                members.iter().for_each(|g| self.collect(g))
            }
        }
    }
}

/// Union of all given geometries.
///
/// A single geometry is returned unchanged and an empty input gives an empty
/// `GeometryCollection`. Disjoint pieces end up in one multi-part geometry.
/// When points, lines and polygons are mixed the result is a
/// `GeometryCollection` holding the polygonal, lineal and puntal parts in
/// that order.
pub fn union_all<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Geometry {
    let mut geometries = geometries.into_iter();
    let Some(first) = geometries.next() else {
        return Geometry::GeometryCollection(Vec::new());
    };
    let Some(second) = geometries.next() else {
        return first.clone();
    };

    let mut parts = Parts::default();
    parts.collect(first);
    parts.collect(second);
    geometries.for_each(|g| parts.collect(g));
    uniform_dimensions(parts.points.iter_mut());
    uniform_dimensions(parts.lines.iter_mut().flatten());

    let mut pieces: Vec<Geometry> = [
        union_polygons(parts.polygons),
        merge_lines(parts.lines),
        union_points(parts.points),
    ]
    .into_iter()
    .flatten()
    .collect();

    if pieces.len() == 1 {
        pieces.swap_remove(0)
    } else {
        Geometry::GeometryCollection(pieces)
    }
}

/// Drop Z everywhere when only some of `coords` carry it
fn uniform_dimensions<'a>(coords: impl IntoIterator<Item = &'a mut Coord>) {
    let mut coords: Vec<&mut Coord> = coords.into_iter().collect();
    let with_z = coords.iter().filter(|c| c.z.is_some()).count();
    if with_z != 0 && with_z != coords.len() {
        coords.iter_mut().for_each(|c| c.z = None);
    }
}

fn union_points(mut points: Vec<Coord>) -> Option<Geometry> {
    points.sort_by(Coord::total_cmp);
    points.dedup_by(|a, b| a.total_cmp(b).is_eq());
    match points.len() {
        0 => None,
        1 => Some(Geometry::Point(points[0])),
        _ => Some(Geometry::MultiPoint(points)),
    }
}

fn cmp_seq(a: &[Coord], b: &[Coord]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(p, q)| p.total_cmp(q))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn cmp_rings(a: &[Vec<Coord>], b: &[Vec<Coord>]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(p, q)| cmp_seq(p, q))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Key of a line end in the plane. `+ 0.0` folds negative zero.
fn node(c: &Coord) -> (u64, u64) {
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

/// Join lines end to end wherever exactly two line ends meet.
///
/// Lines are first oriented so that they compare lower than their reverse,
/// sorted and de-duplicated; this makes both the set of chains and the
/// direction of each chain independent of input order.
fn merge_lines(lines: Vec<Vec<Coord>>) -> Option<Geometry> {
    let mut lines: Vec<Vec<Coord>> = lines
        .into_iter()
        .filter(|l| !l.is_empty())
        .map(|mut line| {
            let reversed: Vec<Coord> = line.iter().rev().copied().collect();
            if cmp_seq(&reversed, &line).is_lt() {
                line = reversed;
            }
            line
        })
        .collect();
    lines.sort_by(|a, b| cmp_seq(a, b));
    lines.dedup_by(|a, b| cmp_seq(a, b).is_eq());

    // line index and whether the line starts (rather than ends) at the node
    let mut ends: HashMap<(u64, u64), Vec<(usize, bool)>> = HashMap::new();
    for (i, line) in lines.iter().enumerate() {
        ends.entry(node(&line[0])).or_default().push((i, true));
        ends.entry(node(&line[line.len() - 1])).or_default().push((i, false));
    }
    let degree = |c: &Coord| ends.get(&node(c)).map_or(0, Vec::len);

    let mut used = vec![false; lines.len()];
    let mut chains = Vec::new();

    let walk = |start: usize, forward: bool, used: &mut Vec<bool>| {
        used[start] = true;
        let mut chain = lines[start].clone();
        if !forward {
            chain.reverse();
        }
        loop {
            let at = match ends.get(&node(&chain[chain.len() - 1])) {
                Some(at) if at.len() == 2 => at,
                _ => break,
            };
            let Some(&(next, starts_here)) = at.iter().find(|(j, _)| !used[*j]) else {
                break;
            };
            used[next] = true;
            let mut piece = lines[next].clone();
            if !starts_here {
                piece.reverse();
            }
            chain.extend(piece.into_iter().skip(1));
        }
        chain
    };

    // open chains start at a node that is not a simple joint
    for i in 0..lines.len() {
        if used[i] {
            continue;
        }
        let line = &lines[i];
        if degree(&line[0]) != 2 {
            chains.push(walk(i, true, &mut used));
        } else if degree(&line[line.len() - 1]) != 2 {
            chains.push(walk(i, false, &mut used));
        }
    }
    // whatever is left forms closed loops
    for i in 0..lines.len() {
        if !used[i] {
            chains.push(walk(i, true, &mut used));
        }
    }

    chains.sort_by(|a, b| cmp_seq(a, b));
    match chains.len() {
        0 => None,
        1 => Some(Geometry::LineString(chains.swap_remove(0))),
        _ => Some(Geometry::MultiLineString(chains)),
    }
}

pub(crate) fn to_geo_polygon(rings: &[Vec<Coord>]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        LineString::new(ring.iter().map(|c| geo::Coord { x: c.x, y: c.y }).collect())
    });
    let exterior = rings.next()?;
    if exterior.0.is_empty() {
        return None;
    }
    Some(Polygon::new(exterior, rings.collect()))
}

fn from_geo_polygon(polygon: Polygon<f64>) -> Vec<Vec<Coord>> {
    let (exterior, interiors) = polygon.into_inner();
    std::iter::once(exterior)
        .chain(interiors)
        .map(|ring| ring.into_iter().map(|c| Coord::xy(c.x, c.y)).collect())
        .collect()
}

/// Bounding box of one input polygon in the R-tree
struct Footprint {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for Footprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Group polygons whose bounding boxes overlap, directly or through a chain
/// of other polygons. Polygons in different groups cannot intersect.
fn clusters(polygons: &[Polygon<f64>]) -> Vec<Vec<usize>> {
    let footprints: Vec<Footprint> = polygons
        .iter()
        .enumerate()
        .filter_map(|(index, polygon)| {
            let rect = polygon.bounding_rect()?;
            Some(Footprint {
                index,
                envelope: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            })
        })
        .collect();
    let tree = RTree::bulk_load(footprints);

    let mut parent: Vec<usize> = (0..polygons.len()).collect();
    for (p, q) in tree.intersection_candidates_with_other_tree(&tree) {
        let a = find(&mut parent, p.index);
        let b = find(&mut parent, q.index);
        if a != b {
            parent[a.max(b)] = a.min(b);
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();
    for i in 0..polygons.len() {
        let root = find(&mut parent, i);
        let at = *slot.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[at].push(i);
    }
    groups
}

/// Union a cluster by pairwise reduction, halving the queue each round
fn dissolve(cluster: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    let mut queue: VecDeque<MultiPolygon<f64>> = cluster
        .into_iter()
        .map(|polygon| MultiPolygon::new(vec![polygon]))
        .collect();

    while queue.len() > 1 {
        let mut next_queue = VecDeque::with_capacity(queue.len().div_ceil(2));
        while let Some(a) = queue.pop_front() {
            match queue.pop_front() {
                Some(b) => next_queue.push_back(a.union(&b)),
                None => next_queue.push_back(a),
            }
        }
        queue = next_queue;
    }

    queue.pop_front().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

fn union_polygons(polygons: Vec<Vec<Vec<Coord>>>) -> Option<Geometry> {
    let (originals, converted): (Vec<_>, Vec<_>) = polygons
        .into_iter()
        .filter_map(|rings| to_geo_polygon(&rings).map(|p| (rings, p)))
        .unzip();

    let groups = clusters(&converted);
    debug!(
        polygons = converted.len(),
        clusters = groups.len(),
        "dissolving polygons"
    );

    let mut originals: Vec<Option<Vec<Vec<Coord>>>> = originals.into_iter().map(Some).collect();
    let mut converted: Vec<Option<Polygon<f64>>> = converted.into_iter().map(Some).collect();
    let mut result = Vec::new();
    for group in groups {
        if let [only] = group[..] {
            // nothing to union with, keep the rings as they came (with Z)
            result.extend(originals[only].take());
            continue;
        }
        let cluster = group.iter().filter_map(|&i| converted[i].take()).collect();
        let dissolved = dissolve(cluster);
        if dissolved.0.is_empty() {
            warn!(
                polygons = group.len(),
                "polygons enclose no area, keeping them undissolved"
            );
            result.extend(group.iter().filter_map(|&i| originals[i].take()));
            continue;
        }
        result.extend(dissolved.into_iter().map(from_geo_polygon));
    }

    // dissolved polygons are planar, so a kept 3D polygon would mix dimensions
    uniform_dimensions(result.iter_mut().flatten().flatten());
    result.sort_by(|a, b| cmp_rings(a, b));
    match result.len() {
        0 => None,
        1 => Some(Geometry::Polygon(result.swap_remove(0))),
        _ => Some(Geometry::MultiPolygon(result)),
    }
}

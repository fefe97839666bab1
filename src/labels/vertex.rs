use std::collections::HashSet;

use geo::Bearing;

use crate::geofile::feature::Feature;
use crate::geometry::traversal::{position_to_coord, vertex_paths};

/// A labelled vertex: its `[lng, lat]` coordinate and the orientation of the label in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexEntry {
    pub coordinate: geo::Coord,
    pub angle: f64,
}

impl VertexEntry {
    /// Display text, latitude first, six decimals.
    pub fn label(&self) -> String {
        format!("{:.6}, {:.6}", self.coordinate.y, self.coordinate.x)
    }

    /// Identity used for deduplication. Six decimals is roughly 0.11 m at the equator.
    pub fn dedup_key(&self) -> String {
        format!("{:.6},{:.6}", self.coordinate.x, self.coordinate.y)
    }
}

/// Bearing in degrees from `from` to `to`, clockwise from north.
fn bearing(from: geo::Coord, to: geo::Coord) -> f64 {
    geo::Point::from(from).bearing(geo::Point::from(to))
}

fn path_entries(coords: &[geo::Coord]) -> impl Iterator<Item = VertexEntry> + '_ {
    coords.iter().enumerate().map(move |(index, coord)| {
        let angle = if let Some(next) = coords.get(index + 1) {
            bearing(*coord, *next)
        } else if index > 0 {
            bearing(coords[index - 1], *coord)
        } else {
            0.0
        };
        VertexEntry {
            coordinate: *coord,
            angle,
        }
    })
}

/// Extract the labelled vertices of every feature, deduplicated by rounded coordinate.
///
/// Polygons only contribute their outer ring. When two vertices round to the same key the first one wins, which
/// also removes the closing vertex of a ring.
pub fn extract_vertices(features: &[Feature]) -> Vec<VertexEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for value in features.iter().filter_map(|feature| feature.value()) {
        for path in vertex_paths(value) {
            let coords: Vec<geo::Coord> = path
                .iter()
                .filter_map(|position| position_to_coord(position))
                .collect();
            for entry in path_entries(&coords) {
                if seen.insert(entry.dedup_key()) {
                    entries.push(entry);
                }
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geojson::{Geometry, Value};
    use rstest::rstest;

    use super::{extract_vertices, VertexEntry};
    use crate::geofile::feature::{Feature, FeatureId};

    fn feature(id: &str, value: Value) -> Feature {
        Feature::new(FeatureId::String(id.to_string()), Geometry::new(value))
    }

    fn closed_square() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 0.0],
        ]
    }

    #[test]
    fn test_closing_vertex_is_emitted_once() {
        let entries = extract_vertices(&[feature("a", Value::Polygon(vec![closed_square()]))]);
        assert_eq!(4, entries.len());
        let origins = entries
            .iter()
            .filter(|entry| entry.coordinate == geo::Coord { x: 0.0, y: 0.0 })
            .count();
        assert_eq!(1, origins);
    }

    #[test]
    fn test_holes_do_not_contribute() {
        let hole = vec![
            vec![0.25, 0.25],
            vec![0.25, 0.75],
            vec![0.75, 0.75],
            vec![0.25, 0.25],
        ];
        let entries =
            extract_vertices(&[feature("a", Value::Polygon(vec![closed_square(), hole]))]);
        assert_eq!(4, entries.len());
        assert!(entries
            .iter()
            .all(|entry| entry.coordinate.x != 0.25 && entry.coordinate.x != 0.75));
    }

    #[test]
    fn test_angles_follow_the_path() {
        let line = Value::LineString(vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
        let entries = extract_vertices(&[feature("a", line)]);
        assert_eq!(3, entries.len());
        // Due north, then due east, and the last vertex keeps the bearing of the incoming edge.
        assert_abs_diff_eq!(entries[0].angle, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(entries[1].angle, 90.0, epsilon = 0.01);
        assert_abs_diff_eq!(entries[2].angle, entries[1].angle, epsilon = 1e-9);
    }

    #[test]
    fn test_single_point_has_zero_angle() {
        let entries = extract_vertices(&[feature("a", Value::Point(vec![12.5, -3.25]))]);
        assert_eq!(1, entries.len());
        assert_eq!(0.0, entries[0].angle);
    }

    #[test]
    fn test_first_occurrence_wins_across_features() {
        let features = vec![
            feature("a", Value::Point(vec![1.0000001, 2.0])),
            feature("b", Value::LineString(vec![vec![1.0000002, 2.0], vec![3.0, 4.0]])),
        ];
        let entries = extract_vertices(&features);
        assert_eq!(2, entries.len());
        assert_eq!(1.0000001, entries[0].coordinate.x);
        assert_eq!(0.0, entries[0].angle);
    }

    #[rstest]
    #[case(-46.633308, -23.55052, "-23.550520, -46.633308")]
    #[case(0.0, 0.0, "0.000000, 0.000000")]
    #[case(179.9999999, 89.123, "89.123000, 180.000000")]
    fn test_label(#[case] lng: f64, #[case] lat: f64, #[case] expected: &str) {
        let entry = VertexEntry {
            coordinate: geo::Coord { x: lng, y: lat },
            angle: 0.0,
        };
        assert_eq!(expected, entry.label());
    }
}

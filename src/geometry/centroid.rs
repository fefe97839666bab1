use geojson::{Position, Value};

use super::traversal::position_to_coord;

/// Arithmetic mean of a ring's vertices. The closing vertex is counted once.
///
/// Returns `None` for empty rings and for rings with fewer than three vertices.
pub fn ring_centroid(ring: &[Position]) -> Option<geo::Coord> {
    let mut coords: Vec<geo::Coord> = ring
        .iter()
        .filter_map(|position| position_to_coord(position))
        .collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }

    let count = coords.len() as f64;
    let sum = coords
        .iter()
        .fold(geo::Coord { x: 0.0, y: 0.0 }, |sum, coord| sum + *coord);
    Some(geo::Coord {
        x: sum.x / count,
        y: sum.y / count,
    })
}

/// Centroid of a polygon's outer ring. For a MultiPolygon the first polygon is used. Holes are ignored.
pub fn polygon_centroid(value: &Value) -> Option<geo::Coord> {
    let rings = match value {
        Value::Polygon(rings) => rings,
        Value::MultiPolygon(polygons) => polygons.first()?,
        _ => return None,
    };
    rings.first().and_then(|outer| ring_centroid(outer))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geojson::{Position, Value};
    use rstest::rstest;

    use super::{polygon_centroid, ring_centroid};

    fn ring(coords: &[(f64, f64)]) -> Vec<Position> {
        coords.iter().map(|(x, y)| vec![*x, *y]).collect()
    }

    #[test]
    fn test_square_centroid() {
        let square = ring(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0), (0.0, 0.0)]);
        let centroid = ring_centroid(&square).unwrap();
        assert_abs_diff_eq!(geo::Point::from(centroid), geo::Point::new(1.0, 1.0));
    }

    #[test]
    fn test_open_ring_centroid() {
        let triangle = ring(&[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0)]);
        let centroid = ring_centroid(&triangle).unwrap();
        assert_abs_diff_eq!(centroid.x, 1.0);
        assert_abs_diff_eq!(centroid.y, 1.0);
    }

    #[rstest]
    #[case(vec![])]
    #[case(ring(&[(1.0, 1.0)]))]
    #[case(ring(&[(1.0, 1.0), (1.0, 1.0)]))]
    #[case(ring(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]))]
    fn test_degenerate_ring_has_no_centroid(#[case] positions: Vec<Position>) {
        assert!(ring_centroid(&positions).is_none());
    }

    #[test]
    fn test_polygon_centroid_ignores_holes() {
        let polygon = Value::Polygon(vec![
            ring(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)]),
            ring(&[(3.0, 3.0), (3.0, 3.5), (3.5, 3.5), (3.0, 3.0)]),
        ]);
        let centroid = polygon_centroid(&polygon).unwrap();
        assert_abs_diff_eq!(geo::Point::from(centroid), geo::Point::new(2.0, 2.0));
    }

    #[test]
    fn test_multipolygon_uses_first_polygon() {
        let multi = Value::MultiPolygon(vec![
            vec![ring(&[(10.0, 10.0), (10.0, 12.0), (12.0, 12.0), (12.0, 10.0)])],
            vec![ring(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)])],
        ]);
        let centroid = polygon_centroid(&multi).unwrap();
        assert_abs_diff_eq!(geo::Point::from(centroid), geo::Point::new(11.0, 11.0));
    }

    #[test]
    fn test_non_polygon_has_no_centroid() {
        let line = Value::LineString(ring(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]));
        assert!(polygon_centroid(&line).is_none());
        assert!(polygon_centroid(&Value::MultiPolygon(vec![])).is_none());
    }
}

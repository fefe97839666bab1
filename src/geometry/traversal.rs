use geojson::{Position, Value};

/// Convert a GeoJSON position to a `[lng, lat]` coordinate. Positions with fewer than two ordinates are ignored.
pub fn position_to_coord(position: &[f64]) -> Option<geo::Coord> {
    match position {
        [x, y, ..] => Some(geo::Coord { x: *x, y: *y }),
        _ => None,
    }
}

/// First coordinate found by depth-first traversal of the geometry.
pub fn first_coordinate(value: &Value) -> Option<geo::Coord> {
    match value {
        Value::Point(position) => position_to_coord(position),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            positions.iter().find_map(|position| position_to_coord(position))
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => lines
            .iter()
            .flatten()
            .find_map(|position| position_to_coord(position)),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .find_map(|position| position_to_coord(position)),
        Value::GeometryCollection(geometries) => geometries
            .iter()
            .find_map(|geometry| first_coordinate(&geometry.value)),
    }
}

/// Visit every coordinate of the geometry, holes included.
pub fn for_each_coordinate<F: FnMut(geo::Coord)>(value: &Value, visit: &mut F) {
    match value {
        Value::Point(position) => visit_positions(std::slice::from_ref(position), visit),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            visit_positions(positions, visit)
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => lines
            .iter()
            .for_each(|line| visit_positions(line, visit)),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .for_each(|ring| visit_positions(ring, visit)),
        Value::GeometryCollection(geometries) => geometries
            .iter()
            .for_each(|geometry| for_each_coordinate(&geometry.value, visit)),
    }
}

fn visit_positions<F: FnMut(geo::Coord)>(positions: &[Position], visit: &mut F) {
    positions
        .iter()
        .filter_map(|position| position_to_coord(position))
        .for_each(|coord| visit(coord))
}

pub fn all_coordinates(value: &Value) -> Vec<geo::Coord> {
    let mut coords = Vec::new();
    for_each_coordinate(value, &mut |coord| coords.push(coord));
    coords
}

/// The vertex sequences that carry coordinate labels, in traversal order.
///
/// Points yield a one-element path, lines yield their vertices and polygons yield their outer ring only. Holes never
/// contribute.
pub fn vertex_paths(value: &Value) -> Vec<&[Position]> {
    let mut paths = Vec::new();
    collect_vertex_paths(value, &mut paths);
    paths
}

fn collect_vertex_paths<'a>(value: &'a Value, paths: &mut Vec<&'a [Position]>) {
    match value {
        Value::Point(position) => paths.push(std::slice::from_ref(position)),
        Value::MultiPoint(positions) => positions
            .iter()
            .for_each(|position| paths.push(std::slice::from_ref(position))),
        Value::LineString(positions) => paths.push(positions),
        Value::MultiLineString(lines) => lines.iter().for_each(|line| paths.push(line)),
        Value::Polygon(rings) => {
            if let Some(outer) = rings.first() {
                paths.push(outer)
            }
        }
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .filter_map(|rings| rings.first())
            .for_each(|outer| paths.push(outer)),
        Value::GeometryCollection(geometries) => geometries
            .iter()
            .for_each(|geometry| collect_vertex_paths(&geometry.value, paths)),
    }
}

use serde::{Deserialize, Serialize};

use super::traversal::{first_coordinate, for_each_coordinate};
use crate::geofile::feature::Feature;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct WgsBoundingBox {
    pub left_lon: f64,
    pub right_lon: f64,
    pub bottom_lat: f64,
    pub top_lat: f64,
}

impl WgsBoundingBox {
    pub fn from_coord(coord: geo::Coord) -> Self {
        Self {
            left_lon: coord.x,
            right_lon: coord.x,
            bottom_lat: coord.y,
            top_lat: coord.y,
        }
    }

    pub fn expand(&mut self, coord: geo::Coord) {
        self.left_lon = self.left_lon.min(coord.x);
        self.right_lon = self.right_lon.max(coord.x);
        self.bottom_lat = self.bottom_lat.min(coord.y);
        self.top_lat = self.top_lat.max(coord.y);
    }

    /// Bounds of every coordinate of every feature, seeded with the first coordinate found.
    /// Returns `None` when no feature has a coordinate.
    pub fn from_features(features: &[Feature]) -> Option<Self> {
        let seed = features
            .iter()
            .filter_map(|feature| feature.value())
            .find_map(first_coordinate)?;
        let mut bbox = Self::from_coord(seed);
        for value in features.iter().filter_map(|feature| feature.value()) {
            for_each_coordinate(value, &mut |coord| bbox.expand(coord));
        }
        Some(bbox)
    }

    pub fn center(&self) -> geo::Coord {
        geo::Coord {
            x: (self.left_lon + self.right_lon) / 2.0,
            y: (self.bottom_lat + self.top_lat) / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.right_lon - self.left_lon
    }

    pub fn height(&self) -> f64 {
        self.top_lat - self.bottom_lat
    }
}

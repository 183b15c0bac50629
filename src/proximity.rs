// src/proximity.rs

use crate::geometry;
use crate::types::{Detection, FrameSummary, ProximityPair, WorldPoint, Zone};

pub const PERSON_LABEL: &str = "person";
pub const VEHICLE_LABELS: [&str; 3] = ["car", "truck", "bus"];

pub fn is_person(class_name: &str) -> bool {
    class_name.eq_ignore_ascii_case(PERSON_LABEL)
}

pub fn is_vehicle(class_name: &str) -> bool {
    VEHICLE_LABELS
        .iter()
        .any(|v| class_name.eq_ignore_ascii_case(v))
}

/// Zone thresholds relative to T: d < T red, T <= d < 2T yellow, else green.
pub fn zone_for(distance_m: f64, threshold_m: f64) -> Zone {
    if distance_m < threshold_m {
        Zone::Red
    } else if distance_m < threshold_m * 2.0 {
        Zone::Yellow
    } else {
        Zone::Green
    }
}

/// Index-level pairing used by both classification and frame annotation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NearestPair {
    pub vehicle_idx: usize,
    pub person_idx: usize,
    pub distance_m: f64,
}

/// Greedy per-vehicle nearest-neighbor over projected detections.
///
/// Detections without a world point are excluded from pairing. Ties break
/// to the first-encountered person, so the result is stable but not a
/// globally optimal matching.
pub(crate) fn nearest_pairs(
    detections: &[Detection],
    world_points: &[Option<WorldPoint>],
) -> Vec<NearestPair> {
    let persons: Vec<usize> = (0..detections.len())
        .filter(|&i| is_person(&detections[i].class_name) && world_points[i].is_some())
        .collect();
    let vehicles: Vec<usize> = (0..detections.len())
        .filter(|&i| is_vehicle(&detections[i].class_name) && world_points[i].is_some())
        .collect();

    if persons.is_empty() || vehicles.is_empty() {
        return Vec::new();
    }

    let mut pairs = Vec::with_capacity(vehicles.len());
    for &vehicle_idx in &vehicles {
        let vehicle_world = world_points[vehicle_idx].unwrap();

        let mut nearest: Option<NearestPair> = None;
        for &person_idx in &persons {
            let person_world = world_points[person_idx].unwrap();
            let dist = geometry::distance(&vehicle_world, &person_world);

            if nearest.map_or(true, |n| dist < n.distance_m) {
                nearest = Some(NearestPair {
                    vehicle_idx,
                    person_idx,
                    distance_m: dist,
                });
            }
        }

        if let Some(pair) = nearest {
            pairs.push(pair);
        }
    }

    pairs
}

/// Classify a frame's projected detections into proximity pairs and an
/// aggregate zone. With zero persons or zero vehicles the summary is empty
/// and green.
pub fn classify(
    detections: &[Detection],
    world_points: &[Option<WorldPoint>],
    proximity_threshold_m: f64,
) -> FrameSummary {
    debug_assert_eq!(detections.len(), world_points.len());

    let pairs = nearest_pairs(detections, world_points);
    if pairs.is_empty() {
        return FrameSummary::empty();
    }

    let mut aggregate = Zone::Green;
    let detections: Vec<ProximityPair> = pairs
        .iter()
        .map(|pair| {
            let zone = zone_for(pair.distance_m, proximity_threshold_m);
            aggregate = aggregate.max(zone);
            ProximityPair {
                car_world: world_points[pair.vehicle_idx].unwrap(),
                distance_m: pair.distance_m,
                zone,
                nearest_person_world: world_points[pair.person_idx].unwrap(),
            }
        })
        .collect();

    FrameSummary {
        detections,
        aggregate_zone: aggregate,
    }
}

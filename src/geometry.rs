// src/geometry.rs

use crate::calibration::{CalibrationModel, IntrinsicsCalibration};
use crate::types::WorldPoint;

/// Project an original-frame pixel onto the ground plane.
///
/// Returns `None` when the projection ray does not intersect the ground in
/// front of the camera (or the homography maps the point to infinity).
pub fn project(u: f64, v: f64, calibration: &CalibrationModel) -> Option<WorldPoint> {
    match calibration {
        CalibrationModel::Homography { homography } => perspective_transform(u, v, homography),
        CalibrationModel::Intrinsics(intrinsics) => ray_cast(u, v, intrinsics),
    }
}

/// Apply a 3x3 image-to-ground homography with perspective division.
fn perspective_transform(u: f64, v: f64, h: &[[f64; 3]; 3]) -> Option<WorldPoint> {
    let w = h[2][0] * u + h[2][1] * v + h[2][2];
    if w.abs() < f64::EPSILON {
        return None;
    }

    Some(WorldPoint {
        x: (h[0][0] * u + h[0][1] * v + h[0][2]) / w,
        z: (h[1][0] * u + h[1][1] * v + h[1][2]) / w,
    })
}

/// Back-project the pixel through the intrinsics, rotate the direction by
/// the camera tilt about the horizontal axis, and intersect with the ground
/// plane `camera_height_m` below the camera.
fn ray_cast(u: f64, v: f64, calib: &IntrinsicsCalibration) -> Option<WorldPoint> {
    // Camera-space direction of the pixel ray.
    let xc = (u - calib.cx) / calib.fx;
    let yc = (v - calib.cy) / calib.fy;
    let zc = 1.0;

    // Rotation about the x-axis by the tilt angle.
    let theta = calib.tilt_rad();
    let (sin_t, cos_t) = theta.sin_cos();
    let dw_x = xc;
    let dw_y = cos_t * yc - sin_t * zc;
    let dw_z = sin_t * yc + cos_t * zc;

    // Ray points level or upward: no ground intersection in front.
    if dw_y >= 0.0 {
        return None;
    }

    let s = -calib.camera_height_m / dw_y;
    Some(WorldPoint {
        x: s * dw_x,
        z: s * dw_z,
    })
}

/// Euclidean distance between two ground-plane points.
pub fn distance(a: &WorldPoint, b: &WorldPoint) -> f64 {
    ((a.x - b.x).powi(2) + (a.z - b.z).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intrinsics(tilt_deg: f64, height_m: f64) -> CalibrationModel {
        CalibrationModel::Intrinsics(IntrinsicsCalibration {
            fx: 1000.0,
            fy: 1000.0,
            cx: 640.0,
            cy: 360.0,
            camera_height_m: height_m,
            tilt_deg,
        })
    }

    #[test]
    fn test_center_pixel_with_zero_tilt_returns_none() {
        // Camera pointing horizontally: the center ray is level (dw_y = 0).
        let calib = intrinsics(0.0, 5.0);
        assert!(project(640.0, 360.0, &calib).is_none());
    }

    #[test]
    fn test_positive_vertical_component_returns_none() {
        // Level camera, pixel below the principal point: yc > 0, so the
        // rotated ray has dw_y = yc >= 0 and never meets the ground.
        let calib = intrinsics(0.0, 5.0);
        assert!(project(640.0, 600.0, &calib).is_none());
    }

    #[test]
    fn test_negative_vertical_component_is_finite() {
        // Level camera, pixel above the principal point: yc < 0 gives
        // dw_y < 0 and a finite ground intersection.
        let calib = intrinsics(0.0, 5.0);
        let p = project(640.0, 100.0, &calib).unwrap();
        assert!(p.x.is_finite() && p.z.is_finite());
        assert!(p.z > 0.0);
    }

    #[test]
    fn test_center_ray_straight_down_camera() {
        // Tilted 90 degrees: the center ray points straight at the ground
        // directly below the camera.
        let calib = intrinsics(90.0, 5.0);
        let p = project(640.0, 360.0, &calib).unwrap();
        assert!(p.x.abs() < 1e-9);
        assert!(p.z.abs() < 1e-9);
    }

    #[test]
    fn test_zero_tilt_ground_distance() {
        // Level camera at height h: a pixel offset dy above the center
        // has dw_y = -dy / fy and maps to Z = h * fy / dy on the ground.
        let calib = intrinsics(0.0, 2.0);
        let p = project(640.0, 360.0 - 400.0, &calib).unwrap();
        assert!((p.z - 2.0 * 1000.0 / 400.0).abs() < 1e-9);
        assert!(p.x.abs() < 1e-9);
    }

    #[test]
    fn test_homography_matches_ray_cast_for_nadir_camera() {
        // For a straight-down camera the ground mapping is the affine
        // homography X = h*(u-cx)/fx, Z = h*(v-cy)/fy.
        let h = 4.0;
        let (fx, fy, cx, cy) = (1000.0, 1000.0, 640.0, 360.0);
        let homography = CalibrationModel::Homography {
            homography: [
                [h / fx, 0.0, -h * cx / fx],
                [0.0, h / fy, -h * cy / fy],
                [0.0, 0.0, 1.0],
            ],
        };
        let intr = CalibrationModel::Intrinsics(IntrinsicsCalibration {
            fx,
            fy,
            cx,
            cy,
            camera_height_m: h,
            tilt_deg: 90.0,
        });

        for &(u, v) in &[(100.0, 100.0), (640.0, 360.0), (1200.0, 700.0)] {
            let a = project(u, v, &homography).unwrap();
            let b = project(u, v, &intr).unwrap();
            assert!((a.x - b.x).abs() < 1e-9, "x mismatch at ({u},{v})");
            assert!((a.z - b.z).abs() < 1e-9, "z mismatch at ({u},{v})");
        }
    }

    #[test]
    fn test_homography_degenerate_point_returns_none() {
        let model = CalibrationModel::Homography {
            homography: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, -360.0]],
        };
        // w = v - 360 vanishes on the horizon line.
        assert!(project(640.0, 360.0, &model).is_none());
    }

    #[test]
    fn test_distance() {
        let a = WorldPoint { x: 0.0, z: 5.0 };
        let b = WorldPoint { x: 0.0, z: 6.0 };
        assert!((distance(&a, &b) - 1.0).abs() < 1e-12);

        let c = WorldPoint { x: 3.0, z: 9.0 };
        assert!((distance(&a, &c) - 5.0).abs() < 1e-12);
    }
}

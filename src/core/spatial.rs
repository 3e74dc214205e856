use nalgebra::{Point3, Vector3};

/// Per-axis separation between two points in a periodic box, using the
/// Minimum Image Convention (MIC).
///
/// Each component lies in `[0, box/2]`. An axis with a non-positive box length
/// is treated as non-periodic.
#[inline]
pub fn periodic_separation(p1: &Point3<f64>, p2: &Point3<f64>, box_size: &Vector3<f64>) -> Vector3<f64> {
    let mut d = (p2 - p1).abs();
    for axis in 0..3 {
        let len = box_size[axis];
        if len <= 0.0 {
            continue;
        }

        // Fold into the primary cell first; positions may sit outside [0, L).
        let mut dx = d[axis].rem_euclid(len);
        if dx > len / 2.0 {
            dx = len - dx;
        }
        d[axis] = dx;
    }
    d
}

/// Squared MIC distance between two points.
#[inline]
pub fn periodic_distance_sq(p1: &Point3<f64>, p2: &Point3<f64>, box_size: &Vector3<f64>) -> f64 {
    periodic_separation(p1, p2, box_size).norm_squared()
}

#[inline]
pub fn periodic_distance(p1: &Point3<f64>, p2: &Point3<f64>, box_size: &Vector3<f64>) -> f64 {
    periodic_distance_sq(p1, p2, box_size).sqrt()
}

/// Moves a point into the primary box `[0, L)` on every periodic axis.
pub fn wrap_into_box(p: &Point3<f64>, box_size: &Vector3<f64>) -> Point3<f64> {
    let mut w = *p;
    for axis in 0..3 {
        let len = box_size[axis];
        if len > 0.0 {
            w[axis] = w[axis].rem_euclid(len);
            // rem_euclid can round up to exactly `len` for tiny negatives
            if w[axis] >= len {
                w[axis] = 0.0;
            }
        }
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separation_uses_minimum_image() {
        let b = Vector3::repeat(100.0);
        let d = periodic_separation(&Point3::new(1.0, 50.0, 0.0), &Point3::new(99.0, 10.0, 0.0), &b);
        assert!((d.x - 2.0).abs() < 1e-12);
        assert!((d.y - 40.0).abs() < 1e-12);
        assert_eq!(d.z, 0.0);
    }

    #[test]
    fn half_box_subtraction_would_disagree() {
        // |dx| = 90 in a box of 100: MIC gives 10, subtracting L/2 would give 40.
        let b = Vector3::repeat(100.0);
        let d = periodic_distance(&Point3::new(5.0, 0.0, 0.0), &Point3::new(95.0, 0.0, 0.0), &b);
        assert!((d - 10.0).abs() < 1e-12);
        assert!((d - 40.0).abs() > 1.0);
    }

    #[test]
    fn wrap_folds_negative_coordinates() {
        let b = Vector3::repeat(10.0);
        let w = wrap_into_box(&Point3::new(-1.0, 12.5, 3.0), &b);
        assert!((w.x - 9.0).abs() < 1e-12);
        assert!((w.y - 2.5).abs() < 1e-12);
        assert!((w.z - 3.0).abs() < 1e-12);
    }
}

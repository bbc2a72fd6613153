//! Great-circle geometry on the spherical Earth model.

use meridian_types::{Distance, GpsLocation};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates, in kilometres.
pub fn distance_km(a: &GpsLocation, b: &GpsLocation) -> Distance {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_to_self() {
        let p = GpsLocation::new(47.4979, 19.0402);
        assert_eq!(distance_km(&p, &p), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let a = GpsLocation::new(0.0, 0.0);
        let b = GpsLocation::new(0.0, 1.0);
        let d = distance_km(&a, &b);
        // One degree of arc on a 6371 km sphere is ~111.19 km.
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn equator_to_pole_is_a_quarter_circumference() {
        let a = GpsLocation::new(0.0, 0.0);
        let b = GpsLocation::new(90.0, 0.0);
        let d = distance_km(&a, &b);
        let quarter = EARTH_RADIUS_KM * std::f64::consts::PI / 2.0;
        assert!((d - quarter).abs() < 0.01, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GpsLocation::new(50.0, 50.0);
        let b = GpsLocation::new(1.0, 2.0);
        assert_eq!(distance_km(&a, &b), distance_km(&b, &a));
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let a = GpsLocation::new(0.0, 0.0);
        let b = GpsLocation::new(0.0, 180.0);
        let d = distance_km(&a, &b);
        let half = EARTH_RADIUS_KM * std::f64::consts::PI;
        assert!((d - half).abs() < 0.01, "got {d}");
    }
}

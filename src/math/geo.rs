//! Great-circle distance.
//!
//! Zone boxes and proximity counts work in plain degrees; only the 7-day proximity
//! filter needs a real distance, and the haversine form is accurate enough at the
//! 100 km scale it is used for.

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two `(lat, lon)` points in degrees, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards against `a` drifting just above 1.0 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        assert_eq!(haversine_km(28.6, 77.2, 28.6, 77.2), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_km(20.0, 80.0, 21.0, 80.0);
        assert!((d - 111.19).abs() < 0.05, "got {d}");
    }

    #[test]
    fn delhi_to_mumbai_is_about_1150_km() {
        let d = haversine_km(28.6139, 77.2090, 19.0760, 72.8777);
        assert!((d - 1150.0).abs() < 15.0, "got {d}");
    }
}

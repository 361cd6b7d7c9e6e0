use crate::models::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle length along consecutive points.
pub fn polyline_length_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_km(Coordinate::new(45.0, 5.0), Coordinate::new(46.0, 5.0));
        assert!((d - 111.19).abs() < 0.01, "{d}");
    }

    #[test]
    fn polyline_length_of_short_paths_is_zero() {
        assert_eq!(polyline_length_km(&[]), 0.0);
        assert_eq!(polyline_length_km(&[Coordinate::new(45.0, 5.0)]), 0.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-80.0..=80.0, -180.0..=180.0).prop_map(|(lat, lon)| Coordinate { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_haversine_symmetric(a in valid_coord(), b in valid_coord()) {
                prop_assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
            }

            #[test]
            fn prop_detour_is_never_shorter(
                a in valid_coord(),
                b in valid_coord(),
                via in valid_coord()
            ) {
                let direct = polyline_length_km(&[a, b]);
                let detour = polyline_length_km(&[a, via, b]);
                prop_assert!(detour + 1e-6 >= direct);
            }
        }
    }
}

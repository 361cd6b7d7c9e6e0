use crate::models::Coordinate;

/// Total turning of a polyline in degrees.
///
/// Each consecutive triple contributes the angle between its two direction
/// vectors, measured in the (lon, lat) plane. Fewer than three points means
/// there is nothing to turn, and triples with a repeated point are skipped.
pub fn curvature(polyline: &[Coordinate]) -> f64 {
    if polyline.len() < 3 {
        return 0.0;
    }

    polyline
        .windows(3)
        .filter_map(|w| turn_angle_deg(w[0], w[1], w[2]))
        .sum()
}

fn turn_angle_deg(p1: Coordinate, p2: Coordinate, p3: Coordinate) -> Option<f64> {
    let v1 = (p2.lon - p1.lon, p2.lat - p1.lat);
    let v2 = (p3.lon - p2.lon, p3.lat - p2.lat);

    let norm1 = v1.0.hypot(v1.1);
    let norm2 = v2.0.hypot(v2.1);
    if norm1 <= 0.0 || norm2 <= 0.0 {
        return None;
    }

    let cos = ((v1.0 * v2.0 + v1.1 * v2.1) / (norm1 * norm2)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

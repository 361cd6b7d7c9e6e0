/// Produces the single visibility score applied to every segment of a route.
pub trait VisibilityScorer: Send + Sync {
    fn score(&self) -> u32;
}

/// Configured score; 0 when no imagery is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedVisibility(pub u32);

impl VisibilityScorer for FixedVisibility {
    fn score(&self) -> u32 {
        self.0
    }
}

/// Buckets an edge-density percentage (edge pixels over all pixels × 100)
/// into the coarse scores the classifier expects.
pub fn bucket_edge_density(percent: f64) -> u32 {
    if percent > 5.0 {
        20
    } else if percent > 2.0 {
        10
    } else {
        0
    }
}

/// Scorer fed by an externally computed edge density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeDensityVisibility {
    pub percent: f64,
}

impl VisibilityScorer for EdgeDensityVisibility {
    fn score(&self) -> u32 {
        bucket_edge_density(self.percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_buckets() {
        assert_eq!(bucket_edge_density(0.0), 0);
        assert_eq!(bucket_edge_density(2.0), 0);
        assert_eq!(bucket_edge_density(2.5), 10);
        assert_eq!(bucket_edge_density(5.0), 10);
        assert_eq!(bucket_edge_density(12.0), 20);
        assert_eq!(bucket_edge_density(f64::NAN), 0);
    }

    #[test]
    fn scorers() {
        assert_eq!(FixedVisibility::default().score(), 0);
        assert_eq!(FixedVisibility(10).score(), 10);
        assert_eq!(EdgeDensityVisibility { percent: 7.5 }.score(), 20);
    }
}

use crate::config::Tolerance;
use crate::spectrum::Peak;

/// How well a detector recovered a set of known band positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakRecovery {
    /// Expected positions with a detected peak within tolerance
    pub found: Vec<f64>,
    /// Expected positions with no detected peak
    pub missed: Vec<f64>,
    /// Detected peaks matching no expected position
    pub spurious: Vec<f64>,
}

impl PeakRecovery {
    /// Fraction of expected positions recovered
    pub fn recall(&self) -> f64 {
        let total = self.found.len() + self.missed.len();
        if total == 0 {
            return 1.0;
        }
        self.found.len() as f64 / total as f64
    }
}

pub fn measure_peak_recovery(
    expected: &[f64],
    detected: &[Peak],
    tolerance: Tolerance,
) -> PeakRecovery {
    let mut recovery = PeakRecovery::default();
    for &e in expected {
        if detected.iter().any(|p| tolerance.is_close(p.position, e)) {
            recovery.found.push(e);
        } else {
            recovery.missed.push(e);
        }
    }
    recovery.spurious = detected
        .iter()
        .map(|p| p.position)
        .filter(|&d| !expected.iter().any(|&e| tolerance.is_close(d, e)))
        .collect();
    recovery
}

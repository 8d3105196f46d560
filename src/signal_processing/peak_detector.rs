use crate::config::{BaselineConfig, DetectionConfig, Prominence};
use crate::error::{MatchError, Result};
use crate::spectrum::{Peak, Spectrum, ensure_finite};

use super::baseline::BaselineCorrector;

/// Peak detector for baseline-corrected Raman spectra
///
/// A sample is reported as a peak when it is a local maximum (flat tops
/// resolve to their middle sample), reaches the minimum height, survives
/// greedy distance suppression (highest peaks claim their neighbourhood
/// first), and has at least the minimum topographic prominence.
///
/// Detection never mutates the input spectrum.
pub struct PeakDetector {
    height: f64,
    distance: usize,
    prominence: Prominence,
    baseline: Option<BaselineCorrector>,
}

impl PeakDetector {
    /// Create a detector; the baseline is subtracted first when enabled.
    pub fn new(detection: &DetectionConfig, baseline: &BaselineConfig) -> Result<Self> {
        detection.validate()?;
        let baseline = if baseline.enabled {
            Some(BaselineCorrector::new(baseline)?)
        } else {
            None
        };
        Ok(Self {
            height: detection.height,
            distance: detection.distance,
            prominence: detection.prominence,
            baseline,
        })
    }

    /// Detect peaks in a spectrum, ordered by ascending position.
    pub fn detect(&self, spectrum: &Spectrum) -> Result<Vec<Peak>> {
        let corrected;
        let y = match &self.baseline {
            Some(corrector) => {
                corrected = corrector.subtract(spectrum.y())?;
                corrected.as_slice()
            }
            None => spectrum.y(),
        };
        Ok(self.peaks_in(spectrum.x(), y))
    }

    /// Detect peaks and also return the intensities they were found in.
    pub fn detect_with_trace(&self, spectrum: &Spectrum) -> Result<(Vec<f64>, Vec<Peak>)> {
        let y = self.corrected(spectrum)?;
        let peaks = self.peaks_in(spectrum.x(), &y);
        Ok((y, peaks))
    }

    /// Intensities the detector searches: baseline-corrected when enabled.
    pub fn corrected(&self, spectrum: &Spectrum) -> Result<Vec<f64>> {
        match &self.baseline {
            Some(corrector) => corrector.subtract(spectrum.y()),
            None => Ok(spectrum.y().to_vec()),
        }
    }

    fn peaks_in(&self, x: &[f64], y: &[f64]) -> Vec<Peak> {
        let prominence = self.prominence.resolve(y);
        let peaks: Vec<Peak> = find_peak_indices(y, self.height, self.distance, prominence)
            .into_iter()
            .map(|i| Peak {
                position: x[i],
                height: y[i],
            })
            .collect();

        log::trace!(
            "Detected {} peaks (height >= {}, distance >= {}, prominence >= {:.4})",
            peaks.len(),
            self.height,
            self.distance,
            prominence
        );
        peaks
    }
}

/// Search `y_data` for peaks and report them at their `x_data` positions.
///
/// `prominence` of `None` uses the mean of `y_data`. No baseline is removed
/// here; pass an already corrected trace or use [`PeakDetector`].
pub fn search_peaks(
    x_data: &[f64],
    y_data: &[f64],
    height: f64,
    distance: usize,
    prominence: Option<f64>,
) -> Result<Vec<Peak>> {
    if x_data.len() != y_data.len() {
        return Err(MatchError::InvalidInput(format!(
            "x has {} values but y has {}",
            x_data.len(),
            y_data.len()
        )));
    }
    ensure_finite("x", x_data)?;
    ensure_finite("y", y_data)?;
    let config = DetectionConfig {
        height,
        distance,
        prominence: prominence.map_or(Prominence::Auto, Prominence::Fixed),
    };
    config.validate()?;

    let prominence = config.prominence.resolve(y_data);
    Ok(find_peak_indices(y_data, height, distance, prominence)
        .into_iter()
        .map(|i| Peak {
            position: x_data[i],
            height: y_data[i],
        })
        .collect())
}

/// Indices of peaks in `y`, ascending.
pub fn find_peak_indices(y: &[f64], height: f64, distance: usize, prominence: f64) -> Vec<usize> {
    let mut peaks: Vec<usize> = local_maxima(y)
        .into_iter()
        .filter(|&i| y[i] >= height)
        .collect();

    if distance > 1 {
        peaks = select_by_distance(&peaks, y, distance);
    }

    peaks.retain(|&i| peak_prominence(y, i) >= prominence);
    peaks
}

/// Local maxima, including the middle sample of flat-topped maxima.
///
/// The first and last samples are never maxima.
fn local_maxima(y: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if y.len() < 3 {
        return maxima;
    }

    let last = y.len() - 1;
    let mut i = 1;
    while i < last {
        if y[i - 1] < y[i] {
            let mut ahead = i + 1;
            while ahead < last && y[ahead] == y[i] {
                ahead += 1;
            }
            if y[ahead] < y[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}

/// Greedy suppression: visiting peaks from highest to lowest, drop every
/// remaining peak closer than `distance` samples to the one being visited.
/// Among equal heights the rightmost peak is visited first and survives.
fn select_by_distance(peaks: &[usize], y: &[f64], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];

    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| y[peaks[a]].total_cmp(&y[peaks[b]]));

    for &j in by_height.iter().rev() {
        if !keep[j] {
            continue;
        }

        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Topographic prominence of the peak at `index`.
///
/// Extends left and right until a strictly higher sample or the edge of
/// the trace; the prominence is the height above the higher of the two
/// minima found along the way.
pub fn peak_prominence(y: &[f64], index: usize) -> f64 {
    let top = y[index];

    let mut left_min = top;
    for &v in y[..=index].iter().rev() {
        if v > top {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = top;
    for &v in &y[index..] {
        if v > top {
            break;
        }
        right_min = right_min.min(v);
    }

    top - left_min.max(right_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_detection(height: f64, distance: usize, prominence: Prominence) -> PeakDetector {
        let detection = DetectionConfig {
            height,
            distance,
            prominence,
        };
        let baseline = BaselineConfig {
            enabled: false,
            ..BaselineConfig::default()
        };
        PeakDetector::new(&detection, &baseline).unwrap()
    }

    #[test]
    fn test_local_maxima_simple() {
        let y = [0.0, 1.0, 0.0, 2.0, 0.0];
        assert_eq!(local_maxima(&y), vec![1, 3]);
    }

    #[test]
    fn test_local_maxima_plateau_midpoint() {
        let y = [0.0, 1.0, 1.0, 1.0, 0.0];
        assert_eq!(local_maxima(&y), vec![2]);
        let y = [0.0, 1.0, 1.0, 0.0];
        assert_eq!(local_maxima(&y), vec![1]);
    }

    #[test]
    fn test_local_maxima_edges_and_shoulders() {
        // Rising edge to the boundary and a shoulder are not maxima
        assert!(local_maxima(&[0.0, 1.0, 2.0]).is_empty());
        assert!(local_maxima(&[0.0, 1.0, 1.0, 2.0, 3.0]).is_empty());
        assert!(local_maxima(&[1.0, 0.0]).is_empty());
    }

    #[test]
    fn test_prominence() {
        let y = [0.0, 5.0, 2.0, 8.0, 1.0];
        assert_eq!(peak_prominence(&y, 3), 8.0 - 1.0);
        // Right search stops at the higher peak after bottoming at 2.0
        assert_eq!(peak_prominence(&y, 1), 5.0 - 0.0_f64.max(2.0));
    }

    #[test]
    fn test_height_filter() {
        let y = [0.0, 0.05, 0.0, 0.5, 0.0];
        assert_eq!(find_peak_indices(&y, 0.1, 1, 0.0), vec![3]);
    }

    #[test]
    fn test_distance_keeps_higher_peak() {
        let mut y = vec![0.0; 40];
        y[10] = 1.0;
        y[14] = 2.0;
        y[30] = 1.5;
        assert_eq!(find_peak_indices(&y, 0.1, 10, 0.0), vec![14, 30]);
    }

    #[test]
    fn test_distance_tie_keeps_later_peak() {
        let mut y = vec![0.0; 30];
        y[10] = 1.0;
        y[14] = 1.0;
        assert_eq!(find_peak_indices(&y, 0.1, 10, 0.0), vec![14]);
    }

    #[test]
    fn test_prominence_filter() {
        // A small ripple on the flank of a large peak is not prominent
        let y = [0.0, 1.0, 2.0, 2.2, 2.1, 5.0, 0.0];
        assert_eq!(find_peak_indices(&y, 0.1, 1, 1.0), vec![5]);
        assert_eq!(find_peak_indices(&y, 0.1, 1, 0.0), vec![3, 5]);
    }

    #[test]
    fn test_search_peaks_positions() {
        let x: Vec<f64> = (0..50).map(|i| 400.0 + i as f64 * 2.0).collect();
        let mut y = vec![0.0; 50];
        y[10] = 3.0;
        y[35] = 4.0;
        let peaks = search_peaks(&x, &y, 0.1, 10, None).unwrap();
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].position, 420.0);
        assert_eq!(peaks[0].height, 3.0);
        assert_eq!(peaks[1].position, 470.0);
    }

    #[test]
    fn test_search_peaks_auto_prominence_is_mean() {
        // Mean is 1.0; the 0.5-high bump is below that prominence
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![0.0, 0.5, 0.0, 9.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let peaks = search_peaks(&x, &y, 0.1, 1, None).unwrap();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].position, 3.0);
    }

    #[test]
    fn test_search_peaks_flat_is_empty() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y = vec![1.0; 4];
        assert!(search_peaks(&x, &y, 0.1, 10, None).unwrap().is_empty());
    }

    #[test]
    fn test_search_peaks_invalid_input() {
        assert!(search_peaks(&[1.0, 2.0], &[1.0], 0.1, 10, None).is_err());
        assert!(search_peaks(&[1.0, 2.0], &[1.0, f64::NAN], 0.1, 10, None).is_err());
        assert!(search_peaks(&[1.0, 2.0], &[1.0, 2.0], 0.1, 0, None).is_err());
        assert!(search_peaks(&[1.0, 2.0], &[1.0, 2.0], 0.1, 10, Some(-1.0)).is_err());
    }

    #[test]
    fn test_detector_does_not_mutate() {
        let spectrum = Spectrum::new(
            (0..20).map(|i| i as f64).collect(),
            (0..20).map(|i| if i == 10 { 5.0 } else { 0.0 }).collect(),
        )
        .unwrap();
        let before = spectrum.clone();
        let peaks = raw_detection(0.1, 10, Prominence::Auto)
            .detect(&spectrum)
            .unwrap();
        assert_eq!(peaks.len(), 1);
        assert_eq!(spectrum, before);
    }

    #[test]
    fn test_detector_with_baseline() {
        let x: Vec<f64> = (0..400).map(|i| 200.0 + i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&w| {
                let drift = 20.0 + 0.01 * (w - 200.0);
                let peak = |c: f64| 40.0 / (1.0 + ((w - c) / 3.0).powi(2));
                drift + peak(300.0) + peak(450.0)
            })
            .collect();
        let spectrum = Spectrum::new(x, y).unwrap();
        let detector =
            PeakDetector::new(&DetectionConfig::default(), &BaselineConfig::default()).unwrap();
        let peaks = detector.detect(&spectrum).unwrap();
        let positions: Vec<f64> = peaks.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![300.0, 450.0]);
        assert!(peaks.iter().all(|p| p.height > 20.0));

        let (trace, traced) = detector.detect_with_trace(&spectrum).unwrap();
        assert_eq!(traced, peaks);
        assert_eq!(trace, detector.corrected(&spectrum).unwrap());
        assert!(trace[0].abs() < 5.0);
    }
}

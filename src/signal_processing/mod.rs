pub mod baseline;
pub mod interpolation;
pub mod math;
pub mod peak_detector;
pub mod peak_fit;

pub use baseline::{BaselineCorrector, subtract_baseline};
pub use interpolation::CubicSpline;
pub use peak_detector::{PeakDetector, search_peaks};
pub use peak_fit::{FitReport, PeakFit, PeakFitter};

//! Smoothing Filter Implementations
//!
//! Pure transforms from a sample sequence to a same-length sequence. Every
//! filter returns an empty vector for empty input and never fails.
//!
//! The Butterworth stage is a single second-order low-pass biquad. The `order`
//! parameter is carried for configuration parity only.

use log::warn;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Quality factor of the low-pass biquad
pub const BUTTERWORTH_Q: f64 = 0.707;
/// Cutoff used when none (or a degenerate one) is configured
pub const DEFAULT_CUTOFF_HZ: f64 = 6.0;
/// Sample rate assumed when the caller has none
pub const DEFAULT_SAMPLE_RATE: f64 = 100.0;

const SAVGOL_KERNEL: [f64; 5] = [-3.0, 12.0, 17.0, 12.0, -3.0];
const SAVGOL_NORM: f64 = 35.0;

/// Normalized biquad coefficients (a0 divided out)
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Design a low-pass section at `cutoff` Hz for a signal sampled at `sample_rate` Hz
    pub fn lowpass(cutoff: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * cutoff / sample_rate;
        let (sn, cs) = omega.sin_cos();
        let alpha = sn / (2.0 * BUTTERWORTH_Q);

        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cs) / 2.0 / a0,
            b1: (1.0 - cs) / a0,
            b2: (1.0 - cs) / 2.0 / a0,
            a1: -2.0 * cs / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Run the recurrence over a whole signal. The first two outputs stay zero.
    pub fn filter(&self, signal: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; signal.len()];
        for i in 2..signal.len() {
            out[i] = self.b0 * signal[i] + self.b1 * signal[i - 1] + self.b2 * signal[i - 2]
                - self.a1 * out[i - 1]
                - self.a2 * out[i - 2];
        }
        out
    }
}

/// Second-order Butterworth low-pass.
///
/// A non-positive or non-finite cutoff falls back to 6 Hz, a non-positive
/// sample rate to 100 Hz.
pub fn butterworth(signal: &[f64], sample_rate: f64, cutoff: f64, _order: u32) -> Vec<f64> {
    let fs = if sample_rate > 0.0 && sample_rate.is_finite() {
        sample_rate
    } else {
        DEFAULT_SAMPLE_RATE
    };
    let fc = if cutoff > 0.0 && cutoff.is_finite() {
        cutoff
    } else {
        DEFAULT_CUTOFF_HZ
    };
    BiquadCoeffs::lowpass(fc, fs).filter(signal)
}

/// Fixed 5-point quadratic Savitzky-Golay smoothing.
/// The first two and last two samples pass through unchanged.
pub fn savitzky_golay(signal: &[f64]) -> Vec<f64> {
    let mut out = signal.to_vec();
    if signal.len() < SAVGOL_KERNEL.len() {
        return out;
    }
    for i in 2..signal.len() - 2 {
        let acc: f64 = SAVGOL_KERNEL
            .iter()
            .zip(&signal[i - 2..=i + 2])
            .map(|(k, x)| k * x)
            .sum();
        out[i] = acc / SAVGOL_NORM;
    }
    out
}

/// Scalar recursive Kalman smoother. A non-positive trust ratio uses 500.
///
/// `_smooth` is accepted for configuration parity and does not change the output.
pub fn kalman(signal: &[f64], trust_ratio: f64, _smooth: bool) -> Vec<f64> {
    let Some(&first) = signal.first() else {
        return Vec::new();
    };

    let trust_ratio = if trust_ratio > 0.0 && trust_ratio.is_finite() {
        trust_ratio
    } else {
        default_trust_ratio()
    };
    let process_noise = 1.0 / trust_ratio;
    let measurement_noise = 1.0;
    let mut estimate = first;
    let mut error_estimate = 1.0;

    signal
        .iter()
        .map(|&x| {
            let gain = error_estimate / (error_estimate + measurement_noise);
            estimate += gain * (x - estimate);
            error_estimate = (1.0 - gain) * error_estimate + process_noise.abs();
            estimate
        })
        .collect()
}

/// Moving average over a window of `window` samples centered at each index.
/// The window shrinks at the boundaries.
pub fn loess(signal: &[f64], window: usize) -> Vec<f64> {
    let n = signal.len();
    let half = window / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let slice = &signal[lo..hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Gaussian kernel convolution with edge clamping. Radius is `ceil(3 * sigma)`,
/// capped at the signal length.
pub fn gaussian(signal: &[f64], sigma: f64) -> Vec<f64> {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return signal.to_vec();
    }
    let radius = ((3.0 * sigma).ceil() as usize).min(signal.len()) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-((k * k) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }

    (0..signal.len())
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(w, k)| w * signal[clamp_index(i as isize + k, signal.len())])
                .sum()
        })
        .collect()
}

/// Sliding median with edge clamping. The window spans `kernel_size / 2` on
/// each side of the current index, capped at the signal length.
pub fn median(signal: &[f64], kernel_size: usize) -> Vec<f64> {
    let half = (kernel_size / 2).min(signal.len()) as isize;
    let mut window = Vec::with_capacity(2 * half as usize + 1);
    (0..signal.len())
        .map(|i| {
            window.clear();
            window.extend((-half..=half).map(|k| signal[clamp_index(i as isize + k, signal.len())]));
            window.sort_by(|a, b| a.total_cmp(b));
            window[window.len() / 2]
        })
        .collect()
}

#[inline]
fn clamp_index(idx: isize, len: usize) -> usize {
    idx.clamp(0, len as isize - 1) as usize
}

fn default_cutoff() -> f64 {
    DEFAULT_CUTOFF_HZ
}
fn default_order() -> u32 {
    4
}
fn default_trust_ratio() -> f64 {
    500.0
}
fn default_smooth() -> bool {
    true
}
fn default_smoothing() -> f64 {
    0.1
}
fn default_loess_window() -> usize {
    5
}
fn default_sigma() -> f64 {
    1.0
}
fn default_kernel_size() -> usize {
    3
}

/// The smoothing stage applied to every raw axis before the Savitzky-Golay polish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    Butterworth {
        #[serde(default = "default_cutoff")]
        cutoff_hz: f64,
        #[serde(default = "default_order")]
        order: u32,
    },
    Kalman {
        #[serde(default = "default_trust_ratio")]
        trust_ratio: f64,
        #[serde(default = "default_smooth")]
        smooth: bool,
    },
    /// Butterworth when `cutoff_hz > 0`, otherwise Gaussian with `sigma = smoothing * 5`
    GcvSpline {
        #[serde(default)]
        cutoff_hz: f64,
        #[serde(default = "default_smoothing")]
        smoothing: f64,
    },
    Loess {
        #[serde(default = "default_loess_window")]
        window: usize,
    },
    Gaussian {
        #[serde(default = "default_sigma")]
        sigma: f64,
    },
    Median {
        #[serde(default = "default_kernel_size")]
        kernel_size: usize,
    },
    #[serde(rename = "savitzky_golay", alias = "savitzky_golay_only")]
    SavitzkyGolayOnly,
}

impl Default for FilterKind {
    fn default() -> Self {
        Self::Butterworth {
            cutoff_hz: DEFAULT_CUTOFF_HZ,
            order: default_order(),
        }
    }
}

/// One tunable parameter of a catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct FilterParam {
    pub label: &'static str,
    pub default: f64,
    pub step: f64,
}

/// Catalog entry describing one filter selector
#[derive(Debug, Clone, Serialize)]
pub struct FilterDescriptor {
    pub selector: &'static str,
    pub description: &'static str,
    pub params: Vec<FilterParam>,
}

fn descriptor(
    selector: &'static str,
    description: &'static str,
    params: &[(&'static str, f64, f64)],
) -> FilterDescriptor {
    FilterDescriptor {
        selector,
        description,
        params: params
            .iter()
            .map(|&(label, default, step)| FilterParam {
                label,
                default,
                step,
            })
            .collect(),
    }
}

impl FilterKind {
    /// Every selector accepted by [`FilterKind::from_selector`]
    pub fn catalog() -> Vec<FilterDescriptor> {
        vec![
            descriptor(
                "butterworth",
                "Second-order low-pass Butterworth with configurable cut-off",
                &[("Cut-off Frequency (Hz)", 6.0, 0.1), ("Order", 4.0, 1.0)],
            ),
            descriptor(
                "butterworth_speed",
                "Butterworth preset with a higher cut-off for speed-like signals",
                &[("Cut-off Frequency (Hz)", 10.0, 0.1), ("Order", 4.0, 1.0)],
            ),
            descriptor(
                "kalman",
                "Scalar Kalman smoother; trust ratio = measurement trust / process trust",
                &[("Trust Ratio", 500.0, 10.0), ("Smooth (0=false, 1=true)", 1.0, 1.0)],
            ),
            descriptor(
                "gcv_spline",
                "Spline approximation: Butterworth at the cut-off, or Gaussian when cut-off is 0",
                &[("Cut-off Frequency (0=auto)", 0.0, 1.0), ("Smoothing Factor", 0.1, 0.01)],
            ),
            descriptor(
                "loess",
                "Centered moving average over a shrinking boundary window",
                &[("Nb Values Used", 5.0, 1.0)],
            ),
            descriptor(
                "gaussian",
                "Gaussian kernel smoothing with edge clamping",
                &[("Sigma Kernel (samples)", 1.0, 0.1)],
            ),
            descriptor(
                "median",
                "Sliding median, removes isolated outliers",
                &[("Kernel Size", 3.0, 2.0)],
            ),
            descriptor(
                "savitzky_golay",
                "No extra smoothing; only the final 5-point Savitzky-Golay polish",
                &[],
            ),
        ]
    }

    /// Build a filter from a selector name and its two numeric parameters.
    ///
    /// Unknown selectors fall back to Butterworth at 6 Hz.
    pub fn from_selector(selector: &str, param1: f64, param2: f64) -> Self {
        match selector.trim().to_ascii_lowercase().as_str() {
            "butterworth" | "butterworth_speed" => Self::Butterworth {
                cutoff_hz: param1,
                order: to_count(param2) as u32,
            },
            "kalman" => Self::Kalman {
                trust_ratio: param1,
                smooth: param2 > 0.0,
            },
            "gcv_spline" => Self::GcvSpline {
                cutoff_hz: param1,
                smoothing: param2,
            },
            "loess" => Self::Loess {
                window: to_count(param1),
            },
            "gaussian" => Self::Gaussian { sigma: param1 },
            "median" => Self::Median {
                kernel_size: to_count(param1),
            },
            "savitzky_golay" => Self::SavitzkyGolayOnly,
            other => {
                warn!(
                    "Unknown filter '{}', falling back to Butterworth {} Hz",
                    other, DEFAULT_CUTOFF_HZ
                );
                Self::default()
            }
        }
    }

    /// Selector name of this variant
    pub fn selector(&self) -> &'static str {
        match self {
            Self::Butterworth { .. } => "butterworth",
            Self::Kalman { .. } => "kalman",
            Self::GcvSpline { .. } => "gcv_spline",
            Self::Loess { .. } => "loess",
            Self::Gaussian { .. } => "gaussian",
            Self::Median { .. } => "median",
            Self::SavitzkyGolayOnly => "savitzky_golay",
        }
    }

    /// Apply the smoothing stage alone (no Savitzky-Golay polish)
    pub fn apply(&self, signal: &[f64], sample_rate: f64) -> Vec<f64> {
        match *self {
            Self::Butterworth { cutoff_hz, order } => {
                butterworth(signal, sample_rate, cutoff_hz, order)
            }
            Self::Kalman { trust_ratio, smooth } => kalman(signal, trust_ratio, smooth),
            Self::GcvSpline {
                cutoff_hz,
                smoothing,
            } => {
                if cutoff_hz > 0.0 {
                    butterworth(signal, sample_rate, cutoff_hz, default_order())
                } else {
                    gaussian(signal, smoothing * 5.0)
                }
            }
            Self::Loess { window } => loess(signal, window),
            Self::Gaussian { sigma } => gaussian(signal, sigma),
            Self::Median { kernel_size } => median(signal, kernel_size),
            Self::SavitzkyGolayOnly => signal.to_vec(),
        }
    }
}

fn to_count(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.floor() as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.37).sin() * 4.0 + i as f64 * 0.1).collect()
    }

    fn all_kinds() -> Vec<FilterKind> {
        vec![
            FilterKind::default(),
            FilterKind::Kalman {
                trust_ratio: 500.0,
                smooth: true,
            },
            FilterKind::GcvSpline {
                cutoff_hz: 0.0,
                smoothing: 0.1,
            },
            FilterKind::GcvSpline {
                cutoff_hz: 8.0,
                smoothing: 0.1,
            },
            FilterKind::Loess { window: 5 },
            FilterKind::Gaussian { sigma: 1.5 },
            FilterKind::Median { kernel_size: 3 },
            FilterKind::SavitzkyGolayOnly,
        ]
    }

    #[test]
    fn test_every_filter_preserves_length() {
        for n in [1usize, 2, 3, 4, 5, 17, 128] {
            let signal = ramp(n);
            for kind in all_kinds() {
                assert_eq!(kind.apply(&signal, 100.0).len(), n, "{:?} n={}", kind, n);
            }
            assert_eq!(savitzky_golay(&signal).len(), n);
        }
    }

    #[test]
    fn test_every_filter_handles_empty_input() {
        for kind in all_kinds() {
            assert!(kind.apply(&[], 100.0).is_empty());
        }
        assert!(savitzky_golay(&[]).is_empty());
    }

    #[test]
    fn test_butterworth_first_two_outputs_are_zero() {
        let signal = vec![3.0; 50];
        let out = butterworth(&signal, 100.0, 6.0, 4);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert!(out[2] > 0.0);

        let two = butterworth(&[7.0, -7.0], 100.0, 6.0, 4);
        assert_eq!(two, vec![0.0, 0.0]);
    }

    #[test]
    fn test_butterworth_converges_to_dc() {
        let out = butterworth(&vec![1.0; 2000], 100.0, 6.0, 2);
        assert!((out[1999] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_butterworth_order_is_not_cascaded() {
        let signal = ramp(64);
        assert_eq!(
            butterworth(&signal, 100.0, 6.0, 2),
            butterworth(&signal, 100.0, 6.0, 8)
        );
    }

    #[test]
    fn test_butterworth_degenerate_parameters() {
        let signal = ramp(32);
        let reference = butterworth(&signal, 100.0, 6.0, 4);
        assert_eq!(butterworth(&signal, 0.0, 6.0, 4), reference);
        assert_eq!(butterworth(&signal, 100.0, 0.0, 4), reference);
        assert_eq!(butterworth(&signal, 100.0, f64::NAN, 4), reference);
    }

    #[test]
    fn test_biquad_coefficients_are_normalized() {
        let c = BiquadCoeffs::lowpass(6.0, 100.0);
        // Unity DC gain
        let dc = (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
        assert!((dc - 1.0).abs() < 1e-12);
        assert!((c.b0 - c.b2).abs() < 1e-15);
    }

    #[test]
    fn test_savitzky_golay_preserves_edges() {
        let signal = ramp(20);
        let out = savitzky_golay(&signal);
        let n = signal.len();
        for i in [0, 1, n - 2, n - 1] {
            assert_eq!(out[i], signal[i]);
        }
        let expected = (-3.0 * signal[0] + 12.0 * signal[1] + 17.0 * signal[2]
            + 12.0 * signal[3]
            - 3.0 * signal[4])
            / 35.0;
        assert!((out[2] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_savitzky_golay_short_input_unchanged() {
        let signal = vec![1.0, 9.0, -4.0, 2.0];
        assert_eq!(savitzky_golay(&signal), signal);
    }

    #[test]
    fn test_savitzky_golay_keeps_quadratics() {
        let signal: Vec<f64> = (0..10).map(|i| (i * i) as f64).collect();
        let out = savitzky_golay(&signal);
        for (a, b) in out.iter().zip(&signal) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_kalman_starts_halfway_and_ignores_smooth_flag() {
        let signal = vec![0.0, 10.0, 10.0, 10.0];
        let a = kalman(&signal, 500.0, true);
        let b = kalman(&signal, 500.0, false);
        assert_eq!(a, b);
        assert_eq!(a[0], 0.0);
        // gain = 1/(1+1) on the first step, error estimate = 0.5 + 1/500
        let e1 = 0.5 + 1.0 / 500.0;
        let g1 = e1 / (e1 + 1.0);
        assert!((a[1] - g1 * 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_loess_shrinks_window_at_edges() {
        let out = loess(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![1.5, 2.0, 3.0, 4.0, 4.5]);
    }

    #[test]
    fn test_gaussian_keeps_constant_signal() {
        let out = gaussian(&[2.5; 12], 2.0);
        for v in out {
            assert!((v - 2.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gaussian_non_positive_sigma_is_identity() {
        let signal = ramp(9);
        assert_eq!(gaussian(&signal, 0.0), signal);
        assert_eq!(gaussian(&signal, -1.0), signal);
    }

    #[test]
    fn test_median_golden_value() {
        // Clamped windows: [5,5,1] [5,1,1] [1,1,1] [1,1,9] [1,9,9]
        let out = median(&[5.0, 1.0, 1.0, 1.0, 9.0], 3);
        assert_eq!(out, vec![5.0, 1.0, 1.0, 1.0, 9.0]);
    }

    #[test]
    fn test_median_removes_spike() {
        let out = median(&[1.0, 1.0, 50.0, 1.0, 1.0], 3);
        assert_eq!(out, vec![1.0; 5]);
    }

    #[test]
    fn test_oversized_kernels_are_capped() {
        let s = [1.0, 2.0, 3.0];
        assert_eq!(median(&s, usize::MAX), median(&s, 7));
        assert_eq!(gaussian(&s, 1e30).len(), 3);
        assert!(gaussian(&s, 1e30).iter().all(|v| v.is_finite()));

        let huge = FilterKind::from_selector("median", 1e30, 0.0);
        assert_eq!(huge.apply(&s, 100.0), median(&s, 7));
        let wide = FilterKind::Gaussian { sigma: 1e30 };
        assert_eq!(wide.apply(&s, 100.0).len(), 3);
    }

    #[test]
    fn test_from_selector() {
        assert_eq!(
            FilterKind::from_selector("butterworth_speed", 10.0, 4.0),
            FilterKind::Butterworth {
                cutoff_hz: 10.0,
                order: 4
            }
        );
        assert_eq!(
            FilterKind::from_selector("kalman", 300.0, 0.0),
            FilterKind::Kalman {
                trust_ratio: 300.0,
                smooth: false
            }
        );
        assert_eq!(
            FilterKind::from_selector("Median", 5.0, 0.0),
            FilterKind::Median { kernel_size: 5 }
        );
        assert_eq!(
            FilterKind::from_selector("wavelet", 1.0, 1.0),
            FilterKind::default()
        );
    }

    #[test]
    fn test_catalog_covers_selectors() {
        for entry in FilterKind::catalog() {
            let kind = FilterKind::from_selector(entry.selector, 1.0, 1.0);
            if entry.selector != "butterworth" && entry.selector != "butterworth_speed" {
                assert_eq!(kind.selector(), entry.selector);
            }
        }
    }

    #[test]
    fn test_filter_kind_serde_defaults() {
        let kind: FilterKind = serde_json::from_str(r#"{"kind":"kalman"}"#).unwrap();
        assert_eq!(
            kind,
            FilterKind::Kalman {
                trust_ratio: 500.0,
                smooth: true
            }
        );
        let kind: FilterKind =
            serde_json::from_str(r#"{"kind":"savitzky_golay_only"}"#).unwrap();
        assert_eq!(kind, FilterKind::SavitzkyGolayOnly);
    }

    #[test]
    fn test_savitzky_golay_tag_matches_selector() {
        let kind = FilterKind::SavitzkyGolayOnly;
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["kind"], kind.selector());
        let back: FilterKind = serde_json::from_str(r#"{"kind":"savitzky_golay"}"#).unwrap();
        assert_eq!(back, kind);
    }
}

//! Direct discrete Fourier transform for short survey channels
//!
//! Survey channels are a few hundred samples at most, so the harmonic
//! search uses plain O(n²) summation over the lower half of the spectrum
//! instead of a planned FFT.

use num_complex::Complex;
use std::f64::consts::PI;

/// One spectral bin of a real-valued series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralBin {
    pub index: usize,
    /// Frequency in cycles per sample
    pub frequency: f64,
    /// Single-sided amplitude, 2·|X_k| / n
    pub amplitude: f64,
    /// Phase in radians
    pub phase: f64,
}

/// Complex DFT coefficients for bins 0..n/2
pub fn dft_half(samples: &[f64]) -> Vec<Complex<f64>> {
    let n = samples.len();
    let half = n / 2;

    (0..half)
        .map(|k| {
            samples
                .iter()
                .enumerate()
                .fold(Complex::new(0.0, 0.0), |acc, (t, &x)| {
                    let angle = -2.0 * PI * k as f64 * t as f64 / n as f64;
                    acc + Complex::from_polar(x, angle)
                })
        })
        .collect()
}

/// Amplitude/phase spectrum for bins 0..n/2
pub fn amplitude_spectrum(samples: &[f64]) -> Vec<SpectralBin> {
    let n = samples.len();
    if n < 2 {
        return Vec::new();
    }

    dft_half(samples)
        .into_iter()
        .enumerate()
        .map(|(index, c)| SpectralBin {
            index,
            frequency: index as f64 / n as f64,
            amplitude: 2.0 * c.norm() / n as f64,
            phase: c.arg(),
        })
        .collect()
}

/// Strongest non-DC bin
pub fn fundamental_bin(spectrum: &[SpectralBin]) -> Option<SpectralBin> {
    spectrum
        .iter()
        .skip(1)
        .copied()
        .max_by(|a, b| {
            a.amplitude
                .partial_cmp(&b.amplitude)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

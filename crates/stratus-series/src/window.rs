//! Sliding input/target windows over a climate series.

use crate::error::SeriesError;
use crate::series::{ClimateSeries, SeriesView};

/// One supervised example: `window_len` input steps followed immediately by
/// `horizon` target steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window<'a> {
    start: usize,
    input: SeriesView<'a>,
    target: SeriesView<'a>,
}

impl<'a> Window<'a> {
    /// Pair an input view with a target view. `start` is the index of the
    /// first input step in the source series.
    #[must_use]
    pub fn new(start: usize, input: SeriesView<'a>, target: SeriesView<'a>) -> Self {
        Self {
            start,
            input,
            target,
        }
    }

    /// Return the index of the first input step.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Return the input steps.
    #[must_use]
    pub fn input(&self) -> SeriesView<'a> {
        self.input
    }

    /// Return the target steps.
    #[must_use]
    pub fn target(&self) -> SeriesView<'a> {
        self.target
    }
}

/// Lazy iterator over the windows of a [`ClimateSeries`].
///
/// Cloning yields an independent iterator from the same position, so a
/// window set can be traversed again without re-slicing. When the series is
/// shorter than `window_len + horizon` the iterator is empty.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    series: &'a ClimateSeries,
    window_len: usize,
    horizon: usize,
    stride: usize,
    total: usize,
    emitted: usize,
}

impl<'a> Windows<'a> {
    fn new(series: &'a ClimateSeries, window_len: usize, horizon: usize, stride: usize) -> Self {
        let span = window_len + horizon;
        let total = if series.len() >= span {
            (series.len() - span) / stride + 1
        } else {
            0
        };
        Self {
            series,
            window_len,
            horizon,
            stride,
            total,
            emitted: 0,
        }
    }

    /// Advance `stride` steps between consecutive windows instead of one.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::ZeroWindowParameter`] if `stride` is zero.
    pub fn with_stride(self, stride: usize) -> Result<Self, SeriesError> {
        if stride == 0 {
            return Err(SeriesError::ZeroWindowParameter { parameter: "stride" });
        }
        Ok(Self::new(self.series, self.window_len, self.horizon, stride))
    }

    /// Return the configured input length.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Return the configured horizon.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted >= self.total {
            return None;
        }
        let start = self.emitted * self.stride;
        self.emitted += 1;
        let input = self.series.view(start, self.window_len)?;
        let target = self.series.view(start + self.window_len, self.horizon)?;
        Some(Window::new(start, input, target))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.emitted;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows<'_> {}

impl ClimateSeries {
    /// Iterate over every `(window_len, horizon)` window with stride 1.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::ZeroWindowParameter`] if `window_len` or
    /// `horizon` is zero.
    pub fn windows(&self, window_len: usize, horizon: usize) -> Result<Windows<'_>, SeriesError> {
        if window_len == 0 {
            return Err(SeriesError::ZeroWindowParameter {
                parameter: "window_len",
            });
        }
        if horizon == 0 {
            return Err(SeriesError::ZeroWindowParameter { parameter: "horizon" });
        }
        Ok(Windows::new(self, window_len, horizon, 1))
    }
}

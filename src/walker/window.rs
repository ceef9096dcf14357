//! Bounded windows over a range of sequence numbers
//!
//! A walk over `[start, end)` is split into half-open windows no wider than
//! `step`. Each window drives one blocking wait against a live list, so the
//! windows are produced lazily rather than collected up front.

/// Lazy iterator of half-open `(lo, hi)` windows covering `[start, end)`
///
/// Forward iteration yields `[start, start + step)`, `[start + step, ...)`
/// and so on, with a short last window when the range is not a multiple of
/// `step`. Reverse iteration starts at the top of the range and walks down,
/// so the short window (if any) is the one touching `start`.
///
/// # Example
///
/// ```
/// use tidemark::Windows;
///
/// let forward: Vec<_> = Windows::new(2, 7, 3, false).collect();
/// assert_eq!(forward, vec![(2, 5), (5, 7)]);
///
/// let reverse: Vec<_> = Windows::new(1, 10, 4, true).collect();
/// assert_eq!(reverse, vec![(6, 10), (2, 6), (1, 2)]);
/// ```
#[derive(Debug, Clone)]
pub struct Windows {
    start: u32,
    end: u32,
    step: u32,
    reverse: bool,
    /// Next `lo` going forward, or next `hi` going backward
    cursor: u32,
}

impl Windows {
    /// Creates the window sequence for `[start, end)`
    ///
    /// A `step` of zero is treated as one. An empty or inverted range
    /// (`start >= end`) yields nothing in either direction.
    pub fn new(start: u32, end: u32, step: u32, reverse: bool) -> Self {
        Self {
            start,
            end,
            step: step.max(1),
            reverse,
            cursor: if reverse { end } else { start },
        }
    }

    /// Convenience constructor for forward iteration
    pub fn forward(start: u32, end: u32, step: u32) -> Self {
        Self::new(start, end, step, false)
    }

    /// Convenience constructor for reverse iteration
    pub fn backward(start: u32, end: u32, step: u32) -> Self {
        Self::new(start, end, step, true)
    }
}

impl Iterator for Windows {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.end {
            return None;
        }

        if self.reverse {
            if self.cursor <= self.start {
                return None;
            }
            let hi = self.cursor;
            let lo = hi.saturating_sub(self.step).max(self.start);
            self.cursor = lo;
            Some((lo, hi))
        } else {
            if self.cursor >= self.end {
                return None;
            }
            let lo = self.cursor;
            let hi = lo.saturating_add(self.step).min(self.end);
            self.cursor = hi;
            Some((lo, hi))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.start >= self.end {
            0
        } else if self.reverse {
            self.cursor.saturating_sub(self.start)
        } else {
            self.end.saturating_sub(self.cursor)
        };
        let windows = remaining.div_ceil(self.step) as usize;
        (windows, Some(windows))
    }
}

impl ExactSizeIterator for Windows {}

impl std::iter::FusedIterator for Windows {}

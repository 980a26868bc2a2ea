//! Display percent for each workflow stage.
//!
//! Every stage owns a disjoint slice of 0-100. Within a slice the displayed
//! value only moves forward; a sub-stage percent that is missing or NaN nudges
//! it by one point so the editor still sees activity.

/// Shown while the upload target is being requested.
pub const PREPARING_PERCENT: u8 = 5;

/// Shown once everything is committed.
pub const COMPLETE_PERCENT: u8 = 100;

/// Bytes on the wire.
pub const UPLOAD_RANGE: ProgressRange = ProgressRange::new(10, 90);

/// Remote transcoding.
pub const PROCESSING_RANGE: ProgressRange = ProgressRange::new(90, 99);

/// Inclusive slice of the display scale reserved for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRange {
    pub start: u8,
    pub end: u8,
}

impl ProgressRange {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    fn scale(&self, percent: f64) -> u8 {
        let span = f64::from(self.end - self.start);
        let scaled = f64::from(self.start) + percent.clamp(0.0, 100.0) * span / 100.0;
        (scaled.round() as u8).min(self.end)
    }

    /// Next display value after a sub-stage progress report.
    ///
    /// The result is never below `previous`, never below `start` and never
    /// above `end`.
    pub fn advance(&self, previous: u8, percent: Option<f64>) -> u8 {
        let floor = previous.clamp(self.start, self.end);
        let next = match percent.filter(|p| p.is_finite()) {
            Some(p) => self.scale(p),
            None => floor.saturating_add(1).min(self.end),
        };
        floor.max(next)
    }
}

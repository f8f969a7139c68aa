//! Dual-handle numeric range facet.
//!
//! Dragging moves the live bounds shown in the paired inputs. Only a commit
//! (a released drag or an input change) moves the committed bounds, which
//! are what gets filtered on and broadcast.

use crate::error::{FacetError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeHandle {
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeCommit {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct RangeFacet {
    name: String,
    label: String,
    domain: (f64, f64),
    live: (f64, f64),
    committed: (f64, f64),
    enabled: bool,
    dragging: Option<RangeHandle>,
}

impl RangeFacet {
    /// Creates a disabled facet spanning the whole domain.
    pub fn new(name: impl Into<String>, lo: f64, hi: f64) -> Result<Self> {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(FacetError::InvalidInput(format!(
                "invalid range domain [{lo}, {hi}]"
            )));
        }
        let name = name.into();
        Ok(Self {
            label: name.clone(),
            name,
            domain: (lo, hi),
            live: (lo, hi),
            committed: (lo, hi),
            enabled: false,
            dragging: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Bounds currently shown by the handles and inputs.
    pub fn live(&self) -> (f64, f64) {
        self.live
    }

    pub fn committed(&self) -> RangeCommit {
        RangeCommit {
            min: self.committed.0,
            max: self.committed.1,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Moves a handle during a drag. Updates the live bounds only.
    pub fn drag(&mut self, handle: RangeHandle, value: f64) -> (f64, f64) {
        self.dragging = Some(handle);
        self.live = self.move_handle(self.live, handle, value);
        self.live
    }

    /// Ends a drag. Commits the live bounds if they moved.
    pub fn release(&mut self) -> Option<RangeCommit> {
        self.dragging.take()?;
        self.commit(self.live.0, self.live.1)
    }

    /// Applies a change typed into one of the paired inputs.
    pub fn input(&mut self, handle: RangeHandle, value: f64) -> Option<RangeCommit> {
        self.dragging = None;
        let (min, max) = self.move_handle(self.committed, handle, value);
        self.commit(min, max)
    }

    /// Commits a bounds pair, clamping it into the domain first.
    ///
    /// Returns the new committed bounds, or `None` if nothing changed.
    pub fn commit(&mut self, min: f64, max: f64) -> Option<RangeCommit> {
        let clamped = self.clamp_pair(min, max);
        self.live = clamped;
        if clamped == self.committed {
            return None;
        }
        self.committed = clamped;
        Some(self.committed())
    }

    /// Returns `true` if the flag changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        true
    }

    /// Text of the filter chip, present only while enabled.
    pub fn chip_label(&self) -> Option<String> {
        self.enabled.then(|| {
            format!(
                "{}: {} - {}",
                self.label,
                format_bound(self.committed.0),
                format_bound(self.committed.1)
            )
        })
    }

    /// Request parameters for the committed bounds, empty while disabled.
    pub fn query_params(&self) -> Vec<(String, String)> {
        if !self.enabled {
            return Vec::new();
        }
        vec![
            (format!("{}_gte", self.name), format_bound(self.committed.0)),
            (format!("{}_lte", self.name), format_bound(self.committed.1)),
        ]
    }

    fn move_handle(&self, current: (f64, f64), handle: RangeHandle, value: f64) -> (f64, f64) {
        let (mut min, mut max) = current;
        let value = self.clamp_value(value);
        match handle {
            RangeHandle::Lower => min = value.min(max),
            RangeHandle::Upper => max = value.max(min),
        }
        (min, max)
    }

    fn clamp_value(&self, value: f64) -> f64 {
        let (lo, hi) = self.domain;
        if value.is_nan() {
            log::debug!("range facet {}: NaN clamped to {lo}", self.name);
            return lo;
        }
        value.clamp(lo, hi)
    }

    fn clamp_pair(&self, min: f64, max: f64) -> (f64, f64) {
        let min = self.clamp_value(min);
        let max = self.clamp_value(max);
        if min > max {
            log::debug!(
                "range facet {}: min {min} above max {max}, clamped",
                self.name
            );
            return (max, max);
        }
        (min, max)
    }
}

/// Formats a bound without a trailing `.0` for whole numbers.
pub fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth() -> RangeFacet {
        RangeFacet::new("depth", 0.0, 1000.0).expect("domain")
    }

    #[test]
    fn drag_updates_live_without_commit() {
        let mut facet = depth();
        assert_eq!(facet.drag(RangeHandle::Lower, 100.0), (100.0, 1000.0));
        assert_eq!(facet.drag(RangeHandle::Lower, 150.0), (150.0, 1000.0));
        assert_eq!(facet.committed(), RangeCommit { min: 0.0, max: 1000.0 });

        let commit = facet.release().expect("commit");
        assert_eq!(commit, RangeCommit { min: 150.0, max: 1000.0 });
        assert_eq!(facet.committed(), commit);
    }

    #[test]
    fn release_without_drag_does_nothing() {
        let mut facet = depth();
        assert!(facet.release().is_none());
    }

    #[test]
    fn handles_cannot_cross() {
        let mut facet = depth();
        facet.input(RangeHandle::Upper, 200.0);
        let commit = facet.input(RangeHandle::Lower, 500.0).expect("commit");
        assert_eq!(commit, RangeCommit { min: 200.0, max: 200.0 });
    }

    #[test]
    fn out_of_domain_values_are_clamped() {
        let mut facet = depth();
        let commit = facet.commit(-50.0, 5000.0);
        assert!(commit.is_none(), "clamps back to the full domain");

        let commit = facet.commit(900.0, 100.0).expect("commit");
        assert_eq!(commit, RangeCommit { min: 100.0, max: 100.0 });

        let commit = facet.commit(f64::NAN, 10.0).expect("commit");
        assert_eq!(commit, RangeCommit { min: 0.0, max: 10.0 });
    }

    #[test]
    fn disabled_facet_has_no_params_or_chip() {
        let mut facet = depth().with_label("Depth (m)");
        facet.commit(10.0, 20.5);
        assert!(facet.query_params().is_empty());
        assert!(facet.chip_label().is_none());

        assert!(facet.set_enabled(true));
        assert!(!facet.set_enabled(true));
        assert_eq!(
            facet.query_params(),
            vec![
                ("depth_gte".to_string(), "10".to_string()),
                ("depth_lte".to_string(), "20.5".to_string())
            ]
        );
        assert_eq!(facet.chip_label().as_deref(), Some("Depth (m): 10 - 20.5"));
    }

    #[test]
    fn invalid_domain_is_rejected() {
        assert!(RangeFacet::new("x", 5.0, 1.0).is_err());
        assert!(RangeFacet::new("x", f64::NEG_INFINITY, 1.0).is_err());
    }
}

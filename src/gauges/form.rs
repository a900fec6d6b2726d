//! Working copy of the gauge form

use crate::error::Error;
use crate::lifecycle::required;
use crate::models::{Gauge, GaugeFields, GaugeType, Side};

/// Most colors a gauge carries
pub const MAX_COLORS: usize = 3;

/// Palette for new gauges, low to high
pub const DEFAULT_COLORS: [&str; MAX_COLORS] = ["#22c55e", "#eab308", "#ef4444"];

/// Value a new gauge starts at
pub const DEFAULT_VALUE: f64 = 50.0;

/// Bounds of a gauge reading
pub const MIN_VALUE: f64 = 0.0;
pub const MAX_VALUE: f64 = 100.0;

pub fn default_colors() -> Vec<String> {
    DEFAULT_COLORS.iter().map(|c| c.to_string()).collect()
}

/// Clamp a reading into `[0, 100]`, rejecting NaN and infinities
pub fn clamp_value(value: f64) -> Result<f64, Error> {
    if !value.is_finite() {
        return Err(Error::validation(format!("{} is not a valid gauge value", value)));
    }
    Ok(value.clamp(MIN_VALUE, MAX_VALUE))
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeForm {
    pub title: String,
    pub value: f64,
    pub gauge_type: GaugeType,
    pub colors: Vec<String>,
    pub side: Side,
}

impl Default for GaugeForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            value: DEFAULT_VALUE,
            gauge_type: GaugeType::Semicircle,
            colors: default_colors(),
            side: Side::Left,
        }
    }
}

impl GaugeForm {
    /// Load an existing gauge; an empty color list falls back to the default palette
    pub fn from_gauge(gauge: &Gauge) -> Self {
        let colors = if gauge.colors.is_empty() {
            default_colors()
        } else {
            gauge.colors.iter().take(MAX_COLORS).cloned().collect()
        };
        Self {
            title: gauge.title.clone(),
            value: gauge.value,
            gauge_type: gauge.gauge_type,
            colors,
            side: gauge.side,
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Set the reading; values outside `[0, 100]` are clamped, non-finite ones ignored
    pub fn set_value(&mut self, value: f64) {
        if let Ok(value) = clamp_value(value) {
            self.value = value;
        }
    }

    pub fn set_type(&mut self, gauge_type: GaugeType) {
        self.gauge_type = gauge_type;
    }

    pub fn set_side(&mut self, side: Side) {
        self.side = side;
    }

    /// Replace one color slot, leaving the others as they are.
    ///
    /// Slots below `index` that do not exist yet are filled from the default palette.
    pub fn set_color_at(&mut self, index: usize, color: &str) -> Result<(), Error> {
        if index >= MAX_COLORS {
            return Err(Error::validation(format!(
                "color slot {} out of range, gauges have {} slots",
                index, MAX_COLORS
            )));
        }
        while self.colors.len() <= index {
            let next = DEFAULT_COLORS[self.colors.len()];
            self.colors.push(next.to_string());
        }
        self.colors[index] = color.to_string();
        Ok(())
    }

    /// The fields to write, or why the form cannot be saved
    pub(crate) fn validated(&self) -> Result<GaugeFields, Error> {
        Ok(GaugeFields {
            title: required("Title", &self.title)?,
            value: clamp_value(self.value)?,
            gauge_type: self.gauge_type,
            colors: self.colors.iter().take(MAX_COLORS).cloned().collect(),
            side: self.side,
        })
    }
}

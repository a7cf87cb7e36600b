//! Front-end control state for the eight filter parameters.
//!
//! The pipeline rejects out-of-domain values; keeping user input inside
//! the domain is the front end's job. [`Controls`] holds what the user
//! has dialed in, snapping every numeric knob to its [`Slider`] range
//! and step, and hands the pipeline a [`FilterParameters`] on demand.

use toonify_pipeline::FilterParameters;

/// Range and granularity of one numeric control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slider {
    /// Smallest selectable value.
    pub min: i32,
    /// Largest selectable value.
    pub max: i32,
    /// Distance between selectable values, counted from `min`.
    pub step: i32,
}

impl Slider {
    const fn new((min, max): (i32, i32), step: i32) -> Self {
        Self { min, max, step }
    }

    /// Nearest selectable value to `value`. Ties round up.
    #[must_use]
    pub const fn snap(self, value: i32) -> i32 {
        let clamped = if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        };
        let steps = (clamped - self.min + self.step / 2) / self.step;
        let snapped = self.min + steps * self.step;
        if snapped > self.max {
            snapped - self.step
        } else {
            snapped
        }
    }
}

/// A numeric filter parameter exposed as a slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knob {
    Diameter,
    SigmaColor,
    SigmaSpace,
    MedianKernel,
    BlockSize,
    ThresholdC,
}

impl Knob {
    /// Every knob, in display order.
    pub const ALL: [Self; 6] = [
        Self::Diameter,
        Self::SigmaColor,
        Self::SigmaSpace,
        Self::MedianKernel,
        Self::BlockSize,
        Self::ThresholdC,
    ];

    /// The slider backing this knob.
    #[must_use]
    pub const fn slider(self) -> Slider {
        match self {
            Self::Diameter => Slider::new(FilterParameters::DIAMETER_RANGE, 2),
            Self::SigmaColor | Self::SigmaSpace => Slider::new(FilterParameters::SIGMA_RANGE, 1),
            Self::MedianKernel => Slider::new(FilterParameters::MEDIAN_KERNEL_RANGE, 2),
            Self::BlockSize => Slider::new(FilterParameters::BLOCK_SIZE_RANGE, 2),
            Self::ThresholdC => Slider::new(FilterParameters::THRESHOLD_C_RANGE, 1),
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Diameter => "Bilateral diameter",
            Self::SigmaColor => "Sigma color",
            Self::SigmaSpace => "Sigma space",
            Self::MedianKernel => "Median blur kernel",
            Self::BlockSize => "Threshold block size",
            Self::ThresholdC => "Threshold C",
        }
    }
}

/// Current values of all filter controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    params: FilterParameters,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            params: FilterParameters::DEFAULTS,
        }
    }
}

impl Controls {
    /// Controls showing the default table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every control with its default. Does not run anything.
    pub const fn reset_to_defaults(&mut self) {
        self.params = FilterParameters::DEFAULTS;
    }

    /// Parameters for the pipeline.
    #[must_use]
    pub const fn parameters(&self) -> FilterParameters {
        self.params
    }

    /// Current value of `knob`.
    #[must_use]
    pub const fn get(&self, knob: Knob) -> i32 {
        match knob {
            Knob::Diameter => self.params.diameter,
            Knob::SigmaColor => self.params.sigma_color,
            Knob::SigmaSpace => self.params.sigma_space,
            Knob::MedianKernel => self.params.median_kernel,
            Knob::BlockSize => self.params.block_size,
            Knob::ThresholdC => self.params.threshold_c,
        }
    }

    /// Move `knob` to the selectable value nearest `value` and return
    /// what was stored.
    pub const fn set(&mut self, knob: Knob, value: i32) -> i32 {
        let snapped = knob.slider().snap(value);
        let field = match knob {
            Knob::Diameter => &mut self.params.diameter,
            Knob::SigmaColor => &mut self.params.sigma_color,
            Knob::SigmaSpace => &mut self.params.sigma_space,
            Knob::MedianKernel => &mut self.params.median_kernel,
            Knob::BlockSize => &mut self.params.block_size,
            Knob::ThresholdC => &mut self.params.threshold_c,
        };
        *field = snapped;
        snapped
    }

    /// Toggle the saturation boost.
    pub const fn set_boost_color(&mut self, on: bool) {
        self.params.boost_color = on;
    }

    /// Toggle the soft-edge pass.
    pub const fn set_soft_edges(&mut self, on: bool) {
        self.params.soft_edges = on;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_defaults() {
        assert_eq!(Controls::new().parameters(), FilterParameters::default());
    }

    #[test]
    fn reset_restores_every_field() {
        let mut controls = Controls::new();
        for knob in Knob::ALL {
            controls.set(knob, knob.slider().max);
        }
        controls.set_boost_color(true);
        controls.set_soft_edges(true);
        assert_ne!(controls.parameters(), FilterParameters::DEFAULTS);

        controls.reset_to_defaults();
        assert_eq!(controls.parameters(), FilterParameters::DEFAULTS);
    }

    #[test]
    fn odd_sliders_snap_to_odd_values() {
        let mut controls = Controls::new();
        assert_eq!(controls.set(Knob::MedianKernel, 4), 5);
        assert_eq!(controls.set(Knob::BlockSize, 4), 5);
        assert_eq!(controls.set(Knob::Diameter, 10), 11);
        assert_eq!(controls.set(Knob::MedianKernel, 16), 15);
        assert_eq!(controls.set(Knob::BlockSize, 1), 3);
    }

    #[test]
    fn values_clamp_to_range() {
        let mut controls = Controls::new();
        assert_eq!(controls.set(Knob::SigmaColor, 1000), 300);
        assert_eq!(controls.set(Knob::SigmaSpace, 0), 1);
        assert_eq!(controls.set(Knob::ThresholdC, -50), -20);
        assert_eq!(controls.get(Knob::ThresholdC), -20);
    }

    #[test]
    fn every_snapped_value_validates() {
        let mut controls = Controls::new();
        for knob in Knob::ALL {
            for value in -400..=400 {
                controls.set(knob, value);
                controls.parameters().validate().unwrap();
            }
        }
    }

    #[test]
    fn in_step_values_are_kept() {
        let slider = Knob::BlockSize.slider();
        for value in (slider.min..=slider.max).step_by(2) {
            assert_eq!(slider.snap(value), value);
        }
    }

    #[test]
    fn labels_are_distinct() {
        let mut labels: Vec<_> = Knob::ALL.iter().map(|k| k.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Knob::ALL.len());
    }
}

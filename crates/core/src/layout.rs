//! Width breakpoints for aside density.
//!
//! Density is a pure function of the current measurements; nothing is
//! remembered between calls.

use serde::{Deserialize, Serialize};

/// Class toggled on the aside container and on its attribute table.
pub const COMPACT_CLASS: &str = "aside-compact";
/// Class toggled on the aside container when the reading surface is wide.
pub const WIDE_CLASS: &str = "aside-wide";

/// Threshold widths, in host layout units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breakpoints {
    /// Parent widths at or below this make the aside compact.
    pub aside: f64,
    /// Aside widths below this stack the attribute table.
    pub content: f64,
    /// View widths above this count as wide.
    pub view: f64,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            aside: 400.0,
            content: 200.0,
            view: 600.0,
        }
    }
}

/// Which breakpoint scheme a deployment uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Parent width drives aside compactness, own width drives the table.
    #[default]
    Nested,
    /// The whole reading surface is classified as wide or not.
    View,
}

/// Widths reported by the host on resize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    /// Width of the aside container itself.
    #[serde(alias = "containerWidth")]
    pub container_width: f64,
    /// Width of the container's parent (the document leaf), when known.
    #[serde(alias = "parentWidth")]
    pub parent_width: Option<f64>,
    /// Width of the whole reading surface, when known.
    #[serde(alias = "viewWidth")]
    pub view_width: Option<f64>,
}

impl Measurements {
    /// Measurements for the nested scheme.
    pub fn nested(container_width: f64, parent_width: f64) -> Self {
        Self {
            container_width,
            parent_width: Some(parent_width),
            view_width: None,
        }
    }

    /// Measurements for the view scheme.
    pub fn view(view_width: f64) -> Self {
        Self {
            container_width: view_width,
            parent_width: None,
            view_width: Some(view_width),
        }
    }
}

/// Density classes that should be present after a resize.
///
/// `None` means the toggle does not apply to the active scheme and the
/// class should be left as it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensityToggles {
    /// `aside-compact` on the aside container.
    pub aside_compact: Option<bool>,
    /// `aside-compact` on the attribute table.
    pub content_compact: Option<bool>,
    /// `aside-wide` on the aside container.
    pub wide: Option<bool>,
}

/// Computes density toggles for the given measurements.
pub fn respond(
    measurements: &Measurements,
    breakpoints: &Breakpoints,
    mode: LayoutMode,
) -> DensityToggles {
    let toggles = match mode {
        LayoutMode::Nested => DensityToggles {
            aside_compact: measurements
                .parent_width
                .map(|width| width <= breakpoints.aside),
            content_compact: Some(measurements.container_width < breakpoints.content),
            wide: None,
        },
        LayoutMode::View => DensityToggles {
            aside_compact: None,
            content_compact: None,
            wide: Some(
                measurements
                    .view_width
                    .unwrap_or(measurements.container_width)
                    > breakpoints.view,
            ),
        },
    };
    log::debug!("density for {:?}: {:?}", measurements, toggles);
    toggles
}

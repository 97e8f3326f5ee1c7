//! Rectangular map regions.
//!
//! A `Viewport` is an equirectangular box: `center ± span / 2` on each axis.
//! That is fine at city scale and wrong near the poles or across the
//! antimeridian, neither of which the fleet ever visits.

use fleet_core::GeoPoint;

/// Latitude span above which a viewport counts as zoomed out.
pub const ZOOMED_OUT_LAT_SPAN: f64 = 1.0;

/// Span of the first viewport shown, degrees on both axes.
pub const INITIAL_SPAN_DEG: f64 = 0.05;

/// Fallback centre when no user location is known (Bangalore).
pub const DEFAULT_CENTER: GeoPoint = GeoPoint { lat: 12.9716, lon: 77.5946 };

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub center:   GeoPoint,
    pub lat_span: f64,
    pub lon_span: f64,
}

/// Inclusive min/max per axis.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    #[inline]
    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&p.lat)
            && (self.min_lon..=self.max_lon).contains(&p.lon)
    }
}

impl Viewport {
    #[inline]
    pub fn new(center: GeoPoint, lat_span: f64, lon_span: f64) -> Self {
        Self { center, lat_span, lon_span }
    }

    pub fn bounds(&self) -> Bounds {
        let half_lat = self.lat_span / 2.0;
        let half_lon = self.lon_span / 2.0;
        Bounds {
            min_lat: self.center.lat - half_lat,
            max_lat: self.center.lat + half_lat,
            min_lon: self.center.lon - half_lon,
            max_lon: self.center.lon + half_lon,
        }
    }

    #[inline]
    pub fn contains(&self, p: GeoPoint) -> bool {
        self.bounds().contains(p)
    }

    #[inline]
    pub fn is_zoomed_out(&self) -> bool {
        self.lat_span > ZOOMED_OUT_LAT_SPAN
    }

    /// Maximum number of drivers drawn for this viewport.
    #[inline]
    pub fn density_cap(&self) -> usize {
        if self.is_zoomed_out() { crate::ZOOMED_OUT_CAP } else { crate::ZOOMED_IN_CAP }
    }
}

/// The first viewport a map shows: centred on `location` if known, else on
/// [`DEFAULT_CENTER`], with [`INITIAL_SPAN_DEG`] on both axes.
pub fn initial_viewport(location: Option<GeoPoint>) -> Viewport {
    Viewport::new(
        location.unwrap_or(DEFAULT_CENTER),
        INITIAL_SPAN_DEG,
        INITIAL_SPAN_DEG,
    )
}

//! Site description from the batch CSV.

/// Fixed physical description of a generation site.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Site {
    /// Human-readable site name.
    pub location_name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Waterfall drop in metres (0 when the site has no waterfall).
    pub waterfall_height_m: f64,
    /// Reference waterfall flow in m³/s.
    pub waterfall_flow_m3s: f64,
    /// Geothermal reservoir temperature in °C.
    pub geo_temp_c: f64,
    /// Drilling depth in km (0 when the site has no well).
    pub depth_km: f64,
}

impl Site {
    /// Return true if the site can generate hydro power.
    #[must_use]
    pub fn has_waterfall(&self) -> bool {
        self.waterfall_height_m > 0.0 && self.waterfall_flow_m3s > 0.0
    }

    /// Return true if the site can generate geothermal power.
    #[must_use]
    pub fn has_geothermal(&self) -> bool {
        self.geo_temp_c > crate::formula::GEO_MIN_RESERVOIR_C && self.depth_km > 0.0
    }
}

//! Physical plausibility ranges for climate variables.

/// Physical quantity a column name refers to, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Air temperature in °C.
    Temperature,
    /// Precipitation in mm per step.
    Rainfall,
    /// River discharge in m³/s.
    Flow,
    /// Anything else.
    Other,
}

impl VariableKind {
    /// Classify a variable by its column name.
    #[must_use]
    pub fn of(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "temp" | "tem" | "temperature" | "temperature_c" | "tavg" => Self::Temperature,
            "rain" | "rainfall" | "rainfall_mm" | "precip" | "precipitation" | "prcp" => {
                Self::Rainfall
            }
            "flow" | "discharge" | "flow_m3s" => Self::Flow,
            _ => Self::Other,
        }
    }

    /// Return the index of the first variable of this kind.
    #[must_use]
    pub fn find(self, variables: &[String]) -> Option<usize> {
        variables.iter().position(|v| Self::of(v) == self)
    }
}

/// Inclusive `[min, max]` range a variable's values must fall within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalRange {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl PhysicalRange {
    /// Air temperature in °C.
    pub const TEMPERATURE: Self = Self { min: -90.0, max: 60.0 };
    /// Precipitation in mm per step.
    pub const RAINFALL: Self = Self { min: 0.0, max: 30_000.0 };
    /// River discharge in m³/s.
    pub const FLOW: Self = Self { min: 0.0, max: 1.0e6 };

    /// Create a range. Bounds are used as given; `min > max` rejects everything.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Return the default range for a variable, matched case-insensitively by
    /// name. Unknown variables have no range (finiteness is still enforced).
    #[must_use]
    pub fn for_variable(name: &str) -> Option<Self> {
        match VariableKind::of(name) {
            VariableKind::Temperature => Some(Self::TEMPERATURE),
            VariableKind::Rainfall => Some(Self::RAINFALL),
            VariableKind::Flow => Some(Self::FLOW),
            VariableKind::Other => None,
        }
    }

    /// Return true if `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve() {
        assert_eq!(PhysicalRange::for_variable("Temperature"), Some(PhysicalRange::TEMPERATURE));
        assert_eq!(PhysicalRange::for_variable("rain"), Some(PhysicalRange::RAINFALL));
        assert_eq!(PhysicalRange::for_variable("humidity"), None);
    }

    #[test]
    fn kind_lookup_finds_first_match() {
        let vars = vec!["humidity".to_string(), "Rainfall_mm".to_string(), "tem".to_string()];
        assert_eq!(VariableKind::Rainfall.find(&vars), Some(1));
        assert_eq!(VariableKind::Temperature.find(&vars), Some(2));
        assert_eq!(VariableKind::Flow.find(&vars), None);
    }

    #[test]
    fn temperature_bounds_are_inclusive() {
        let r = PhysicalRange::TEMPERATURE;
        assert!(r.contains(-90.0));
        assert!(r.contains(60.0));
        assert!(!r.contains(60.1));
    }
}

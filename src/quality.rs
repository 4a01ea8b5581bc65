use serde::Serialize;
use std::fmt;

/// water quality label derived from a reading, best first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Quality {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// how loudly the presentation should flag a quality level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Good,
    Warning,
    Danger,
}

impl Quality {
    /// Classify a reading. Upper bounds are inclusive; anything that is not
    /// at or below 10 (NaN included) is poor.
    pub fn classify(turbidity: f64) -> Self {
        if turbidity <= 1.0 {
            Quality::Excellent
        } else if turbidity <= 4.0 {
            Quality::Good
        } else if turbidity <= 10.0 {
            Quality::Fair
        } else {
            Quality::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Excellent => "Excellent Quality",
            Quality::Good => "Good Quality",
            Quality::Fair => "Fair Quality",
            Quality::Poor => "Poor Quality",
        }
    }

    pub fn indicator(self) -> Indicator {
        match self {
            Quality::Excellent | Quality::Good => Indicator::Good,
            Quality::Fair => Indicator::Warning,
            Quality::Poor => Indicator::Danger,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

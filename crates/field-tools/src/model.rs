//! Domain Models

use serde::{Deserialize, Serialize};

/// A geocoded place
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

/// Current temperature at a point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub lat: f64,
    pub lon: f64,
    pub temperature_f: f64,
}

/// Book picked for a theme
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub subjects: Vec<String>,
}

/// Clothing bands, coldest first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClothingBand {
    Arctic,
    Cold,
    Cool,
    Mild,
    Warm,
    Hot,
}

impl ClothingBand {
    pub fn for_temperature(temperature_f: f64) -> Self {
        match temperature_f {
            t if t < 20.0 => Self::Arctic,
            t if t < 40.0 => Self::Cold,
            t if t < 55.0 => Self::Cool,
            t if t < 70.0 => Self::Mild,
            t if t < 85.0 => Self::Warm,
            _ => Self::Hot,
        }
    }

    pub const fn suggestion(self) -> &'static str {
        match self {
            Self::Arctic => "Insulated parka, thermal layers, hat, gloves and a scarf.",
            Self::Cold => "Winter coat, sweater and a warm hat.",
            Self::Cool => "Light jacket or a fleece over long sleeves.",
            Self::Mild => "Long sleeves or a light sweater.",
            Self::Warm => "T-shirt and breathable trousers or shorts.",
            Self::Hot => "Light, loose clothing, sunglasses and plenty of water.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_cover_the_range() {
        assert_eq!(ClothingBand::for_temperature(-10.0), ClothingBand::Arctic);
        assert_eq!(ClothingBand::for_temperature(39.9), ClothingBand::Cold);
        assert_eq!(ClothingBand::for_temperature(40.0), ClothingBand::Cool);
        assert_eq!(ClothingBand::for_temperature(72.0), ClothingBand::Warm);
        assert_eq!(ClothingBand::for_temperature(101.0), ClothingBand::Hot);
    }
}

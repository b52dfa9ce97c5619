//! Canned sources
//!
//! For tests and offline demos. Deterministic, no network.

use async_trait::async_trait;

use super::{BookCatalog, GeoCoder, WeatherSource};
use crate::error::{Result, ToolsError};
use crate::model::{Book, Coordinates, Temperature};

/// Geocoder over a small fixed table
#[derive(Default)]
pub struct MockGeoCoder {
    unavailable: bool,
}

impl MockGeoCoder {
    pub const fn new() -> Self {
        Self { unavailable: false }
    }

    /// Every lookup fails as if the service were down
    pub const fn unavailable() -> Self {
        Self { unavailable: true }
    }

    fn known(city: &str) -> Option<(f64, f64)> {
        match city.trim().to_lowercase().as_str() {
            "denver" => Some((39.7392, -104.9849)),
            "anchorage" => Some((61.2176, -149.8997)),
            "oslo" => Some((59.9133, 10.7389)),
            "phoenix" => Some((33.4484, -112.0740)),
            "london" => Some((51.5072, -0.1276)),
            "tokyo" => Some((35.6764, 139.6500)),
            _ => None,
        }
    }
}

#[async_trait]
impl GeoCoder for MockGeoCoder {
    async fn locate(&self, city: &str) -> Result<Coordinates> {
        if self.unavailable {
            return Err(ToolsError::Upstream {
                service: "mock-geocoder",
                message: "service unavailable".into(),
            });
        }
        let (lat, lon) = Self::known(city).ok_or_else(|| ToolsError::NotFound(format!("city '{city}'")))?;
        Ok(Coordinates {
            city: city.to_string(),
            lat,
            lon,
        })
    }

    fn name(&self) -> &str {
        "MockGeoCoder"
    }
}

/// Temperature falls with latitude; good enough for demos
#[derive(Default)]
pub struct MockWeather;

#[async_trait]
impl WeatherSource for MockWeather {
    async fn current_temperature(&self, lat: f64, lon: f64) -> Result<Temperature> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ToolsError::InvalidInput(format!("({lat}, {lon}) is not a coordinate")));
        }
        let temperature_f = (0.9f64.mul_add(-lat.abs(), 95.0) * 10.0).round() / 10.0;
        Ok(Temperature {
            lat,
            lon,
            temperature_f,
        })
    }

    fn name(&self) -> &str {
        "MockWeather"
    }
}

/// One book per known theme
#[derive(Default)]
pub struct MockBookCatalog;

#[async_trait]
impl BookCatalog for MockBookCatalog {
    async fn book_by_theme(&self, theme: &str) -> Result<Book> {
        let (title, author) = match theme.trim().to_lowercase().as_str() {
            "mountains" => ("Into Thin Air", "Jon Krakauer"),
            "identity" => ("Invisible Man", "Ralph Ellison"),
            "historical fiction" | "historical_fiction" => ("Wolf Hall", "Hilary Mantel"),
            "weather" => ("The Weather Machine", "Andrew Blum"),
            _ => return Err(ToolsError::NotFound(format!("books for the theme '{theme}'"))),
        };
        Ok(Book {
            title: title.into(),
            author: author.into(),
            subjects: vec![theme.to_lowercase()],
        })
    }

    fn name(&self) -> &str {
        "MockBookCatalog"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_geocoder() {
        let denver = MockGeoCoder::new().locate("Denver").await.unwrap();
        assert_eq!(denver.city, "Denver");
        assert!(denver.lat > 39.0);

        assert!(matches!(MockGeoCoder::new().locate("Atlantis").await, Err(ToolsError::NotFound(_))));
        assert!(MockGeoCoder::unavailable().locate("Denver").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_weather_colder_up_north() {
        let weather = MockWeather;
        let anchorage = weather.current_temperature(61.2, -149.9).await.unwrap();
        let phoenix = weather.current_temperature(33.4, -112.0).await.unwrap();
        assert!(anchorage.temperature_f < phoenix.temperature_f);
        assert!(weather.current_temperature(120.0, 0.0).await.is_err());
    }
}

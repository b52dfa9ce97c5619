//! Public HTTP data sources

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde_json::Value;

use super::{BookCatalog, GeoCoder, WeatherSource, attempt_get_json, default_client};
use crate::error::{Result, ToolsError};
use crate::model::{Book, Coordinates, Temperature};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const OPEN_LIBRARY_URL: &str = "https://openlibrary.org";

/// OpenStreetMap Nominatim search
pub struct NominatimGeoCoder {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl NominatimGeoCoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: NOMINATIM_URL.into(),
            user_agent: "city-locator/1.0".into(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Nominatim answers with a list of places; lat/lon come as strings
fn parse_place(city: &str, body: &Value) -> Result<Coordinates> {
    let place = body
        .as_array()
        .and_then(|places| places.first())
        .ok_or_else(|| ToolsError::NotFound(format!("city '{city}'")))?;

    let coord = |key: &str| -> Result<f64> {
        let value = &place[key];
        value
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| value.as_f64())
            .ok_or_else(|| ToolsError::Upstream {
                service: "nominatim",
                message: format!("missing {key}"),
            })
    };

    Ok(Coordinates {
        city: city.to_string(),
        lat: coord("lat")?,
        lon: coord("lon")?,
    })
}

#[async_trait]
impl GeoCoder for NominatimGeoCoder {
    async fn locate(&self, city: &str) -> Result<Coordinates> {
        let request = self
            .client
            .get(&self.base_url)
            .header(USER_AGENT, &self.user_agent)
            .query(&[("q", city), ("format", "json"), ("limit", "1")]);
        let body = attempt_get_json("nominatim", request).await?;
        parse_place(city, &body)
    }

    fn name(&self) -> &str {
        "Nominatim"
    }
}

/// Open-Meteo current conditions
pub struct OpenMeteoWeather {
    client: Client,
    base_url: String,
}

impl OpenMeteoWeather {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: OPEN_METEO_URL.into(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

fn parse_temperature(lat: f64, lon: f64, body: &Value) -> Result<Temperature> {
    let temperature_f = body["current"]["temperature_2m"]
        .as_f64()
        .ok_or_else(|| ToolsError::Upstream {
            service: "open-meteo",
            message: "missing current.temperature_2m".into(),
        })?;
    Ok(Temperature {
        lat,
        lon,
        temperature_f,
    })
}

#[async_trait]
impl WeatherSource for OpenMeteoWeather {
    async fn current_temperature(&self, lat: f64, lon: f64) -> Result<Temperature> {
        let request = self.client.get(&self.base_url).query(&[
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("current", "temperature_2m".into()),
            ("temperature_unit", "fahrenheit".into()),
        ]);
        let body = attempt_get_json("open-meteo", request).await?;
        parse_temperature(lat, lon, &body)
    }

    fn name(&self) -> &str {
        "Open-Meteo"
    }
}

/// Open Library subject search
pub struct OpenLibraryCatalog {
    client: Client,
    base_url: String,
}

impl OpenLibraryCatalog {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: OPEN_LIBRARY_URL.into(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// "Historical Fiction" → "historical_fiction"
fn subject_slug(theme: &str) -> String {
    theme.trim().to_lowercase().replace(' ', "_")
}

fn book_from_work(work: &Value) -> Book {
    let author = work["authors"]
        .as_array()
        .and_then(|authors| authors.first())
        .and_then(|a| a["name"].as_str())
        .unwrap_or("Unknown Author");
    let subjects = work["subject"]
        .as_array()
        .map(|s| s.iter().filter_map(Value::as_str).take(5).map(String::from).collect())
        .unwrap_or_default();

    Book {
        title: work["title"].as_str().unwrap_or("Unknown Title").to_string(),
        author: author.to_string(),
        subjects,
    }
}

fn pick_book(theme: &str, body: &Value) -> Result<Book> {
    let works = body["works"].as_array().map(Vec::as_slice).unwrap_or_default();
    works
        .choose(&mut rand::thread_rng())
        .map(book_from_work)
        .ok_or_else(|| ToolsError::NotFound(format!("books for the theme '{theme}'")))
}

#[async_trait]
impl BookCatalog for OpenLibraryCatalog {
    async fn book_by_theme(&self, theme: &str) -> Result<Book> {
        let slug = subject_slug(theme);
        if slug.is_empty() {
            return Err(ToolsError::InvalidInput("theme is empty".into()));
        }
        let url = format!("{}/subjects/{slug}.json", self.base_url.trim_end_matches('/'));
        let request = self.client.get(url).query(&[("limit", "50")]);
        let body = attempt_get_json("open-library", request).await?;
        pick_book(theme, &body)
    }

    fn name(&self) -> &str {
        "Open Library"
    }
}

//! # field-tools
//!
//! Everyday tools for a field assistant, backed by public data APIs.
//!
//! ```text
//! "What should I wear in Denver?"
//!
//!   lookup_coordinates {city: "Denver"}      ─▶ {lat: 39.74, lon: -104.98}
//!   lookup_temperature {lat, lon}            ─▶ {temperature_f: 28.4}
//!   suggest_clothing   {temperature_f: 28.4} ─▶ "Winter coat, sweater..."
//! ```
//!
//! Every source has an HTTP implementation and a canned one, so the same
//! tools run offline in tests and demos.

pub mod error;
pub mod model;
pub mod source;
pub mod svckit;

use std::path::PathBuf;
use std::sync::Arc;

use agent_core::ToolRegistry;

pub use error::{Result, ToolsError};
pub use model::{Book, ClothingBand, Coordinates, Temperature};
use source::{
    BookCatalog, GeoCoder, MockBookCatalog, MockGeoCoder, MockWeather, NominatimGeoCoder,
    OpenLibraryCatalog, OpenMeteoWeather, WeatherSource,
};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        BookByThemeTool, CurrentTimeTool, ListDirectoryTool, LookupCoordinatesTool,
        LookupTemperatureTool, SuggestClothingTool,
    };
}

/// Data sources the tools read from
#[derive(Clone)]
pub struct FieldSources {
    pub geocoder: Arc<dyn GeoCoder>,
    pub weather: Arc<dyn WeatherSource>,
    pub books: Arc<dyn BookCatalog>,
}

impl FieldSources {
    /// The public APIs
    pub fn http() -> Result<Self> {
        Ok(Self {
            geocoder: Arc::new(NominatimGeoCoder::new()?),
            weather: Arc::new(OpenMeteoWeather::new()?),
            books: Arc::new(OpenLibraryCatalog::new()?),
        })
    }

    /// Canned data, no network
    pub fn mock() -> Self {
        Self {
            geocoder: Arc::new(MockGeoCoder::new()),
            weather: Arc::new(MockWeather),
            books: Arc::new(MockBookCatalog),
        }
    }
}

/// Register every field tool. `directory_root` enables `list_directory`.
pub fn register_field_tools(
    registry: &mut ToolRegistry,
    sources: &FieldSources,
    directory_root: Option<PathBuf>,
) -> agent_core::Result<()> {
    registry.register(tools::LookupCoordinatesTool::new(sources.geocoder.clone()))?;
    registry.register(tools::LookupTemperatureTool::new(sources.weather.clone()))?;
    registry.register(tools::SuggestClothingTool)?;
    registry.register(tools::BookByThemeTool::new(sources.books.clone()))?;
    registry.register(tools::CurrentTimeTool)?;
    if let Some(root) = directory_root {
        registry.register(tools::ListDirectoryTool::new(root))?;
    }
    Ok(())
}

/// System prompt for the field agent
pub const FIELD_AGENT_PROMPT: &str = r"You are a helpful field assistant. Use your tools to answer questions about the weather, what to wear, books and the current time.

## Weather and clothing

To answer a weather or clothing question you must:
1. call `lookup_coordinates` with the city,
2. call `lookup_temperature` with the latitude and longitude it returned,
3. call `suggest_clothing` with the temperature.

Never guess coordinates or temperatures.

## Books

Call `book_by_theme` with the user's theme and present the title, author and subjects nicely.
If the tool fails, tell the user no book was found for that theme.

## Tool failures

A tool result marked as failed is information, not a crash. Explain what went wrong
or try a different approach; do not repeat the same failing call.

Only call a tool if it is actually useful.";

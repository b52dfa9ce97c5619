//! Service Kit - Agent Tools
//!
//! Tools that implement `agent_core::Tool` for the field agent.

mod books;
mod clock;
mod directory;
mod weather;

pub use books::BookByThemeTool;
pub use clock::CurrentTimeTool;
pub use directory::ListDirectoryTool;
pub use weather::{LookupCoordinatesTool, LookupTemperatureTool, SuggestClothingTool};

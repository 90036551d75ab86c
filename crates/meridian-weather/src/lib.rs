//! Current weather lookup: location extraction, `OpenWeather` client and answer formatting.

pub mod client;
pub mod error;
pub mod format;
pub mod location;
pub mod lookup;
pub mod types;

pub use client::{DEFAULT_BASE_URL, WeatherClient};
pub use error::WeatherError;
pub use format::format_snapshot;
pub use lookup::WeatherService;
pub use types::{Units, WeatherQuery, WeatherSnapshot};

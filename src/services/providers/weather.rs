use crate::{error::EngineResult, models::WeatherTag, services::providers::WeatherProvider};

/// Returns the same weather for every location
///
/// Used by the batch runner (tags come from configuration) and in tests.
#[derive(Debug, Clone, Default)]
pub struct FixedWeather {
    tags: Vec<WeatherTag>,
}

impl FixedWeather {
    pub fn new(tags: Vec<WeatherTag>) -> Self {
        Self { tags }
    }
}

#[async_trait::async_trait]
impl WeatherProvider for FixedWeather {
    async fn weather_tags(&self, _location: &str) -> EngineResult<Vec<WeatherTag>> {
        Ok(self.tags.clone())
    }
}

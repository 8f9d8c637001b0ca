use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use outfit_engine::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, PgRatingStore, PgWardrobeRepository},
    services::{
        circuit_breaker::CircuitBreakerConfig,
        providers::{
            CfOracle, CircuitBreakerCfOracle, FixedWeather, HttpCfOracle, HttpTrendProvider,
            NeutralCfOracle, StaticTrendProvider, TrendProvider,
        },
    },
    RecommendationEngine,
};
use uuid::Uuid;

const OUTFITS_PER_USER: usize = 3;

/// Daily batch run: `outfit-engine <occasion> <location> <user-id>...`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: outfit-engine <occasion> <location> <user-id>...");
    }
    let occasion = &args[0];
    let location = &args[1];
    let user_ids = args[2..]
        .iter()
        .map(|id| Uuid::parse_str(id).with_context(|| format!("invalid user id: {}", id)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let config = Config::from_env()?;
    let settings = config.engine_settings();

    let pool = create_pool(&config.database_url).await?;
    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client);

    let trends: Arc<dyn TrendProvider> = match &config.trend_api_url {
        Some(url) => Arc::new(HttpTrendProvider::new(cache.clone(), url.clone())),
        None => {
            tracing::info!("No trend service configured, using empty snapshot");
            Arc::new(StaticTrendProvider::default())
        }
    };

    let cf_oracle: Arc<dyn CfOracle> = match &config.cf_oracle_url {
        Some(url) => Arc::new(CircuitBreakerCfOracle::new(
            Arc::new(HttpCfOracle::new(url.clone())),
            CircuitBreakerConfig {
                failure_threshold: config.cf_failure_threshold,
                open_duration: Duration::from_secs(config.cf_open_secs),
                call_timeout: settings.cf_timeout,
            },
        )),
        None => {
            tracing::info!("No CF oracle configured, using neutral scores");
            Arc::new(NeutralCfOracle)
        }
    };

    let engine = RecommendationEngine::builder(settings)
        .wardrobe(Arc::new(PgWardrobeRepository::new(pool.clone())))
        .ratings(Arc::new(PgRatingStore::new(pool)))
        .weather(Arc::new(FixedWeather::new(config.default_weather_tags())))
        .trends(trends)
        .cf_oracle(cf_oracle)
        .build()?;

    for user_id in user_ids {
        let outfits = engine
            .generate_daily_outfits(user_id, location, occasion, OUTFITS_PER_USER)
            .await;

        let output = serde_json::json!({
            "user_id": user_id,
            "occasion": occasion,
            "outfits": outfits,
        });
        println!("{}", serde_json::to_string(&output)?);
    }

    cache_writer.shutdown().await;
    Ok(())
}

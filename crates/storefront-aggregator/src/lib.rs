//! Product aggregation over the storefront's merchandise, price and inventory services.
//!
//! Each downstream service is reached through a [`ResilientCachedClient`] that runs the
//! remote call under the service's named resilience policy and caches answers per SKU:
//!
//! | Service     | Discipline                           | Default TTL | Fallback                      |
//! |-------------|--------------------------------------|-------------|-------------------------------|
//! | merchandise | [`CachingDiscipline::CacheAside`]    | 15 minutes  | "Unknown Product" placeholder |
//! | price       | [`CachingDiscipline::CacheAside`]    | 2 minutes   | `0.00 USD`                    |
//! | inventory   | [`CachingDiscipline::FallbackOnly`]  | 30 seconds  | `-1` (backordered)            |
//!
//! Clients never fail. A failed call is logged with its policy, error kind and circuit
//! state, then answered from the cache or with the fallback value. The [`Aggregator`]
//! runs the three clients concurrently and merges their answers into a [`Product`].
//!
//! ```rust,no_run
//! use storefront_aggregator::{telemetry, Aggregator, AggregatorConfig, RequestContext, Sku};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AggregatorConfig::from_file("storefront.toml")?;
//! telemetry::init(&config.log)?;
//!
//! let aggregator = Aggregator::connect(&config)?;
//! let ctx = RequestContext::new().with_store_number(1234);
//! let product = aggregator.get_composite(Sku(12345), &ctx).await;
//! println!("{} costs {} {}", product.name, product.price, product.currency);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: `downstream_answers_total{policy, quality}`, plus pipeline and cache metrics

mod aggregator;
mod client;
mod config;
mod context;
mod downstream;
mod http;
pub mod telemetry;

pub use aggregator::{
    Aggregator, InventoryClient, MerchandiseClient, PriceClient, Product, ProductQuality,
};
pub use client::{
    Answer, AnswerQuality, CachingDiscipline, ClientBuilder, ResilientCachedClient, Transport,
};
pub use config::{
    AggregatorConfig, CacheConfig, ConfigError, Downstream, ServiceConfig, ServicesConfig,
};
pub use context::RequestContext;
pub use downstream::{
    InventoryRequest, InventoryResponse, MerchandiseRequest, MerchandiseResponse, PriceRequest,
    PriceResponse, Sku, BACKORDERED, PLACEHOLDER_IMAGE_URL,
};
pub use http::{DownstreamRequest, HttpDownstream};

//! Test organization:
//! - scenarios.rs: the degraded-path walkthroughs (cached merchandise, timed-out inventory,
//!   stale inventory)
//! - fan_out.rs: concurrency and isolation of the three branches

mod fan_out;
mod scenarios;

use crate::common::{quick_policy, Stub};
use storefront_aggregator::{
    Aggregator, AggregatorConfig, Downstream, InventoryResponse, MerchandiseResponse,
    PriceResponse,
};
use storefront_cache::CacheService;
use storefront_resilience::ResiliencePipeline;

pub(crate) struct Harness {
    pub aggregator: Aggregator,
    pub pipeline: ResiliencePipeline,
    pub cache: CacheService,
    pub merchandise: Stub<MerchandiseResponse>,
    pub price: Stub<PriceResponse>,
    pub inventory: Stub<InventoryResponse>,
}

pub(crate) fn widget() -> MerchandiseResponse {
    MerchandiseResponse {
        name: "Widget".to_string(),
        description: "A very useful widget".to_string(),
        image_url: "https://cdn.example.com/widget.png".to_string(),
        category: "Tools".to_string(),
    }
}

pub(crate) fn price() -> PriceResponse {
    PriceResponse {
        price: "19.99".to_string(),
        original_price: "24.99".to_string(),
        currency: "USD".to_string(),
    }
}

pub(crate) fn harness() -> Harness {
    let mut config = AggregatorConfig::default();
    for downstream in Downstream::ALL {
        config
            .policies
            .insert(downstream.name().to_string(), quick_policy());
    }
    let pipeline = config.pipeline().unwrap();
    let cache = CacheService::in_memory(1_000);
    let merchandise = Stub::ok(widget());
    let price = Stub::ok(price());
    let inventory = Stub::ok(InventoryResponse {
        available_quantity: 10,
    });

    let aggregator = Aggregator::with_transports(
        &config,
        &pipeline,
        cache.clone(),
        merchandise.clone(),
        price.clone(),
        inventory.clone(),
    )
    .unwrap();

    Harness {
        aggregator,
        pipeline,
        cache,
        merchandise,
        price,
        inventory,
    }
}

use crate::client::{Answer, AnswerQuality, CachingDiscipline, ResilientCachedClient};
use crate::config::{AggregatorConfig, ConfigError, Downstream};
use crate::context::RequestContext;
use crate::downstream::{
    InventoryRequest, InventoryResponse, MerchandiseRequest, MerchandiseResponse, PriceRequest,
    PriceResponse, Sku,
};
use crate::http::HttpDownstream;
use serde::Serialize;
use storefront_cache::CacheService;
use storefront_resilience::{PipelineError, ResilienceError, ResiliencePipeline};
use tower::Service;
use tracing::{field, info, info_span, warn, Instrument};

pub type MerchandiseClient = ResilientCachedClient<MerchandiseRequest, MerchandiseResponse>;
pub type PriceClient = ResilientCachedClient<PriceRequest, PriceResponse>;
pub type InventoryClient = ResilientCachedClient<InventoryRequest, InventoryResponse>;

/// Per-branch [`AnswerQuality`] of a [`Product`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductQuality {
    pub merchandise: AnswerQuality,
    pub price: AnswerQuality,
    pub inventory: AnswerQuality,
}

impl ProductQuality {
    /// True if any branch was answered from a stale entry or a fallback value.
    pub fn is_degraded(&self) -> bool {
        self.merchandise.is_degraded() || self.price.is_degraded() || self.inventory.is_degraded()
    }
}

/// A product assembled from the three downstream services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub sku: Sku,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub price: String,
    pub original_price: String,
    pub currency: String,
    /// `-1` when inventory is unknown (backordered).
    pub available_quantity: i64,
    pub quality: ProductQuality,
}

impl Product {
    fn assemble(
        sku: Sku,
        merchandise: Answer<MerchandiseResponse>,
        price: Answer<PriceResponse>,
        inventory: Answer<InventoryResponse>,
    ) -> Self {
        let quality = ProductQuality {
            merchandise: merchandise.quality,
            price: price.quality,
            inventory: inventory.quality,
        };
        let MerchandiseResponse {
            name,
            description,
            image_url,
            category,
        } = merchandise.value;
        let PriceResponse {
            price,
            original_price,
            currency,
        } = price.value;

        Self {
            sku,
            name,
            description,
            image_url,
            category,
            price,
            original_price,
            currency,
            available_quantity: inventory.value.available_quantity,
            quality,
        }
    }
}

/// Fans a product lookup out to merchandise, price and inventory and merges the answers.
///
/// The three calls run concurrently and independently; a failure in one never affects
/// the others, and [`Aggregator::get_composite`] always produces a [`Product`].
#[derive(Debug)]
pub struct Aggregator {
    merchandise: MerchandiseClient,
    price: PriceClient,
    inventory: InventoryClient,
}

impl Aggregator {
    pub fn new(merchandise: MerchandiseClient, price: PriceClient, inventory: InventoryClient) -> Self {
        Self {
            merchandise,
            price,
            inventory,
        }
    }

    /// Wires the three clients over the given transports: merchandise and price
    /// cache-aside, inventory fallback-only.
    pub fn with_transports<M, P, I>(
        config: &AggregatorConfig,
        pipeline: &ResiliencePipeline,
        cache: CacheService,
        merchandise: M,
        price: P,
        inventory: I,
    ) -> Result<Self, PipelineError>
    where
        M: Service<MerchandiseRequest, Response = MerchandiseResponse, Error = ResilienceError>
            + Clone
            + Send
            + Sync
            + 'static,
        M::Future: Send + 'static,
        P: Service<PriceRequest, Response = PriceResponse, Error = ResilienceError>
            + Clone
            + Send
            + Sync
            + 'static,
        P::Future: Send + 'static,
        I: Service<InventoryRequest, Response = InventoryResponse, Error = ResilienceError>
            + Clone
            + Send
            + Sync
            + 'static,
        I::Future: Send + 'static,
    {
        let merchandise = ResilientCachedClient::builder(
            Downstream::Merchandise.name(),
            MerchandiseResponse::fallback(),
        )
        .ttl(config.cache_ttl(Downstream::Merchandise))
        .build(
            pipeline,
            cache.clone(),
            |sku| MerchandiseRequest { sku },
            merchandise,
        )?;

        let price = ResilientCachedClient::builder(Downstream::Price.name(), PriceResponse::fallback())
            .ttl(config.cache_ttl(Downstream::Price))
            .build(pipeline, cache.clone(), |sku| PriceRequest { sku }, price)?;

        let inventory = ResilientCachedClient::builder(
            Downstream::Inventory.name(),
            InventoryResponse::fallback(),
        )
        .discipline(CachingDiscipline::FallbackOnly {
            max_staleness: Some(config.services.inventory.max_staleness),
        })
        .ttl(config.cache_ttl(Downstream::Inventory))
        .build(pipeline, cache, |sku| InventoryRequest { sku }, inventory)?;

        Ok(Self::new(merchandise, price, inventory))
    }

    /// Builds the pipeline, an in-process cache and HTTP transports from `config`.
    pub fn connect(config: &AggregatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline = config.pipeline()?;
        let cache = CacheService::in_memory(config.cache.capacity);
        let http = reqwest::Client::builder().build()?;
        let services = &config.services;

        let aggregator = Self::with_transports(
            config,
            &pipeline,
            cache,
            HttpDownstream::new(http.clone(), &services.merchandise.base_url),
            HttpDownstream::new(http.clone(), &services.price.base_url),
            HttpDownstream::new(http, &services.inventory.base_url),
        )?;
        info!(policies = ?pipeline.policy_names(), "aggregator ready");
        Ok(aggregator)
    }

    pub fn merchandise(&self) -> &MerchandiseClient {
        &self.merchandise
    }

    pub fn price(&self) -> &PriceClient {
        &self.price
    }

    pub fn inventory(&self) -> &InventoryClient {
        &self.inventory
    }

    /// Assembles the product for `sku`. Never fails; degraded branches are visible in
    /// [`Product::quality`].
    pub async fn get_composite(&self, sku: Sku, ctx: &RequestContext) -> Product {
        let span = info_span!(
            "composite",
            %sku,
            store_number = field::Empty,
            order_number = field::Empty,
            user_id = field::Empty,
            session_id = field::Empty,
        );
        ctx.record_on(&span);

        async {
            let (merchandise, price, inventory) = tokio::join!(
                self.merchandise.get(sku, ctx),
                self.price.get(sku, ctx),
                self.inventory.get(sku, ctx),
            );
            let product = Product::assemble(sku, merchandise, price, inventory);

            let quality = product.quality;
            if quality.is_degraded() {
                warn!(
                    merchandise = %quality.merchandise,
                    price = %quality.price,
                    inventory = %quality.inventory,
                    "assembled degraded product"
                );
            } else {
                info!(
                    merchandise = %quality.merchandise,
                    price = %quality.price,
                    inventory = %quality.inventory,
                    "assembled product"
                );
            }
            product
        }
        .instrument(span)
        .await
    }
}

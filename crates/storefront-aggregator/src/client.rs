use crate::context::RequestContext;
use crate::downstream::Sku;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use storefront_cache::{CacheKey, CacheService};
use storefront_resilience::{
    PipelineError, PolicyHandle, PolicyName, ResilienceError, ResiliencePipeline,
};
use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceExt};
use tracing::{error, field, info_span, warn, Instrument};

#[cfg(feature = "metrics")]
use metrics::counter;

/// The remote call behind a client, after type erasure.
pub type Transport<Req, Resp> = BoxCloneSyncService<Req, Resp, ResilienceError>;

type RequestBuilder<Req> = Arc<dyn Fn(Sku) -> Req + Send + Sync>;

/// How a client combines the cache with the remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachingDiscipline {
    /// Serve from the cache while the entry is fresh; call the remote only on a miss.
    /// A failed remote call is answered with the fallback value.
    CacheAside,
    /// Always call the remote. The cache is only read when the call fails, and then
    /// may serve an entry that expired up to `max_staleness` ago (`None`: any age).
    FallbackOnly { max_staleness: Option<Duration> },
}

/// Where an [`Answer`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerQuality {
    /// Returned by the remote service during this call.
    Fresh,
    /// Served from an unexpired cache entry.
    Cached,
    /// Served from the cache after the remote call failed.
    Stale,
    /// The static fallback value; no real data was available.
    Sentinel,
}

impl AnswerQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerQuality::Fresh => "fresh",
            AnswerQuality::Cached => "cached",
            AnswerQuality::Stale => "stale",
            AnswerQuality::Sentinel => "sentinel",
        }
    }

    /// True when the remote call failed while producing this answer.
    pub fn is_degraded(self) -> bool {
        matches!(self, AnswerQuality::Stale | AnswerQuality::Sentinel)
    }
}

impl fmt::Display for AnswerQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client result tagged with its [`AnswerQuality`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer<T> {
    pub value: T,
    pub quality: AnswerQuality,
}

impl<T> Answer<T> {
    fn new(value: T, quality: AnswerQuality) -> Self {
        Self { value, quality }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// A downstream client that never fails.
///
/// Every remote call runs through the named policy of a [`ResiliencePipeline`], and
/// results are cached per SKU under the configured [`CachingDiscipline`]. Failures are
/// logged with the policy's live circuit state and answered from the cache or with the
/// fallback value.
///
/// ```rust
/// use storefront_aggregator::{CachingDiscipline, ResilientCachedClient, Sku, RequestContext};
/// use storefront_cache::CacheService;
/// use storefront_resilience::{PolicyConfig, ResilienceError, ResiliencePipeline};
/// use std::time::Duration;
/// use tower::service_fn;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = ResiliencePipeline::from_configs([("stock", PolicyConfig::default())])?;
/// let client = ResilientCachedClient::builder("stock", 0_i64)
///     .discipline(CachingDiscipline::FallbackOnly { max_staleness: None })
///     .ttl(Duration::from_secs(30))
///     .build(
///         &pipeline,
///         CacheService::in_memory(100),
///         |sku: Sku| sku,
///         service_fn(|_sku: Sku| async { Ok::<_, ResilienceError>(7_i64) }),
///     )?;
///
/// let answer = client.get(Sku(1), &RequestContext::new()).await;
/// assert_eq!(answer.value, 7);
/// # Ok(())
/// # }
/// ```
pub struct ResilientCachedClient<Req, Resp> {
    policy: PolicyHandle,
    cache: CacheService,
    cache_domain: String,
    discipline: CachingDiscipline,
    ttl: Duration,
    fallback: Resp,
    request: RequestBuilder<Req>,
    transport: Transport<Req, Resp>,
}

impl<Req, Resp> ResilientCachedClient<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn builder(policy: impl Into<PolicyName>, fallback: Resp) -> ClientBuilder<Req, Resp> {
        ClientBuilder::new(policy.into(), fallback)
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    pub fn discipline(&self) -> CachingDiscipline {
        self.discipline
    }

    /// Answers for `sku`. Never fails.
    pub async fn get(&self, sku: Sku, ctx: &RequestContext) -> Answer<Resp> {
        let span = info_span!(
            "downstream",
            policy = %self.policy.name(),
            %sku,
            store_number = field::Empty,
            order_number = field::Empty,
            user_id = field::Empty,
            session_id = field::Empty,
        );
        ctx.record_on(&span);

        let answer = self.answer(sku).instrument(span).await;
        record(self.policy.name(), answer.quality);
        answer
    }

    async fn answer(&self, sku: Sku) -> Answer<Resp> {
        let key = CacheKey::for_sku(&self.cache_domain, sku);

        match self.discipline {
            CachingDiscipline::CacheAside => {
                if let Some(value) = self.cache.get(key.as_str()).await {
                    return Answer::new(value, AnswerQuality::Cached);
                }
                match self.fetch(sku).await {
                    Ok(value) => {
                        self.cache.put(key.as_str(), &value, self.ttl).await;
                        Answer::new(value, AnswerQuality::Fresh)
                    }
                    Err(err) => {
                        self.log_failure(&err);
                        Answer::new(self.fallback.clone(), AnswerQuality::Sentinel)
                    }
                }
            }
            CachingDiscipline::FallbackOnly { max_staleness } => match self.fetch(sku).await {
                Ok(value) => {
                    self.cache.put(key.as_str(), &value, self.ttl).await;
                    Answer::new(value, AnswerQuality::Fresh)
                }
                Err(err) => {
                    self.log_failure(&err);
                    let circuit_state = self.policy.circuit_state();
                    match self.cache.get_stale(key.as_str(), max_staleness).await {
                        Some(value) => {
                            warn!(%circuit_state, "used cached fallback");
                            Answer::new(value, AnswerQuality::Stale)
                        }
                        None => {
                            warn!(%circuit_state, "no cached value available, serving fallback");
                            Answer::new(self.fallback.clone(), AnswerQuality::Sentinel)
                        }
                    }
                }
            },
        }
    }

    async fn fetch(&self, sku: Sku) -> Result<Resp, ResilienceError> {
        let transport = self.transport.clone();
        let request = (self.request)(sku);
        self.policy
            .decorate(move || transport.clone().oneshot(request.clone()))
            .call()
            .await
    }

    fn log_failure(&self, err: &ResilienceError) {
        error!(
            error_kind = err.kind().as_str(),
            error = %err,
            circuit_state = %self.policy.circuit_state(),
            "downstream call failed"
        );
    }
}

impl<Req, Resp> fmt::Debug for ResilientCachedClient<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientCachedClient")
            .field("policy", self.policy.name())
            .field("cache_domain", &self.cache_domain)
            .field("discipline", &self.discipline)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ResilientCachedClient`].
pub struct ClientBuilder<Req, Resp> {
    policy: PolicyName,
    fallback: Resp,
    discipline: CachingDiscipline,
    ttl: Duration,
    cache_domain: Option<String>,
    _request: PhantomData<fn(Sku) -> Req>,
}

impl<Req, Resp> ClientBuilder<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn new(policy: PolicyName, fallback: Resp) -> Self {
        Self {
            policy,
            fallback,
            discipline: CachingDiscipline::CacheAside,
            ttl: Duration::from_secs(60),
            cache_domain: None,
            _request: PhantomData,
        }
    }

    /// Default: [`CachingDiscipline::CacheAside`]
    pub fn discipline(mut self, discipline: CachingDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    /// How long a successful answer stays fresh in the cache.
    ///
    /// Default: 60 seconds
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Prefix of this client's cache keys. Default: the policy name.
    pub fn cache_domain(mut self, domain: impl Into<String>) -> Self {
        self.cache_domain = Some(domain.into());
        self
    }

    /// Resolves the policy and builds the client.
    ///
    /// Fails only if `pipeline` has no policy with the configured name.
    pub fn build<F, S>(
        self,
        pipeline: &ResiliencePipeline,
        cache: CacheService,
        request: F,
        transport: S,
    ) -> Result<ResilientCachedClient<Req, Resp>, PipelineError>
    where
        F: Fn(Sku) -> Req + Send + Sync + 'static,
        S: Service<Req, Response = Resp, Error = ResilienceError> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
    {
        let policy = pipeline.policy(self.policy.as_str())?;
        Ok(ResilientCachedClient {
            cache_domain: self
                .cache_domain
                .unwrap_or_else(|| self.policy.as_str().to_string()),
            policy,
            cache,
            discipline: self.discipline,
            ttl: self.ttl,
            fallback: self.fallback,
            request: Arc::new(request),
            transport: BoxCloneSyncService::new(transport),
        })
    }
}

#[cfg(feature = "metrics")]
fn record(policy: &PolicyName, quality: AnswerQuality) {
    counter!("downstream_answers_total", "policy" => policy.to_string(), "quality" => quality.as_str())
        .increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record(_policy: &PolicyName, _quality: AnswerQuality) {}

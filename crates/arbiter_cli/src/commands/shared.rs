use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use arbiter::db;
use arbiter::entity::source::Source;
use arbiter::notify::{LogSink, NotificationSink, WebhookSink};
use arbiter::platform::{BudgetConfig, RateLimitedClient, SourceAdapter};
use arbiter::sync::EngineContext;
use console::Term;

use crate::config::{Config, RateOverrides};
use crate::progress::ProgressReporter;

/// Everything a command needs to run engine components.
pub(crate) struct Session {
    pub(crate) ctx: EngineContext,
    pub(crate) reporter: Arc<ProgressReporter>,
    pub(crate) is_tty: bool,
}

/// Connect (running pending migrations) and build the engine context.
pub(crate) async fn open_session(
    config: &Config,
    database_url: &str,
    shutdown_flag: Option<Arc<AtomicBool>>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let db = Arc::new(db::connect_and_migrate(database_url).await?);
    let reporter = Arc::new(ProgressReporter::new());

    let mut builder = EngineContext::builder()
        .database(db)
        .user_id(config.user_id())
        .notifier(notifier(config)?)
        .progress(reporter.as_callback());
    if let Some(flag) = shutdown_flag {
        builder = builder.shutdown_flag(flag);
    }

    Ok(Session {
        ctx: builder.build()?,
        reporter,
        is_tty: Term::stdout().is_term(),
    })
}

fn notifier(config: &Config) -> Result<Arc<dyn NotificationSink>, Box<dyn std::error::Error>> {
    Ok(match config.notify.webhook_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Arc::new(WebhookSink::new(url.trim())?),
        _ => Arc::new(LogSink),
    })
}

fn budget(source: Source, rate: &RateOverrides) -> BudgetConfig {
    let mut budget = BudgetConfig::for_source(source);
    if let Some(refill) = rate.refill_per_minute.filter(|r| *r > 0.0) {
        budget = budget.with_refill_per_minute(refill).with_capacity(refill);
    }
    if let Some(gap) = rate.min_gap_ms {
        budget = budget.with_min_gap(Duration::from_millis(gap));
    }
    budget
}

fn wrap<A>(adapter: A, budget: BudgetConfig, ctx: &EngineContext) -> Arc<dyn SourceAdapter>
where
    A: SourceAdapter + 'static,
{
    let client = RateLimitedClient::new(adapter, budget);
    match ctx.progress_handle() {
        Some(callback) => Arc::new(client.with_progress(callback)),
        None => Arc::new(client),
    }
}

fn missing(source: Source, what: &str) -> Box<dyn std::error::Error> {
    format!(
        "{} is not configured: set {} in [{}] or ARBITER_{}__{}",
        source,
        what,
        source,
        source.as_str().to_uppercase(),
        what.to_uppercase()
    )
    .into()
}

/// Build the rate-limited adapter for one source from config.
pub(crate) fn build_adapter(
    source: Source,
    config: &Config,
    ctx: &EngineContext,
) -> Result<Arc<dyn SourceAdapter>, Box<dyn std::error::Error>> {
    #[cfg(not(all(feature = "amazon", feature = "ebay", feature = "bricklink", feature = "keepa")))]
    let _ = (config, ctx);

    match source {
        #[cfg(feature = "amazon")]
        Source::Amazon => {
            use arbiter::amazon::{AmazonAdapter, UK_MARKETPLACE_ID};

            let section = &config.amazon;
            let token = section
                .access_token
                .as_deref()
                .ok_or_else(|| missing(source, "access_token"))?;
            let marketplace = section.marketplace_id.as_deref().unwrap_or(UK_MARKETPLACE_ID);
            let mut adapter = AmazonAdapter::new(token, marketplace)?;
            if let Some(url) = section.base_url.as_deref() {
                adapter = adapter.with_base_url(url);
            }
            Ok(wrap(adapter, budget(source, &section.rate), ctx))
        }
        #[cfg(feature = "ebay")]
        Source::Ebay => {
            use arbiter::ebay::{EBAY_GB, EbayAdapter};

            let section = &config.ebay;
            let token = section
                .token
                .as_deref()
                .ok_or_else(|| missing(source, "token"))?;
            let marketplace = section.marketplace.as_deref().unwrap_or(EBAY_GB);
            let mut adapter = EbayAdapter::new(token, marketplace)?;
            if let Some(url) = section.base_url.as_deref() {
                adapter = adapter.with_base_url(url);
            }
            Ok(wrap(adapter, budget(source, &section.rate), ctx))
        }
        #[cfg(feature = "bricklink")]
        Source::BrickLink => {
            use arbiter::bricklink::{BrickLinkAdapter, OAuthCredentials};

            let section = &config.bricklink;
            let field = |value: &Option<String>, name: &str| {
                value.clone().ok_or_else(|| missing(source, name))
            };
            let credentials = OAuthCredentials {
                consumer_key: field(&section.consumer_key, "consumer_key")?,
                consumer_secret: field(&section.consumer_secret, "consumer_secret")?,
                token: field(&section.token, "token")?,
                token_secret: field(&section.token_secret, "token_secret")?,
            };
            let mut adapter = BrickLinkAdapter::new(credentials)?;
            if let Some(url) = section.base_url.as_deref() {
                adapter = adapter.with_base_url(url);
            }
            Ok(wrap(adapter, budget(source, &section.rate), ctx))
        }
        #[cfg(feature = "keepa")]
        Source::Keepa => {
            use arbiter::keepa::{DOMAIN_UK, KeepaAdapter};

            let section = &config.keepa;
            let key = section
                .api_key
                .as_deref()
                .ok_or_else(|| missing(source, "api_key"))?;
            let domain = section.domain.unwrap_or(DOMAIN_UK);
            let mut adapter = KeepaAdapter::new(key, domain)?;
            if let Some(url) = section.base_url.as_deref() {
                adapter = adapter.with_base_url(url);
            }
            Ok(wrap(adapter, budget(source, &section.rate), ctx))
        }
        #[allow(unreachable_patterns)]
        _ => Err(format!("{} support was not compiled into this build", source).into()),
    }
}

/// Build adapters for every source in `sources`, skipping (with a warning)
/// those that are not configured.
pub(crate) fn build_configured(
    sources: &[Source],
    config: &Config,
    session: &Session,
) -> Vec<Arc<dyn SourceAdapter>> {
    sources
        .iter()
        .filter_map(|&source| match build_adapter(source, config, &session.ctx) {
            Ok(adapter) => Some(adapter),
            Err(e) => {
                if session.is_tty {
                    eprintln!("Skipping {}: {}", source, e);
                } else {
                    tracing::warn!(source = %source, error = %e, "Skipping source");
                }
                None
            }
        })
        .collect()
}

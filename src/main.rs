use clap::Parser;
use gettext_anywhere::config::Config;
use gettext_anywhere::handlers::HandlerOptions;
use gettext_anywhere::{
    CatalogCache, CatalogLoader, DEFAULT_DOMAIN, HandlerRegistry, ResolveOptions, Resolver,
    TranslationHook, UntranslatedLoader,
};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;

/// Translates a message with the catalogs of a domain.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(long, env, default_value = "INFO")]
    log_level: LevelFilter,
    /// The domain of the catalogs.
    #[arg(long, default_value = DEFAULT_DOMAIN)]
    domain: String,
    /// The languages to search for, in order of preference.
    #[arg(long = "lang", default_value = "de_DE")]
    languages: Vec<String>,
    /// The locale directory (or key prefix) to search in.
    #[arg(long)]
    locale_dir: Option<String>,
    /// Loads the catalogs of the domain from this S3 bucket.
    #[arg(long, env)]
    bucket_name: Option<String>,
    /// Returns the untranslated message if no catalog exists.
    #[arg(long)]
    fallback: bool,
    /// The message to translate.
    #[arg(default_value = "Test translation.")]
    message: String,
}

/// Initializes the application and translates the message.
///
/// This initializes the logging, aggregates configuration and registers the configured handlers
/// before the catalogs of the domain are resolved.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // parse the arguments and configuration
    let args = Args::parse();
    let config = Config::new()?;

    // initialize logging
    tracing_subscriber::registry()
        .with(config.log_filter.clone().0)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_filter(args.log_level),
        )
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { translate(args, config).await })
}

async fn translate(args: Args, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(HandlerRegistry::with_builtin_kinds());
    config.apply(&registry).await?;
    if let Some(bucket_name) = args.bucket_name {
        registry
            .register_named(
                args.domain.as_str(),
                "s3",
                HandlerOptions::new().with("bucket_name", bucket_name),
            )
            .await?;
    }
    debug!(domains = ?registry.domains().await, "registered handlers");

    let resolver = Arc::new(Resolver::new(registry, Arc::new(CatalogCache::new())));
    let hook = TranslationHook::new(Arc::new(UntranslatedLoader), resolver);
    hook.install().await;

    let mut options = ResolveOptions::new()
        .with_languages(args.languages)
        .with_fallback(args.fallback);
    if let Some(locale_dir) = args.locale_dir {
        options = options.with_locale_dir(locale_dir);
    }
    let catalog = hook.translation(&args.domain, &options).await;
    hook.uninstall().await;

    let catalog = catalog?;
    info!(catalogs = catalog.chain().count(), "resolved catalogs");
    println!("{}", catalog.gettext(&args.message));
    Ok(())
}

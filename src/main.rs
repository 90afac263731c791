use std::{process, sync::Arc};

use penna::{
    application::{
        error::AppError,
        pagination::PageRequest,
        repos::{ContentStore, StatusStore},
    },
    cache::{MemoryCacheStore, StoreMode, build_article_store},
    config::{self, Command, CreateArgs, PageArgs},
    domain::articles::{ArticleInput, parse_tag_list},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        memory::{MemoryContentStore, MemoryStatusStore, seed_demo_content},
        telemetry,
    },
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Migrate => run_migrate(&settings).await,
        command => {
            let store = init_store(&settings).await?;
            run_command(store.as_ref(), command).await
        }
    }
}

async fn run_migrate(settings: &config::Settings) -> Result<(), AppError> {
    let database_url = database_url(settings)?;
    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "penna::migrate", "migrations applied");
    Ok(())
}

fn database_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)
}

/// The content store for this process, wrapped in the cache unless configured otherwise.
async fn init_store(settings: &config::Settings) -> Result<Arc<dyn ContentStore>, AppError> {
    let inner: Arc<dyn ContentStore> = match settings.database.url.as_deref() {
        Some(url) => {
            let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
                .await
                .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
            let repositories = PostgresRepositories::new(pool);
            repositories
                .health_check()
                .await
                .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
            repositories
                .status_store()
                .published()
                .await
                .map_err(AppError::from)?;
            Arc::new(repositories.content_store())
        }
        None => {
            let store = MemoryContentStore::new(Arc::new(MemoryStatusStore::default()));
            let seeded = seed_demo_content(&store).await?;
            info!(
                target = "penna::store",
                seeded, "no database configured; using seeded in-memory store"
            );
            Arc::new(store)
        }
    };

    let cache = Arc::new(MemoryCacheStore::from_config(&settings.cache));
    Ok(build_article_store(
        inner,
        cache,
        &settings.cache,
        StoreMode::from_admin_flag(settings.cache.admin),
    ))
}

async fn run_command(store: &dyn ContentStore, command: Command) -> Result<(), AppError> {
    match command {
        Command::List(args) => {
            let request = page_request(&args.page)?;
            // The second read is served from the cache when it is enabled.
            store.by_page(request, args.all).await?;
            print_json(&store.by_page(request, args.all).await?)
        }
        Command::Get(args) => {
            store.by_id(args.id).await?;
            let article = store.by_id(args.id).await?.ok_or(AppError::NotFound)?;
            print_json(&article)
        }
        Command::Show(args) => {
            store.by_slug(&args.slug).await?;
            let article = store.by_slug(&args.slug).await?.ok_or(AppError::NotFound)?;
            print_json(&article)
        }
        Command::Tag(args) => {
            let request = page_request(&args.page)?;
            store.by_tag(&args.slug, request).await?;
            print_json(&store.by_tag(&args.slug, request).await?)
        }
        Command::Create(args) => {
            let created = store.create(create_input(args)).await?;
            if !created {
                return Err(AppError::validation(
                    "article was rejected; check required fields, status, and slug uniqueness",
                ));
            }
            print_json(&serde_json::json!({ "created": true }))
        }
        Command::Migrate => Err(AppError::unexpected("migrate does not use a content store")),
    }
}

fn page_request(args: &PageArgs) -> Result<PageRequest, AppError> {
    Ok(PageRequest::new(args.page, args.limit)?)
}

fn create_input(args: CreateArgs) -> ArticleInput {
    ArticleInput {
        id: None,
        author_id: Some(args.author_id),
        status_id: Some(args.status_id),
        title: Some(args.title),
        slug: args.slug,
        excerpt: Some(args.excerpt),
        body: Some(args.body),
        tags: parse_tag_list(&args.tags),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

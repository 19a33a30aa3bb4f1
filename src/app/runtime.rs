use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use animal_catalog_core::catalog::{AnimalDraft, Catalog, Characteristic, SCIENTIFIC_NAME_KEY};
use animal_catalog_core::image::{
    GoogleImageSearch, HttpImageValidator, ImageCache, ImageResolver, ImageSession, ImageSubject, SearchConfig,
};
use animal_catalog_core::source::{LETTERS, NinjasClient, load_all};
use animal_catalog_core::store::{KeyValueStore, SqliteStore};
use animal_catalog_core::{Database, DatabaseOptions, HttpTimeouts};
use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::app::config::{self, FileConfig};
use crate::app::terminal;
use crate::cli::{AddArgs, Args, Command};
use crate::output;

/// Effective settings after merging CLI flags over the config file.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) database_path: PathBuf,
    pub(crate) timeouts: HttpTimeouts,
    pub(crate) db_options: DatabaseOptions,
    pub(crate) search_api_key: Option<String>,
    pub(crate) search_engine_id: Option<String>,
    pub(crate) search_base_url: Option<String>,
    pub(crate) animals_api_key: Option<String>,
    pub(crate) animals_base_url: Option<String>,
}

impl Settings {
    pub(crate) fn resolve(args: &Args, file: FileConfig) -> Self {
        let defaults = HttpTimeouts::default();
        let db_defaults = DatabaseOptions::default();
        Self {
            database_path: args
                .db
                .clone()
                .or(file.database_path)
                .unwrap_or_else(config::resolve_default_database_path),
            timeouts: HttpTimeouts {
                connect_secs: file.http_connect_timeout_secs.unwrap_or(defaults.connect_secs),
                read_secs: file.http_read_timeout_secs.unwrap_or(defaults.read_secs),
            },
            db_options: DatabaseOptions {
                max_connections: file.db_max_connections.unwrap_or(db_defaults.max_connections),
                busy_timeout_ms: file.db_busy_timeout_ms.unwrap_or(db_defaults.busy_timeout_ms),
            },
            search_api_key: non_empty(args.search_key.clone().or(file.search_api_key)),
            search_engine_id: non_empty(args.search_engine.clone().or(file.search_engine_id)),
            search_base_url: file.search_base_url,
            animals_api_key: non_empty(args.animals_key.clone().or(file.animals_api_key)),
            animals_base_url: file.animals_base_url,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) async fn run(args: Args) -> Result<()> {
    let file_config = config::load_file_config(args.config.as_deref())?;
    let default_level = terminal::resolve_default_log_level(args.quiet, args.verbose, file_config.verbosity);
    terminal::init_tracing(default_level, terminal::is_no_color_requested(file_config.no_color));
    debug!(?args, "CLI arguments parsed");

    let settings = Settings::resolve(&args, file_config);
    let db = open_database(&settings).await?;
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(db.clone()));
    let mut catalog = Catalog::open(Arc::clone(&store)).await;

    let result = dispatch(&args, &settings, &mut catalog, store).await;

    catalog.close().await;
    db.close().await;
    result
}

async fn open_database(settings: &Settings) -> Result<Database> {
    if let Some(parent) = settings.database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory '{}'", parent.display()))?;
    }
    Database::new(&settings.database_path, settings.db_options)
        .await
        .with_context(|| format!("Failed to open catalog database '{}'", settings.database_path.display()))
}

async fn dispatch(
    args: &Args,
    settings: &Settings,
    catalog: &mut Catalog,
    store: Arc<dyn KeyValueStore>,
) -> Result<()> {
    match &args.command {
        Command::Refresh { force } => refresh(args, settings, catalog, *force).await,
        Command::List { page, favorites } => {
            let width = output::terminal_width();
            let state = catalog.state();
            let lines = if *favorites {
                output::render_favorites(state, width)
            } else {
                output::render_page(&state.page(*page as usize), state, width)
            };
            output::print_lines(&lines);
            Ok(())
        }
        Command::Show { name } => {
            let animal = catalog.get(name)?;
            output::print_lines(&output::render_animal(animal, catalog.state().is_favorite(name)));
            if let Some(image) = &animal.image {
                println!("Image: {image}");
                return Ok(());
            }
            let subject = ImageSubject::from_animal(animal);
            resolve_image(settings, store, subject).await
        }
        Command::Image { common, scientific } => {
            let subject = ImageSubject::new(Some(common.clone()), scientific.clone());
            resolve_image(settings, store, subject).await
        }
        Command::Favorite { name } => {
            catalog.get(name)?;
            let favorite = catalog.toggle_favorite(name).await;
            if favorite {
                println!("Added {name} to favorites");
            } else {
                println!("Removed {name} from favorites");
            }
            Ok(())
        }
        Command::Remove { name } => {
            let removed = catalog.remove_animal(name).await?;
            println!("Removed {}", removed.name);
            Ok(())
        }
        Command::Add(add) => {
            let animal = catalog.add_animal(draft_from_args(add)).await?;
            println!("Added {}", animal.name);
            Ok(())
        }
    }
}

async fn refresh(args: &Args, settings: &Settings, catalog: &mut Catalog, force: bool) -> Result<()> {
    if !force && !catalog.needs_refresh() {
        info!(animals = catalog.state().len(), "catalog is fresh; skipping refresh");
        println!("Catalog is up to date ({} animals)", catalog.state().len());
        return Ok(());
    }

    let Some(api_key) = settings.animals_api_key.as_deref() else {
        bail!(
            "Cannot refresh without an animal data API key\n  \
             Suggestion: pass --animals-key or set animals_api_key in the config file"
        );
    };
    let client = match settings.animals_base_url.as_deref() {
        Some(base) => NinjasClient::with_base_url(api_key, base, settings.timeouts)?,
        None => NinjasClient::new(api_key, settings.timeouts)?,
    };

    let progress = if terminal::progress_bar_enabled(args) {
        let bar = ProgressBar::new(LETTERS.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} letters {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    catalog.set_loading(true);
    catalog.set_error(None);
    let animals = load_all(&client, &LETTERS, |prefix| {
        progress.set_message(prefix.to_string());
        progress.inc(1);
    })
    .await;
    progress.finish_and_clear();

    if animals.is_empty() {
        catalog.set_loading(false);
        catalog.set_error(Some("No animals could be loaded".to_string()));
        bail!(
            "No animals could be loaded\n  \
             Suggestion: check the API key and network connection, then run with -v for details"
        );
    }

    catalog.set_animals(animals).await;
    catalog.set_loading(false);
    println!("Loaded {} animals", catalog.state().len());
    Ok(())
}

async fn resolve_image(settings: &Settings, store: Arc<dyn KeyValueStore>, subject: ImageSubject) -> Result<()> {
    let (Some(api_key), Some(engine_id)) = (
        settings.search_api_key.as_deref(),
        settings.search_engine_id.as_deref(),
    ) else {
        bail!(
            "Cannot resolve images without search credentials\n  \
             Suggestion: pass --search-key and --search-engine or set them in the config file"
        );
    };

    let mut search_config = SearchConfig::new(api_key, engine_id);
    if let Some(base) = &settings.search_base_url {
        search_config = search_config.with_base_url(base.clone());
    }
    let resolver = ImageResolver::new(
        Arc::new(GoogleImageSearch::new(search_config, settings.timeouts)?),
        Arc::new(HttpImageValidator::new(settings.timeouts)?),
        ImageCache::new(store),
    );

    let session = ImageSession::new(resolver);
    session.select(subject).await.context("Image resolution task failed")?;
    output::print_lines(&output::render_image_view(&session.current()));
    Ok(())
}

/// Maps `add` flags onto the manual-add form.
pub(crate) fn draft_from_args(add: &AddArgs) -> AnimalDraft {
    let mut taxonomy: BTreeMap<String, String> = add.taxonomy.iter().cloned().collect();
    if let Some(scientific) = &add.scientific_name {
        taxonomy.insert(SCIENTIFIC_NAME_KEY.to_string(), scientific.clone());
    }
    let characteristics = add
        .characteristics
        .iter()
        .map(|(key, value)| (key.clone(), parse_characteristic(value)))
        .collect();

    AnimalDraft {
        name: add.name.clone(),
        taxonomy,
        characteristics,
        locations: add.locations.clone(),
        image_url: add.image_url.clone(),
    }
}

fn parse_characteristic(raw: &str) -> Characteristic {
    match raw.parse::<f64>() {
        Ok(number) if number.is_finite() => Characteristic::Number(number),
        _ => Characteristic::Text(raw.to_string()),
    }
}

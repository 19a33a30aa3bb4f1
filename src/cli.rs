//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Browse, favorite and curate an animal catalog.
///
/// Animal records come from a remote data API and are kept on this device.
/// Each animal's photo is found through an image search and cached for a day.
#[derive(Parser, Debug)]
#[command(name = "animal-catalog")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/animal-catalog/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Catalog database file
    #[arg(long, value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Image search API key
    #[arg(long, value_name = "KEY", global = true)]
    pub search_key: Option<String>,

    /// Image search engine id
    #[arg(long, value_name = "ID", global = true)]
    pub search_engine: Option<String>,

    /// Animal data API key
    #[arg(long, value_name = "KEY", global = true)]
    pub animals_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load every animal from the data API when the catalog is stale
    Refresh {
        /// Reload even if the catalog is fresh
        #[arg(long)]
        force: bool,
    },

    /// List animals, 50 per page
    List {
        /// Page number (1-based)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Show only favorites
        #[arg(long)]
        favorites: bool,
    },

    /// Show one animal and resolve its photo
    Show {
        /// Animal name
        name: String,
    },

    /// Resolve a photo for any name
    Image {
        /// Common name
        common: String,

        /// Scientific name, searched first
        #[arg(long)]
        scientific: Option<String>,
    },

    /// Toggle an animal's favorite flag
    Favorite {
        /// Animal name
        name: String,
    },

    /// Remove an animal; later refreshes will not bring it back
    Remove {
        /// Animal name
        name: String,
    },

    /// Add an animal by hand
    Add(AddArgs),
}

#[derive(ClapArgs, Debug)]
pub struct AddArgs {
    /// Animal name (required, trimmed)
    #[arg(long)]
    pub name: String,

    /// Binomial name, stored as taxonomy.scientific_name
    #[arg(long)]
    pub scientific_name: Option<String>,

    /// Taxonomy entry as key=value (repeatable)
    #[arg(long = "taxonomy", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub taxonomy: Vec<(String, String)>,

    /// Characteristic as key=value (repeatable)
    #[arg(long = "characteristic", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub characteristics: Vec<(String, String)>,

    /// Location (repeatable)
    #[arg(long = "location", value_name = "LOCATION")]
    pub locations: Vec<String>,

    /// Image URL or data URI
    #[arg(long)]
    pub image_url: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

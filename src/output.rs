//! CLI output formatting.
//!
//! Renderers return lines so they can be tested without capturing stdout.

use animal_catalog_core::catalog::{Animal, CatalogState, Page};
use animal_catalog_core::image::ImageView;

const FAVORITE_MARK: &str = "★";

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub(crate) fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending an ellipsis if cut.
pub(crate) fn truncate_to_width(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    match width {
        0 => String::new(),
        1 => "…".to_string(),
        _ => {
            let mut output: String = text.chars().take(width - 1).collect();
            output.push('…');
            output
        }
    }
}

fn listing_line(animal: &Animal, favorite: bool, width: usize) -> String {
    let mark = if favorite { FAVORITE_MARK } else { " " };
    let line = match animal.scientific_name() {
        Some(scientific) => format!("{mark} {} ({scientific})", animal.name),
        None => format!("{mark} {}", animal.name),
    };
    truncate_to_width(&line, width)
}

pub(crate) fn render_page(page: &Page<'_>, state: &CatalogState, width: usize) -> Vec<String> {
    if state.is_empty() {
        return vec!["Catalog is empty. Run `animal-catalog refresh` or `animal-catalog add`.".to_string()];
    }
    let mut lines = vec![format!(
        "Page {}/{} ({} animals)",
        page.number,
        page.total_pages,
        state.len()
    )];
    lines.extend(
        page.animals
            .iter()
            .map(|animal| listing_line(animal, state.is_favorite(&animal.name), width)),
    );
    lines
}

pub(crate) fn render_favorites(state: &CatalogState, width: usize) -> Vec<String> {
    let favorites = state.favorite_animals();
    if favorites.is_empty() {
        return vec!["No favorites yet.".to_string()];
    }
    let mut lines = vec![format!("Favorites ({})", favorites.len())];
    lines.extend(favorites.iter().map(|animal| listing_line(animal, true, width)));
    lines
}

pub(crate) fn render_animal(animal: &Animal, favorite: bool) -> Vec<String> {
    let mut lines = vec![if favorite {
        format!("{} {FAVORITE_MARK}", animal.name)
    } else {
        animal.name.clone()
    }];

    if !animal.taxonomy.is_empty() {
        lines.push("Taxonomy:".to_string());
        lines.extend(animal.taxonomy.iter().map(|(key, value)| format!("  {key}: {value}")));
    }
    if !animal.characteristics.is_empty() {
        lines.push("Characteristics:".to_string());
        lines.extend(
            animal
                .characteristics
                .iter()
                .map(|(key, value)| format!("  {key}: {value}")),
        );
    }
    if !animal.locations.is_empty() {
        lines.push(format!("Locations: {}", animal.locations.join(", ")));
    }
    lines
}

pub(crate) fn render_image_view(view: &ImageView) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(error) = &view.error {
        lines.push(format!("Image: {error}"));
        return lines;
    }
    match &view.image_url {
        Some(url) => lines.push(format!("Image: {url}")),
        None => lines.push("Image: none could be loaded".to_string()),
    }
    if !view.candidates.is_empty() {
        lines.push(format!("Candidates ({}):", view.candidates.len()));
        lines.extend(view.candidates.iter().map(|candidate| {
            let score = candidate
                .score
                .map_or_else(|| "-".to_string(), |score| score.to_string());
            format!("  [{score:>4}] {}", candidate.link)
        }));
    }
    lines
}

pub(crate) fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

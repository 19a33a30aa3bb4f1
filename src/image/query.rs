//! Search query generation for one subject.

const SCIENTIFIC_TEMPLATES: [&str; 3] = [
    "{} animal real photo",
    "{} wildlife photography",
    "{} species",
];

const COMMON_TEMPLATES: [&str; 4] = [
    "{} animal real photo",
    "{} animal in habitat",
    "{} portrait photo",
    "{} wildlife",
];

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

/// Builds the ordered, deduplicated query list for a subject.
///
/// Scientific-name queries come first. Returns an empty list when both names
/// are absent or blank.
#[must_use]
pub fn generate_queries(common_name: Option<&str>, scientific_name: Option<&str>) -> Vec<String> {
    let scientific = non_blank(scientific_name)
        .into_iter()
        .flat_map(|sci| SCIENTIFIC_TEMPLATES.iter().map(move |t| t.replace("{}", sci)));
    let common = non_blank(common_name)
        .into_iter()
        .flat_map(|name| COMMON_TEMPLATES.iter().map(move |t| t.replace("{}", name)));

    let mut queries: Vec<String> = Vec::new();
    for query in scientific.chain(common) {
        if !queries.contains(&query) {
            queries.push(query);
        }
    }
    queries
}

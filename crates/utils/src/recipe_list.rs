//! Recipe list files
//!
//! Two formats are accepted: a JSON array of identifiers when the file name
//! ends in `.json`, otherwise plain text with one identifier per line where
//! blank lines and `#` comments are ignored.

use autobake_core::{Error, RecipeIdentifier, Result};
use std::collections::HashSet;
use std::path::Path;

/// Load and normalize a recipe list, dropping duplicates but keeping order
pub fn load_recipe_list(path: &Path) -> Result<Vec<RecipeIdentifier>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_system(path, "read recipe list", e))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let raw: Vec<String> = if is_json {
        serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!(
                "recipe list '{}' is not a JSON array of strings: {e}",
                path.display()
            ))
        })?
    } else {
        parse_plain_list(&content)
    };

    let mut seen = HashSet::new();
    let mut recipes = Vec::with_capacity(raw.len());
    for entry in raw {
        let identifier = RecipeIdentifier::new(&entry)?;
        if seen.insert(identifier.clone()) {
            recipes.push(identifier);
        } else {
            tracing::debug!(recipe = %identifier, "duplicate recipe in list ignored");
        }
    }
    Ok(recipes)
}

fn parse_plain_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

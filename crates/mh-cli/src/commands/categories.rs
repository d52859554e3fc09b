//! Categories command for listing and creating categories.

use std::io::Write;

use anyhow::{Context, Result};

use mh_db::Database;

/// Lists categories, marking the default one.
pub fn list<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let categories = db.categories()?;
    let default_id = db.settings()?.default_category_id;

    for category in categories {
        let marker = if category.id == default_id { " (default)" } else { "" };
        writeln!(writer, "{:>4}  {}{marker}", category.id, category.name)?;
    }
    Ok(())
}

/// Creates a category.
pub fn add<W: Write>(writer: &mut W, db: &mut Database, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("category name cannot be empty");
    }
    let id = db
        .add_category(name)
        .with_context(|| format!("failed to add category {name:?}"))?;
    writeln!(writer, "Added category {id}: {name}")?;
    Ok(id)
}

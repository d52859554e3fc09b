//! Settings command for showing and changing stored settings.

use std::io::Write;

use anyhow::{Context, Result};

use mh_core::Setting;
use mh_db::Database;

use super::util::category_name;

/// Prints all settings.
pub fn show<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let settings = db.settings()?;
    let categories = db.categories()?;
    writeln!(
        writer,
        "{} = {} ({})",
        Setting::DefaultCategory,
        settings.default_category_id,
        category_name(&categories, settings.default_category_id)
    )?;
    Ok(())
}

/// Changes the category used when none is given.
pub fn set_default_category<W: Write>(writer: &mut W, db: &mut Database, id: i64) -> Result<()> {
    db.update_setting(Setting::DefaultCategory, &id.to_string())
        .context("failed to update default category")?;
    let categories = db.categories()?;
    writeln!(
        writer,
        "Default category is now {id} ({})",
        category_name(&categories, id)
    )?;
    Ok(())
}

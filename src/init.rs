//! Project initialization for promptvc
//!
//! `promptvc init` creates the `.promptvc/` directory with a history database
//! and a commented config file.

use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db::Database;

const CONFIG_HEADER: &str = "# promptvc settings\n\
# [display] palette accepts: green, blue, magenta, yellow, cyan, red, bright_blue, bright_magenta\n\n";

/// Initialize promptvc in `dir`, returning the database path
pub fn init_project(dir: &Path) -> Result<PathBuf, String> {
    println!("\n{}", "Initializing promptvc...".cyan().bold());
    println!("   Directory: {}\n", dir.display());

    let state_dir = dir.join(".promptvc");
    create_dir_if_missing(&state_dir)?;

    // Opening the database creates the tables
    let db_path = state_dir.join("history.db");
    let existed = db_path.exists();
    Database::open_at(&db_path).map_err(|e| format!("Could not create history.db: {}", e))?;
    if existed {
        println!("   {} .promptvc/history.db (already exists)", "Skipping".yellow());
    } else {
        println!("   {} .promptvc/history.db", "Creating".green());
    }

    let config = toml::to_string_pretty(&Config::default())
        .map_err(|e| format!("Could not render config: {}", e))?;
    write_file_if_missing(
        &state_dir.join("config.toml"),
        &format!("{}{}", CONFIG_HEADER, config),
        ".promptvc/config.toml",
    )?;

    add_to_gitignore(dir)?;

    println!("\n{}", "promptvc initialized!".green().bold());
    println!("\nNext steps:");
    println!(
        "  1. Save a first version: {}",
        "promptvc commit -g <group> --prompt-file prompt.txt".cyan()
    );
    println!("  2. Inspect history: {}", "promptvc log -g <group>".cyan());
    println!();

    Ok(db_path)
}

fn create_dir_if_missing(path: &Path) -> Result<(), String> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| format!("Could not create {}: {}", path.display(), e))?;
        println!("   {} {}", "Creating".green(), path.display());
    }
    Ok(())
}

fn write_file_if_missing(path: &Path, content: &str, display_name: &str) -> Result<(), String> {
    if path.exists() {
        println!("   {} {} (already exists)", "Skipping".yellow(), display_name);
    } else {
        fs::write(path, content)
            .map_err(|e| format!("Could not write {}: {}", display_name, e))?;
        println!("   {} {}", "Creating".green(), display_name);
    }
    Ok(())
}

fn add_to_gitignore(dir: &Path) -> Result<(), String> {
    let gitignore_path = dir.join(".gitignore");
    let entry = ".promptvc/history.db";

    if gitignore_path.exists() {
        let existing = fs::read_to_string(&gitignore_path)
            .map_err(|e| format!("Could not read .gitignore: {}", e))?;

        if existing.lines().any(|line| line.trim() == entry || line.trim() == ".promptvc/") {
            return Ok(());
        }

        let new_content = format!("{}\n\n# promptvc history (local)\n{}\n", existing.trim_end(), entry);
        fs::write(&gitignore_path, new_content)
            .map_err(|e| format!("Could not update .gitignore: {}", e))?;
        println!("   {} .gitignore (added {})", "Updated".green(), entry);
    } else {
        let content = format!("# promptvc history (local)\n{}\n", entry);
        fs::write(&gitignore_path, content)
            .map_err(|e| format!("Could not create .gitignore: {}", e))?;
        println!("   {} .gitignore", "Creating".green());
    }

    Ok(())
}

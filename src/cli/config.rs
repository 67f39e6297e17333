//! Configuration inspection commands

use colored::Colorize;

use crate::config::{self, Settings};
use crate::error::Result;

/// Print the module configuration in its introspection shape.
pub fn dump(config_path: Option<&str>) -> Result<()> {
    let settings = Settings::load_at(config_path)?;
    println!("{}", config::dump(&settings.github)?);
    Ok(())
}

/// Load and validate the configuration, then summarize it.
pub fn check(config_path: Option<&str>) -> Result<()> {
    let path = Settings::resolve_path(config_path);
    let settings = Settings::load_from(&path)?;
    let github = &settings.github;

    println!("Config file: {}", path.display().to_string().cyan());
    if github.enabled {
        println!("{} Module enabled", "✓".green());
    } else {
        println!("{} Module disabled", "○".dimmed());
    }
    println!(
        "  Interval: {}s, time delay: {}s, event type: {}",
        github.interval_secs(),
        github.time_delay_secs(),
        github.event_type().as_str()
    );
    for credential in &github.organizations {
        println!("  Organization: {}", credential.org_name.bold());
    }
    println!("  Queue: {} ({} eps)", settings.queue.path.display(), settings.queue.max_eps);
    println!("  State: {}", settings.state.dir.display());
    println!("  API: {}", settings.api.base_url);

    println!("{}", "Configuration OK".green());
    Ok(())
}

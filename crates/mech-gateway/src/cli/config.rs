//! `mech config validate` / `mech config show` (grounded on the teacher's
//! `cli/config.rs`, trimmed of the keychain secret subcommands — no
//! credential store is part of this crate's scope).

use mech_domain::config::{Config, ConfigSeverity};

/// Parse and validate the config, printing any issues. Returns `true`
/// when no errors (warnings are still printed but do not fail).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}

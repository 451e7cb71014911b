//! `mech doctor` (grounded on the teacher's `cli/doctor.rs`): diagnostic
//! checks against the current configuration. The teacher's SerialMemory
//! reachability check is replaced with a check that the persisted-memory
//! directories (spec.md §6) are writable, since that collaborator is gone.

use mech_domain::config::{Config, ConfigSeverity};

use crate::bootstrap::workspace_root;

/// Run all diagnostic checks and print a summary. Returns `Ok(true)` when
/// every check passes, `Ok(false)` when at least one failed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("mech doctor");
    println!("===========\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_llm_providers(config, &mut all_passed);
    check_workspace(&mut all_passed);
    check_memory_dirs(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check("Config file exists", exists, if exists { config_path.to_owned() } else { format!("{config_path} not found (using defaults)") });
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check("Config validation", error_count == 0, format!("{} issue(s) ({error_count} error(s))", issues.len()));
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

fn check_llm_providers(config: &Config, all_passed: &mut bool) {
    let count = config.llm.providers.len();
    let ok = count > 0;
    print_check("LLM providers configured", ok, if ok { format!("{count} provider(s)") } else { "none configured".into() });
    if !ok {
        *all_passed = false;
    }
}

fn check_workspace(all_passed: &mut bool) {
    let path = workspace_root();
    let exists = path.exists();
    let writable = if exists {
        let probe = path.join(".mech_doctor_probe");
        let w = std::fs::write(&probe, b"probe").is_ok();
        let _ = std::fs::remove_file(&probe);
        w
    } else {
        false
    };

    let ok = exists && writable;
    let detail = match (exists, writable) {
        (true, true) => format!("{} (writable)", path.display()),
        (true, false) => format!("{} (not writable)", path.display()),
        _ => format!("{} (does not exist)", path.display()),
    };
    print_check("Workspace directory", ok, detail);
    if !ok {
        *all_passed = false;
    }
}

fn check_memory_dirs(config: &Config, all_passed: &mut bool) {
    let short_parent = config.memory.short_term_path.parent();
    let long_parent = config.memory.long_term_path.parent();
    let ensure = |p: Option<&std::path::Path>| -> bool {
        match p {
            Some(dir) => std::fs::create_dir_all(dir).is_ok(),
            None => false,
        }
    };
    let ok = ensure(short_parent) && ensure(long_parent);
    print_check(
        "Memory directories writable",
        ok,
        format!("{} / {}", config.memory.short_term_path.display(), config.memory.long_term_path.display()),
    );
    if !ok {
        *all_passed = false;
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}

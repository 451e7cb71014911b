use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mech_domain::config::{Config, ConfigSeverity};
use mech_gateway::bootstrap;
use mech_gateway::cli::{Cli, Command, ConfigCommand};
use mech_gateway::doctor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
        Some(Command::Run { message, r#loop, model, json }) => {
            init_tracing();
            let (config, _config_path) = mech_gateway::cli::load_config()?;
            run_once(Arc::new(config), message, r#loop, model, json).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = mech_gateway::cli::load_config()?;
            let passed = doctor::run(&config, &config_path).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = mech_gateway::cli::load_config()?;
            let valid = mech_gateway::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = mech_gateway::cli::load_config()?;
            mech_gateway::cli::config::show(&config);
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mech_gateway=debug,mech_core=debug")))
        .json()
        .init();
}

/// Run the MECH driver loop once for a CLI invocation (spec.md §4.E).
async fn run_once(config: Arc<Config>, message: String, loop_forever: bool, model: Option<String>, json_out: bool) -> anyhow::Result<()> {
    tracing::info!("mech starting");

    for issue in config.validate() {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }

    let state = bootstrap::bootstrap(config.clone())?;
    let mech_config = Arc::new(config.mech.clone().with_env_overrides());

    let overseer = config.agents.get("overseer").cloned().unwrap_or_else(default_overseer);

    let params = mech_core::MechDriverParams {
        agent_id: overseer.id.clone(),
        instructions: overseer.instructions.clone(),
        model_class: overseer.model_class.clone(),
        fixed_model: model.or_else(|| overseer.pinned_model.clone()),
        tool_choice: overseer.tool_choice.clone(),
        json_schema: overseer.json_schema.clone(),
        force_json: overseer.force_json,
        temperature: overseer.temperature,
        max_tool_calls: overseer.max_tool_calls,
        tool_names: overseer.tools.clone(),
        ai_name: mech_config.ai_name.clone(),
        active_projects: Vec::new(),
        active_tasks: Vec::new(),
    };

    let cancel = mech_core::CancelToken::new();
    let hooks: Arc<dyn mech_core::AgentHooks> = Arc::new(mech_core::NoopHooks);

    let result = mech_core::run_mech(
        params,
        hooks,
        message,
        loop_forever,
        state.providers.clone(),
        state.tools.clone(),
        mech_config,
        cancel,
        || 0.0,
        || false,
        |event| tracing::debug!(event = ?event, "mech_event"),
    )
    .await;

    if json_out {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        match &result {
            mech_core::MechResult::Complete { result, .. } => println!("{result}"),
            mech_core::MechResult::FatalError { error, .. } => eprintln!("fatal: {error}"),
        }
    }

    if result.is_fatal() {
        std::process::exit(1);
    }
    Ok(())
}

fn default_overseer() -> mech_domain::config::AgentConfig {
    mech_domain::config::AgentConfig {
        id: "overseer".into(),
        name: "Overseer".into(),
        instructions: "You are the Overseer, the persistent top-level agent of a MAGI system.".into(),
        model_class: "monologue".into(),
        pinned_model: None,
        tools: vec!["shell".into(), "read_file".into(), "write_file".into(), "list_files".into(), "calculator".into()],
        tool_choice: Default::default(),
        json_schema: None,
        force_json: false,
        temperature: None,
        max_tool_call_rounds_per_turn: 10,
        max_tool_calls: 8,
    }
}

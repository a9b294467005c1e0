use std::path::Path;
use console::style;
use crate::cli::commands::ModelsArgs;
use crate::errors::PilotError;
use crate::llm::catalog::PROVIDERS;
use crate::llm::create_provider;
use crate::llm::router::resolve_provider_id;
use super::{load_app_config, spinner};
use tracing::warn;

pub async fn handle_models(args: ModelsArgs, config_path: Option<&Path>, quiet: bool) -> Result<(), PilotError> {
    let config = load_app_config(config_path, &args.llm).await?;
    let active = resolve_provider_id(&config.llm.provider);

    for provider in PROVIDERS {
        let marker = if provider.id == active { style("*").green().bold() } else { style(" ") };
        println!("{} {} ({})", marker, style(provider.name).bold(), provider.id);
        println!("    base url: {}", provider.default_base_url);
        if !provider.env_var.is_empty() {
            println!("    api key:  ${}", provider.env_var);
        }
        for model in provider.models {
            let tag = if model.recommended { style(" recommended").dim().to_string() } else { String::new() };
            println!("    - {} {}{}", model.id, style(model.label).dim(), tag);
        }
    }

    if args.offline {
        return Ok(());
    }

    // Capability check: an unreachable backend is reported, not fatal.
    let provider = create_provider(&config.llm)?;
    let bar = spinner(quiet, format!("Probing {} backend", provider.provider_name()));
    let probe = provider.list_models().await;
    bar.finish_and_clear();
    match probe {
        Ok(models) => {
            println!();
            println!("{} serves {} model(s):", style(provider.provider_name()).cyan(), models.len());
            for model in models {
                let mark = if model == provider.model_name() { " (configured)" } else { "" };
                println!("    {}{}", model, mark);
            }
        }
        Err(e) => {
            warn!(provider = %provider.provider_name(), error = %e, "Backend unreachable");
            println!();
            println!("{} {} backend unreachable: {}", style("warning:").yellow(), provider.provider_name(), e);
        }
    }
    Ok(())
}

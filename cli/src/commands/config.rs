// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use conclave_core::domain::config::MissionConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file populated with defaults
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./conclave-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, force } => generate(&output, force).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. CONCLAVE_CONFIG_PATH: {}",
            std::env::var("CONCLAVE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./conclave-config.yaml");
        println!("  4. ~/.conclave/config.yaml");
        println!("  5. /etc/conclave/config.yaml");
        match MissionConfigManifest::discover_config() {
            Some(found) => println!("  Discovered: {}", found.display().to_string().green()),
            None => println!("  Discovered: {}", "(none, defaults apply)".dimmed()),
        }
        println!();
    }

    let config = MissionConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;
    let spec = &config.spec;

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Mission:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  Objective: {}", spec.mission.objective);
    println!("  Cycle interval: {}s", spec.mission.cycle_interval_seconds);
    println!("  Stagnation threshold: {}", spec.mission.stagnation_threshold);
    println!("  Max tool rounds: {}", spec.mission.max_tool_rounds);
    println!();

    println!("{}", "LLM Providers:".bold());
    for provider in &spec.llm_providers {
        let status = if provider.enabled { "enabled".green() } else { "disabled".dimmed() };
        println!("  {} ({}, {})", provider.name.bold(), provider.provider_type, status);
        println!("    Endpoint: {}", provider.endpoint);
        for model in &provider.models {
            println!("      - {} -> {}", model.alias, model.model);
        }
    }
    println!();

    println!("{}", "LLM Selection:".bold());
    println!("  Architect: {}", spec.llm_selection.architect);
    println!("  Specialist: {}", spec.llm_selection.specialist);
    println!("  Search: {}", spec.llm_selection.search);
    if let Some(fallback) = &spec.llm_selection.fallback_provider {
        println!("  Fallback provider: {}", fallback);
    }
    println!();

    println!("{}", "Runtime:".bold());
    println!("  Embedding: {:?} ({} dims)", spec.embedding.provider, spec.embedding.dimensions);
    println!(
        "  Sandbox: {}",
        if spec.sandbox.enabled {
            format!("{} ({}s timeout)", spec.sandbox.interpreter, spec.sandbox.timeout_seconds)
        } else {
            "disabled".to_string()
        }
    );
    println!("  Persistence: {:?} at {}", spec.persistence.backend, spec.persistence.path);
    println!("  Listen: {}:{}", spec.network.bind_address, spec.network.port);

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = MissionConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

async fn generate(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", output.display());
    }

    MissionConfigManifest::default()
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conclave-config.yaml");

        generate(&path, false).await.unwrap();
        validate(Some(path.clone())).await.unwrap();

        let manifest = MissionConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(manifest.spec.mission.max_tool_rounds, 12);
    }

    #[tokio::test]
    async fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conclave-config.yaml");
        std::fs::write(&path, "keep me").unwrap();

        assert!(generate(&path, false).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");

        generate(&path, true).await.unwrap();
        assert!(MissionConfigManifest::from_yaml_file(&path).is_ok());
    }

    #[tokio::test]
    async fn test_validate_rejects_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "apiVersion: [unterminated").unwrap();

        assert!(validate(Some(path)).await.is_err());
    }
}

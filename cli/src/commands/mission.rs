// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Mission commands
//!
//! `run` and `resume` drive the cycle scheduler in the foreground and print
//! cycle progress until the requested number of cycles completes, the
//! mission finishes, the scheduler halts, or Ctrl+C arrives. `status`,
//! `graph` and `reset` work directly on the persisted snapshot and never
//! contact an LLM provider.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, warn};

use conclave_core::application::mission_factory::{build_scheduler, create_persistence};
use conclave_core::application::scheduler::CycleScheduler;
use conclave_core::domain::config::MissionConfigManifest;
use conclave_core::domain::events::MissionEvent;
use conclave_core::domain::snapshot::MissionSnapshot;
use conclave_core::infrastructure::event_bus::{EventBus, EventBusError, EventReceiver};
use conclave_cortex::{KnowledgeGraph, KnowledgeNode};

#[derive(Args, Debug, Clone, Default)]
pub struct MissionArgs {
    /// Stop after this many completed cycles (default: run until done)
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,
}

/// Why the foreground follower stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    CycleLimit,
    Completed,
    Halted(String),
    Interrupted,
    Closed,
}

fn load_manifest(config_path: Option<PathBuf>) -> Result<MissionConfigManifest> {
    let manifest = MissionConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    manifest.validate().context("Configuration validation failed")?;
    Ok(manifest)
}

pub async fn run(config_path: Option<PathBuf>, args: MissionArgs) -> Result<()> {
    let manifest = load_manifest(config_path)?;
    let scheduler = build_scheduler(&manifest, EventBus::with_default_capacity())?;
    let events = scheduler.events().subscribe();

    println!("{} {}", "Objective:".bold(), manifest.spec.mission.objective);
    scheduler.start().await.context("Failed to start mission")?;

    drive(scheduler, events, args.cycles).await
}

pub async fn resume(config_path: Option<PathBuf>, args: MissionArgs) -> Result<()> {
    let manifest = load_manifest(config_path)?;
    let scheduler = build_scheduler(&manifest, EventBus::with_default_capacity())?;
    let events = scheduler.events().subscribe();

    let indexed = scheduler.resume().await.context("Failed to resume mission")?;
    println!("{}", format!("✓ Mission restored ({} nodes re-indexed)", indexed).green());

    drive(scheduler, events, args.cycles).await
}

async fn drive(scheduler: CycleScheduler, events: EventReceiver, cycles: Option<u64>) -> Result<()> {
    let outcome = follow(events, cycles).await;
    scheduler.stop().await;

    let status = scheduler.status().await;
    println!();
    println!(
        "{} cycle {} ({}), {} nodes, {} invalidated",
        "Mission".bold(),
        status.cycle,
        status.state,
        status.node_count,
        status.invalidated_count
    );

    match outcome {
        FollowOutcome::Halted(error) => anyhow::bail!("Mission halted: {}", error),
        FollowOutcome::Interrupted => {
            info!("Interrupted, mission stopped");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Prints events until a stop condition is met
pub async fn follow(mut events: EventReceiver, cycles: Option<u64>) -> FollowOutcome {
    let mut completed = 0u64;
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => return FollowOutcome::Interrupted,
        };

        let event = match event {
            Ok(event) => event,
            Err(EventBusError::Lagged(skipped)) => {
                warn!("Event stream lagged, {} events skipped", skipped);
                continue;
            }
            Err(_) => return FollowOutcome::Closed,
        };

        print_event(&event);
        match event {
            MissionEvent::CycleCompleted { .. } => {
                completed += 1;
                if cycles.is_some_and(|limit| completed >= limit) {
                    return FollowOutcome::CycleLimit;
                }
            }
            MissionEvent::MissionCompleted { .. } => return FollowOutcome::Completed,
            MissionEvent::SchedulerHalted { error, .. } => return FollowOutcome::Halted(error),
            _ => {}
        }
    }
}

fn print_event(event: &MissionEvent) {
    match event {
        MissionEvent::CycleStarted { cycle, .. } => {
            println!("{}", format!("── Cycle {} ──", cycle).cyan().bold());
        }
        MissionEvent::SpecialistOutput { agent_id, content, .. } => {
            println!("  {} {}", format!("[{}]", agent_id).blue(), first_line(content));
        }
        MissionEvent::ToolInvoked { tool, .. } => println!("  {} {}", "tool".dimmed(), tool),
        MissionEvent::ToolFailed { tool, error, .. } => {
            println!("  {} {}: {}", "tool failed".red(), tool, error);
        }
        MissionEvent::AgentDeployed { agent_id, .. } => println!("  {} {}", "+ agent".green(), agent_id),
        MissionEvent::AgentRetired { agent_id, reason, .. } => {
            println!("  {} {} ({})", "- agent".yellow(), agent_id, reason);
        }
        MissionEvent::KnowledgeAdded {
            node_id, created_by, ..
        } => println!("  {} {} by {}", "+ node".green(), node_id, created_by),
        MissionEvent::ChaosInterventionArmed { stagnation_counter, .. } => {
            println!("  {} after {} stagnant cycles", "chaos intervention armed".magenta(), stagnation_counter);
        }
        MissionEvent::BiasWarningRaised { label, share, .. } => {
            println!("  {} '{}' ({:.0}% of recent focus)", "bias".yellow(), label, share * 100.0);
        }
        MissionEvent::ObjectiveChanged { objective, .. } => println!("  {} {}", "objective".bold(), objective),
        MissionEvent::CycleCompleted {
            summary, strategic_focus, ..
        } => println!("  {} [{}] {}", "summary".bold(), strategic_focus, summary),
        MissionEvent::CycleAbandoned { cycle, .. } => println!("  {} cycle {}", "abandoned".yellow(), cycle),
        MissionEvent::MissionCompleted { summary, .. } => {
            println!("{} {}", "✓ Mission complete:".green().bold(), summary);
        }
        MissionEvent::SchedulerHalted { error, .. } => println!("{} {}", "✗ Halted:".red().bold(), error),
        _ => {}
    }
}

fn first_line(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().trim();
    if line.chars().count() > 100 {
        format!("{}…", line.chars().take(100).collect::<String>())
    } else {
        line.to_string()
    }
}

pub async fn reset(config_path: Option<PathBuf>, confirm: bool) -> Result<()> {
    if !confirm {
        anyhow::bail!("Reset deletes the knowledge graph and all agents; pass --yes to confirm");
    }
    let manifest = load_manifest(config_path)?;
    let persistence = create_persistence(&manifest.spec.persistence)?;
    persistence.purge().await.context("Failed to purge mission storage")?;

    println!("{}", "✓ Mission state cleared".green());
    Ok(())
}

async fn load_snapshot(config_path: Option<PathBuf>) -> Result<Option<MissionSnapshot>> {
    let manifest = load_manifest(config_path)?;
    let persistence = create_persistence(&manifest.spec.persistence)?;
    persistence.load().await.context("Failed to read mission snapshot")
}

pub async fn status(config_path: Option<PathBuf>) -> Result<()> {
    let Some(snapshot) = load_snapshot(config_path).await? else {
        println!("{}", "No mission snapshot. Start one with `conclave run`.".dimmed());
        return Ok(());
    };

    println!("{}", "Mission status:".bold());
    println!("  Objective: {}", snapshot.objective);
    println!("  Cycle: {}", snapshot.cycle_counter);
    println!("  Saved at: {}", snapshot.saved_at.to_rfc3339());
    println!("  Nodes: {}", snapshot.nodes.len());
    println!("  Stagnation: {}", snapshot.stagnation_counter);
    if let Some(vector) = &snapshot.research_vector {
        println!("  Research vector: {} (promise {:.2})", vector.direction, vector.promise);
    }
    if let Some(focus) = snapshot.focus_history.last() {
        println!("  Last focus: {}", focus);
    }
    println!();

    println!("{}", "Agents:".bold());
    for agent in &snapshot.agents {
        let metric = snapshot.metrics.get(&agent.id);
        let nodes = metric.map(|m| m.nodes_created).unwrap_or(0);
        let lifespan = agent
            .lifespan_cycles
            .map(|l| format!("{} cycles from {}", l, agent.creation_cycle))
            .unwrap_or_else(|| "permanent".to_string());
        println!("  {} ({}, {} nodes)", agent.id.to_string().bold(), lifespan, nodes);
    }
    Ok(())
}

pub async fn graph(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let Some(snapshot) = load_snapshot(config_path).await? else {
        println!("{}", "No mission snapshot.".dimmed());
        return Ok(());
    };
    let graph = KnowledgeGraph::restore(snapshot.nodes, snapshot.node_counter).context("Snapshot graph is corrupt")?;

    if json {
        let invalidated = graph.mark_invalidated();
        let nodes: Vec<serde_json::Value> = graph
            .all()
            .iter()
            .map(|node| -> Result<serde_json::Value, serde_json::Error> {
                let mut value = serde_json::to_value(node)?;
                if let Some(map) = value.as_object_mut() {
                    map.insert("invalidated".into(), invalidated.contains(&node.id).into());
                }
                Ok(value)
            })
            .collect::<Result<_, _>>()?;
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    let invalidated = graph.mark_invalidated();
    for node in graph.all() {
        let line = format_node(node, invalidated.contains(&node.id));
        if invalidated.contains(&node.id) {
            println!("{}", line.dimmed().strikethrough());
        } else {
            println!("{}", line);
        }
    }
    println!();
    println!("{} nodes, {} invalidated", graph.len(), invalidated.len());
    Ok(())
}

/// One table row: `H2  HYPOTHESIS  0.70  theorist  content  -> SUPPORTS:L1`
pub fn format_node(node: &KnowledgeNode, invalidated: bool) -> String {
    let mut line = format!(
        "{:<5} {:<20} {:.2}  {:<14} {}",
        node.id,
        node.node_type,
        node.promise_score,
        node.created_by,
        first_line(&node.content)
    );
    if !node.relations.is_empty() {
        let relations: Vec<String> = node.relations.iter().map(|r| r.to_string()).collect();
        line.push_str(&format!("  -> {}", relations.join(", ")));
    }
    if invalidated {
        line.push_str("  [invalidated]");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use conclave_cortex::{NodeDraft, NodeType, Relation};

    #[test]
    fn test_first_line_skips_blank_lines_and_truncates() {
        assert_eq!(first_line("\n\n  Gaps are even.\nMore"), "Gaps are even.");
        let long = "x".repeat(150);
        assert_eq!(first_line(&long).chars().count(), 101);
    }

    #[test]
    fn test_format_node_marks_invalidated() {
        let mut graph = KnowledgeGraph::new();
        let hypothesis = graph
            .create(NodeDraft::new(NodeType::Hypothesis, "All gaps are even", "theorist"))
            .unwrap();
        let refutation = graph
            .create(
                NodeDraft::new(NodeType::Refutation, "The gap 3-2 is odd", "skeptic")
                    .with_relation(Relation::new("REFUTES", hypothesis.clone())),
            )
            .unwrap();

        let invalidated = graph.mark_invalidated();
        let h = graph.get(&hypothesis).unwrap();
        let r = graph.get(&refutation).unwrap();

        let row = format_node(h, invalidated.contains(&h.id));
        assert!(row.starts_with("H1"));
        assert!(row.ends_with("[invalidated]"));

        let row = format_node(r, invalidated.contains(&r.id));
        assert!(row.contains("REFUTES:H1"));
        assert!(!row.contains("[invalidated]"));
    }

    #[tokio::test]
    async fn test_reset_requires_confirmation() {
        let err = reset(None, false).await.unwrap_err();
        assert!(err.to_string().contains("--yes"));
    }

    #[tokio::test]
    async fn test_follow_stops_after_cycle_limit() {
        let bus = EventBus::new(16);
        let receiver = bus.subscribe();
        for cycle in 1..=3 {
            bus.publish(MissionEvent::CycleCompleted {
                cycle,
                summary: format!("cycle {cycle}"),
                strategic_focus: "PARITY".into(),
                completed_at: Utc::now(),
            });
        }
        assert_eq!(follow(receiver, Some(2)).await, FollowOutcome::CycleLimit);
    }

    #[tokio::test]
    async fn test_follow_reports_halt() {
        let bus = EventBus::new(16);
        let receiver = bus.subscribe();
        bus.publish(MissionEvent::SchedulerHalted {
            error: "oracle unreachable".into(),
            halted_at: Utc::now(),
        });
        assert_eq!(
            follow(receiver, None).await,
            FollowOutcome::Halted("oracle unreachable".into())
        );
    }
}

//! Command-line interface for orderflow.
//!
//! Each subcommand runs one of the workflow's pipelines against the random
//! endpoint and prints what came out of it.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{self, ResolvedConfig};
use crate::core::OrderWorkflow;
use crate::domain::{create_order, WorkflowReport};

/// orderflow - Asynchronous order pipeline
#[derive(Parser, Debug)]
#[command(name = "orderflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Number of orders per run (overrides config)
    #[arg(short, long, global = true)]
    pub orders: Option<usize>,

    /// Worker threads in the pool (overrides config)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Confirm every order, push a notification for each, report failed pushes
    Notify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Confirm a batch and wait on the completion tracker
    Confirm,

    /// Create one order, then confirm it
    Compose,

    /// Look up item and shipping details in parallel and combine them
    Combine,

    /// Confirm a batch and print every identifier in submission order
    All,

    /// Confirm a batch and print whichever confirmation lands first
    Any,

    /// Run a chain whose middle stage may fail, then recover
    Recover {
        /// Recovery style
        #[arg(short, long, value_enum, default_value = "handle")]
        style: RecoveryStyle,

        /// Make the middle stage fail
        #[arg(long)]
        fail: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// How a failed stage is turned back into a value
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RecoveryStyle {
    /// Map both outcomes to a value
    Handle,

    /// Replace only the failure
    Exceptionally,
}

impl Cli {
    /// Resolve configuration with command-line overrides applied
    fn resolve_config(&self) -> Result<ResolvedConfig> {
        let mut resolved = config::config()?.clone();
        if let Some(orders) = self.orders {
            resolved.order_count = orders;
        }
        if let Some(workers) = self.workers {
            resolved.workers = workers;
        }
        Ok(resolved)
    }

    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = self.resolve_config()?;

        if let Commands::Config = self.command {
            show_config(&cfg);
            return Ok(());
        }

        let workflow = OrderWorkflow::from_config(&cfg)?;
        let count = cfg.order_count;

        match self.command {
            Commands::Notify { json } => {
                let report = workflow.confirm_and_notify(count).await?;
                print_report(&report, json)?;
            }
            Commands::Confirm => {
                let confirmed = workflow.confirm_batch_tracked(count).await?;
                println!("{}", confirmed);
            }
            Commands::Compose => {
                println!("{}", workflow.create_and_confirm().await?);
            }
            Commands::Combine => {
                let order = create_order();
                println!("{}", workflow.combine_item_and_shipping(&order).await?);
            }
            Commands::All => {
                let confirmed = workflow.confirm_all(count).await?;
                println!("{:?}", confirmed);
            }
            Commands::Any => {
                println!("{}", workflow.confirm_any(count).await?);
            }
            Commands::Recover { style, fail } => {
                let value = match style {
                    RecoveryStyle::Handle => workflow.recover_with_handle(fail).await?,
                    RecoveryStyle::Exceptionally => workflow.recover_exceptionally(fail).await?,
                };
                println!("{}", value);
            }
            Commands::Config => unreachable!("handled above"),
        }

        Ok(())
    }
}

/// Print the failed pushes of a confirm-and-notify run
fn print_report(report: &WorkflowReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Run ID:    {}", report.run_id);
    println!("Orders:    {}", report.order_count);
    println!("Confirmed: {}", report.confirmed);

    if report.failed_pushes.is_empty() {
        println!("All push messages delivered");
    } else {
        println!("\nFailed push messages:");
        println!("{:<16} {:<10}", "ORDER ID", "ATTEMPTS");
        println!("{}", "-".repeat(26));
        for result in &report.failed_pushes {
            println!("{:<16} {:<10}", result.order_id, result.attempts);
        }
    }

    for failure in &report.unit_failures {
        eprintln!("[{} failed: {}]", failure.order_id, failure.error);
    }

    Ok(())
}

fn show_config(cfg: &ResolvedConfig) {
    let budget = |max: Option<u32>| {
        max.map(|m| m.to_string())
            .unwrap_or_else(|| "unbounded".to_string())
    };

    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Pipeline:");
    println!("  Orders per run: {}", cfg.order_count);
    println!("  Workers:        {}", cfg.workers);
    println!();
    println!("Retry budgets:");
    println!(
        "  Confirm: {} attempts, {}ms apart",
        budget(cfg.confirm.max_attempts),
        cfg.confirm.interval_ms
    );
    println!(
        "  Push:    {} attempts, {}ms apart",
        budget(cfg.push.max_attempts),
        cfg.push.interval_ms
    );
    println!();
    println!("Endpoint:");
    println!("  Confirm success rate: {}", cfg.endpoint.confirm_success_rate);
    println!("  Push success rate:    {}", cfg.endpoint.push_success_rate);
    println!();
    println!("Lookups:");
    println!("  Item delay:     {}ms", cfg.lookups.item_delay_ms);
    println!("  Shipping delay: {}ms", cfg.lookups.shipping_delay_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recover_flags() {
        let cli = Cli::parse_from(["orderflow", "recover", "--style", "exceptionally", "--fail"]);

        match cli.command {
            Commands::Recover { style, fail } => {
                assert!(matches!(style, RecoveryStyle::Exceptionally));
                assert!(fail);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::parse_from(["orderflow", "notify", "--orders", "5", "-w", "2", "--json"]);

        assert_eq!(cli.orders, Some(5));
        assert_eq!(cli.workers, Some(2));
        assert!(matches!(cli.command, Commands::Notify { json: true }));
    }
}

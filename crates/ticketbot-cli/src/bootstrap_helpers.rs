use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ticketbot_runtime::{run_reaction_bridge, RoutingTable};
use ticketbot_slack::SlackApiClient;
use ticketbot_tracker::{DryRunTicketCreator, JiraTicketClient, TicketCreator};
use tracing::{info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::{Cli, CliLogFormat};

/// Installs the global subscriber. `RUST_LOG` overrides `level`.
pub fn init_tracing(level: &str, format: CliLogFormat) -> Result<()> {
    let directive = level
        .trim()
        .parse::<Directive>()
        .with_context(|| format!("invalid --log-level '{level}'"))?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let installed = match format {
        CliLogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .try_init(),
        CliLogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .try_init(),
    };
    installed.map_err(|error| anyhow!("failed to initialize tracing: {error}"))
}

pub fn build_routing_table(cli: &Cli) -> Result<RoutingTable> {
    let routing = RoutingTable::parse(&cli.user_jira_pairs, cli.default_email_domain.as_deref())
        .context("invalid --user-jira-pairs")?;
    if routing.is_empty() {
        warn!("no user routes configured; every ticket reaction will be rejected");
    }
    Ok(routing)
}

pub fn build_ticket_creator(cli: &Cli) -> Result<Arc<dyn TicketCreator>> {
    if cli.jira_dry_run {
        info!("jira dry-run enabled; tickets are logged, not created");
        if cli.browse_base_url().is_empty() {
            warn!(
                "no --jira-url or --jira-browse-url set; ticket replies will omit the browse link"
            );
        }
        return Ok(Arc::new(DryRunTicketCreator::new()));
    }
    let client =
        JiraTicketClient::new(cli.jira_client_config()).context("invalid jira configuration")?;
    Ok(Arc::new(client))
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let routing = build_routing_table(&cli)?;
    let tracker = build_ticket_creator(&cli)?;
    let slack = SlackApiClient::new(cli.slack_client_config())?;
    run_reaction_bridge(
        cli.bridge_config(),
        Arc::new(slack),
        tracker,
        Arc::new(routing),
    )
    .await
}

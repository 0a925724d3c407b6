use std::collections::BTreeMap;

use bookcart::prelude::*;
use bookcart_app::{
    context::AppContext,
    domain::sandbox::{SandboxService, SmokeResult, SmokeRun, WEBHOOK_EVENTS},
};
use clap::{Args, Subcommand};
use tabled::{Table, Tabled, settings::Style};

use super::render;

#[derive(Debug, Args)]
pub(crate) struct SandboxCommand {
    #[command(subcommand)]
    command: SandboxSubcommand,
}

#[derive(Debug, Subcommand)]
enum SandboxSubcommand {
    /// Show sandbox mode, supported methods and test cards
    Info,

    /// Simulate a payment provider webhook
    Webhook {
        /// Payment id
        payment: String,

        /// Event type
        #[arg(value_parser = clap::builder::PossibleValuesParser::new(WEBHOOK_EVENTS))]
        event: String,
    },
}

#[derive(Debug, Args)]
pub(crate) struct SmokeArgs {
    /// Book to order during the run
    #[arg(long, default_value_t = 1)]
    book: u64,

    /// Print the results as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Tabled)]
struct CardRow {
    #[tabled(rename = "Card")]
    name: String,

    #[tabled(rename = "Number")]
    number: String,
}

#[derive(Tabled)]
struct SmokeRow {
    #[tabled(rename = "Step")]
    test: &'static str,

    #[tabled(rename = "Result")]
    result: &'static str,

    #[tabled(rename = "HTTP")]
    status: String,

    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&SmokeResult> for SmokeRow {
    fn from(result: &SmokeResult) -> Self {
        Self {
            test: result.test,
            result: if result.success { "pass" } else { "FAIL" },
            status: result
                .status
                .map(|status| status.to_string())
                .unwrap_or_default(),
            detail: [result.error.as_deref(), result.note.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

pub(crate) async fn run(ctx: &AppContext, command: SandboxCommand) -> Result<(), String> {
    match command.command {
        SandboxSubcommand::Info => {
            let info = ctx
                .sandbox
                .info()
                .await
                .map_err(|error| render::failure("failed to read sandbox info", &error))?;

            println!("sandbox_mode: {}", info.sandbox_mode);

            if let Some(version) = &info.version {
                println!("version: {version}");
            }

            if let Some(environment) = &info.environment {
                println!("environment: {environment}");
            }

            println!("supported_methods: {}", info.supported_methods.join(", "));

            if let Some(url) = &info.webhook_url {
                println!("webhook_url: {url}");
            }

            println!("success cards:\n{}", cards(&info.test_cards.success));
            println!("decline cards:\n{}", cards(&info.test_cards.decline));
        }
        SandboxSubcommand::Webhook { payment, event } => {
            let reply = ctx
                .sandbox
                .simulate_webhook(PaymentId::new(payment), event)
                .await
                .map_err(|error| render::failure("webhook simulation failed", &error))?;

            println!(
                "{}",
                serde_json::to_string_pretty(&reply).map_err(|error| error.to_string())?
            );
        }
    }

    Ok(())
}

pub(crate) async fn smoke(ctx: &AppContext, args: SmokeArgs) -> Result<(), String> {
    let results = SmokeRun::new(ctx.api.clone(), BookId::new(args.book))
        .run()
        .await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).map_err(|error| error.to_string())?
        );
    } else {
        let rows = results.iter().map(SmokeRow::from);

        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    let failed = results.iter().filter(|result| !result.success).count();

    if failed > 0 {
        return Err(format!("{failed} of {} smoke steps failed", results.len()));
    }

    Ok(())
}

fn cards(cards: &BTreeMap<String, String>) -> String {
    if cards.is_empty() {
        return "  (none advertised)".to_string();
    }

    let rows = cards.iter().map(|(name, number)| CardRow {
        name: name.clone(),
        number: number.clone(),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

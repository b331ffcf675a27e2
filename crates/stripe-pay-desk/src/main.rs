//! stripe-pay desk CLI
//!
//! Opens a document from the server, shows its buttons, and clicks them.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stripe_pay_core::{ButtonAction, DeskContext, DocumentKind, DocumentView};
use stripe_pay_desk::{DeskConfig, HttpRemote, TerminalHost, open_form};

#[derive(Debug, Parser)]
#[command(author, version, about = "Stripe payment buttons for desk documents")]
struct Cli {
    /// Server base URL (overrides STRIPE_PAY_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Doctype {
    SalesInvoice,
    CollectiveInvoice,
    TransferDetails,
}

impl From<Doctype> for DocumentKind {
    fn from(doctype: Doctype) -> Self {
        match doctype {
            Doctype::SalesInvoice => Self::SalesInvoice,
            Doctype::CollectiveInvoice => Self::CollectiveInvoice,
            Doctype::TransferDetails => Self::TransferDetails,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the buttons shown for a document
    Buttons { doctype: Doctype, name: String },

    /// Click "Pay with Stripe" on an invoice
    Pay { doctype: Doctype, name: String },

    /// Click "View Stripe Session" on an invoice
    ViewSession { doctype: Doctype, name: String },

    /// Click "Check Status" on a transfer record
    CheckStatus { name: String },
}

impl Command {
    fn target(&self) -> (DocumentKind, &str, Option<ButtonAction>) {
        match self {
            Self::Buttons { doctype, name } => ((*doctype).into(), name, None),
            Self::Pay { doctype, name } => ((*doctype).into(), name, Some(ButtonAction::PayWithStripe)),
            Self::ViewSession { doctype, name } => {
                ((*doctype).into(), name, Some(ButtonAction::ViewStripeSession))
            }
            Self::CheckStatus { name } => (DocumentKind::TransferDetails, name, Some(ButtonAction::CheckStatus)),
        }
    }
}

fn print_buttons(view: &DocumentView) {
    let doc = view.doc();
    println!("{} {}", doc.doctype(), doc.name());

    let buttons = view.refresh();
    if buttons.is_empty() {
        println!("  (no buttons)");
    }
    for button in buttons {
        match button.group {
            Some(group) => println!("  {group} > {}", button.label),
            None => println!("  {}", button.label),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Logs go to stderr so they do not mix with the form output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = DeskConfig::from_env();
    if let Some(url) = cli.url.clone() {
        config.base_url = url;
    }
    tracing::debug!(server = %config.base_url, "Desk configured");

    let remote = Arc::new(HttpRemote::new(&config)?);
    let host = Arc::new(TerminalHost::new(std::io::stdout().is_terminal()));
    let ctx = DeskContext {
        remote: remote.clone(),
        store: remote.clone(),
        host: host.clone(),
        dashboard: config.dashboard.clone(),
    };

    let (kind, name, action) = cli.command.target();
    let mut view = ctx.view(open_form(remote.as_ref(), kind, name).await?);

    let Some(action) = action else {
        print_buttons(&view);
        return Ok(());
    };

    view.click(action).await?;

    for (doctype, name) in host.take_reloads() {
        let Some(kind) = DocumentKind::from_doctype(&doctype) else {
            continue;
        };
        print_buttons(&ctx.view(open_form(remote.as_ref(), kind, &name).await?));
    }

    Ok(())
}

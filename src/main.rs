mod api;
mod config;
mod consts;
mod db;
mod entities;
mod handler;
mod models;
mod telemetry;
mod ui;

#[cfg(test)]
mod testing;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use uuid::Uuid;

use crate::entities::InvoiceEntity;
use crate::handler::{Handler, InvoiceBackend};
use crate::ui::invoice_details::{
    InvoiceDetailsAction, InvoiceDetailsState, handle_input, render_invoice_details,
};

#[derive(Parser)]
#[command(name = "invoicer", version, about = "Create and edit invoices")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Apply pending migrations before serving
        #[arg(long)]
        migrate: bool,
    },
    /// Open the invoice form in the terminal
    Ui {
        /// Edit an existing invoice instead of starting a new one
        #[arg(long)]
        invoice: Option<Uuid>,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init()?;

    match cli.command {
        Command::Serve { migrate } => {
            telemetry::init_stdout();
            let db = db::init(config.database_url()?).await?;
            if migrate {
                db.migrate().await?;
            }
            api::serve(db, &config.bind_addr).await
        }
        Command::Migrate => {
            telemetry::init_stdout();
            let db = db::init(config.database_url()?).await?;
            db.migrate().await?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::Ui { invoice } => {
            telemetry::init_file(&config.log_file)?;
            let handler = Handler::new(&config.api_url)?;
            run_ui(&handler, invoice).await
        }
    }
}

async fn run_ui(handler: &Handler, invoice_id: Option<Uuid>) -> Result<()> {
    let (invoice, load_error) = match invoice_id {
        Some(id) => match InvoiceEntity::load(handler, id).await {
            Ok(invoice) => (invoice, None),
            Err(err) => {
                tracing::error!(invoice_id = %id, error = %err, "could not load invoice");
                (InvoiceEntity::new(), Some(err))
            }
        },
        None => (InvoiceEntity::new(), None),
    };

    let mut state = InvoiceDetailsState::load(handler, invoice).await;
    if let Some(err) = load_error {
        state.show_error(&err);
    }

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut state, handler).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app<B: Backend, H: InvoiceBackend + ?Sized>(
    terminal: &mut Terminal<B>,
    state: &mut InvoiceDetailsState,
    handler: &H,
) -> Result<()> {
    loop {
        terminal.draw(|f| render_invoice_details(f, state))?;

        if let Some(InvoiceDetailsAction::Quit) = handle_input(state, handler).await? {
            break;
        }
    }

    Ok(())
}

use bookcart_app::{config::AppConfig, context::AppContext, observability};
use clap::{Parser, Subcommand};

mod account;
mod books;
mod cart;
mod checkout;
mod orders;
mod render;
mod sandbox;

#[derive(Debug, Parser)]
#[command(name = "bookcart", about = "Bookshop cart and checkout client", long_about = None, version)]
pub(crate) struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Browse the catalog
    Books(books::BooksCommand),

    /// Show or change the cart held by the backend session
    Cart(cart::CartCommand),

    /// Sign in and remember the credential
    Login(account::LoginArgs),

    /// Create an account
    Register(account::RegisterArgs),

    /// Sign out and forget the credential
    Logout,

    /// Show who the backend thinks is signed in
    Whoami,

    /// List, inspect or cancel orders
    Orders(orders::OrdersCommand),

    /// Create an order and pay for it
    Checkout(Box<checkout::CheckoutArgs>),

    /// Read payment state
    Payment(checkout::PaymentCommand),

    /// Payment sandbox tools
    Sandbox(sandbox::SandboxCommand),

    /// Run the sandbox smoke test end to end
    Smoke(sandbox::SmokeArgs),
}

impl Cli {
    /// Parse arguments after loading `.env`, if present.
    pub(crate) fn load() -> Self {
        _ = dotenvy::dotenv();

        Self::parse()
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init(&self.config.logging).map_err(|error| error.to_string())?;

        let ctx = AppContext::from_config(&self.config)
            .await
            .map_err(|error| render::failure("failed to start", &error))?;

        match self.command {
            Commands::Books(command) => books::run(&ctx, command).await,
            Commands::Cart(command) => cart::run(&ctx, command).await,
            Commands::Login(args) => account::login(&ctx, args).await,
            Commands::Register(args) => account::register(&ctx, args).await,
            Commands::Logout => account::logout(&ctx).await,
            Commands::Whoami => account::whoami(&ctx).await,
            Commands::Orders(command) => orders::run(&ctx, command).await,
            Commands::Checkout(args) => checkout::run(&ctx, *args).await,
            Commands::Payment(command) => checkout::payment(&ctx, command).await,
            Commands::Sandbox(command) => sandbox::run(&ctx, command).await,
            Commands::Smoke(args) => sandbox::smoke(&ctx, args).await,
        }
    }
}

use bookcart::prelude::*;
use bookcart_app::{context::AppContext, domain::carts::CartsServiceError};
use clap::{Args, Subcommand};

use super::render;

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Show the cart
    Show,

    /// Add copies of a book
    Add {
        /// Book id
        book: u64,

        /// Copies to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },

    /// Set the quantity of a line
    Update {
        /// Book id
        book: u64,

        /// New quantity
        quantity: u32,
    },

    /// Remove a line
    Remove {
        /// Book id
        book: u64,
    },

    /// Empty the cart
    Clear,
}

pub(crate) async fn run(ctx: &AppContext, command: CartCommand) -> Result<(), String> {
    let carts = &ctx.carts;

    let cart = match command.command {
        CartSubcommand::Show => carts.load_cart().await,
        CartSubcommand::Add { book, quantity } => {
            carts.add_item(BookId::new(book), quantity).await
        }
        CartSubcommand::Update { book, quantity } => {
            carts.update_quantity(BookId::new(book), quantity).await
        }
        CartSubcommand::Remove { book } => carts.remove_item(BookId::new(book)).await,
        CartSubcommand::Clear => {
            carts.load_cart().await.map_err(|error| failure(&error))?;

            if !carts.can_clear() {
                println!("cart is already empty");
                return Ok(());
            }

            carts.clear_cart().await
        }
    }
    .map_err(|error| failure(&error))?;

    println!("{}", render::cart(&cart));

    Ok(())
}

fn failure(error: &CartsServiceError) -> String {
    match error {
        CartsServiceError::Resync(_) => {
            render::failure("cart was changed but could not be reloaded", error)
        }
        _ => render::failure("cart update failed", error),
    }
}

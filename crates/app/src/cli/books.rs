use bookcart::prelude::*;
use bookcart_app::{api::BookQuery, context::AppContext, domain::catalog::CatalogService};
use clap::{Args, Subcommand};

use super::render;

#[derive(Debug, Args)]
pub(crate) struct BooksCommand {
    #[command(subcommand)]
    command: BooksSubcommand,
}

#[derive(Debug, Subcommand)]
enum BooksSubcommand {
    /// List books, optionally filtered and ordered
    List(ListBooksArgs),

    /// Show a single book
    Show(ShowBookArgs),
}

#[derive(Debug, Args)]
struct ListBooksArgs {
    /// Free-text search over title and description
    #[arg(long)]
    search: Option<String>,

    /// Ordering field, prefix with '-' to reverse (e.g. -Price, Title)
    #[arg(long, allow_hyphen_values = true)]
    ordering: Option<String>,
}

#[derive(Debug, Args)]
struct ShowBookArgs {
    /// Book id
    id: u64,
}

pub(crate) async fn run(ctx: &AppContext, command: BooksCommand) -> Result<(), String> {
    match command.command {
        BooksSubcommand::List(args) => {
            let books = ctx
                .catalog
                .list_books(BookQuery {
                    search: args.search,
                    ordering: args.ordering,
                })
                .await
                .map_err(|error| render::failure("failed to list books", &error))?;

            if books.is_empty() {
                println!("no books found");
            } else {
                println!("{}", render::books(&books));
            }
        }
        BooksSubcommand::Show(args) => {
            let book = ctx
                .catalog
                .get_book(BookId::new(args.id))
                .await
                .map_err(|error| render::failure("failed to load book", &error))?;

            println!("id: {}", book.id);
            println!("title: {}", book.title);
            println!("price: {}", render::money(book.price));
            println!("stock: {}", book.stock);

            if let Some(date) = &book.publication_date {
                println!("published: {date}");
            }

            if let Some(description) = &book.description {
                println!("description: {description}");
            }
        }
    }

    Ok(())
}

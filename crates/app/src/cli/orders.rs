use bookcart::prelude::*;
use bookcart_app::{
    api::PaymentStatusReport,
    context::AppContext,
    domain::orders::{OrdersService, OrdersServiceError},
};
use clap::{Args, Subcommand};

use super::render;

#[derive(Debug, Args)]
pub(crate) struct OrdersCommand {
    #[command(subcommand)]
    command: OrdersSubcommand,
}

#[derive(Debug, Subcommand)]
enum OrdersSubcommand {
    /// List your orders, newest first
    List,

    /// Show one order with its lines
    Show {
        /// Order id
        id: u64,
    },

    /// Cancel a pending or confirmed order
    Cancel {
        /// Order id
        id: u64,
    },

    /// Show the latest payment recorded against an order
    Payment {
        /// Order id
        id: u64,
    },
}

pub(crate) async fn run(ctx: &AppContext, command: OrdersCommand) -> Result<(), String> {
    match command.command {
        OrdersSubcommand::List => {
            let orders = ctx.orders.list_orders().await.map_err(failure)?;

            if orders.is_empty() {
                println!("no orders yet");
            } else {
                println!("{}", render::orders(&orders));
            }
        }
        OrdersSubcommand::Show { id } => {
            let order = ctx
                .orders
                .get_order(OrderId::new(id))
                .await
                .map_err(failure)?;

            println!("order_id: {}", order.order_id);
            println!("status: {}", order.status);

            if let Some(date) = order.order_date {
                println!("placed: {date}");
            }

            println!("total: {}", render::money(order.total_amount));
            println!("{}", render::order_lines(&order.items));
        }
        OrdersSubcommand::Cancel { id } => {
            let message = ctx
                .orders
                .cancel_order(OrderId::new(id))
                .await
                .map_err(failure)?;

            println!("{message}");
        }
        OrdersSubcommand::Payment { id } => {
            let report = ctx
                .orders
                .order_payment(OrderId::new(id))
                .await
                .map_err(failure)?;

            print_report(&report);
        }
    }

    Ok(())
}

pub(crate) fn print_report(report: &PaymentStatusReport) {
    println!("payment_id: {}", report.payment_id);
    println!("status: {}", report.status);

    if let Some(transaction_id) = &report.transaction_id {
        println!("transaction_id: {transaction_id}");
    }

    if let Some(date) = report.payment_date {
        println!("payment_date: {date}");
    }

    if let Some(message) = &report.message {
        println!("message: {message}");
    }
}

fn failure(error: OrdersServiceError) -> String {
    render::failure("orders request failed", &error)
}

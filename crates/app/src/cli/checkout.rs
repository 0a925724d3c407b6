use bookcart::prelude::*;
use bookcart_app::{
    api::ChargeReceipt, context::AppContext, domain::checkout::CheckoutServiceError,
};
use clap::{Args, Subcommand};

use super::{orders::print_report, render};

const SANDBOX_HOLDER: &str = "Test User";
const SANDBOX_EXPIRY: &str = "12/2030";
const SANDBOX_CVV: &str = "123";

#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    /// Order line as BOOK_ID or BOOK_ID:QTY; repeat for more lines
    #[arg(long = "book", value_name = "ID[:QTY]", value_parser = parse_line)]
    books: Vec<DraftLine>,

    /// Order whatever is in the cart
    #[arg(long, conflicts_with = "books")]
    from_cart: bool,

    /// Retry payment against an order created earlier instead of creating one
    #[arg(long, value_name = "ORDER_ID", conflicts_with_all = ["books", "from_cart"])]
    order: Option<u64>,

    /// Name to put on the order
    #[arg(long)]
    customer_name: Option<String>,

    /// Payment method
    #[arg(long, value_parser = parse_method, default_value = "credit_card")]
    method: PaymentMethod,

    #[command(flatten)]
    card: CardArgs,
}

#[derive(Debug, Args)]
struct CardArgs {
    /// Use a sandbox test card by name (e.g. success_visa, decline_insufficient)
    #[arg(long, value_parser = parse_test_card, conflicts_with = "card_number")]
    test_card: Option<TestCard>,

    /// Card number
    #[arg(long)]
    card_number: Option<String>,

    /// Name on the card
    #[arg(long)]
    card_holder: Option<String>,

    /// Expiry as MM/YY or MM/YYYY
    #[arg(long)]
    card_expiry: Option<String>,

    /// Card verification code
    #[arg(long)]
    card_cvv: Option<String>,
}

impl CardArgs {
    /// Card fields, with sandbox defaults filled in when a test card is named.
    fn details(self) -> CardDetails {
        let sandbox = self.test_card.is_some();
        let fallback = |value: Option<String>, default: &str| {
            value.unwrap_or_else(|| if sandbox { default.to_string() } else { String::new() })
        };

        CardDetails {
            number: self
                .test_card
                .map(|card| card.number.to_string())
                .or(self.card_number)
                .unwrap_or_default(),
            holder: fallback(self.card_holder, SANDBOX_HOLDER),
            expiry: fallback(self.card_expiry, SANDBOX_EXPIRY),
            cvv: fallback(self.card_cvv, SANDBOX_CVV),
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct PaymentCommand {
    #[command(subcommand)]
    command: PaymentSubcommand,
}

#[derive(Debug, Subcommand)]
enum PaymentSubcommand {
    /// Read the current status of a payment
    Status {
        /// Payment id
        id: String,
    },
}

pub(crate) async fn run(ctx: &AppContext, args: CheckoutArgs) -> Result<(), String> {
    let payment = if args.method.requires_card() {
        PaymentDetails::card(args.method, args.card.details())
    } else {
        PaymentDetails::without_card(args.method)
    };

    payment
        .validate()
        .map_err(|error| render::failure("payment details rejected", &error))?;

    let result = if let Some(order_id) = args.order {
        ctx.checkout
            .resume_order(OrderId::new(order_id))
            .map_err(|error| render::failure("cannot resume order", &error))?;

        ctx.checkout.charge(payment).await
    } else {
        let mut draft = if args.from_cart {
            let cart = ctx
                .carts
                .load_cart()
                .await
                .map_err(|error| render::failure("failed to load cart", &error))?;

            OrderDraft::from_cart(&cart)
        } else {
            args.books
                .iter()
                .fold(OrderDraft::new(), |draft, line| {
                    draft.with_line(line.book_id, line.quantity)
                })
        };

        if draft.is_empty() {
            return Err("nothing to order: pass --book ID[:QTY] or --from-cart".to_string());
        }

        if let Some(name) = args.customer_name {
            draft = draft.with_customer_name(name);
        }

        ctx.checkout.checkout(draft, payment).await
    };

    match result {
        Ok(receipt) => {
            print_receipt(&receipt);
            println!("checkout: {}", ctx.checkout.state().name());

            Ok(())
        }
        Err(CheckoutServiceError::Charge { reason, .. }) => {
            let retry = ctx
                .checkout
                .order_id()
                .map(|order_id| format!("; retry with `bookcart checkout --order {order_id}`"))
                .unwrap_or_default();

            Err(format!("payment failed: {reason}{retry}"))
        }
        Err(error) => Err(render::failure("checkout failed", &error)),
    }
}

pub(crate) async fn payment(ctx: &AppContext, command: PaymentCommand) -> Result<(), String> {
    match command.command {
        PaymentSubcommand::Status { id } => {
            let report = ctx
                .checkout
                .payment_status(PaymentId::new(id))
                .await
                .map_err(|error| render::failure("failed to read payment", &error))?;

            print_report(&report);
        }
    }

    Ok(())
}

fn print_receipt(receipt: &ChargeReceipt) {
    if let Some(order_id) = receipt.order_id {
        println!("order_id: {order_id}");
    }

    println!("payment_id: {}", receipt.payment_id);
    println!("status: {}", receipt.status);

    if let Some(amount) = receipt.amount {
        println!("amount: {}", render::money(amount));
    }

    if let Some(transaction_id) = &receipt.transaction_id {
        println!("transaction_id: {transaction_id}");
    }

    if let Some(message) = &receipt.message {
        println!("message: {message}");
    }
}

fn parse_line(raw: &str) -> Result<DraftLine, String> {
    let (book, quantity) = raw.split_once(':').unwrap_or((raw, "1"));

    let book_id = book
        .trim()
        .parse::<u64>()
        .map_err(|error| format!("invalid book id {book:?}: {error}"))?;

    let quantity = quantity
        .trim()
        .parse::<u32>()
        .map_err(|error| format!("invalid quantity {quantity:?}: {error}"))
        .and_then(|quantity| Quantity::new(quantity).map_err(|error| error.to_string()))?;

    Ok(DraftLine {
        book_id: BookId::new(book_id),
        quantity,
    })
}

fn parse_method(raw: &str) -> Result<PaymentMethod, String> {
    PaymentMethod::ALL
        .into_iter()
        .find(|method| method.as_str() == raw)
        .ok_or_else(|| {
            let known: Vec<&str> = PaymentMethod::ALL.map(PaymentMethod::as_str).to_vec();

            format!("unknown payment method {raw:?}, expected one of {}", known.join(", "))
        })
}

fn parse_test_card(raw: &str) -> Result<TestCard, String> {
    TestCard::ALL
        .into_iter()
        .find(|card| card.name == raw)
        .or_else(|| TestCard::lookup(raw))
        .ok_or_else(|| format!("unknown test card {raw:?}"))
}

use bookcart_app::{auth::AuthService, context::AppContext};
use clap::Args;

use super::render;

#[derive(Debug, Args)]
pub(crate) struct LoginArgs {
    /// Account email
    #[arg(long)]
    email: String,

    /// Account password
    #[arg(long, env = "BOOKCART_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Debug, Args)]
pub(crate) struct RegisterArgs {
    /// Display username
    #[arg(long)]
    username: String,

    /// Account email
    #[arg(long)]
    email: String,

    /// Account password
    #[arg(long, env = "BOOKCART_PASSWORD", hide_env_values = true)]
    password: String,
}

pub(crate) async fn login(ctx: &AppContext, args: LoginArgs) -> Result<(), String> {
    let customer = ctx
        .auth
        .login(args.email, args.password)
        .await
        .map_err(|error| render::failure("login failed", &error))?;

    println!("signed in as {} <{}>", customer.display_name(), customer.email);

    if ctx.session.bearer().is_none() {
        println!("the backend issued no token; only cookie-backed calls will be authenticated");
    }

    Ok(())
}

pub(crate) async fn register(ctx: &AppContext, args: RegisterArgs) -> Result<(), String> {
    let customer = ctx
        .auth
        .register(args.username, args.email, args.password)
        .await
        .map_err(|error| render::failure("registration failed", &error))?;

    println!("customer_id: {}", customer.customer_id);
    println!("email: {}", customer.email);
    println!("account created; sign in with `bookcart login`");

    Ok(())
}

pub(crate) async fn logout(ctx: &AppContext) -> Result<(), String> {
    ctx.auth
        .logout()
        .await
        .map_err(|error| render::failure("server-side logout failed, signed out locally", &error))?;

    println!("signed out");

    Ok(())
}

pub(crate) async fn whoami(ctx: &AppContext) -> Result<(), String> {
    let customer = ctx
        .auth
        .current_customer()
        .await
        .map_err(|error| render::failure("failed to ask the backend", &error))?;

    match customer {
        Some(customer) => println!("{} <{}>", customer.display_name(), customer.email),
        None if ctx.session.is_authenticated() => {
            println!("the backend does not recognise the remembered credential");
        }
        None => println!("not signed in"),
    }

    Ok(())
}

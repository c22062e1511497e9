//! Balances Demo
//!
//! Lists the balances of a profile, then looks one currency up through the
//! cached listing. Configuration comes from the `WISE_*` environment
//! variables; command-line flags override them.
//!
//! # Usage
//!
//! ```bash
//! # Against the sandbox
//! WISE_API_KEY=... cargo run --example balances_demo -- --profile 12345
//!
//! # Look up one currency and print debug logs
//! RUST_LOG=debug WISE_API_KEY=... cargo run --example balances_demo -- \
//!     --profile 12345 --currency EUR
//!
//! # Through an outbound proxy
//! cargo run --example balances_demo -- \
//!     --api-key ... --profile 12345 --proxy http://localhost:3128
//! ```

use anyhow::Result;
use clap::Parser;

use borderless::{BalanceType, ClientConfig, Environment, Wise};

#[derive(Parser, Debug)]
#[command(author, version, about = "Wise Balances Demo")]
struct Args {
    /// API token
    #[arg(long, env = "WISE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Target environment (sandbox or live)
    #[arg(long, env = "WISE_ENVIRONMENT", default_value = "sandbox")]
    environment: Environment,

    /// Profile whose balances are listed
    #[arg(long)]
    profile: u64,

    /// Currency to look up in the cached listing
    #[arg(long)]
    currency: Option<String>,

    /// Include savings jars
    #[arg(long)]
    all_types: bool,

    /// Outbound proxy URL
    #[arg(long, env = "WISE_PROXY")]
    proxy: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    println!("Wise Balances Demo");
    println!("==================");
    println!("Environment: {}", args.environment);
    println!("Profile: {}", args.profile);
    println!();

    let mut config = ClientConfig::new(args.api_key).with_environment(args.environment);
    if let Some(proxy) = args.proxy.filter(|proxy| !proxy.is_empty()) {
        config = config.with_proxy(proxy);
    }

    let wise = Wise::new(config)?;
    let balance_type = (!args.all_types).then_some(BalanceType::Standard);
    let balances = wise.balances().list(args.profile, balance_type).await?;

    for balance in balances.as_array().into_iter().flatten() {
        let currency = balance["currency"].as_str().unwrap_or("???");
        let amount = &balance["amount"]["value"];
        let kind = balance["type"].as_str().unwrap_or("");
        println!("  {currency:<4} {amount:>14} {kind}");
    }

    if let Some(currency) = args.currency {
        println!();
        match wise.balances().by_currency(args.profile, &currency).await? {
            Some(balance) => println!("{currency} balance:\n{balance:#}"),
            None => println!("No {currency} balance on this profile"),
        }
    }

    Ok(())
}

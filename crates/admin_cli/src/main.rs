use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::store::JsonFileBackend;
use engine::{
    AccountKind, Bank, CloseAccountStatus, LoanDecision, Money, OpenAccountStatus, Principal, Role,
};
use rust_decimal::Decimal;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "teller_admin")]
#[command(about = "Command-line teller for the banking engine")]
struct Cli {
    /// Username to run as (also read from `TELLER_USER`).
    #[arg(long, env = "TELLER_USER", global = true)]
    username: Option<String>,

    /// Password for `--username` (also read from `TELLER_PASSWORD`).
    #[arg(long, env = "TELLER_PASSWORD", global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new login.
    Register(RegisterArgs),
    Account(Account),
    Loan(Loan),
    Stock(StockCmd),
    Calendar(Calendar),
    /// All journal entries booked on a date (defaults to today). Manager only.
    Report {
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },
    /// List registered customers. Manager only.
    Customers,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    new_username: String,
    #[arg(long)]
    new_password: String,
    /// `customer` or `manager`.
    #[arg(long, default_value = "customer")]
    role: String,
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Open an account; `amount` funds it (e.g. "1200 USD").
    Open { kind: String, amount: String },
    /// Close an account, paying the closing fee.
    Close { kind: String },
    Deposit { kind: String, amount: String },
    Withdraw { kind: String, amount: String },
    /// Convert a balance slice into another currency.
    Exchange {
        kind: String,
        amount: String,
        into: String,
    },
    Transfer {
        from_kind: String,
        to_user: String,
        to_kind: String,
        amount: String,
    },
    /// Balances per account (defaults to the caller's own).
    Balances {
        #[arg(long)]
        user: Option<String>,
    },
    /// Journal entries touching one account.
    History {
        kind: String,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Args, Debug)]
struct Loan {
    #[command(subcommand)]
    command: LoanCommand,
}

#[derive(Subcommand, Debug)]
enum LoanCommand {
    /// File a loan request backed by a named collateral (USD values).
    Request {
        collateral: String,
        value: Decimal,
        amount: Decimal,
    },
    /// Pending requests. Manager only.
    Pending,
    /// Review a pending request. Manager only.
    Approve { owner: String, collateral: String },
    Reject { owner: String, collateral: String },
    /// Settle an active loan in full.
    Pay { collateral: String, amount: String },
    /// Active loans (defaults to the caller's own).
    Active {
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Args, Debug)]
struct StockCmd {
    #[command(subcommand)]
    command: StockCommand,
}

#[derive(Subcommand, Debug)]
enum StockCommand {
    /// List a new stock. Manager only.
    Add { name: String, price: Decimal },
    /// Reprice a listed stock. Manager only.
    Price { name: String, price: Decimal },
    /// Remove a stock, force-liquidating holders. Manager only.
    Delist { name: String },
    Buy { name: String, quantity: u32 },
    /// Sell units; omit `quantity` to sell the whole holding.
    Sell {
        name: String,
        quantity: Option<u32>,
    },
    /// The price board.
    List,
    /// Holdings and profit (defaults to the caller's own).
    Portfolio {
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Args, Debug)]
struct Calendar {
    #[command(subcommand)]
    command: CalendarCommand,
}

#[derive(Subcommand, Debug)]
enum CalendarCommand {
    /// Advance the bank calendar one day. Manager only.
    Day,
    /// Jump one month and accrue interest. Manager only.
    Month,
}

type CliError = Box<dyn Error + Send + Sync>;

fn parse_role(raw: &str) -> Result<Role, CliError> {
    match raw {
        "customer" => Ok(Role::Customer),
        "manager" => Ok(Role::Manager),
        other => Err(format!("unsupported role: {other}").into()),
    }
}

fn parse_kind(raw: &str) -> Result<AccountKind, CliError> {
    Ok(AccountKind::try_from(raw)?)
}

fn login(bank: &Bank, cli: &Cli) -> Result<Principal, CliError> {
    let (Some(username), Some(password)) = (&cli.username, &cli.password) else {
        return Err("missing --username/--password (or TELLER_USER/TELLER_PASSWORD)".into());
    };
    Ok(bank.login(username, password)?)
}

fn main() -> Result<(), CliError> {
    let settings = settings::Settings::new()?;
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "teller_admin={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let cli = Cli::parse();
    let mut bank = Bank::builder()
        .backend(Box::new(JsonFileBackend::new(&settings.snapshot.path)))
        .build()?;

    match &cli.command {
        Command::Register(args) => {
            let role = parse_role(&args.role)?;
            bank.register(&args.new_username, &args.new_password, role)?;
            println!("registered {}: {}", args.role, args.new_username);
        }
        Command::Account(account) => run_account(&mut bank, &cli, &account.command)?,
        Command::Loan(loan) => run_loan(&mut bank, &cli, &loan.command)?,
        Command::Stock(stock) => run_stock(&mut bank, &cli, &stock.command)?,
        Command::Calendar(calendar) => {
            let principal = login(&bank, &cli)?;
            let date = match calendar.command {
                CalendarCommand::Day => bank.advance_day(&principal)?,
                CalendarCommand::Month => bank.advance_month(&principal)?,
            };
            println!("calendar advanced to {date}");
        }
        Command::Report { date } => {
            let principal = login(&bank, &cli)?;
            let date = date.unwrap_or_else(|| bank.current_date());
            for tx in bank.daily_report(&principal, date)? {
                println!("{}  {:>14}  {} -> {}", tx.date, tx.amount.to_string(), tx.sender, tx.receiver);
            }
        }
        Command::Customers => {
            let principal = login(&bank, &cli)?;
            for username in bank.customers(&principal)? {
                println!("{username}");
            }
        }
    }

    Ok(())
}

fn run_account(bank: &mut Bank, cli: &Cli, command: &AccountCommand) -> Result<(), CliError> {
    let principal = login(bank, cli)?;
    match command {
        AccountCommand::Open { kind, amount } => {
            let status = bank.open_account(&principal, parse_kind(kind)?, amount.parse::<Money>()?)?;
            if status != OpenAccountStatus::Opened {
                eprintln!("open refused: {status:?}");
                std::process::exit(1);
            }
            println!("opened {kind} account for {}", principal.username);
        }
        AccountCommand::Close { kind } => {
            let status = bank.close_account(&principal, parse_kind(kind)?)?;
            if status != CloseAccountStatus::Closed {
                eprintln!("close refused: {status:?}");
                std::process::exit(1);
            }
            println!("closed {kind} account");
        }
        AccountCommand::Deposit { kind, amount } => {
            bank.deposit(&principal, parse_kind(kind)?, amount.parse::<Money>()?)?;
            println!("deposited {amount}");
        }
        AccountCommand::Withdraw { kind, amount } => {
            bank.withdraw(&principal, parse_kind(kind)?, amount.parse::<Money>()?)?;
            println!("withdrew {amount}");
        }
        AccountCommand::Exchange { kind, amount, into } => {
            let source = amount.parse::<Money>()?;
            let target = engine::Currency::try_from(into.as_str())?;
            bank.exchange_currency(&principal, parse_kind(kind)?, source, target)?;
            println!("exchanged {source} into {target}");
        }
        AccountCommand::Transfer {
            from_kind,
            to_user,
            to_kind,
            amount,
        } => {
            bank.transfer(
                &principal,
                parse_kind(from_kind)?,
                to_user,
                parse_kind(to_kind)?,
                amount.parse::<Money>()?,
            )?;
            println!("transferred {amount} to {to_user}");
        }
        AccountCommand::Balances { user } => {
            let username = user.as_deref().unwrap_or(&principal.username);
            for view in bank.balances(&principal, username)? {
                println!("{} (total {} USD)", view.kind, view.total_usd.round_dp(2));
                for (currency, amount) in &view.balances {
                    println!("  {:>14} {currency}", amount.round_dp(2).to_string());
                }
                if let Some(security) = view.security {
                    println!(
                        "  enabled: {}, realized profit: {} USD",
                        security.enabled,
                        security.realized_profit.round_dp(2)
                    );
                }
            }
        }
        AccountCommand::History { kind, user } => {
            let username = user.as_deref().unwrap_or(&principal.username);
            for tx in bank.transactions(&principal, username, parse_kind(kind)?)? {
                println!("{}  {:>14}  {} -> {}", tx.date, tx.amount.to_string(), tx.sender, tx.receiver);
            }
        }
    }
    Ok(())
}

fn run_loan(bank: &mut Bank, cli: &Cli, command: &LoanCommand) -> Result<(), CliError> {
    let principal = login(bank, cli)?;
    match command {
        LoanCommand::Request {
            collateral,
            value,
            amount,
        } => {
            bank.request_loan(&principal, collateral, *value, *amount)?;
            println!("requested {amount} USD against {collateral}");
        }
        LoanCommand::Pending => {
            for loan in bank.pending_loans(&principal)? {
                println!(
                    "{}: {} USD against {} (worth {})",
                    loan.owner, loan.principal, loan.collateral, loan.collateral_value
                );
            }
        }
        LoanCommand::Approve { owner, collateral } => {
            match bank.approve_loan(&principal, owner, collateral)? {
                LoanDecision::Approved => println!("approved {owner}'s loan on {collateral}"),
                LoanDecision::Rejected => println!("auto-rejected: collateral does not cover"),
            }
        }
        LoanCommand::Reject { owner, collateral } => {
            bank.reject_loan(&principal, owner, collateral)?;
            println!("rejected {owner}'s loan on {collateral}");
        }
        LoanCommand::Pay { collateral, amount } => {
            bank.pay_loan(&principal, collateral, amount.parse::<Money>()?)?;
            println!("loan on {collateral} settled");
        }
        LoanCommand::Active { user } => {
            let username = user.as_deref().unwrap_or(&principal.username);
            for loan in bank.active_loans(&principal, username)? {
                println!(
                    "{}: {} USD outstanding against {}",
                    loan.owner, loan.principal, loan.collateral
                );
            }
        }
    }
    Ok(())
}

fn run_stock(bank: &mut Bank, cli: &Cli, command: &StockCommand) -> Result<(), CliError> {
    let principal = login(bank, cli)?;
    match command {
        StockCommand::Add { name, price } => {
            bank.add_stock(&principal, name, *price)?;
            println!("listed {name} at {price} USD");
        }
        StockCommand::Price { name, price } => {
            bank.update_price(&principal, name, *price)?;
            println!("{name} now {price} USD");
        }
        StockCommand::Delist { name } => {
            bank.delist_stock(&principal, name)?;
            println!("delisted {name}, holders liquidated");
        }
        StockCommand::Buy { name, quantity } => {
            bank.buy_stock(&principal, name, *quantity)?;
            println!("bought {quantity} x {name}");
        }
        StockCommand::Sell { name, quantity } => {
            let realized = bank.sell_stock(&principal, name, *quantity)?;
            println!("sold {name}, realized profit {} USD", realized.round_dp(2));
        }
        StockCommand::List => {
            for stock in bank.stocks() {
                println!("{:>10}  {} USD", stock.name, stock.price.round_dp(2));
            }
        }
        StockCommand::Portfolio { user } => {
            let username = user.as_deref().unwrap_or(&principal.username);
            let portfolio = bank.portfolio(&principal, username)?;
            println!("enabled: {}", portfolio.enabled);
            for holding in &portfolio.holdings {
                println!(
                    "{:>10}  {} units @ {} USD (unrealized {} USD)",
                    holding.stock,
                    holding.quantity,
                    holding.current_price.round_dp(2),
                    holding.unrealized_profit.round_dp(2)
                );
            }
            println!(
                "realized: {} USD, unrealized: {} USD",
                portfolio.realized_profit.round_dp(2),
                portfolio.unrealized_profit.round_dp(2)
            );
        }
    }
    Ok(())
}

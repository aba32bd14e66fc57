//! `cashflow`: command-line front end of the cash book.
//!
//! Every invocation opens the book from the data directory, runs one command
//! as the stored session's holder and prints the result as JSON.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use cashflow_auth::Role;
use cashflow_core::{DebtId, HolderId, ItemId, SectionId, TransactionId, UnitId};
use cashflow_debts::DebtKind;
use cashflow_infra::{Book, BookConfig, FileStore, InventorySortKey};
use cashflow_inventory::MovementKind;
use cashflow_treasury::{TransactionKind, TransactionStatus};

#[derive(Parser)]
#[command(name = "cashflow", version, about = "Cash custody and bookkeeping for small businesses")]
struct Cli {
    /// Directory holding the book (overrides CASHFLOW_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session.
    Login { username: String, password: String },
    /// End the current session.
    Logout,
    /// Show the logged-in holder.
    Whoami,
    /// Total cash and open debt figures.
    Dashboard,
    /// Cash transactions.
    #[command(subcommand)]
    Tx(TxCommand),
    /// Cash holders (users).
    #[command(subcommand)]
    Holders(HolderCommand),
    /// Receivables and payables.
    #[command(subcommand)]
    Debts(DebtCommand),
    /// Stock items and movements.
    #[command(subcommand)]
    Inventory(InventoryCommand),
    /// Units of measure.
    #[command(subcommand)]
    Units(UnitCommand),
    /// Storage sections.
    #[command(subcommand)]
    Sections(SectionCommand),
    /// Audit journal, newest first.
    Journal {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Erase all data and start over from the seed book.
    Reset {
        /// Required confirmation.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum TxCommand {
    /// Record an income, expense or transfer.
    Record {
        #[arg(long)]
        kind: TransactionKind,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Custodian of the cash (supervisors only; defaults to yourself).
        #[arg(long)]
        holder: Option<HolderId>,
        /// Receiving holder of a transfer.
        #[arg(long)]
        target: Option<HolderId>,
    },
    /// List visible transactions.
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        status: Option<TransactionStatus>,
        #[command(flatten)]
        dates: DateArgs,
    },
    /// Validate, reject or reopen a transaction.
    Status { id: TransactionId, status: TransactionStatus },
}

#[derive(Args, Clone)]
struct HolderArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: Option<String>,
    #[arg(long, default_value = "employee")]
    role: Role,
    /// Grant the inventory view.
    #[arg(long)]
    inventory: bool,
    /// Grant the debts view.
    #[arg(long)]
    debts: bool,
    /// Withhold the transaction history view.
    #[arg(long)]
    no_transactions: bool,
}

#[derive(Subcommand)]
enum HolderCommand {
    List,
    Add(HolderArgs),
    Edit {
        id: HolderId,
        #[command(flatten)]
        holder: HolderArgs,
    },
}

#[derive(Args, Clone)]
struct DebtArgs {
    #[arg(long)]
    entity: String,
    #[arg(long)]
    amount: Decimal,
    #[arg(long)]
    description: String,
    /// Defaults to today.
    #[arg(long)]
    issued: Option<NaiveDate>,
    #[arg(long)]
    due: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum DebtCommand {
    List {
        #[arg(long)]
        kind: Option<DebtKind>,
        /// Unpaid only.
        #[arg(long)]
        open: bool,
    },
    /// Paid debts by payment date.
    Settled {
        #[command(flatten)]
        dates: DateArgs,
    },
    Add {
        #[arg(long)]
        kind: DebtKind,
        #[command(flatten)]
        debt: DebtArgs,
    },
    Edit {
        id: DebtId,
        #[command(flatten)]
        debt: DebtArgs,
    },
    Delete { id: DebtId },
    Validate { id: DebtId },
    Reject { id: DebtId },
    /// Pay or collect a validated debt.
    Settle {
        id: DebtId,
        /// Holder whose cash moves (defaults to yourself).
        #[arg(long)]
        holder: Option<HolderId>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Quantity,
    Section,
}

impl From<SortArg> for InventorySortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => InventorySortKey::Name,
            SortArg::Quantity => InventorySortKey::Quantity,
            SortArg::Section => InventorySortKey::Section,
        }
    }
}

#[derive(Subcommand)]
enum InventoryCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        section: Option<String>,
        #[arg(long, value_enum, default_value = "name")]
        sort: SortArg,
        #[arg(long)]
        desc: bool,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "0")]
        quantity: Decimal,
        #[arg(long, default_value = "0")]
        unit_cost: Decimal,
        #[arg(long)]
        unit: String,
        #[arg(long)]
        section: String,
    },
    /// Receive (in) or issue (out) stock.
    Move {
        item: ItemId,
        #[arg(long)]
        kind: MovementKind,
        #[arg(long)]
        quantity: Decimal,
        /// Ignored for issues, which use the average cost.
        #[arg(long, default_value = "0")]
        unit_cost: Decimal,
        #[arg(long, default_value = "")]
        reason: String,
    },
    Edit {
        item: ItemId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        average_cost: Decimal,
        #[arg(long, default_value = "")]
        description: String,
    },
    MinStock { item: ItemId, quantity: Decimal },
    LowStock,
    History {
        #[command(flatten)]
        dates: DateArgs,
    },
}

#[derive(Subcommand)]
enum UnitCommand {
    List,
    Add { name: String, abbreviation: String },
    Delete { id: UnitId },
}

#[derive(Subcommand)]
enum SectionCommand {
    List,
    Add { name: String },
    Delete { id: SectionId },
}

#[derive(Args, Clone, Copy, Default)]
struct DateArgs {
    /// First day included (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day included (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    cashflow_observability::init();

    let mut config = BookConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    tracing::debug!(data_dir = %config.data_dir.display(), "opening book");

    let store = FileStore::new(config.data_dir.clone());
    let mut book = Book::open(store, config).context("open book")?;
    commands::dispatch(&mut book, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_transaction_record() {
        let cli = Cli::try_parse_from([
            "cashflow", "tx", "record", "--kind", "expense", "--amount", "12.50",
            "--description", "Taxi",
        ])
        .unwrap();
        match cli.command {
            Command::Tx(TxCommand::Record { kind, amount, .. }) => {
                assert_eq!(kind, TransactionKind::Expense);
                assert_eq!(amount, Decimal::new(1250, 2));
            }
            _ => panic!("expected tx record"),
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let id = TransactionId::new().to_string();
        assert!(Cli::try_parse_from(["cashflow", "tx", "status", &id, "approved"]).is_err());
    }
}

//! Command handlers: one book operation each, result printed as JSON.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Serialize;

use cashflow_auth::{LoginAccount, Role, ViewPermissions};
use cashflow_core::{HolderId, Money};
use cashflow_holders::Holder;
use cashflow_infra::{
    Book, DateRange, DebtUpdate, FileStore, HolderUpdate, InventoryQuery, ItemUpdate, NewDebt,
    NewHolder, NewInventoryItem, NewTransaction, SortDirection, StockMovement, TransactionFilter,
};

use crate::{
    Command, DateArgs, DebtArgs, DebtCommand, HolderArgs, HolderCommand, InventoryCommand,
    SectionCommand, TxCommand, UnitCommand,
};

type CliBook = Book<FileStore>;

/// Public face of a holder; credentials stay out of the output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HolderView<'a> {
    id: HolderId,
    name: &'a str,
    username: &'a str,
    role: Role,
    balance: Money,
    permissions: ViewPermissions,
}

fn holder_view(holder: &Holder) -> HolderView<'_> {
    HolderView {
        id: holder.id_typed(),
        name: holder.name(),
        username: holder.username(),
        role: holder.role(),
        balance: holder.balance(),
        permissions: holder.permissions(),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{out}");
    Ok(())
}

#[derive(Serialize)]
struct Created<T> {
    id: T,
}

fn created<T: Serialize>(id: T) -> Result<()> {
    print_json(&Created { id })
}

impl From<DateArgs> for DateRange {
    fn from(value: DateArgs) -> Self {
        DateRange::new(value.from, value.to)
    }
}

impl HolderArgs {
    fn permissions(&self) -> ViewPermissions {
        ViewPermissions {
            inventory: self.inventory,
            debts: self.debts,
            transactions: !self.no_transactions,
        }
    }
}

pub(crate) fn dispatch(book: &mut CliBook, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let principal = book.login(&username, &password).context("login")?;
            print_json(&principal)
        }
        Command::Logout => book.logout().context("logout"),
        Command::Whoami => {
            let holder = book.current_user().context("no user is logged in")?;
            print_json(&holder_view(holder))
        }
        Command::Dashboard => print_json(&book.dashboard()?),
        Command::Tx(cmd) => transactions(book, cmd),
        Command::Holders(cmd) => holders(book, cmd),
        Command::Debts(cmd) => debts(book, cmd),
        Command::Inventory(cmd) => inventory(book, cmd),
        Command::Units(cmd) => units(book, cmd),
        Command::Sections(cmd) => sections(book, cmd),
        Command::Journal { limit } => {
            let journal = book.journal()?;
            let shown = limit.map_or(journal, |n| &journal[..n.min(journal.len())]);
            print_json(shown)
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("factory reset erases every record; pass --yes to confirm");
            }
            book.factory_reset().context("factory reset")
        }
    }
}

fn transactions(book: &mut CliBook, cmd: TxCommand) -> Result<()> {
    match cmd {
        TxCommand::Record {
            kind,
            amount,
            description,
            category,
            holder,
            target,
        } => {
            let id = book
                .record_transaction(NewTransaction {
                    kind,
                    amount,
                    holder_id: holder,
                    target_holder_id: target,
                    description,
                    category,
                })
                .context("record transaction")?;
            created(id)
        }
        TxCommand::List {
            search,
            status,
            dates,
        } => {
            let filter = TransactionFilter {
                text: search,
                status,
                dates: dates.into(),
            };
            print_json(&book.visible_transactions(&filter)?)
        }
        TxCommand::Status { id, status } => book
            .update_transaction_status(id, status)
            .with_context(|| format!("set transaction {id} to {status}")),
    }
}

fn holders(book: &mut CliBook, cmd: HolderCommand) -> Result<()> {
    match cmd {
        HolderCommand::List => {
            let visible = book.visible_holders()?;
            let views: Vec<HolderView<'_>> = visible.into_iter().map(holder_view).collect();
            print_json(&views)
        }
        HolderCommand::Add(args) => {
            let permissions = args.permissions();
            let id = book
                .add_holder(NewHolder {
                    name: args.name,
                    username: args.username,
                    password: args.password,
                    role: args.role,
                    permissions,
                })
                .context("add holder")?;
            created(id)
        }
        HolderCommand::Edit { id, holder } => {
            let permissions = holder.permissions();
            book.edit_holder(
                id,
                HolderUpdate {
                    name: holder.name,
                    username: holder.username,
                    password: holder.password,
                    role: holder.role,
                    permissions,
                },
            )
            .with_context(|| format!("edit holder {id}"))
        }
    }
}

fn debts(book: &mut CliBook, cmd: DebtCommand) -> Result<()> {
    match cmd {
        DebtCommand::List { kind, open } => {
            let debts: Vec<_> = book
                .visible_debts()?
                .into_iter()
                .filter(|d| kind.is_none_or(|k| d.kind() == k))
                .filter(|d| !open || !d.is_paid())
                .collect();
            print_json(&debts)
        }
        DebtCommand::Settled { dates } => print_json(&book.settled_debts(&dates.into())?),
        DebtCommand::Add { kind, debt } => {
            let DebtArgs {
                entity,
                amount,
                description,
                issued,
                due,
            } = debt;
            let id = book
                .add_debt(NewDebt {
                    kind,
                    entity_name: entity,
                    amount,
                    description,
                    issue_date: issued.unwrap_or_else(|| Utc::now().date_naive()),
                    due_date: due,
                })
                .context("add debt")?;
            created(id)
        }
        DebtCommand::Edit { id, debt } => book
            .edit_debt(
                id,
                DebtUpdate {
                    entity_name: debt.entity,
                    amount: debt.amount,
                    description: debt.description,
                    issue_date: debt.issued.unwrap_or_else(|| Utc::now().date_naive()),
                    due_date: debt.due,
                },
            )
            .with_context(|| format!("edit debt {id}")),
        DebtCommand::Delete { id } => book
            .delete_debt(id)
            .with_context(|| format!("delete debt {id}")),
        DebtCommand::Validate { id } => book
            .validate_debt(id)
            .with_context(|| format!("validate debt {id}")),
        DebtCommand::Reject { id } => book
            .reject_debt(id)
            .with_context(|| format!("reject debt {id}")),
        DebtCommand::Settle { id, holder } => {
            let holder = match holder {
                Some(holder) => holder,
                None => book.current_principal()?.holder_id,
            };
            let tx = book
                .settle_debt(id, holder)
                .with_context(|| format!("settle debt {id}"))?;
            created(tx)
        }
    }
}

fn inventory(book: &mut CliBook, cmd: InventoryCommand) -> Result<()> {
    match cmd {
        InventoryCommand::List {
            search,
            section,
            sort,
            desc,
        } => {
            let query = InventoryQuery {
                text: search,
                section,
                sort: sort.into(),
                direction: if desc {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                },
            };
            print_json(&book.inventory_listing(&query)?)
        }
        InventoryCommand::Add {
            name,
            description,
            quantity,
            unit_cost,
            unit,
            section,
        } => {
            let id = book
                .add_inventory_item(NewInventoryItem {
                    name,
                    description,
                    quantity,
                    unit_cost,
                    unit,
                    section,
                })
                .context("add inventory item")?;
            created(id)
        }
        InventoryCommand::Move {
            item,
            kind,
            quantity,
            unit_cost,
            reason,
        } => {
            let id = book
                .record_stock_movement(StockMovement {
                    item_id: item,
                    kind,
                    quantity,
                    unit_cost,
                    reason,
                })
                .with_context(|| format!("record {kind} movement on item {item}"))?;
            created(id)
        }
        InventoryCommand::Edit {
            item,
            name,
            average_cost,
            description,
        } => book
            .edit_inventory_item(
                item,
                ItemUpdate {
                    name,
                    average_cost,
                    description,
                },
            )
            .with_context(|| format!("edit item {item}")),
        InventoryCommand::MinStock { item, quantity } => book
            .set_min_stock(item, quantity)
            .with_context(|| format!("set minimum stock of item {item}")),
        InventoryCommand::LowStock => print_json(&book.low_stock_items()?),
        InventoryCommand::History { dates } => print_json(&book.movement_history(&dates.into())?),
    }
}

fn units(book: &mut CliBook, cmd: UnitCommand) -> Result<()> {
    match cmd {
        UnitCommand::List => print_json(book.database().catalog.units()),
        UnitCommand::Add { name, abbreviation } => {
            created(book.add_unit(&name, &abbreviation).context("add unit")?)
        }
        UnitCommand::Delete { id } => book
            .delete_unit(id)
            .with_context(|| format!("delete unit {id}")),
    }
}

fn sections(book: &mut CliBook, cmd: SectionCommand) -> Result<()> {
    match cmd {
        SectionCommand::List => print_json(book.database().catalog.sections()),
        SectionCommand::Add { name } => created(book.add_section(&name).context("add section")?),
        SectionCommand::Delete { id } => book
            .delete_section(id)
            .with_context(|| format!("delete section {id}")),
    }
}

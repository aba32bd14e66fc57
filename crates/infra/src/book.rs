//! Book application service.
//!
//! `Book` owns the in-memory state of one bookkeeping database, the logged-in
//! holder, an event bus and the store the state is mirrored to.
//!
//! ## Operation flow
//!
//! ```text
//! Request
//!   ↓
//! 1. Resolve the logged-in principal and authorize the capability
//!   ↓
//! 2. Decide: `handle` on every aggregate involved (pure, may fail)
//!   ↓
//! 3. Apply: evolve the aggregates, including balance deltas on holders
//!   ↓
//! 4. Journal the action, persist the database document
//!   ↓
//! 5. Publish the events on the bus
//! ```
//!
//! All decisions of an operation are taken before anything is applied, so a
//! refused operation leaves the book untouched. Persisting happens before
//! publication; a failed publication is logged and otherwise ignored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cashflow_auth::{
    AuthzError, Capability, LoginAccount, Principal, authorize, is_allowed, verify_credentials,
};
use cashflow_core::{
    Aggregate, DebtId, DomainError, HolderId, ItemId, MovementId, Quantity, SectionId,
    TransactionId, UnitId,
};
use cashflow_debts::{
    DEBT_SETTLEMENT_CATEGORY, DeleteDebt, Debt, DebtCommand, EditDebt, RegisterDebt, RejectDebt,
    SettleDebt, ValidateDebt, settlement_description, settlement_kind,
};
use cashflow_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use cashflow_holders::{
    AdjustBalance, EditHolder, Holder, HolderCommand, HolderEvent, RegisterHolder,
};
use cashflow_inventory::{
    CreateItem, EditItem, InventoryCommand, InventoryItem, InventoryMovement, RecordMovement,
    SetMinStock,
};
use cashflow_treasury::{
    BalanceDelta, CashTransaction, ChangeStatus, RecordTransaction, TransactionCommand,
    TransactionEvent, TransactionStatus, net_by_holder,
};

use crate::config::BookConfig;
use crate::error::BookResult;
use crate::events::{BookEnvelope, BookEvent};
use crate::journal::AuditAction;
use crate::requests::{
    DebtUpdate, HolderUpdate, ItemUpdate, NewDebt, NewHolder, NewInventoryItem, NewTransaction,
    StockMovement,
};
use crate::seed::{DEFAULT_PASSWORD, seed_database};
use crate::snapshot::Database;
use crate::store::KeyValueStore;

/// Everything one operation produced, committed together.
#[derive(Debug, Default)]
struct Commit {
    events: Vec<BookEvent>,
    logs: Vec<(AuditAction, String)>,
}

impl Commit {
    fn log(&mut self, action: AuditAction, details: impl Into<String>) {
        self.logs.push((action, details.into()));
    }

    fn single(action: AuditAction, details: impl Into<String>) -> Self {
        let mut commit = Self::default();
        commit.log(action, details);
        commit
    }
}

pub struct Book<S> {
    pub(crate) store: S,
    pub(crate) config: BookConfig,
    pub(crate) db: Database,
    pub(crate) session: Option<HolderId>,
    bus: Arc<InMemoryEventBus<BookEnvelope>>,
    sequence: u64,
}

impl<S> core::fmt::Debug for Book<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Book")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("holders", &self.db.holders.len())
            .field("transactions", &self.db.transactions.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl<S: KeyValueStore> Book<S> {
    /// Load the book from `store`, falling back to seed data when nothing is
    /// stored or the stored document cannot be read. A stored session is
    /// restored when it still names an existing holder.
    pub fn open(store: S, config: BookConfig) -> BookResult<Self> {
        let now = Utc::now();
        let db = match store.get(&config.database_key)? {
            Some(raw) => match Database::from_json(&raw, seed_database(now)?) {
                Ok(db) => {
                    debug!(
                        key = %config.database_key,
                        holders = db.holders.len(),
                        transactions = db.transactions.len(),
                        "book loaded"
                    );
                    db
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        key = %config.database_key,
                        "stored book unreadable, using seed data"
                    );
                    seed_database(now)?
                }
            },
            None => {
                info!(key = %config.database_key, "no stored book, using seed data");
                seed_database(now)?
            }
        };

        let session = store
            .get(&config.session_key)?
            .and_then(|raw| serde_json::from_str::<HolderId>(&raw).ok())
            .filter(|id| db.holders.iter().any(|h| h.id_typed() == *id));

        Ok(Self {
            store,
            config,
            db,
            session,
            bus: Arc::new(InMemoryEventBus::new()),
            sequence: 0,
        })
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Receive every event committed from now on.
    pub fn subscribe(&self) -> Subscription<BookEnvelope> {
        self.bus.subscribe()
    }

    /// The logged-in holder, if any.
    pub fn current_user(&self) -> Option<&Holder> {
        let id = self.session?;
        self.db.holders.iter().find(|h| h.id_typed() == id)
    }

    pub fn current_principal(&self) -> BookResult<Principal> {
        self.current_user()
            .map(Holder::principal)
            .ok_or_else(|| AuthzError::NotAuthenticated.into())
    }

    // --- session --------------------------------------------------------

    pub fn login(&mut self, username: &str, password: &str) -> BookResult<Principal> {
        let principal = verify_credentials(self.db.holders.iter(), username, password)
            .inspect_err(|_| debug!(username, "login refused"))?
            .principal();

        let raw = serde_json::to_string(&principal.holder_id)?;
        self.store.set(&self.config.session_key, &raw)?;
        self.session = Some(principal.holder_id);

        info!(holder = %principal.holder_id, role = %principal.role, "login");
        self.commit(&principal, Commit::single(AuditAction::Login, "Signed in"))?;
        Ok(principal)
    }

    pub fn logout(&mut self) -> BookResult<()> {
        let actor = self.current_principal()?;
        self.commit(&actor, Commit::single(AuditAction::Logout, "Signed out"))?;
        self.session = None;
        self.store.remove(&self.config.session_key)?;
        info!(holder = %actor.holder_id, "logout");
        Ok(())
    }

    // --- transactions ---------------------------------------------------

    /// Record a cash movement. Supervisors' transactions are VALIDATED (and
    /// move balances) immediately; everybody else's wait as PENDING.
    pub fn record_transaction(&mut self, request: NewTransaction) -> BookResult<TransactionId> {
        let actor = self.current_principal()?;
        let holder_id = match request.holder_id {
            Some(id) if id != actor.holder_id => {
                authorize(&actor, Capability::SelectTransactionHolder)?;
                id
            }
            _ => actor.holder_id,
        };
        self.holder_index(holder_id)?;
        if let Some(target) = request.target_holder_id {
            self.holder_index(target)?;
        }

        let status = if actor.is_supervisor() {
            TransactionStatus::Validated
        } else {
            TransactionStatus::Pending
        };

        let mut commit = Commit::default();
        let id = self.insert_transaction(
            RecordTransaction {
                transaction_id: TransactionId::new(),
                kind: request.kind,
                amount: request.amount,
                holder_id,
                target_holder_id: request.target_holder_id,
                description: request.description,
                category: request.category,
                status,
                created_by: actor.holder_id,
                occurred_at: Utc::now(),
            },
            &mut commit,
        )?;
        self.commit(&actor, commit)?;
        Ok(id)
    }

    /// Move a transaction to `status`, reversing or applying its balance
    /// effect as it leaves or enters VALIDATED.
    ///
    /// Supervisors may set any status. Other holders may only validate or
    /// reject a PENDING transfer addressed to them.
    pub fn update_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> BookResult<()> {
        let actor = self.current_principal()?;
        let idx = self.transaction_index(id)?;
        let tx = &self.db.transactions[idx];

        if !is_allowed(&actor, Capability::SetAnyTransactionStatus) {
            let may_resolve = tx.status().is_pending()
                && tx.is_transfer_target(actor.holder_id)
                && status != TransactionStatus::Pending;
            if !may_resolve {
                debug!(
                    transaction = %id,
                    holder = %actor.holder_id,
                    "only the receiving holder may resolve a pending transfer"
                );
                return Err(AuthzError::Forbidden(Capability::SetAnyTransactionStatus).into());
            }
        }

        let now = Utc::now();
        let events = tx.handle(&TransactionCommand::ChangeStatus(ChangeStatus {
            transaction_id: id,
            status,
            occurred_at: now,
        }))?;
        if events.is_empty() {
            return Ok(());
        }

        let balance = self.balance_events(&transaction_deltas(&events), id, now)?;
        let from = tx.status();
        let description = tx.description().to_string();

        let mut commit = Commit::default();
        let tx = &mut self.db.transactions[idx];
        for event in &events {
            tx.apply(event);
        }
        commit
            .events
            .extend(events.into_iter().map(BookEvent::Transaction));
        self.apply_holder_events(balance, &mut commit);
        commit.log(
            AuditAction::UpdateStatus,
            format!("Transaction '{description}' changed from {from} to {status}"),
        );

        info!(
            transaction = %id,
            %from,
            to = %status,
            actor = %actor.holder_id,
            "transaction status changed"
        );
        self.commit(&actor, commit)
    }

    // --- holders --------------------------------------------------------

    pub fn add_holder(&mut self, request: NewHolder) -> BookResult<HolderId> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ManageHolders)?;
        self.ensure_username_free(&request.username, None)?;

        let password = request
            .password
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

        let mut holder = Holder::empty(HolderId::new());
        let events = holder.execute(&HolderCommand::RegisterHolder(RegisterHolder {
            holder_id: holder.id_typed(),
            name: request.name,
            username: request.username,
            password,
            role: request.role,
            permissions: request.permissions,
            opening_balance: Decimal::ZERO,
            occurred_at: Utc::now(),
        }))?;

        let id = holder.id_typed();
        let mut commit = Commit::single(
            AuditAction::AddUser,
            format!("Created user: {} ({})", holder.username(), holder.role()),
        );
        commit.events.extend(events.into_iter().map(BookEvent::Holder));
        self.db.holders.push(holder);

        info!(holder = %id, actor = %actor.holder_id, "holder added");
        self.commit(&actor, commit)?;
        Ok(id)
    }

    pub fn edit_holder(&mut self, id: HolderId, request: HolderUpdate) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ManageHolders)?;
        let idx = self.holder_index(id)?;
        self.ensure_username_free(&request.username, Some(id))?;

        let holder = &mut self.db.holders[idx];
        let events = holder.execute(&HolderCommand::EditHolder(EditHolder {
            holder_id: id,
            name: request.name,
            username: request.username,
            role: request.role,
            permissions: request.permissions,
            password: request.password,
            occurred_at: Utc::now(),
        }))?;

        let mut commit = Commit::single(
            AuditAction::EditUser,
            format!("Edited user: {}", holder.username()),
        );
        commit.events.extend(events.into_iter().map(BookEvent::Holder));

        info!(holder = %id, actor = %actor.holder_id, "holder edited");
        self.commit(&actor, commit)
    }

    // --- debts ----------------------------------------------------------

    /// Register a receivable or payable. Supervisors' debts are validated on
    /// creation.
    pub fn add_debt(&mut self, request: NewDebt) -> BookResult<DebtId> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewDebts)?;

        let status = if actor.is_supervisor() {
            TransactionStatus::Validated
        } else {
            TransactionStatus::Pending
        };

        let mut debt = Debt::empty(DebtId::new());
        let events = debt.execute(&DebtCommand::RegisterDebt(RegisterDebt {
            debt_id: debt.id_typed(),
            kind: request.kind,
            entity_name: request.entity_name,
            amount: request.amount,
            description: request.description,
            issue_date: request.issue_date,
            due_date: request.due_date,
            status,
            occurred_at: Utc::now(),
        }))?;

        let id = debt.id_typed();
        let mut commit = Commit::single(
            AuditAction::AddDebt,
            format!("Created debt: {} - {}", debt.entity_name(), debt.amount()),
        );
        commit.events.extend(events.into_iter().map(BookEvent::Debt));
        self.db.debts.push(debt);

        info!(debt = %id, %status, actor = %actor.holder_id, "debt added");
        self.commit(&actor, commit)?;
        Ok(id)
    }

    pub fn edit_debt(&mut self, id: DebtId, request: DebtUpdate) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewDebts)?;
        let idx = self.debt_index(id)?;

        let events = self.db.debts[idx].execute(&DebtCommand::EditDebt(EditDebt {
            debt_id: id,
            entity_name: request.entity_name,
            amount: request.amount,
            description: request.description,
            issue_date: request.issue_date,
            due_date: request.due_date,
            occurred_at: Utc::now(),
        }))?;

        let mut commit = Commit::single(AuditAction::EditDebt, format!("Edited debt {id}"));
        commit.events.extend(events.into_iter().map(BookEvent::Debt));
        self.commit(&actor, commit)
    }

    /// Remove a debt. Validated debts can only be removed by supervisors.
    pub fn delete_debt(&mut self, id: DebtId) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewDebts)?;
        let idx = self.debt_index(id)?;

        let events = self.db.debts[idx].execute(&DebtCommand::DeleteDebt(DeleteDebt {
            debt_id: id,
            allow_validated: actor.is_supervisor(),
            occurred_at: Utc::now(),
        }))?;
        let debt = self.db.debts.remove(idx);

        let mut commit = Commit::single(
            AuditAction::DeleteDebt,
            format!("Deleted debt {id} ({})", debt.entity_name()),
        );
        commit.events.extend(events.into_iter().map(BookEvent::Debt));

        info!(debt = %id, actor = %actor.holder_id, "debt deleted");
        self.commit(&actor, commit)
    }

    pub fn validate_debt(&mut self, id: DebtId) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ValidateDebts)?;
        let idx = self.debt_index(id)?;

        let events = self.db.debts[idx].execute(&DebtCommand::ValidateDebt(ValidateDebt {
            debt_id: id,
            occurred_at: Utc::now(),
        }))?;

        let mut commit = Commit::single(AuditAction::ValidateDebt, format!("Validated debt {id}"));
        commit.events.extend(events.into_iter().map(BookEvent::Debt));
        self.commit(&actor, commit)
    }

    pub fn reject_debt(&mut self, id: DebtId) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ValidateDebts)?;
        let idx = self.debt_index(id)?;

        let events = self.db.debts[idx].execute(&DebtCommand::RejectDebt(RejectDebt {
            debt_id: id,
            occurred_at: Utc::now(),
        }))?;

        let mut commit = Commit::single(AuditAction::RejectDebt, format!("Rejected debt {id}"));
        commit.events.extend(events.into_iter().map(BookEvent::Debt));
        self.commit(&actor, commit)
    }

    /// Settle a validated debt through `holder_id`'s cash.
    ///
    /// Records a PENDING income (receivable) or expense (payable) transaction
    /// for the full amount, marks the debt paid and links the two. Balances
    /// move once that transaction is validated.
    pub fn settle_debt(&mut self, id: DebtId, holder_id: HolderId) -> BookResult<TransactionId> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewDebts)?;
        if holder_id != actor.holder_id {
            authorize(&actor, Capability::SelectTransactionHolder)?;
        }
        self.holder_index(holder_id)?;
        let idx = self.debt_index(id)?;

        let now = Utc::now();
        let transaction_id = TransactionId::new();
        let debt = &self.db.debts[idx];
        let debt_events = debt.handle(&DebtCommand::SettleDebt(SettleDebt {
            debt_id: id,
            holder_id,
            transaction_id,
            paid_at: now,
        }))?;
        let settlement = RecordTransaction {
            transaction_id,
            kind: settlement_kind(debt.kind()),
            amount: debt.amount(),
            holder_id,
            target_holder_id: None,
            description: settlement_description(debt),
            category: DEBT_SETTLEMENT_CATEGORY.to_string(),
            status: TransactionStatus::Pending,
            created_by: actor.holder_id,
            occurred_at: now,
        };
        let entity = debt.entity_name().to_string();

        let mut commit = Commit::default();
        self.insert_transaction(settlement, &mut commit)?;
        let debt = &mut self.db.debts[idx];
        for event in &debt_events {
            debt.apply(event);
        }
        commit
            .events
            .extend(debt_events.into_iter().map(BookEvent::Debt));
        commit.log(AuditAction::PayDebt, format!("Settled debt: {entity}"));

        info!(debt = %id, transaction = %transaction_id, holder = %holder_id, "debt settled");
        self.commit(&actor, commit)?;
        Ok(transaction_id)
    }

    // --- inventory ------------------------------------------------------

    pub fn add_inventory_item(&mut self, request: NewInventoryItem) -> BookResult<ItemId> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewInventory)?;

        let mut item = InventoryItem::empty(ItemId::new());
        let events = item.execute(&InventoryCommand::CreateItem(CreateItem {
            item_id: item.id_typed(),
            name: request.name,
            description: request.description,
            quantity: request.quantity,
            unit_cost: request.unit_cost,
            unit: request.unit,
            section: request.section,
            occurred_at: Utc::now(),
        }))?;

        let id = item.id_typed();
        self.db.inventory_movements.extend(
            events
                .iter()
                .filter_map(|e| InventoryMovement::from_event(MovementId::new(), item.name(), e)),
        );
        let mut commit = Commit::single(
            AuditAction::InvAddItem,
            format!("New item: {} (cost: {})", item.name(), item.average_cost()),
        );
        commit.events.extend(events.into_iter().map(BookEvent::Inventory));
        self.db.inventory.push(item);

        info!(item = %id, actor = %actor.holder_id, "inventory item added");
        self.commit(&actor, commit)?;
        Ok(id)
    }

    /// Receive (IN) or issue (OUT) stock. IN recomputes the weighted average
    /// cost; OUT is valued at the current average whatever cost is supplied.
    pub fn record_stock_movement(&mut self, request: StockMovement) -> BookResult<MovementId> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ViewInventory)?;
        let idx = self.item_index(request.item_id)?;

        let item = &mut self.db.inventory[idx];
        let events = item.execute(&InventoryCommand::RecordMovement(RecordMovement {
            item_id: request.item_id,
            kind: request.kind,
            quantity: request.quantity,
            unit_cost: request.unit_cost,
            reason: request.reason,
            occurred_at: Utc::now(),
        }))?;

        let movement = events
            .iter()
            .find_map(|e| InventoryMovement::from_event(MovementId::new(), item.name(), e))
            .ok_or_else(|| DomainError::invariant("stock movement produced no movement record"))?;
        let movement_id = movement.id;

        let mut commit = Commit::single(
            AuditAction::InvMovement,
            format!(
                "{} {} of {}. Reason: {}",
                movement.kind, movement.quantity, movement.item_name, movement.reason
            ),
        );
        commit.events.extend(events.into_iter().map(BookEvent::Inventory));

        info!(
            item = %request.item_id,
            kind = %movement.kind,
            quantity = %movement.quantity,
            unit_cost = %movement.unit_cost,
            "stock movement recorded"
        );
        self.db.inventory_movements.push(movement);
        self.commit(&actor, commit)?;
        Ok(movement_id)
    }

    /// Manual correction of name, average cost and description.
    pub fn edit_inventory_item(&mut self, id: ItemId, request: ItemUpdate) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ManageInventoryCatalog)?;
        let idx = self.item_index(id)?;

        let events = self.db.inventory[idx].execute(&InventoryCommand::EditItem(EditItem {
            item_id: id,
            name: request.name,
            average_cost: request.average_cost,
            description: request.description,
            occurred_at: Utc::now(),
        }))?;

        let item = &self.db.inventory[idx];
        let mut commit = Commit::single(
            AuditAction::InvEditItem,
            format!("Edited item {id}: name {}, cost {}", item.name(), item.average_cost()),
        );
        commit.events.extend(events.into_iter().map(BookEvent::Inventory));
        self.commit(&actor, commit)
    }

    pub fn set_min_stock(&mut self, id: ItemId, min_stock: Quantity) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ManageInventoryCatalog)?;
        let idx = self.item_index(id)?;

        let events = self.db.inventory[idx].execute(&InventoryCommand::SetMinStock(SetMinStock {
            item_id: id,
            min_stock,
            occurred_at: Utc::now(),
        }))?;

        let mut commit = Commit::single(
            AuditAction::InvSetMinStock,
            format!("Minimum stock of {} set to {min_stock}", self.db.inventory[idx].name()),
        );
        commit.events.extend(events.into_iter().map(BookEvent::Inventory));
        self.commit(&actor, commit)
    }

    pub fn add_unit(&mut self, name: &str, abbreviation: &str) -> BookResult<UnitId> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ManageInventoryCatalog)?;

        let unit = self.db.catalog.add_unit(UnitId::new(), name, abbreviation)?;
        let (id, details) = (unit.id, format!("Added unit {} ({})", unit.name, unit.abbreviation));
        self.commit(&actor, Commit::single(AuditAction::InvAddUnit, details))?;
        Ok(id)
    }

    pub fn delete_unit(&mut self, id: UnitId) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ManageInventoryCatalog)?;

        let unit = self.db.catalog.delete_unit(id)?;
        self.commit(
            &actor,
            Commit::single(AuditAction::InvDeleteUnit, format!("Deleted unit {}", unit.name)),
        )
    }

    pub fn add_section(&mut self, name: &str) -> BookResult<SectionId> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ManageInventoryCatalog)?;

        let section = self.db.catalog.add_section(SectionId::new(), name)?;
        let (id, details) = (section.id, format!("Added section {}", section.name));
        self.commit(&actor, Commit::single(AuditAction::InvAddSection, details))?;
        Ok(id)
    }

    pub fn delete_section(&mut self, id: SectionId) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::ManageInventoryCatalog)?;

        let section = self.db.catalog.delete_section(id)?;
        self.commit(
            &actor,
            Commit::single(
                AuditAction::InvDeleteSection,
                format!("Deleted section {}", section.name),
            ),
        )
    }

    // --- maintenance ----------------------------------------------------

    /// Erase every record and the session, then start over from seed data.
    pub fn factory_reset(&mut self) -> BookResult<()> {
        let actor = self.current_principal()?;
        authorize(&actor, Capability::FactoryReset)?;

        self.store.remove(&self.config.database_key)?;
        self.store.remove(&self.config.session_key)?;
        self.db = seed_database(Utc::now())?;
        self.session = None;
        self.persist()?;

        warn!(actor = %actor.holder_id, "factory reset: all book data erased");
        Ok(())
    }

    // --- internals ------------------------------------------------------

    fn holder_index(&self, id: HolderId) -> BookResult<usize> {
        self.db
            .holders
            .iter()
            .position(|h| h.id_typed() == id)
            .ok_or_else(|| DomainError::not_found(format!("holder {id}")).into())
    }

    fn transaction_index(&self, id: TransactionId) -> BookResult<usize> {
        self.db
            .transactions
            .iter()
            .position(|t| t.id_typed() == id)
            .ok_or_else(|| DomainError::not_found(format!("transaction {id}")).into())
    }

    fn debt_index(&self, id: DebtId) -> BookResult<usize> {
        self.db
            .debts
            .iter()
            .position(|d| d.id_typed() == id)
            .ok_or_else(|| DomainError::not_found(format!("debt {id}")).into())
    }

    fn item_index(&self, id: ItemId) -> BookResult<usize> {
        self.db
            .inventory
            .iter()
            .position(|i| i.id_typed() == id)
            .ok_or_else(|| DomainError::not_found(format!("inventory item {id}")).into())
    }

    fn ensure_username_free(&self, username: &str, except: Option<HolderId>) -> BookResult<()> {
        let wanted = username.trim().to_lowercase();
        let taken = self
            .db
            .holders
            .iter()
            .filter(|h| Some(h.id_typed()) != except)
            .any(|h| h.username().to_lowercase() == wanted);
        if taken {
            let message = format!("username '{}' is already taken", username.trim());
            return Err(DomainError::conflict(message).into());
        }
        Ok(())
    }

    /// Decide and apply a new transaction together with the balance movements
    /// it implies.
    fn insert_transaction(
        &mut self,
        cmd: RecordTransaction,
        commit: &mut Commit,
    ) -> BookResult<TransactionId> {
        let id = cmd.transaction_id;
        let occurred_at = cmd.occurred_at;
        let mut tx = CashTransaction::empty(id);
        let events = tx.handle(&TransactionCommand::RecordTransaction(cmd))?;
        let balance = self.balance_events(&transaction_deltas(&events), id, occurred_at)?;

        for event in &events {
            tx.apply(event);
        }
        commit.log(
            AuditAction::CreateTransaction,
            format!("Type: {}, Amount: {}, Status: {}", tx.kind(), tx.amount(), tx.status()),
        );
        info!(
            transaction = %id,
            kind = %tx.kind(),
            amount = %tx.amount(),
            status = %tx.status(),
            "transaction recorded"
        );
        self.db.transactions.push(tx);
        commit
            .events
            .extend(events.into_iter().map(BookEvent::Transaction));
        self.apply_holder_events(balance, commit);
        Ok(id)
    }

    /// Decide the holder events for a set of balance deltas, without applying.
    fn balance_events(
        &self,
        deltas: &[BalanceDelta],
        transaction_id: TransactionId,
        occurred_at: DateTime<Utc>,
    ) -> BookResult<Vec<(usize, HolderEvent)>> {
        let mut out = Vec::new();
        for delta in net_by_holder(deltas)? {
            let idx = self.holder_index(delta.holder_id)?;
            let events = self.db.holders[idx].handle(&HolderCommand::AdjustBalance(AdjustBalance {
                holder_id: delta.holder_id,
                delta: delta.delta,
                transaction_id,
                occurred_at,
            }))?;
            out.extend(events.into_iter().map(|e| (idx, e)));
        }
        Ok(out)
    }

    fn apply_holder_events(&mut self, events: Vec<(usize, HolderEvent)>, commit: &mut Commit) {
        for (idx, event) in events {
            self.db.holders[idx].apply(&event);
            commit.events.push(BookEvent::Holder(event));
        }
    }

    fn commit(&mut self, actor: &Principal, commit: Commit) -> BookResult<()> {
        let now = Utc::now();
        for (action, details) in commit.logs {
            self.db.logs.record(actor, action, details, now);
        }
        self.persist()?;
        self.publish(commit.events);
        Ok(())
    }

    fn persist(&self) -> BookResult<()> {
        let raw = self.db.to_json()?;
        if let Err(e) = self.store.set(&self.config.database_key, &raw) {
            warn!(error = %e, key = %self.config.database_key, "failed to persist book");
            return Err(e.into());
        }
        Ok(())
    }

    fn publish(&mut self, events: Vec<BookEvent>) {
        for event in events {
            self.sequence += 1;
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                event.aggregate_id(),
                event.aggregate_type(),
                self.sequence,
                event,
            );
            if let Err(e) = self.bus.publish(envelope) {
                warn!(error = ?e, sequence = self.sequence, "failed to publish book event");
            }
        }
    }
}

fn transaction_deltas(events: &[TransactionEvent]) -> Vec<BalanceDelta> {
    events
        .iter()
        .flat_map(|e| e.balance_deltas().iter().copied())
        .collect()
}


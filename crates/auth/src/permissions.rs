use serde::{Deserialize, Serialize};

/// Per-holder view flags.
///
/// Supervisors ignore these; for everybody else they decide which sections of
/// the book are reachable at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewPermissions {
    pub inventory: bool,
    /// Receivables and payables.
    pub debts: bool,
    /// Transaction history.
    pub transactions: bool,
}

impl ViewPermissions {
    pub const ALL: ViewPermissions = ViewPermissions {
        inventory: true,
        debts: true,
        transactions: true,
    };
}

impl Default for ViewPermissions {
    fn default() -> Self {
        Self {
            inventory: false,
            debts: false,
            transactions: true,
        }
    }
}

/// Something a principal may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewTransactions,
    ViewDebts,
    ViewInventory,
    ViewHolders,
    /// Create or edit holders.
    ManageHolders,
    ViewJournal,
    FactoryReset,
    /// Validate or reject pending debts, delete validated ones.
    ValidateDebts,
    /// Record transactions on behalf of another holder.
    SelectTransactionHolder,
    /// Move any transaction to any status.
    SetAnyTransactionStatus,
    /// Units, sections and manual item corrections.
    ManageInventoryCatalog,
    ViewInventoryCost,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewTransactions => "transactions.view",
            Capability::ViewDebts => "debts.view",
            Capability::ViewInventory => "inventory.view",
            Capability::ViewHolders => "holders.view",
            Capability::ManageHolders => "holders.manage",
            Capability::ViewJournal => "journal.view",
            Capability::FactoryReset => "system.reset",
            Capability::ValidateDebts => "debts.validate",
            Capability::SelectTransactionHolder => "transactions.select_holder",
            Capability::SetAnyTransactionStatus => "transactions.set_status",
            Capability::ManageInventoryCatalog => "inventory.catalog",
            Capability::ViewInventoryCost => "inventory.cost",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

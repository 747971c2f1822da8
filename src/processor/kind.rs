//! Stream identities and their deduplication keys

use std::fmt;

/// Known stream kinds
///
/// The deduplication key of a stream is fixed by its kind and never read
/// from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Branches,
    Centres,
    Clients,
    Groups,
    Users,
    LoanProducts,
    DepositProducts,
    LoanAccounts,
    DepositAccounts,
    CreditArrangements,
    Cards,
    LoanTransactions,
    DepositTransactions,
    LoanRepayments,
    Installments,
    Communications,
    Tasks,
    IndexRateSources,
    GlAccounts,
    GlJournalEntries,
    InterestAccrualBreakdown,
    AuditTrail,
    /// Any other stream; keyed by `id`
    Other(String),
}

impl StreamKind {
    /// Every named kind
    pub const NAMED: [StreamKind; 22] = [
        Self::Branches,
        Self::Centres,
        Self::Clients,
        Self::Groups,
        Self::Users,
        Self::LoanProducts,
        Self::DepositProducts,
        Self::LoanAccounts,
        Self::DepositAccounts,
        Self::CreditArrangements,
        Self::Cards,
        Self::LoanTransactions,
        Self::DepositTransactions,
        Self::LoanRepayments,
        Self::Installments,
        Self::Communications,
        Self::Tasks,
        Self::IndexRateSources,
        Self::GlAccounts,
        Self::GlJournalEntries,
        Self::InterestAccrualBreakdown,
        Self::AuditTrail,
    ];

    /// Resolve a stream name
    pub fn from_name(name: &str) -> Self {
        Self::NAMED
            .iter()
            .find(|kind| kind.name() == name)
            .cloned()
            .unwrap_or_else(|| Self::Other(name.to_string()))
    }

    /// Stream name
    pub fn name(&self) -> &str {
        match self {
            Self::Branches => "branches",
            Self::Centres => "centres",
            Self::Clients => "clients",
            Self::Groups => "groups",
            Self::Users => "users",
            Self::LoanProducts => "loan_products",
            Self::DepositProducts => "deposit_products",
            Self::LoanAccounts => "loan_accounts",
            Self::DepositAccounts => "deposit_accounts",
            Self::CreditArrangements => "credit_arrangements",
            Self::Cards => "cards",
            Self::LoanTransactions => "loan_transactions",
            Self::DepositTransactions => "deposit_transactions",
            Self::LoanRepayments => "loan_repayments",
            Self::Installments => "installments",
            Self::Communications => "communications",
            Self::Tasks => "tasks",
            Self::IndexRateSources => "index_rate_sources",
            Self::GlAccounts => "gl_accounts",
            Self::GlJournalEntries => "gl_journal_entries",
            Self::InterestAccrualBreakdown => "interest_accrual_breakdown",
            Self::AuditTrail => "audit_trail",
            Self::Other(name) => name,
        }
    }

    /// Field whose value identifies a record within the stream
    ///
    /// `None` means the stream has no identifying field and records are
    /// keyed by their content fingerprint. Audit events carry no id, and
    /// several can share one `occurred_at`.
    pub fn deduplication_key(&self) -> Option<&'static str> {
        match self {
            Self::LoanTransactions
            | Self::DepositTransactions
            | Self::LoanRepayments
            | Self::Installments
            | Self::Communications
            | Self::Tasks
            | Self::IndexRateSources => Some("encoded_key"),
            Self::GlAccounts => Some("gl_code"),
            Self::GlJournalEntries | Self::InterestAccrualBreakdown => Some("entry_id"),
            Self::AuditTrail => None,
            _ => Some("id"),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Bulk attribute updates driven by CSV input.
//!
//! Every row goes through the same sequence: validate, look up, diff, confirm,
//! apply. The parts that differ between commands (which columns are read and
//! how the new state is derived) live behind [`UpdateRule`].

pub mod change;
pub mod decision;
pub mod input;
pub mod processor;
pub mod proxy;
pub mod summary;
pub mod upn;

use crate::directory::DirectoryUser;
use change::ProposedChange;
use input::{CsvSchema, InputRecord};

pub use decision::{Decider, Decision, Mode, PromptDecider};
pub use processor::RowProcessor;
pub use proxy::ProxyAddressRule;
pub use summary::{Outcome, RunSummary, SkipReason};
pub use upn::UpnRule;

/// How one kind of bulk update reads its rows and derives the new state
pub trait UpdateRule: Send + Sync {
    /// Short name used in logs and the audit journal
    fn name(&self) -> &'static str;

    fn schema(&self) -> &CsvSchema;

    /// Why a row cannot be processed at all, e.g. a blank required value
    fn skip_reason(&self, record: &InputRecord) -> Option<String> {
        self.schema()
            .required
            .iter()
            .find(|column| record.value(column).is_empty())
            .map(|column| format!("{} is blank", column))
    }

    /// New state for `user`; must not have side effects
    fn propose(&self, user: &DirectoryUser, record: &InputRecord) -> ProposedChange;
}

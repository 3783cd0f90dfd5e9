mod collection;
mod ids;
mod item;
mod report;
mod scope;
mod settings;

pub use collection::{CollectionError, ItemCollection};
pub use ids::ItemId;
pub use item::{InitLevel, Item, ItemDraft, ItemError};
pub use report::{HardItem, ReportError, SessionReport};
pub use scope::{RangeSet, ScopeError, ScopeMode, ScopeSpec, group_number};
pub use settings::{PriorTable, SettingsError, StudySettings};

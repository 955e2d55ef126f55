pub mod extensions;
pub mod matcher;
pub mod rule;

pub use extensions::{default_category, OTHERS};
pub use matcher::{Categorizer, Classification, FileDescriptor, SkippedRule};
pub use rule::{CustomRule, NewRule, RuleError, RuleMatcher, RuleType};

pub mod exchange;
pub mod gesture;
pub mod payload;
pub mod rule;

pub use exchange::{ExportBlob, RuleBundle, BUNDLE_FORMAT, BUNDLE_VERSION};
pub use gesture::{MoveKind, VerticalZone};
pub use payload::{EquationSign, RuleCategory, RulePayload};
pub use rule::{IconCategory, RuleNode, RuleRecord, VariantTag};

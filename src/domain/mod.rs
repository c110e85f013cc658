pub mod types;
pub mod event;
pub mod rule;
pub mod eligibility;

pub use types::*;
pub use event::*;
pub use rule::*;
pub use eligibility::*;

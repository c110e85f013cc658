pub mod dispatch_event;
pub mod preview_rule;

pub use dispatch_event::DispatchEventUseCase;
pub use preview_rule::PreviewRuleUseCase;

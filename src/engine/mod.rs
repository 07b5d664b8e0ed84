// Decision engine
pub mod combined;
pub mod escalation;
pub mod evaluator;

pub use combined::check_combined;
pub use escalation::resolve_escalation;
pub use evaluator::evaluate;

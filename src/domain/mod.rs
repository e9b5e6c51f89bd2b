// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Validation, invariants and orchestration. Storage and messaging are reached
// only through the `UnitOfWork` and `EventPublisher` traits.
//
// ============================================================================

pub mod order;

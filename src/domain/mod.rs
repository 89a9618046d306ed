// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Order model, validation rules and the lifecycle service. Storage and
// broker access are injected as traits from `store` and `messaging`.
//
// ============================================================================

pub mod order;

//! Ownership policy gate.
//!
//! The backing store is reached with a service credential that bypasses its
//! row-level policies, so this gate is the only ownership check that runs.
//! It is a pure function: callers surface a denial as an authorization
//! failure, never as a silent no-op.

/// Mutating action on an owner-scoped record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Decide whether `actor_id` may perform `action` on a record owned by
/// `owner_id`. Deny unless the actor is the owner. Administrative record
/// kinds (albums) never consult this gate; their callers are pre-filtered by
/// a separate admin surface.
pub fn authorize(actor_id: &str, owner_id: &str, _action: Action) -> Decision {
    if actor_id == owner_id {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

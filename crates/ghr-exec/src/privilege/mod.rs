//! Elevated-start path.
//!
//! [`PrivilegeReconciler::reconcile`] runs as root and produces an immutable
//! [`RuntimeIdentity`]; [`RuntimeIdentity::apply`] then drops to it in-process.
mod accounts;
pub use accounts::{GroupEntry, PasswdEntry, parse_group, parse_passwd};

mod identity;
pub use identity::RuntimeIdentity;

mod reconciler;
pub use reconciler::PrivilegeReconciler;

/// `true` when running with an effective uid of 0.
pub fn is_elevated() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

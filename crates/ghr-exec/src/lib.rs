//! Process-level half of the worker lifecycle: privilege handling, the worker's scripts,
//! signal capture and supervision.
mod error;
pub use error::{ExecError, ExecResult};

mod utils;
pub use utils::{WorkerSecurity, attach_security};

mod privilege;
pub use privilege::{GroupEntry, PasswdEntry, PrivilegeReconciler, RuntimeIdentity};
pub use privilege::{is_elevated, parse_group, parse_passwd};

mod scripts;
pub use scripts::{CONFIGURE_SCRIPT, RUN_SCRIPT, RunnerScripts};

mod signals;
pub use signals::install_shutdown_handler;

mod supervisor;
pub use supervisor::{DEFAULT_GRACE, Outcome, Supervisor};

use std::{io, os::unix::fs::lchown, path::Path, path::PathBuf};

use tracing::{debug, info};

use crate::{ExecError, ExecResult};

/// Unprivileged identity the worker runs as. Built once by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeIdentity {
    pub user: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
    /// Supplementary groups, primary gid included.
    pub groups: Vec<u32>,
}

impl RuntimeIdentity {
    /// Environment the worker sees for this identity.
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            ("HOME".into(), self.home.display().to_string()),
            ("USER".into(), self.user.clone()),
            ("LOGNAME".into(), self.user.clone()),
        ]
    }

    /// Create `dir` if needed and hand the whole tree to this identity.
    pub fn own_tree(&self, dir: &Path) -> ExecResult<()> {
        std::fs::create_dir_all(dir)?;
        chown_recursive(dir, self.uid, self.gid)
            .map_err(|e| ExecError::Privilege(format!("chown {} failed: {e}", dir.display())))?;
        debug!(dir = %dir.display(), uid = self.uid, gid = self.gid, "ownership handed over");
        Ok(())
    }

    /// Drop to this identity for the rest of the process lifetime.
    ///
    /// Supplementary groups go first, then the gid, then the uid; regaining root afterwards
    /// must fail.
    pub fn apply(&self) -> ExecResult<()> {
        let fail = |step: &str| {
            ExecError::Privilege(format!("{step} failed: {}", io::Error::last_os_error()))
        };

        let groups: Vec<libc::gid_t> = self.groups.iter().map(|g| *g as libc::gid_t).collect();
        // SAFETY: the pointer and length describe a live, correctly typed slice.
        if unsafe { libc::setgroups(groups.len() as _, groups.as_ptr()) } != 0 {
            return Err(fail("setgroups"));
        }
        // SAFETY: plain syscalls without pointer arguments.
        if unsafe { libc::setgid(self.gid as libc::gid_t) } != 0 {
            return Err(fail("setgid"));
        }
        if unsafe { libc::setuid(self.uid as libc::uid_t) } != 0 {
            return Err(fail("setuid"));
        }

        if self.uid != 0 && unsafe { libc::setuid(0) } == 0 {
            return Err(ExecError::Privilege("root could be regained after drop".into()));
        }

        info!(user = %self.user, uid = self.uid, gid = self.gid, groups = ?self.groups, "privileges dropped");
        Ok(())
    }
}

fn chown_recursive(path: &Path, uid: u32, gid: u32) -> io::Result<()> {
    lchown(path, Some(uid), Some(gid))?;
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        for entry in std::fs::read_dir(path)? {
            chown_recursive(&entry?.path(), uid, gid)?;
        }
    }
    Ok(())
}

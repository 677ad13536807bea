use std::{
    os::unix::fs::{FileTypeExt, MetadataExt},
    path::{Path, PathBuf},
};

use tokio::process::Command;
use tracing::{info, instrument, warn};

use crate::{
    ExecError, ExecResult, GroupEntry, PasswdEntry, RuntimeIdentity, parse_group, parse_passwd,
};

const PASSWD_FILE: &str = "/etc/passwd";
const GROUP_FILE: &str = "/etc/group";

/// Name given to a group created for the socket's gid.
const SOCKET_GROUP: &str = "docker";

/// Maps a host-shared socket's group into the container and resolves the runtime identity.
#[derive(Debug, Clone)]
pub struct PrivilegeReconciler {
    user: String,
    socket: PathBuf,
    passwd_file: PathBuf,
    group_file: PathBuf,
}

impl PrivilegeReconciler {
    pub fn new(user: impl Into<String>, socket: impl Into<PathBuf>) -> Self {
        Self {
            user: user.into(),
            socket: socket.into(),
            passwd_file: PathBuf::from(PASSWD_FILE),
            group_file: PathBuf::from(GROUP_FILE),
        }
    }

    /// Read accounts from alternative files.
    pub fn with_account_files(mut self, passwd: impl Into<PathBuf>, group: impl Into<PathBuf>) -> Self {
        self.passwd_file = passwd.into();
        self.group_file = group.into();
        self
    }

    /// Resolve the runtime identity, mapping the socket group when the socket exists.
    ///
    /// Only an unknown user is fatal. Socket and group problems are logged and skipped.
    #[instrument(skip_all, fields(user = %self.user, socket = %self.socket.display()))]
    pub async fn reconcile(&self) -> ExecResult<RuntimeIdentity> {
        let user = self.lookup_user().await?;
        let groups = self.read_groups().await;

        let mut supplementary: Vec<u32> = vec![user.gid];
        for g in groups.iter().filter(|g| g.has_member(&user.name)) {
            push_unique(&mut supplementary, g.gid);
        }

        if let Some(gid) = self.socket_gid() {
            let group = self.ensure_group(gid, &groups).await;
            if let Some(group) = group {
                self.ensure_member(&group, &groups).await;
            }
            push_unique(&mut supplementary, gid);
        }

        Ok(RuntimeIdentity {
            user: user.name,
            uid: user.uid,
            gid: user.gid,
            home: user.home,
            groups: supplementary,
        })
    }

    async fn lookup_user(&self) -> ExecResult<PasswdEntry> {
        let content = tokio::fs::read_to_string(&self.passwd_file)
            .await
            .map_err(|e| {
                ExecError::Privilege(format!("cannot read {}: {e}", self.passwd_file.display()))
            })?;
        parse_passwd(&content)
            .into_iter()
            .find(|p| p.name == self.user)
            .ok_or_else(|| ExecError::Privilege(format!("unknown user '{}'", self.user)))
    }

    async fn read_groups(&self) -> Vec<GroupEntry> {
        match tokio::fs::read_to_string(&self.group_file).await {
            Ok(content) => parse_group(&content),
            Err(e) => {
                warn!(path = %self.group_file.display(), error = %e, "cannot read group database");
                Vec::new()
            }
        }
    }

    fn socket_gid(&self) -> Option<u32> {
        match std::fs::metadata(&self.socket) {
            Ok(meta) if meta.file_type().is_socket() => {
                info!(gid = meta.gid(), "shared socket found");
                Some(meta.gid())
            }
            Ok(_) => {
                warn!("shared socket path is not a socket, skipping group mapping");
                None
            }
            Err(_) => {
                info!("shared socket not present, skipping group mapping");
                None
            }
        }
    }

    /// Name of the group owning `gid`, creating it when no group has that id.
    async fn ensure_group(&self, gid: u32, groups: &[GroupEntry]) -> Option<String> {
        if let Some(existing) = groups.iter().find(|g| g.gid == gid) {
            info!(group = %existing.name, gid, "reusing existing group for socket");
            return Some(existing.name.clone());
        }

        // The preferred name may already be taken with another id.
        let name = if groups.iter().any(|g| g.name == SOCKET_GROUP) {
            format!("{SOCKET_GROUP}-{gid}")
        } else {
            SOCKET_GROUP.to_string()
        };
        let created = run_tool("groupadd", &["-g", &gid.to_string(), &name]).await;
        created.then_some(name)
    }

    async fn ensure_member(&self, group: &str, groups: &[GroupEntry]) {
        let already = groups
            .iter()
            .any(|g| g.name == group && g.has_member(&self.user));
        if already {
            return;
        }
        run_tool("usermod", &["-aG", group, &self.user]).await;
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }
}

fn push_unique(groups: &mut Vec<u32>, gid: u32) {
    if !groups.contains(&gid) {
        groups.push(gid);
    }
}

/// Run an account-management tool; failures are advisory.
async fn run_tool(program: &str, args: &[&str]) -> bool {
    match Command::new(program).args(args).status().await {
        Ok(status) if status.success() => {
            info!(program, ?args, "account update applied");
            true
        }
        Ok(status) => {
            warn!(program, ?args, %status, "account update failed, continuing");
            false
        }
        Err(e) => {
            warn!(program, ?args, error = %e, "account tool unavailable, continuing");
            false
        }
    }
}

use super::model::{remove_dir, Workspace};
use moka::future::Cache;
use moka::notification::{ListenerFuture, RemovalCause};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Upper bound on live workspaces, far above what one instance serves
const MAX_WORKSPACES: u64 = 10_000;

/// Hands out one private workspace per request and reclaims it on close or
/// after the lease has been idle for `lease`.
///
/// Expired storage is purged with `tokio::fs` while the cache runs its
/// pending tasks, i.e. during [`WorkspaceManager::sweep`].
pub struct WorkspaceManager {
    root: PathBuf,
    leases: Cache<Uuid, Arc<Workspace>>,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>, lease: Duration) -> Self {
        let leases = Cache::builder()
            .max_capacity(MAX_WORKSPACES)
            .time_to_idle(lease)
            .async_eviction_listener(
                |id: Arc<Uuid>, workspace: Arc<Workspace>, cause| -> ListenerFuture {
                    Box::pin(async move {
                        // Explicit removals are cleaned up by `close` itself
                        if !matches!(cause, RemovalCause::Expired | RemovalCause::Size) {
                            return;
                        }
                        if workspace.is_in_flight() {
                            tracing::debug!(
                                workspace_id = %id,
                                "Lease expired mid-run, keeping storage"
                            );
                            return;
                        }
                        tracing::info!(
                            workspace_id = %id,
                            cause = ?cause,
                            "Workspace lease expired"
                        );
                        workspace.release().await;
                    })
                },
            )
            .build();

        Self {
            root: root.into(),
            leases,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh workspace. Storage is created on first write.
    pub async fn open(&self) -> Arc<Workspace> {
        let id = Uuid::new_v4();
        let workspace = Arc::new(Workspace::new(id, &self.root));
        self.leases.insert(id, workspace.clone()).await;

        tracing::debug!(workspace_id = %id, dir = %workspace.dir().display(), "Workspace opened");
        workspace
    }

    /// Find a live workspace. Refreshes its lease.
    pub async fn resolve(&self, id: Uuid) -> Option<Arc<Workspace>> {
        self.leases.get(&id).await
    }

    /// Keep the lease of a workspace a request is still working in.
    ///
    /// A lease that lapsed during the run is taken out again; the storage of
    /// an in-flight workspace survives expiry.
    pub async fn renew(&self, workspace: &Arc<Workspace>) {
        let id = workspace.id();
        if self.leases.get(&id).await.is_none() {
            tracing::warn!(workspace_id = %id, "Workspace lease lapsed mid-run, renewing");
            self.leases.insert(id, workspace.clone()).await;
        }
    }

    /// Release a workspace and everything it stored.
    ///
    /// Safe to call repeatedly and for ids that were never opened.
    pub async fn close(&self, id: Uuid) {
        match self.leases.remove(&id).await {
            Some(workspace) => {
                workspace.release().await;
                tracing::info!(workspace_id = %id, "Workspace closed");
            }
            None => remove_dir(&self.root.join(id.to_string())).await,
        }
    }

    /// Run pending lease expirations
    pub async fn sweep(&self) {
        self.leases.run_pending_tasks().await;
    }

    /// Check that the workspace root accepts writes
    pub async fn check_storage(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let probe = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await
    }

    pub fn live_count(&self) -> u64 {
        self.leases.entry_count()
    }
}

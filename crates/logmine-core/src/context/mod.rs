//! Request-scoped context propagation
//!
//! Binds one resolved [`DatasetArtefacts`] bundle (and, optionally, the
//! active [`ChatSession`]) to the dynamic extent of a single inbound request,
//! so that analysis tools invoked arbitrarily deep inside the pipeline can
//! retrieve "the current dataset" without it being threaded through every
//! call signature.
//!
//! The binding is a tokio task-local, never a process-wide global: code
//! running under a scope sees its values, concurrently scheduled scopes never
//! observe each other, nested scopes shadow and restore the outer binding on
//! every exit path, including panics and early returns.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::dataset::DatasetArtefacts;
use crate::error::{LogmineError, LogmineResult};
use crate::session::ChatSession;

/// Shared handle to the mutable session bound to a request
pub type SharedSession = Arc<RwLock<ChatSession>>;

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Dataset artefacts and chat session scoped to the current request
#[derive(Debug, Clone)]
pub struct RequestContext {
    artefacts: Arc<DatasetArtefacts>,
    session: Option<SharedSession>,
}

impl RequestContext {
    /// Create a context for the given artefact bundle
    pub fn new(artefacts: Arc<DatasetArtefacts>) -> Self {
        Self {
            artefacts,
            session: None,
        }
    }

    /// Attach the active chat session
    pub fn with_session(mut self, session: SharedSession) -> Self {
        self.session = Some(session);
        self
    }

    /// The artefact bundle bound to this context
    pub fn artefacts(&self) -> &Arc<DatasetArtefacts> {
        &self.artefacts
    }

    /// The session bound to this context, if any
    pub fn session(&self) -> Option<&SharedSession> {
        self.session.as_ref()
    }

    /// Run `future` with this context bound for its entire dynamic extent.
    ///
    /// The previous binding (if any) is restored when the future completes,
    /// on every exit path.
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: std::future::Future,
    {
        REQUEST_CONTEXT.scope(self, future).await
    }

    /// Synchronous variant of [`RequestContext::scope`] for non-async callers
    pub fn sync_scope<F, R>(self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        REQUEST_CONTEXT.sync_scope(self, f)
    }
}

/// The context bound to the current task, if inside a scope
pub fn current() -> Option<RequestContext> {
    REQUEST_CONTEXT.try_with(|ctx| ctx.clone()).ok()
}

/// The artefact bundle of the current request.
///
/// Errors when called outside an active request scope; analysis tools are
/// only ever invoked inside one.
pub fn current_artefacts() -> LogmineResult<Arc<DatasetArtefacts>> {
    current()
        .map(|ctx| ctx.artefacts)
        .ok_or_else(|| LogmineError::invalid_input("No dataset is bound to the current request"))
}

/// The chat session of the current request, if one is bound
pub fn current_session() -> Option<SharedSession> {
    current().and_then(|ctx| ctx.session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChatSession;

    async fn artefacts_for(dataset_id: &str) -> Arc<DatasetArtefacts> {
        // Only the identity matters here; resolution proper is covered in
        // the dataset module.
        let dir = tempfile::tempdir().unwrap();
        Arc::new(crate::dataset::resolver::test_support::bundle(
            dir.path(),
            dataset_id,
            "user-1",
        ))
    }

    #[tokio::test]
    async fn test_current_outside_scope_is_absent() {
        assert!(current().is_none());
        assert!(current_artefacts().is_err());
        assert!(current_session().is_none());
    }

    #[tokio::test]
    async fn test_scope_binds_and_restores() {
        let artefacts = artefacts_for("ds-a").await;

        RequestContext::new(artefacts.clone())
            .scope(async {
                let bound = current_artefacts().unwrap();
                assert_eq!(bound.dataset_id(), "ds-a");
            })
            .await;

        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_and_restores_outer() {
        let outer = artefacts_for("ds-outer").await;
        let inner = artefacts_for("ds-inner").await;

        RequestContext::new(outer)
            .scope(async {
                assert_eq!(current_artefacts().unwrap().dataset_id(), "ds-outer");

                RequestContext::new(inner)
                    .scope(async {
                        assert_eq!(current_artefacts().unwrap().dataset_id(), "ds-inner");
                    })
                    .await;

                assert_eq!(current_artefacts().unwrap().dataset_id(), "ds-outer");
            })
            .await;
    }

    #[tokio::test]
    async fn test_concurrent_scopes_never_cross_contaminate() {
        let a = artefacts_for("ds-a").await;
        let b = artefacts_for("ds-b").await;

        let task_a = RequestContext::new(a).scope(async {
            for _ in 0..32 {
                assert_eq!(current_artefacts().unwrap().dataset_id(), "ds-a");
                tokio::task::yield_now().await;
            }
        });
        let task_b = RequestContext::new(b).scope(async {
            for _ in 0..32 {
                assert_eq!(current_artefacts().unwrap().dataset_id(), "ds-b");
                tokio::task::yield_now().await;
            }
        });

        tokio::join!(task_a, task_b);
    }

    #[tokio::test]
    async fn test_session_binding() {
        let artefacts = artefacts_for("ds-a").await;
        let session = Arc::new(RwLock::new(ChatSession::new(
            "user-1",
            "ds-a",
            "session-20240305-140702",
        )));

        RequestContext::new(artefacts)
            .with_session(session.clone())
            .scope(async {
                let bound = current_session().unwrap();
                bound.write().await.append(crate::session::ChatRole::User, "Hi ");
                assert_eq!(bound.read().await.num_turns(), 1);
            })
            .await;

        assert_eq!(session.read().await.num_turns(), 1);
    }
}

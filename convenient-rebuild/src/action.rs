//! Producer-supplied rebuild actions

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Error type returned by rebuild actions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Zero-argument async action that regenerates an artifact
///
/// The action must write the artifact to its declared path before resolving.
/// The engine invokes it at most once per registration or check call.
pub type RebuildAction = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Wrap an async closure into a [`RebuildAction`]
///
/// ```
/// use convenient_rebuild::rebuild_action;
///
/// let action = rebuild_action(|| async {
///     tokio::fs::write("dist/out.txt", b"generated").await?;
///     Ok(())
/// });
/// # drop(action);
/// ```
pub fn rebuild_action<F, Fut>(action: F) -> RebuildAction
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move || Box::pin(action()))
}

//! User hooks
//!
//! Hooks are asynchronous and may fail. A hook that panics is treated the
//! same as one that returns an error: [`run_hook`] executes the hook on its
//! own task so the panic is contained and reported as a message.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Error type returned by user hooks
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by user hooks
pub type HookResult<T> = std::result::Result<T, HookError>;

/// Rewrites the bytes of a source file.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn transform(&self, content: Vec<u8>, absolute_filename: &Path) -> HookResult<Vec<u8>>;

    /// Stable token identifying this transform's behaviour. Part of the
    /// transform cache key: change it whenever the output would change.
    fn identity(&self) -> String;
}

/// Decides whether a matched file is copied.
#[async_trait]
pub trait Filter: Send + Sync {
    async fn filter(&self, absolute_filename: &Path) -> HookResult<bool>;
}

/// Rewrites a final destination name.
#[async_trait]
pub trait PathTransform: Send + Sync {
    async fn transform_path(&self, target: &str, absolute_filename: &Path) -> HookResult<String>;
}

/// Derives the transform cache keys from the default ones.
#[async_trait]
pub trait CacheKeys: Send + Sync {
    async fn keys(
        &self,
        defaults: BTreeMap<String, Value>,
        absolute_filename: &Path,
    ) -> HookResult<BTreeMap<String, Value>>;
}

/// Closure-backed [`Transform`]
pub struct FnTransform<F> {
    identity: String,
    f: F,
}

/// Build a [`Transform`] from an async closure and its identity token.
pub fn transform_fn<F, Fut>(identity: impl Into<String>, f: F) -> FnTransform<F>
where
    F: Fn(Vec<u8>, PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<Vec<u8>>> + Send,
{
    FnTransform {
        identity: identity.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> Transform for FnTransform<F>
where
    F: Fn(Vec<u8>, PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<Vec<u8>>> + Send,
{
    async fn transform(&self, content: Vec<u8>, absolute_filename: &Path) -> HookResult<Vec<u8>> {
        (self.f)(content, absolute_filename.to_path_buf()).await
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }
}

/// Closure-backed [`Filter`]
pub struct FnFilter<F>(F);

pub fn filter_fn<F, Fut>(f: F) -> FnFilter<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<bool>> + Send,
{
    FnFilter(f)
}

#[async_trait]
impl<F, Fut> Filter for FnFilter<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<bool>> + Send,
{
    async fn filter(&self, absolute_filename: &Path) -> HookResult<bool> {
        (self.0)(absolute_filename.to_path_buf()).await
    }
}

/// Closure-backed [`PathTransform`]
pub struct FnPathTransform<F>(F);

pub fn transform_path_fn<F, Fut>(f: F) -> FnPathTransform<F>
where
    F: Fn(String, PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<String>> + Send,
{
    FnPathTransform(f)
}

#[async_trait]
impl<F, Fut> PathTransform for FnPathTransform<F>
where
    F: Fn(String, PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<String>> + Send,
{
    async fn transform_path(&self, target: &str, absolute_filename: &Path) -> HookResult<String> {
        (self.0)(target.to_string(), absolute_filename.to_path_buf()).await
    }
}

/// Closure-backed [`CacheKeys`]
pub struct FnCacheKeys<F>(F);

pub fn cache_keys_fn<F, Fut>(f: F) -> FnCacheKeys<F>
where
    F: Fn(BTreeMap<String, Value>, PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<BTreeMap<String, Value>>> + Send,
{
    FnCacheKeys(f)
}

#[async_trait]
impl<F, Fut> CacheKeys for FnCacheKeys<F>
where
    F: Fn(BTreeMap<String, Value>, PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult<BTreeMap<String, Value>>> + Send,
{
    async fn keys(
        &self,
        defaults: BTreeMap<String, Value>,
        absolute_filename: &Path,
    ) -> HookResult<BTreeMap<String, Value>> {
        (self.0)(defaults, absolute_filename.to_path_buf()).await
    }
}

/// Run a hook future on its own task.
///
/// Returns the hook's value, or a message describing its error or panic.
pub(crate) async fn run_hook<T, Fut>(future: Fut) -> std::result::Result<T, String>
where
    T: Send + 'static,
    Fut: Future<Output = HookResult<T>> + Send + 'static,
{
    match tokio::spawn(future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(join) if join.is_panic() => Err(panic_message(join.into_panic())),
        Err(join) => Err(join.to_string()),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "hook panicked with a non-string payload".to_string()
    }
}

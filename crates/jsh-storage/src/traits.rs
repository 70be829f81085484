//! Storage contract and handler traits.
//!
//! Each capability is its own trait so a resource can expose any subset of
//! them. Every trait is implemented for async closures with the matching
//! signature, so small handlers can be registered inline:
//!
//! ```ignore
//! node.register_get(|_ctx: RequestContext, id: String| async move {
//!     Ok::<_, Failure>(Object::new(id, "user"))
//! })?;
//! ```
//!
//! Implementations must be thread-safe: operations are invoked concurrently
//! for independent requests.

use std::future::Future;

use async_trait::async_trait;

use jsh_domain::{Failure, Object, RequestContext};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, Failure>;

/// Saves a new object. Backs `POST /{types}`.
#[async_trait]
pub trait Save: Send + Sync + 'static {
    /// Persists `object` and returns the stored version, including the id
    /// assigned by the backend.
    async fn save(&self, ctx: RequestContext, object: Object) -> StorageResult<Object>;

    /// Status sent after a successful save.
    fn created_status(&self) -> u16 {
        201
    }
}

/// Fetches one object by id. Backs `GET /{types}/:id`.
#[async_trait]
pub trait Get: Send + Sync + 'static {
    async fn get(&self, ctx: RequestContext, id: String) -> StorageResult<Object>;
}

/// Lists all objects. Backs `GET /{types}`.
#[async_trait]
pub trait List: Send + Sync + 'static {
    async fn list(&self, ctx: RequestContext) -> StorageResult<jsh_domain::List>;
}

/// Updates an existing object. Backs `PATCH /{types}/:id`.
#[async_trait]
pub trait Update: Send + Sync + 'static {
    async fn update(&self, ctx: RequestContext, object: Object) -> StorageResult<Object>;
}

/// Deletes an object by id. Backs `DELETE /{types}/:id`.
#[async_trait]
pub trait Delete: Send + Sync + 'static {
    async fn delete(&self, ctx: RequestContext, id: String) -> StorageResult<()>;
}

/// The full storage contract.
pub trait Crud: Save + Get + List + Update + Delete {}

impl<T> Crud for T where T: Save + Get + List + Update + Delete {}

/// A custom state-mutating action. Backs `PATCH /{types}/:id/{action}`.
///
/// Receives the request document's object, exactly as an update would: its
/// id is always the identifier from the path.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    async fn apply(&self, ctx: RequestContext, object: Object) -> StorageResult<Object>;
}

/// Resolves a to-one relationship of the object `parent_id`.
#[async_trait]
pub trait ToOne: Send + Sync + 'static {
    async fn fetch(&self, ctx: RequestContext, parent_id: String) -> StorageResult<Object>;
}

/// Resolves a to-many relationship of the object `parent_id`.
#[async_trait]
pub trait ToMany: Send + Sync + 'static {
    async fn fetch(&self, ctx: RequestContext, parent_id: String)
        -> StorageResult<jsh_domain::List>;
}

#[async_trait]
impl<F, Fut> Save for F
where
    F: Fn(RequestContext, Object) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorageResult<Object>> + Send,
{
    async fn save(&self, ctx: RequestContext, object: Object) -> StorageResult<Object> {
        self(ctx, object).await
    }
}

#[async_trait]
impl<F, Fut> Get for F
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorageResult<Object>> + Send,
{
    async fn get(&self, ctx: RequestContext, id: String) -> StorageResult<Object> {
        self(ctx, id).await
    }
}

#[async_trait]
impl<F, Fut> List for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorageResult<jsh_domain::List>> + Send,
{
    async fn list(&self, ctx: RequestContext) -> StorageResult<jsh_domain::List> {
        self(ctx).await
    }
}

#[async_trait]
impl<F, Fut> Update for F
where
    F: Fn(RequestContext, Object) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorageResult<Object>> + Send,
{
    async fn update(&self, ctx: RequestContext, object: Object) -> StorageResult<Object> {
        self(ctx, object).await
    }
}

#[async_trait]
impl<F, Fut> Delete for F
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorageResult<()>> + Send,
{
    async fn delete(&self, ctx: RequestContext, id: String) -> StorageResult<()> {
        self(ctx, id).await
    }
}

#[async_trait]
impl<F, Fut> Action for F
where
    F: Fn(RequestContext, Object) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorageResult<Object>> + Send,
{
    async fn apply(&self, ctx: RequestContext, object: Object) -> StorageResult<Object> {
        self(ctx, object).await
    }
}

#[async_trait]
impl<F, Fut> ToOne for F
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorageResult<Object>> + Send,
{
    async fn fetch(&self, ctx: RequestContext, parent_id: String) -> StorageResult<Object> {
        self(ctx, parent_id).await
    }
}

#[async_trait]
impl<F, Fut> ToMany for F
where
    F: Fn(RequestContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorageResult<jsh_domain::List>> + Send,
{
    async fn fetch(
        &self,
        ctx: RequestContext,
        parent_id: String,
    ) -> StorageResult<jsh_domain::List> {
        self(ctx, parent_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsh_domain::ErrorObject;

    async fn call_get(op: &dyn Get, id: &str) -> StorageResult<Object> {
        op.get(RequestContext::detached(), id.to_string()).await
    }

    #[tokio::test]
    async fn test_closure_implements_get() {
        let op = |_ctx: RequestContext, id: String| async move {
            Ok::<_, Failure>(Object::new(id, "user"))
        };
        let object = call_get(&op, "7").await.unwrap();
        assert_eq!(object.id, "7");
    }

    #[tokio::test]
    async fn test_closure_failure_passes_through() {
        let op = |_ctx: RequestContext, id: String| async move {
            Err::<Object, Failure>(ErrorObject::not_found(format!("user {id}")).into())
        };
        let failure = call_get(&op, "9").await.unwrap_err();
        assert_eq!(failure.status(), 404);
    }

    #[tokio::test]
    async fn test_closure_save_uses_default_created_status() {
        let op = |_ctx: RequestContext, mut object: Object| async move {
            object.id = "1".to_string();
            Ok::<_, Failure>(object)
        };
        assert_eq!(Save::created_status(&op), 201);
        let saved = op
            .save(RequestContext::detached(), Object::new("", "user"))
            .await
            .unwrap();
        assert_eq!(saved.id, "1");
    }

    #[tokio::test]
    async fn test_closure_action_receives_object() {
        let op = |_ctx: RequestContext, mut object: Object| async move {
            let renamed = object.attribute("name").cloned();
            object.set_attribute("previous", renamed.unwrap_or_default());
            Ok::<_, Failure>(object)
        };
        let mut input = Object::new("4", "user");
        input.set_attribute("name", "x");
        let object = op
            .apply(RequestContext::detached(), input)
            .await
            .unwrap();
        assert_eq!(object.id, "4");
        assert_eq!(object.attribute("previous"), Some(&serde_json::json!("x")));
    }

    #[tokio::test]
    async fn test_closure_implements_to_many() {
        let op = |_ctx: RequestContext, parent: String| async move {
            Ok::<_, Failure>(vec![Object::new(format!("{parent}-a"), "tag")])
        };
        let list = ToMany::fetch(&op, RequestContext::detached(), "3".to_string())
            .await
            .unwrap();
        assert_eq!(list[0].id, "3-a");
    }
}

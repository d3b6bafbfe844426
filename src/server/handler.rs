use crate::Result;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub(super) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased async method handler
///
/// Handlers take the request's positional arguments and produce the result
/// value framed back to the caller, or fail.
///
/// Wrapped in Arc for cheap cloning when spawning per-request tasks.
pub(super) trait HandlerFn: Send + Sync {
    fn call(&self, args: Vec<Value>) -> BoxFuture<'static, Result<Value>>;
}

pub(super) type BoxedHandler = Arc<dyn HandlerFn>;

// Adapter from a plain async closure to the trait object.
struct Handler<F> {
    func: F,
}

impl<F, Fut> HandlerFn for Handler<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn call(&self, args: Vec<Value>) -> BoxFuture<'static, Result<Value>> {
        // ---
        Box::pin((self.func)(args))
    }
}

/// Wrap an async closure into a [`BoxedHandler`]
///
/// This allows the registry to store handlers of different closure types in
/// the same map.
pub(super) fn wrap<F, Fut>(func: F) -> BoxedHandler
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    // ---
    Arc::new(Handler { func })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_wrapped_handler_sees_positional_args() {
        // ---
        let handler = wrap(|args: Vec<Value>| async move { Ok(json!(args.len())) });

        let result = handler.call(vec![json!(1), json!("two")]).await.unwrap();
        assert_eq!(result, json!(2));
    }
}

//! Adapting async functions into pipeline endpoints.
//!
//! Any `async fn` whose arguments all implement [`FromRequest`] and whose
//! output implements [`IntoResponse`] is a [`Handler`]. Arguments are
//! extracted left to right; the first failure is rendered by the
//! [`ErrorMapper`] and the remaining extractors never run.

use std::future::Future;
use std::sync::Arc;

use kairos_core::{RequestContext, Response};
use kairos_middleware::{BoxFuture, Endpoint};

use crate::{ErrorMapper, FromRequest, IntoResponse};

/// An async function usable as a route handler.
///
/// `Args` is the tuple of extractor types and only serves to keep the
/// implementations for different arities apart.
pub trait Handler<Args>: Clone + Send + Sync + 'static {
    /// Extracts the arguments from `ctx`, runs the handler and converts its
    /// output.
    fn call(&self, ctx: RequestContext, errors: Arc<dyn ErrorMapper>) -> BoxFuture<'static, Response>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoResponse,
            $($ty: FromRequest + 'static,)*
        {
            fn call(
                &self,
                mut ctx: RequestContext,
                errors: Arc<dyn ErrorMapper>,
            ) -> BoxFuture<'static, Response> {
                let handler = self.clone();
                Box::pin(async move {
                    $(
                        let $ty = match <$ty as FromRequest>::from_request(&mut ctx).await {
                            Ok(value) => value,
                            Err(err) => return errors.map(err),
                        };
                    )*
                    handler($($ty),*).await.into_response()
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

/// Wraps a handler as the innermost stage of a route pipeline.
pub fn into_endpoint<H, Args>(handler: H, errors: Arc<dyn ErrorMapper>) -> Endpoint
where
    H: Handler<Args>,
    Args: 'static,
{
    Arc::new(move |ctx| handler.call(ctx, Arc::clone(&errors)))
}

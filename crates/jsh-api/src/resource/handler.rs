//! Bound capabilities and their axum endpoints.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::rejection::BytesRejection,
    routing::{delete, get, patch, post, MethodRouter},
    Extension,
};
use jsh_storage::{Action, Delete, Get, List, Save, ToMany, ToOne, Update};

use crate::dispatch::Dispatcher;
use crate::extract::{OwnIdParam, RequestScope};
use crate::routes::RouteEntry;

/// A capability bound to one route.
#[derive(Clone)]
pub(crate) enum Handler {
    Save(Arc<dyn Save>),
    Get(Arc<dyn Get>),
    List(Arc<dyn List>),
    Update(Arc<dyn Update>),
    Delete(Arc<dyn Delete>),
    Action(Arc<dyn Action>),
    ToOne(Arc<dyn ToOne>),
    ToMany(Arc<dyn ToMany>),
    Custom(MethodRouter),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Handler::Save(_) => "Save",
            Handler::Get(_) => "Get",
            Handler::List(_) => "List",
            Handler::Update(_) => "Update",
            Handler::Delete(_) => "Delete",
            Handler::Action(_) => "Action",
            Handler::ToOne(_) => "ToOne",
            Handler::ToMany(_) => "ToMany",
            Handler::Custom(_) => "Custom",
        };
        f.write_str(kind)
    }
}

/// A route-table entry together with what serves it.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub entry: RouteEntry,
    pub handler: Handler,
}

impl Binding {
    /// Builds the axum path and method router for this binding.
    pub fn endpoint(
        &self,
        prefix: &str,
        resource_type: &str,
        dispatcher: &Dispatcher,
    ) -> (String, MethodRouter) {
        let (path, own_id) = self.entry.router_path(prefix, resource_type);
        let method_router = method_router(&self.handler, resource_type, dispatcher);

        let method_router = match own_id {
            Some(name) => method_router.layer(Extension(OwnIdParam(Arc::from(name)))),
            None => method_router,
        };
        (path, method_router)
    }
}

fn method_router(handler: &Handler, resource_type: &str, dispatcher: &Dispatcher) -> MethodRouter {
    let dispatcher = dispatcher.clone();
    let resource_type: Arc<str> = Arc::from(resource_type);

    match handler {
        Handler::Save(op) => {
            let op = Arc::clone(op);
            post(
                move |scope: RequestScope, body: Result<Bytes, BytesRejection>| async move {
                    let (ctx, _guard) = scope.into_parts();
                    dispatcher.save(ctx, op.as_ref(), &resource_type, body).await
                },
            )
        }
        Handler::Get(op) => {
            let op = Arc::clone(op);
            get(move |scope: RequestScope| async move {
                let (ctx, _guard) = scope.into_parts();
                dispatcher.get(ctx, op.as_ref()).await
            })
        }
        Handler::List(op) => {
            let op = Arc::clone(op);
            get(move |scope: RequestScope| async move {
                let (ctx, _guard) = scope.into_parts();
                dispatcher.list(ctx, op.as_ref()).await
            })
        }
        Handler::Update(op) => {
            let op = Arc::clone(op);
            patch(
                move |scope: RequestScope, body: Result<Bytes, BytesRejection>| async move {
                    let (ctx, _guard) = scope.into_parts();
                    dispatcher.update(ctx, op.as_ref(), &resource_type, body).await
                },
            )
        }
        Handler::Delete(op) => {
            let op = Arc::clone(op);
            delete(move |scope: RequestScope| async move {
                let (ctx, _guard) = scope.into_parts();
                dispatcher.delete(ctx, op.as_ref()).await
            })
        }
        Handler::Action(op) => {
            let op = Arc::clone(op);
            patch(
                move |scope: RequestScope, body: Result<Bytes, BytesRejection>| async move {
                    let (ctx, _guard) = scope.into_parts();
                    dispatcher.action(ctx, op.as_ref(), &resource_type, body).await
                },
            )
        }
        Handler::ToOne(op) => {
            let op = Arc::clone(op);
            get(move |scope: RequestScope| async move {
                let (ctx, _guard) = scope.into_parts();
                dispatcher.to_one(ctx, op.as_ref()).await
            })
        }
        Handler::ToMany(op) => {
            let op = Arc::clone(op);
            get(move |scope: RequestScope| async move {
                let (ctx, _guard) = scope.into_parts();
                dispatcher.to_many(ctx, op.as_ref()).await
            })
        }
        Handler::Custom(method_router) => method_router.clone(),
    }
}

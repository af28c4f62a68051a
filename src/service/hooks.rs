use crate::error::AppError;
use crate::service::{Record, RequestContext};
use async_trait::async_trait;
use sqlx::PgConnection;

/// Extension points run inside the operation's transaction, before commit.
/// An error aborts the operation and rolls the transaction back.
#[async_trait]
pub trait CrudHooks: Send + Sync {
    async fn on_after_create(
        &self,
        _ctx: &RequestContext,
        _conn: &mut PgConnection,
        _created: &[Record],
    ) -> Result<(), AppError> {
        Ok(())
    }

    /// `old` and `new` are index-aligned.
    async fn on_after_update(
        &self,
        _ctx: &RequestContext,
        _conn: &mut PgConnection,
        _old: &[Record],
        _new: &[Record],
    ) -> Result<(), AppError> {
        Ok(())
    }

    async fn on_before_delete(
        &self,
        _ctx: &RequestContext,
        _conn: &mut PgConnection,
        _records: &[Record],
    ) -> Result<(), AppError> {
        Ok(())
    }

    async fn on_after_delete(
        &self,
        _ctx: &RequestContext,
        _conn: &mut PgConnection,
        _records: &[Record],
    ) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl CrudHooks for NoHooks {}

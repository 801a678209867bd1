use sqlx::PgConnection;

/// A borrowed handle to a live database connection. Driven adapters run their queries
/// against [ConnectionHandle::borrow_connection].
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Access to the external systems the service talks to. Business logic only ever sees this
/// trait so driven adapters can be swapped out (or faked in tests) freely.
pub trait ExternalConnectivity: Sync {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;
}

use crate::app_env::test::TEST_DB_URL;
use crate::db;
use dotenv::dotenv;
use lazy_static::lazy_static;
use rand::{Rng, thread_rng};
use sqlx::{Connection, PgConnection, PgPool};
use std::env;
use std::future::Future;
use tokio::runtime::Runtime;

lazy_static! {
    static ref TOKIO_RT: Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Tokio runtime failed to initialize");
}

/// A throwaway database created for one test
struct TestDatabase {
    name: String,
}

impl TestDatabase {
    async fn create(server_url: &str) -> Result<Self, sqlx::Error> {
        let database_id: u32 = thread_rng().gen_range(10_000..99_999);
        let name = format!("test_db_{database_id}");

        let mut conn = PgConnection::connect(server_url).await?;
        let created = sqlx::query(&format!("CREATE DATABASE {name}"))
            .execute(&mut conn)
            .await;
        conn.close().await?;
        created?;

        Ok(TestDatabase { name })
    }

    async fn drop_database(self, server_url: &str) {
        let dropped = async {
            let mut conn = PgConnection::connect(server_url).await?;
            sqlx::query(&format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.name))
                .execute(&mut conn)
                .await?;
            conn.close().await
        };

        if let Err(error) = dropped.await {
            println!(
                "Warning: failed to drop test database {}, you may need to do it manually. Error: {error}",
                self.name
            );
        }
    }
}

/// Creates a fresh, migrated database for a test, hands the test a pool connected to it,
/// and drops the database afterwards.
///
/// Expects that the TEST_DB_URL environment variable is populated
pub fn prepare_db_and_test<F, R>(test_fn: F)
where
    R: Future<Output = ()>,
    F: FnOnce(PgPool) -> R,
{
    if dotenv().is_err() {
        println!("Test is running without .env file.");
    }

    TOKIO_RT.block_on(async move {
        let server_url = env::var(TEST_DB_URL).unwrap_or_else(|_| {
            panic!("You must provide the {TEST_DB_URL} environment variable as the base postgres connection string")
        });
        let server_url = server_url.trim_end_matches('/').to_owned();

        let test_db = TestDatabase::create(&server_url)
            .await
            .unwrap_or_else(|db_err| panic!("Failed to create test database: {db_err}"));
        let pool = db::connect_sqlx(&format!("{server_url}/{}", test_db.name))
            .await
            .expect("Could not connect to the test database");
        db::migrate(&pool)
            .await
            .expect("Could not migrate the test database");

        test_fn(pool.clone()).await;

        pool.close().await;
        test_db.drop_database(&server_url).await;
    });
}

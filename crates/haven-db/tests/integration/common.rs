use std::time::Duration;

use haven_db::{DatabaseConfig, DocumentRepository};
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// A migrated document store in a throwaway PostgreSQL container.
///
/// The container stops when this value is dropped.
pub struct TestDb {
    pub repo: DocumentRepository,
    _container: ContainerAsync<GenericImage>,
}

impl TestDb {
    pub async fn start() -> Self {
        let container = GenericImage::new("postgres", "16")
            .with_exposed_port(ContainerPort::Tcp(5432))
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .with_env_var("POSTGRES_DB", "haven_test")
            .start()
            .await
            .expect("postgres container should start");

        let host = container.get_host().await.expect("container host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("mapped postgres port");
        let config = DatabaseConfig::new(format!(
            "postgresql://postgres:postgres@{host}:{port}/haven_test"
        ));

        // The ready message can precede the server accepting TCP connections.
        let mut attempts = 0;
        let repo = loop {
            match DocumentRepository::connect(&config).await {
                Ok(repo) => break repo,
                Err(e) if attempts < 30 => {
                    attempts += 1;
                    tracing::debug!(attempts, error = %e, "Waiting for postgres");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(e) => panic!("could not connect to postgres: {e}"),
            }
        };

        repo.migrate().await.expect("migrations should apply");

        Self {
            repo,
            _container: container,
        }
    }
}

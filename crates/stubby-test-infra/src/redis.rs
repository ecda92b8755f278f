use crate::Result;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisConfig {
    #[builder(default = "8.6.0".to_string())]
    tag: String,
    /// Pings issued before giving up on a freshly started server.
    #[builder(default = 20)]
    ready_attempts: usize,
}

/// Test fixture for a disposable standalone Redis server.
pub struct RedisServer {
    container: ContainerAsync<GenericImage>,
    config: RedisConfig,
}

impl RedisServer {
    /// Starts a Redis container suitable for integration tests.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let container = GenericImage::new("redis", config.tag.as_str())
            .with_exposed_port(6379_u16.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await?;

        Ok(Self { container, config })
    }

    pub async fn host(&self) -> Result<String> {
        let host = self.container.get_host().await?.to_string();
        match host.as_str() {
            "localhost" => Ok(String::from("127.0.0.1")),
            _ => Ok(host),
        }
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(6379).await?)
    }

    pub async fn url(&self) -> Result<String> {
        Ok(format!("redis://{}:{}", self.host().await?, self.port().await?))
    }

    /// Opens a multiplexed connection, retrying until the server answers.
    pub async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let client = redis::Client::open(self.url().await?)?;

        for _ in 1..self.config.ready_attempts {
            if let Ok(conn) = Self::ping(&client).await {
                return Ok(conn);
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        // last attempt reports its error
        Self::ping(&client).await
    }

    async fn ping(client: &redis::Client) -> Result<redis::aio::MultiplexedConnection> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(conn)
    }

    /// Returns the underlying container reference.
    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}

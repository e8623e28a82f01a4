use std::{sync::Arc, time::Duration};

use mongodb::{Client, Collection, Database, bson::doc, options::ClientOptions};
use tokio::{sync::RwLock, time::sleep};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

struct RetryPolicy;

impl RetryPolicy {
    const MAX_ATTEMPTS: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 250;

    fn initial_delay() -> Duration {
        Duration::from_millis(Self::INITIAL_DELAY_MS)
    }

    fn next_delay(current: Duration) -> Duration {
        (current * 2).min(Duration::from_secs(5))
    }
}

/// Shared, reconnectable handle to the MongoDB database used by every Mongo store.
#[derive(Clone)]
pub struct MongoConnection {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoConnection {
    /// Connect and wait until the server answers a ping.
    pub async fn open(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;
        Ok(Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { client, database }),
                config,
            }),
        })
    }

    pub async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    pub async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database().await.collection::<T>(name)
    }

    pub async fn ping(&self) -> MongoResult<()> {
        self.database()
            .await
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    pub async fn reconnect(&self) -> MongoResult<()> {
        let config = &self.inner.config;
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;
        let mut guard = self.inner.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempts = 0;
    let mut delay = RetryPolicy::initial_delay();

    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => break,
            Err(err) => {
                attempts += 1;
                if attempts >= RetryPolicy::MAX_ATTEMPTS {
                    return Err(MongoDaoError::InitialPing {
                        attempts,
                        source: err,
                    });
                }
                sleep(delay).await;
                delay = RetryPolicy::next_delay(delay);
            }
        }
    }

    Ok((client, database))
}

use crate::error::UsageError;
use crate::models::UsageEvent;
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, UsageError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            UsageError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), UsageError> {
        tracing::info!("Creating MongoDB indexes for the usage collection");

        let usage = self.usage();

        // Compound index on (login, begin_time) for per-user and time-bounded queries
        let user_index = IndexModel::builder()
            .keys(doc! { "login": 1, "begin_time": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_begin_time_lookup".to_string())
                    .build(),
            )
            .build();

        usage.create_index(user_index, None).await.map_err(|e| {
            tracing::error!(
                "Failed to create user_begin_time index on usage collection: {}",
                e
            );
            UsageError::from(e)
        })?;
        tracing::info!("Created index on usage.(login, begin_time)");

        // Compound index on (login, resource_id, usage_type, begin_time desc)
        // for the exact-match and latest-event lookups
        let resource_index = IndexModel::builder()
            .keys(doc! { "login": 1, "resource_id": 1, "usage_type": 1, "begin_time": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_resource_lookup".to_string())
                    .build(),
            )
            .build();

        usage.create_index(resource_index, None).await.map_err(|e| {
            tracing::error!(
                "Failed to create user_resource index on usage collection: {}",
                e
            );
            UsageError::from(e)
        })?;
        tracing::info!("Created index on usage.(login, resource_id, usage_type, begin_time)");

        // resource_id alone serves resource teardown deletes
        let resource_id_index = IndexModel::builder()
            .keys(doc! { "resource_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("resource_id_lookup".to_string())
                    .build(),
            )
            .build();

        usage
            .create_index(resource_id_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create resource_id index on usage collection: {}",
                    e
                );
                UsageError::from(e)
            })?;
        tracing::info!("Created index on usage.resource_id");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), UsageError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                UsageError::from(e)
            })?;
        Ok(())
    }

    /// Typed handle on the `usage` collection.
    pub fn usage(&self) -> Collection<UsageEvent> {
        self.db.collection("usage")
    }
}

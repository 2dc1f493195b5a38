use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::scan::ScanOutput;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, Instrument};

use super::SessionStore;
use crate::models::{StoreError, StoreResult};

/// A session blob as persisted in DynamoDB
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session_key: String,
    pub payload: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_key: &str, payload: Vec<u8>, ttl: Duration) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1));
        Self {
            session_key: session_key.to_string(),
            payload,
            expires_at: now + ttl,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// DynamoDB implementation of the SessionStore trait.
///
/// `expires_at` is written as epoch seconds so it can double as the table's TTL attribute;
/// DynamoDB deletes lazily, so expiry is also checked on read.
pub struct DynamoDbSessionStore {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbSessionStore {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    /// Create a DynamoDB client span with X-Ray friendly attributes
    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.remote.service" = "AWS::DynamoDB",
            "aws.remote.operation" = operation,
            "aws.remote.resource.type" = "AWS::DynamoDB::Table",
            "aws.remote.resource.identifier" = %self.table_name,
            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,
            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
        )
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Convert a SessionRecord to DynamoDB attribute values
    pub fn record_to_item(&self, record: &SessionRecord) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();

        item.insert(
            "session_key".to_string(),
            AttributeValue::S(record.session_key.clone()),
        );
        item.insert(
            "payload".to_string(),
            AttributeValue::B(Blob::new(record.payload.clone())),
        );
        item.insert(
            "expires_at".to_string(),
            AttributeValue::N(record.expires_at.timestamp().to_string()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(record.updated_at.to_rfc3339()),
        );

        item
    }

    /// Convert a DynamoDB item to a SessionRecord
    pub fn item_to_record(
        &self,
        item: &HashMap<String, AttributeValue>,
    ) -> StoreResult<SessionRecord> {
        let session_key = item
            .get("session_key")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| StoreError::Backend {
                message: "Missing session_key".to_string(),
            })?
            .clone();

        // Rows written before payloads were binary hold a string; anything else is
        // handed to the cart decoder as empty
        let payload = match item.get("payload") {
            Some(AttributeValue::B(blob)) => blob.as_ref().to_vec(),
            Some(AttributeValue::S(text)) => text.as_bytes().to_vec(),
            _ => Vec::new(),
        };

        let expires_at = item
            .get("expires_at")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| StoreError::Backend {
                message: "Invalid expires_at".to_string(),
            })?;

        let updated_at = item
            .get("updated_at")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(expires_at);

        Ok(SessionRecord {
            session_key,
            payload,
            expires_at,
            updated_at,
        })
    }

    fn map_sdk_error<E, R>(&self, error: SdkError<E, R>) -> StoreError
    where
        DynamoDbError: From<SdkError<E, R>>,
    {
        if let SdkError::TimeoutError(_) = error {
            error!("DynamoDB request timed out");
            return StoreError::Timeout;
        }
        self.map_dynamodb_error(error.into())
    }

    fn map_dynamodb_error(&self, error: DynamoDbError) -> StoreError {
        error!("DynamoDB error: {:?}", error);
        match error {
            DynamoDbError::ResourceNotFoundException(_) => StoreError::TableNotFound {
                table_name: self.table_name.clone(),
            },
            other => StoreError::Backend {
                message: other.to_string(),
            },
        }
    }
}

/// Live sessions across every page of a counting scan
fn total_count(pages: &[ScanOutput]) -> usize {
    pages.iter().map(|page| page.count().max(0) as usize).sum()
}

#[async_trait]
impl SessionStore for DynamoDbSessionStore {
    #[instrument(skip(self), fields(table = %self.table_name, session_key = %key))]
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let get_span = self.create_dynamodb_span("GetItem");

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("session_key", AttributeValue::S(key.to_string()))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| self.map_sdk_error(e))
        }
        .instrument(get_span)
        .await?;

        match response.item {
            Some(item) => {
                let record = self.item_to_record(&item)?;
                if record.is_expired(Utc::now()) {
                    info!("Session record expired");
                    Ok(None)
                } else {
                    Ok(Some(record.payload))
                }
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, value), fields(table = %self.table_name, session_key = %key, bytes = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let item = self.record_to_item(&SessionRecord::new(key, value, ttl));
        let put_span = self.create_dynamodb_span("PutItem");

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .send()
                .await
                .map_err(|e| self.map_sdk_error(e))
        }
        .instrument(put_span)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table_name, session_key = %key))]
    async fn remove(&self, key: &str) -> StoreResult<()> {
        let delete_span = self.create_dynamodb_span("DeleteItem");

        async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key("session_key", AttributeValue::S(key.to_string()))
                .send()
                .await
                .map_err(|e| self.map_sdk_error(e))
        }
        .instrument(delete_span)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn len(&self) -> StoreResult<usize> {
        let scan_span = self.create_dynamodb_span("Scan");

        let pages = async {
            self.client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("expires_at > :now")
                .expression_attribute_values(
                    ":now",
                    AttributeValue::N(Utc::now().timestamp().to_string()),
                )
                .select(Select::Count)
                .into_paginator()
                .send()
                .try_collect()
                .await
                .map_err(|e| self.map_sdk_error(e))
        }
        .instrument(scan_span)
        .await?;

        Ok(total_count(&pages))
    }
}

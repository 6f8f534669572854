//! [`DynamoStore`]: [`Store`] backed by a DynamoDB table keyed by `token`.
//!
//! The store talks to DynamoDB through the narrow [`DynamoApi`] trait so the
//! item mapping and not-found handling can be exercised without a live table.
//!
//! # Item shape
//!
//! | attribute    | type | notes                      |
//! |--------------|------|----------------------------|
//! | `token`      | S    | hash key                   |
//! | `id`         | S    | UUIDv7                     |
//! | `createdAt`  | S    | RFC 3339                   |
//! | `updatedAt`  | S    | RFC 3339                   |
//! | `payload`    | S    | ciphertext hex             |
//! | `token_type` | S    |                            |
//! | `ttl`        | N    | not a DynamoDB TTL column  |
//! | `metadata`   | M    | JSON mapped onto S/N/BOOL/NULL/L/M |

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{DisplayErrorContext, SdkError},
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ScalarAttributeType,
    },
};
use chrono::{DateTime, Utc};
use common::protocol::{Metadata, NewToken};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::model::Token;

/// A DynamoDB item or key.
pub type Item = HashMap<String, AttributeValue>;

/// Hash key attribute of the token table.
pub const KEY_ATTRIBUTE: &str = "token";

/// Table name used when none is configured.
pub const DEFAULT_TABLE: &str = "token_data";

/// The DynamoDB operations the vault needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DynamoApi: Send + Sync {
    /// Point read. `Ok(None)` when the response carries no item.
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError>;

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError>;

    async fn delete_item(&self, table: &str, key: Item) -> Result<(), StoreError>;

    /// `Ok(false)` only when DynamoDB reports the table as not found.
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError>;

    /// Create an on-demand table with a string hash key.
    async fn create_table(&self, table: &str, hash_key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl DynamoApi for aws_sdk_dynamodb::Client {
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let output = point_read(self, table, key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.item().cloned())
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        aws_sdk_dynamodb::Client::put_item(self)
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<(), StoreError> {
        aws_sdk_dynamodb::Client::delete_item(self)
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        match aws_sdk_dynamodb::Client::describe_table(self)
            .table_name(table)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(false)
            }
            Err(e) => Err(sdk_error(e)),
        }
    }

    async fn create_table(&self, table: &str, hash_key: &str) -> Result<(), StoreError> {
        let attribute = AttributeDefinition::builder()
            .attribute_name(hash_key)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let key_schema = KeySchemaElement::builder()
            .attribute_name(hash_key)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        aws_sdk_dynamodb::Client::create_table(self)
            .table_name(table)
            .attribute_definitions(attribute)
            .key_schema(key_schema)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

/// Strongly consistent, so a read after an overwrite sees the new record.
fn point_read(
    client: &aws_sdk_dynamodb::Client,
    table: &str,
    key: Item,
) -> aws_sdk_dynamodb::operation::get_item::builders::GetItemFluentBuilder {
    aws_sdk_dynamodb::Client::get_item(client)
        .table_name(table)
        .set_key(Some(key))
        .consistent_read(true)
}

fn sdk_error<E, R>(e: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    StoreError::Backend(DisplayErrorContext(&e).to_string())
}

/// Token table in DynamoDB.
pub struct DynamoStore<A = aws_sdk_dynamodb::Client> {
    api: A,
    table: String,
}

impl<A: DynamoApi> DynamoStore<A> {
    pub fn new(api: A, table: impl Into<String>) -> Self {
        Self {
            api,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the table if DynamoDB reports it missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the describe or create call fails.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        if self.api.table_exists(&self.table).await? {
            debug!(table = %self.table, "token table present");
            return Ok(());
        }
        info!(table = %self.table, "token table missing; creating");
        self.api.create_table(&self.table, KEY_ATTRIBUTE).await
    }
}

#[async_trait]
impl<A: DynamoApi> Store for DynamoStore<A> {
    async fn create_token(&self, mut token: Token) -> Result<Token, StoreError> {
        token.assign_identity();
        self.api.put_item(&self.table, to_item(&token)).await?;
        Ok(token)
    }

    async fn get_token(&self, token: &str) -> Result<Token, StoreError> {
        match self.api.get_item(&self.table, key_for(token)).await? {
            Some(item) if !item.is_empty() => from_item(item),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete_token(&self, token: &Token) -> Result<(), StoreError> {
        self.api.delete_item(&self.table, key_for(&token.token)).await
    }

    fn backend(&self) -> &'static str {
        "dynamodb"
    }
}

// ---------------------------------------------------------------------------
// Item mapping
// ---------------------------------------------------------------------------

fn key_for(token: &str) -> Item {
    HashMap::from([(KEY_ATTRIBUTE.to_owned(), AttributeValue::S(token.to_owned()))])
}

fn to_item(token: &Token) -> Item {
    let metadata = token
        .data
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), json_to_attr(v)))
        .collect();

    HashMap::from([
        (KEY_ATTRIBUTE.to_owned(), AttributeValue::S(token.token.clone())),
        ("id".to_owned(), AttributeValue::S(token.id.to_string())),
        ("createdAt".to_owned(), AttributeValue::S(token.created_at.to_rfc3339())),
        ("updatedAt".to_owned(), AttributeValue::S(token.updated_at.to_rfc3339())),
        ("payload".to_owned(), AttributeValue::S(token.data.payload.clone())),
        ("token_type".to_owned(), AttributeValue::S(token.data.token_type.clone())),
        ("ttl".to_owned(), AttributeValue::N(token.data.ttl.to_string())),
        ("metadata".to_owned(), AttributeValue::M(metadata)),
    ])
}

fn from_item(mut item: Item) -> Result<Token, StoreError> {
    let token = take_string(&mut item, KEY_ATTRIBUTE)?;
    let id = Uuid::parse_str(&take_string(&mut item, "id")?)
        .map_err(|e| StoreError::Codec(format!("id: {e}")))?;
    let created_at = take_time(&mut item, "createdAt")?;
    let updated_at = take_time(&mut item, "updatedAt")?;
    let payload = take_string(&mut item, "payload")?;
    let token_type = match item.remove("token_type") {
        Some(AttributeValue::S(s)) => s,
        None => String::new(),
        Some(_) => return Err(StoreError::Codec("token_type: expected S".into())),
    };
    let ttl = match item.remove("ttl") {
        Some(AttributeValue::N(n)) => n
            .parse::<i64>()
            .map_err(|e| StoreError::Codec(format!("ttl: {e}")))?,
        None => 0,
        Some(_) => return Err(StoreError::Codec("ttl: expected N".into())),
    };
    let metadata = match item.remove("metadata") {
        Some(AttributeValue::M(map)) => map
            .into_iter()
            .map(|(k, v)| attr_to_json(v).map(|v| (k, v)))
            .collect::<Result<Metadata, _>>()?,
        None | Some(AttributeValue::Null(_)) => Metadata::new(),
        Some(_) => return Err(StoreError::Codec("metadata: expected M".into())),
    };

    Ok(Token {
        id,
        created_at,
        updated_at,
        data: NewToken {
            payload,
            token_type,
            ttl,
            metadata,
        },
        token,
    })
}

fn take_string(item: &mut Item, name: &str) -> Result<String, StoreError> {
    match item.remove(name) {
        Some(AttributeValue::S(s)) => Ok(s),
        Some(_) => Err(StoreError::Codec(format!("{name}: expected S"))),
        None => Err(StoreError::Codec(format!("{name}: missing"))),
    }
}

fn take_time(item: &mut Item, name: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw = take_string(item, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Codec(format!("{name}: {e}")))
}

fn json_to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_attr).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_attr(v)))
                .collect(),
        ),
    }
}

fn attr_to_json(value: AttributeValue) -> Result<Value, StoreError> {
    Ok(match value {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => Value::Number(parse_number(&n)?),
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(
            items
                .into_iter()
                .map(attr_to_json)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| attr_to_json(v).map(|v| (k, v)))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::Ss(set) => Value::Array(set.into_iter().map(Value::String).collect()),
        _ => return Err(StoreError::Codec("metadata: unsupported attribute type".into())),
    })
}

fn parse_number(n: &str) -> Result<serde_json::Number, StoreError> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(i.into());
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(u.into());
    }
    n.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| StoreError::Codec(format!("metadata: invalid number {n}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored_token() -> Token {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!("test"));
        metadata.insert(
            "nested".into(),
            json!({"count": 3, "ratio": 0.5, "ok": true, "none": null, "tags": ["a", "b"]}),
        );
        let mut t = Token::new(NewToken {
            payload: "c0ffee".into(),
            token_type: "bearer".into(),
            ttl: 3600,
            metadata,
        });
        t.token = "test-token-123".into();
        t.assign_identity();
        t
    }

    #[test]
    fn point_reads_are_strongly_consistent() {
        let conf = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .build();
        let client = aws_sdk_dynamodb::Client::from_conf(conf);

        let req = point_read(&client, DEFAULT_TABLE, key_for("test-token-123"));
        let input = req.as_input();
        assert_eq!(input.get_consistent_read(), &Some(true));
        assert_eq!(input.get_table_name().as_deref(), Some(DEFAULT_TABLE));
        assert!(input.get_key().as_ref().is_some_and(|k| k.contains_key(KEY_ATTRIBUTE)));
    }

    #[tokio::test]
    async fn missing_item_and_empty_item_are_both_not_found() {
        let mut none = MockDynamoApi::new();
        none.expect_get_item().times(1).returning(|_, _| Ok(None));
        let store = DynamoStore::new(none, DEFAULT_TABLE);
        assert!(matches!(
            store.get_token("nonexistent").await,
            Err(StoreError::NotFound)
        ));

        let mut empty = MockDynamoApi::new();
        empty
            .expect_get_item()
            .times(1)
            .returning(|_, _| Ok(Some(Item::new())));
        let store = DynamoStore::new(empty, DEFAULT_TABLE);
        assert!(matches!(
            store.get_token("nonexistent").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn get_token_reads_by_key_and_decodes() {
        let expected = stored_token();
        let item = to_item(&expected);
        let mut api = MockDynamoApi::new();
        api.expect_get_item()
            .withf(|table, key| {
                table == DEFAULT_TABLE
                    && key.len() == 1
                    && key.get(KEY_ATTRIBUTE) == Some(&AttributeValue::S("test-token-123".into()))
            })
            .times(1)
            .returning(move |_, _| Ok(Some(item.clone())));

        let store = DynamoStore::new(api, DEFAULT_TABLE);
        let fetched = store.get_token("test-token-123").await.unwrap();
        assert_eq!(fetched, expected);
    }

    #[tokio::test]
    async fn get_token_propagates_backend_error() {
        let mut api = MockDynamoApi::new();
        api.expect_get_item()
            .returning(|_, _| Err(StoreError::Backend("dynamodb error".into())));
        let store = DynamoStore::new(api, DEFAULT_TABLE);
        let err = store.get_token("t").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref m) if m == "dynamodb error"));
    }

    #[tokio::test]
    async fn malformed_item_is_codec_error() {
        let mut api = MockDynamoApi::new();
        api.expect_get_item().returning(|_, _| {
            Ok(Some(HashMap::from([
                ("invalid_field".to_owned(), AttributeValue::S("invalid".into())),
                ("createdAt".to_owned(), AttributeValue::N("not-a-date".into())),
            ])))
        });
        let store = DynamoStore::new(api, DEFAULT_TABLE);
        assert!(matches!(
            store.get_token("t").await,
            Err(StoreError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn create_token_assigns_identity_and_writes_full_item() {
        let mut api = MockDynamoApi::new();
        api.expect_put_item()
            .withf(|table, item| {
                table == "custom_table"
                    && item.get("token") == Some(&AttributeValue::S("abc".into()))
                    && item.get("ttl") == Some(&AttributeValue::N("60".into()))
                    && matches!(item.get("metadata"), Some(AttributeValue::M(_)))
                    && ["id", "createdAt", "updatedAt", "payload", "token_type"]
                        .iter()
                        .all(|k| item.contains_key(*k))
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let store = DynamoStore::new(api, "custom_table");
        let mut t = Token::new(NewToken {
            payload: "c0ffee".into(),
            ttl: 60,
            ..Default::default()
        });
        t.token = "abc".into();
        let created = store.create_token(t).await.unwrap();
        assert!(created.has_identity());
    }

    #[tokio::test]
    async fn create_token_propagates_put_error() {
        let mut api = MockDynamoApi::new();
        api.expect_put_item()
            .returning(|_, _| Err(StoreError::Backend("throttled".into())));
        let store = DynamoStore::new(api, DEFAULT_TABLE);
        assert!(store.create_token(stored_token()).await.is_err());
    }

    #[tokio::test]
    async fn delete_token_uses_token_key_only() {
        let mut api = MockDynamoApi::new();
        api.expect_delete_item()
            .withf(|table, key| {
                table == DEFAULT_TABLE && *key == key_for("test-token-123")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let store = DynamoStore::new(api, DEFAULT_TABLE);
        store.delete_token(&stored_token()).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_table_creates_missing_table() {
        let mut api = MockDynamoApi::new();
        api.expect_table_exists().times(1).returning(|_| Ok(false));
        api.expect_create_table()
            .withf(|table, hash_key| table == DEFAULT_TABLE && hash_key == KEY_ATTRIBUTE)
            .times(1)
            .returning(|_, _| Ok(()));
        DynamoStore::new(api, DEFAULT_TABLE).ensure_table().await.unwrap();
    }

    #[tokio::test]
    async fn ensure_table_skips_existing_table() {
        let mut api = MockDynamoApi::new();
        api.expect_table_exists().times(1).returning(|_| Ok(true));
        api.expect_create_table().never();
        DynamoStore::new(api, DEFAULT_TABLE).ensure_table().await.unwrap();
    }

    #[test]
    fn item_round_trip_preserves_metadata_types() {
        let t = stored_token();
        let back = from_item(to_item(&t)).unwrap();
        assert_eq!(back.data.metadata["nested"]["count"], json!(3));
        assert_eq!(back.data.metadata["nested"]["ratio"], json!(0.5));
        assert_eq!(back.data.metadata["nested"]["none"], Value::Null);
        assert_eq!(back, t);
    }

    #[test]
    fn optional_attributes_default() {
        let t = stored_token();
        let mut item = to_item(&t);
        item.remove("token_type");
        item.remove("ttl");
        item.remove("metadata");
        let back = from_item(item).unwrap();
        assert_eq!(back.data.token_type, "");
        assert_eq!(back.data.ttl, 0);
        assert!(back.data.metadata.is_empty());
    }

    #[test]
    fn binary_metadata_rejected() {
        let err = attr_to_json(AttributeValue::B(aws_sdk_dynamodb::primitives::Blob::new(
            vec![1u8],
        )))
        .unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }
}

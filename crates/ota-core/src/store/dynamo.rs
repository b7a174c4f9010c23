//! `DynamoDB` record store, queried with parameterized `PartiQL`.
//!
//! Every selector value is bound as a statement parameter. Attribute names
//! cannot be bound, so they are validated against [`is_attr_name`] and
//! emitted as quoted identifiers.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use ota_schema::{ContentHash, PackageRecord};
use tracing::{debug, instrument};

use super::{DecodeError, RecordStore, StoreError};
use crate::query::{Clause, Filter, is_attr_name};

/// Attributes projected by every query, in [`PackageRecord`] field order.
const PROJECTION: &str =
    r#""app", "env", "version", "ident", "url", "md5", "cpuArch", "deviceAttr""#;

/// A `PartiQL` statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text with `?` placeholders
    pub text: String,
    /// Values bound to the placeholders, in order
    pub parameters: Vec<AttributeValue>,
}

/// Render `filter` as a `SELECT` against `table`.
pub fn render_statement(table: &str, filter: &Filter) -> Result<Statement, StoreError> {
    if !is_table_name(table) {
        return Err(StoreError::InvalidQuery(format!(
            "invalid table name '{table}'"
        )));
    }

    let mut parameters = Vec::with_capacity(filter.clauses().len() * 2);
    let mut predicates = Vec::with_capacity(filter.clauses().len());

    for clause in filter.clauses() {
        match clause {
            Clause::App { app, env } => {
                predicates.push(r#"("app" = ? AND "env" = ?)"#.to_string());
                parameters.push(AttributeValue::S(app.clone()));
                parameters.push(AttributeValue::S(env.clone()));
            }
            Clause::Attr { name, env } => {
                if !is_attr_name(name) {
                    return Err(StoreError::InvalidQuery(format!(
                        "invalid attribute name '{name}'"
                    )));
                }
                predicates.push(format!(r#"("deviceAttr"."{name}" = true AND "env" = ?)"#));
                parameters.push(AttributeValue::S(env.clone()));
            }
        }
    }

    Ok(Statement {
        text: format!(
            r#"SELECT {PROJECTION} FROM "{table}" WHERE {}"#,
            predicates.join(" OR ")
        ),
        parameters,
    })
}

fn is_table_name(name: &str) -> bool {
    (3..=255).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Record store backed by a `DynamoDB` table.
#[derive(Debug, Clone)]
pub struct DynamoRecordStore {
    client: Client,
    table: String,
}

impl DynamoRecordStore {
    /// Wrap an already-configured client.
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Build a client from shared AWS configuration.
    pub fn from_config(config: &aws_config::SdkConfig, table: impl Into<String>) -> Self {
        Self::new(Client::new(config), table)
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    #[instrument(skip(self, filter), fields(table = %self.table, clauses = filter.clauses().len()))]
    async fn query(&self, filter: &Filter) -> Result<Vec<PackageRecord>, StoreError> {
        let statement = render_statement(&self.table, filter)?;
        debug!(statement = %statement.text, "executing PartiQL statement");

        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = self
                .client
                .execute_statement()
                .statement(&statement.text)
                .set_parameters(Some(statement.parameters.clone()))
                .set_next_token(next_token.take())
                .send()
                .await
                .context("ExecuteStatement failed")
                .map_err(StoreError::Backend)?;

            for item in resp.items() {
                records.push(decode_item(item)?);
            }

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = records.len(), "query returned records");
        Ok(records)
    }
}

/// Decode one `DynamoDB` item into a [`PackageRecord`].
pub fn decode_item(item: &HashMap<String, AttributeValue>) -> Result<PackageRecord, DecodeError> {
    Ok(PackageRecord {
        app: required_string(item, "app")?,
        env: required_string(item, "env")?,
        version: required_string(item, "version")?,
        ident: required_string(item, "ident")?,
        url: required_string(item, "url")?,
        md5: ContentHash::new(required_string(item, "md5")?),
        cpu_arch: optional_string(item, "cpuArch")?,
        device_attr: device_attrs(item)?,
    })
}

fn required_string(
    item: &HashMap<String, AttributeValue>,
    field: &'static str,
) -> Result<String, DecodeError> {
    optional_string(item, field)?.ok_or(DecodeError::Missing(field))
}

fn optional_string(
    item: &HashMap<String, AttributeValue>,
    field: &'static str,
) -> Result<Option<String>, DecodeError> {
    match item.get(field) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(AttributeValue::S(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DecodeError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn device_attrs(
    item: &HashMap<String, AttributeValue>,
) -> Result<Option<std::collections::BTreeMap<String, bool>>, DecodeError> {
    const FIELD: &str = "deviceAttr";
    let wrong_type = DecodeError::WrongType {
        field: FIELD,
        expected: "a map of booleans",
    };

    match item.get(FIELD) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(AttributeValue::M(map)) => map
            .iter()
            .map(|(k, v)| match v {
                AttributeValue::Bool(b) => Ok((k.clone(), *b)),
                _ => Err(wrong_type.clone()),
            })
            .collect::<Result<_, _>>()
            .map(Some),
        Some(_) => Err(wrong_type),
    }
}

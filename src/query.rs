//! Query handling: validate, wait the configured delay, answer, and record
//! organization-scoped exchanges.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::answer;
use crate::conversations::{self, ExchangeTarget};
use crate::error::{non_empty, truthy};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub repo_id: Option<Value>,
    #[serde(default)]
    pub org_id: Option<Value>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<Value>,
    #[serde(default)]
    pub anonymous_id: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// A query that names what it is about.
#[derive(Debug, Clone)]
pub struct ValidQuery {
    pub text: String,
    pub repo_id: Option<String>,
    pub target: Option<ExchangeTarget>,
}

impl QueryRequest {
    /// Returns `None` unless a query and a repository or organization id are
    /// present. Ids may be any truthy JSON value.
    pub fn validate(self) -> Option<ValidQuery> {
        let text = non_empty(&self.query)?.to_string();
        let repo_id = truthy(self.repo_id);
        let org_id = truthy(self.org_id);
        if repo_id.is_none() && org_id.is_none() {
            return None;
        }

        let target = org_id.map(|org_id| ExchangeTarget {
            org_id,
            conversation_id: truthy(self.conversation_id),
            user_id: None,
            anonymous_id: truthy(self.anonymous_id),
        });

        Some(ValidQuery {
            text,
            repo_id,
            target,
        })
    }
}

pub async fn run_query(
    pool: &SqlitePool,
    delay: Duration,
    query: &ValidQuery,
) -> Result<QueryResponse> {
    let topic = answer::classify(&query.text);
    tracing::info!(
        repo_id = query.repo_id.as_deref().unwrap_or("-"),
        org_id = query.target.as_ref().map(|t| t.org_id.as_str()).unwrap_or("-"),
        topic = ?topic,
        "answering query"
    );
    let answer = topic.answer();

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let Some(target) = &query.target else {
        return Ok(QueryResponse {
            answer: answer.to_string(),
            success: None,
            response: None,
            conversation_id: None,
        });
    };

    let conversation_id =
        conversations::record_exchange(pool, target, &query.text, answer).await?;

    Ok(QueryResponse {
        answer: answer.to_string(),
        success: Some(true),
        response: Some(answer.to_string()),
        conversation_id: Some(conversation_id),
    })
}

/// CLI entry point: classifies a query and prints the answer.
pub fn run_ask(query: &str) -> Result<()> {
    let topic = answer::classify(query);
    println!("topic: {:?}", topic);
    println!();
    println!("{}", topic.answer());
    Ok(())
}

//! Conversation log and dashboard analytics.
//!
//! Each organization-scoped query appends a user message and the assistant's
//! answer to a conversation. The dashboard aggregates over those rows.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::{format_ts_iso, now_millis};
use crate::models::{Conversation, DashboardAnalytics, Message, Role};

/// Identifies who is asking and where the exchange should land.
#[derive(Debug, Clone, Default)]
pub struct ExchangeTarget {
    pub org_id: String,
    pub conversation_id: Option<String>,
    pub user_id: Option<String>,
    pub anonymous_id: Option<String>,
}

/// Appends a question and its answer, creating the conversation when the
/// target names none or names one that does not exist in this org.
/// Returns the conversation id.
pub async fn record_exchange(
    pool: &SqlitePool,
    target: &ExchangeTarget,
    question: &str,
    answer: &str,
) -> Result<String> {
    let mut tx = pool.begin().await?;

    let existing: Option<String> = match &target.conversation_id {
        Some(id) => {
            sqlx::query_scalar("SELECT id FROM conversations WHERE id = ? AND org_id = ?")
                .bind(id)
                .bind(&target.org_id)
                .fetch_optional(&mut *tx)
                .await?
        }
        None => None,
    };

    let now = now_millis();
    let conversation_id = match existing {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            let anonymous_id = target
                .anonymous_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            sqlx::query(
                "INSERT INTO conversations (id, org_id, user_id, anonymous_id, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&target.org_id)
            .bind(&target.user_id)
            .bind(&anonymous_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            tracing::debug!(conversation_id = %id, org_id = %target.org_id, "started conversation");
            id
        }
    };

    for (role, content) in [(Role::User, question), (Role::Assistant, answer)] {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&conversation_id)
        .bind(role.as_str())
        .bind(content)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(conversation_id)
}

/// All conversations of an organization, newest first, each carrying its
/// messages newest first.
pub async fn list_conversations(pool: &SqlitePool, org_id: &str) -> Result<Vec<Conversation>> {
    let conv_rows = sqlx::query(
        "SELECT id, org_id, user_id, anonymous_id, created_at FROM conversations WHERE org_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    let msg_rows = sqlx::query(
        r#"
        SELECT m.id, m.conversation_id, m.role, m.content, m.created_at
        FROM messages m
        JOIN conversations c ON c.id = m.conversation_id
        WHERE c.org_id = ?
        ORDER BY m.created_at DESC, m.rowid DESC
        "#,
    )
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    let mut by_conversation: HashMap<String, Vec<Message>> = HashMap::new();
    for row in msg_rows {
        let role_str: String = row.get("role");
        let role = if role_str == "assistant" {
            Role::Assistant
        } else {
            Role::User
        };
        let conversation_id: String = row.get("conversation_id");
        by_conversation
            .entry(conversation_id.clone())
            .or_default()
            .push(Message {
                id: row.get("id"),
                conversation_id,
                content: row.get("content"),
                role,
                created_at: format_ts_iso(row.get("created_at")),
            });
    }

    Ok(conv_rows
        .iter()
        .map(|row| {
            let id: String = row.get("id");
            let messages = by_conversation.remove(&id).unwrap_or_default();
            Conversation {
                id,
                user_id: row.get("user_id"),
                anonymous_id: row.get("anonymous_id"),
                org_id: row.get("org_id"),
                created_at: format_ts_iso(row.get("created_at")),
                messages,
            }
        })
        .collect())
}

pub async fn dashboard_analytics(pool: &SqlitePool, org_id: &str) -> Result<DashboardAnalytics> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM messages m JOIN conversations c ON c.id = m.conversation_id
                WHERE c.org_id = ? AND m.role = 'user') AS total_queries,
            (SELECT COUNT(DISTINCT COALESCE(user_id, anonymous_id)) FROM conversations
                WHERE org_id = ?) AS total_users,
            (SELECT COUNT(*) FROM conversations WHERE org_id = ?) AS total_conversations,
            (SELECT COUNT(*) FROM messages m JOIN conversations c ON c.id = m.conversation_id
                WHERE c.org_id = ?) AS total_messages
        "#,
    )
    .bind(org_id)
    .bind(org_id)
    .bind(org_id)
    .bind(org_id)
    .fetch_one(pool)
    .await?;

    let total_queries: i64 = row.get("total_queries");
    let total_users: i64 = row.get("total_users");
    let total_conversations: i64 = row.get("total_conversations");
    let total_messages: i64 = row.get("total_messages");

    Ok(DashboardAnalytics {
        total_queries: total_queries.to_string(),
        total_users: total_users.to_string(),
        average_conversation_length: average_length(total_messages, total_conversations),
    })
}

/// Messages per conversation, rounded to two decimals; 0 with no
/// conversations.
fn average_length(messages: i64, conversations: i64) -> f64 {
    if conversations == 0 {
        return 0.0;
    }
    let avg = messages as f64 / conversations as f64;
    (avg * 100.0).round() / 100.0
}

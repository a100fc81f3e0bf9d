//! Demo repository catalog.
//!
//! The dashboard lists a fixed set of five repositories. Creating a
//! repository only derives its name and id from the request; nothing is
//! stored.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::{Repository, RepositorySummary};

/// `(id, name, date added, url)`
const CATALOG: &[(&str, &str, &str, &str)] = &[
    (
        "1",
        "API Documentation",
        "Jun 15, 2023",
        "https://github.com/user/api-docs",
    ),
    (
        "2",
        "User Authentication Flow",
        "Jun 14, 2023",
        "https://github.com/user/auth-flow",
    ),
    (
        "3",
        "Payment Integration",
        "Mar 4, 2024",
        "https://github.com/user/payment-integration",
    ),
    (
        "4",
        "Frontend Components",
        "Apr 12, 2024",
        "https://github.com/user/frontend-components",
    ),
    (
        "5",
        "Database Schema",
        "Jun 29, 2023",
        "https://github.com/user/db-schema",
    ),
];

pub fn catalog() -> Vec<Repository> {
    CATALOG
        .iter()
        .map(|(id, name, date_added, url)| Repository {
            id: id.to_string(),
            name: name.to_string(),
            date_added: date_added.to_string(),
            url: url.to_string(),
        })
        .collect()
}

pub fn find_summary(id: &str) -> Option<RepositorySummary> {
    CATALOG
        .iter()
        .find(|(repo_id, ..)| *repo_id == id)
        .map(|(id, name, ..)| RepositorySummary {
            id: id.to_string(),
            name: name.to_string(),
        })
}

/// Last path segment of a repository URL, or the one before it when the URL
/// ends with a slash.
pub fn repo_name_from_url(url: &str) -> String {
    let parts: Vec<&str> = url.split('/').collect();
    let last = parts.last().copied().unwrap_or_default();
    if !last.is_empty() {
        return last.to_string();
    }
    if parts.len() >= 2 {
        parts[parts.len() - 2].to_string()
    } else {
        String::new()
    }
}

pub fn format_date_added(ts: DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y").to_string()
}

pub fn new_repository(url: &str, now: DateTime<Utc>) -> Repository {
    Repository {
        id: now.timestamp_millis().to_string(),
        name: repo_name_from_url(url),
        date_added: format_date_added(now),
        url: url.to_string(),
    }
}

/// CLI entry point: prints the catalog as a table.
pub fn run_list_repos() -> Result<()> {
    println!("{:<4} {:<28} {:<14} URL", "ID", "NAME", "ADDED");
    for repo in catalog() {
        println!(
            "{:<4} {:<28} {:<14} {}",
            repo.id, repo.name, repo.date_added, repo.url
        );
    }
    Ok(())
}

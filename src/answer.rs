//! Canned answers for documentation queries.
//!
//! Picks one of five fixed answers by case-insensitive keyword match. Topics
//! are checked in declaration order, so a query mentioning both "api" and
//! "database" gets the API answer.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Api,
    Authentication,
    Database,
    Install,
    Unknown,
}

const API_ANSWER: &str = "The API uses REST principles and returns JSON responses. All endpoints require authentication using an API key that should be included in the Authorization header.";

const AUTH_ANSWER: &str = "Authentication is handled using JWT tokens. Users can authenticate via username/password or OAuth with supported providers. Tokens expire after 24 hours.";

const DATABASE_ANSWER: &str = "The database schema uses a relational model with the following main tables:\n- Users\n- Repositories\n- Documents\n- Embeddings\n\nForeign key relationships maintain data integrity between these entities.";

const INSTALL_ANSWER: &str = "To install the project:\n1. Clone the repository\n2. Run `npm install`\n3. Configure environment variables in .env\n4. Run `npm run dev` to start the development server";

const FALLBACK_ANSWER: &str = "I don't have specific information about that in my knowledge base. Could you try rephrasing your question or ask about API usage, authentication, database schema, or installation?";

/// Keyword table, in match order.
const KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Api, &["api"]),
    (Topic::Authentication, &["authentication", "login"]),
    (Topic::Database, &["database", "schema"]),
    (Topic::Install, &["install", "setup"]),
];

impl Topic {
    pub fn answer(&self) -> &'static str {
        match self {
            Topic::Api => API_ANSWER,
            Topic::Authentication => AUTH_ANSWER,
            Topic::Database => DATABASE_ANSWER,
            Topic::Install => INSTALL_ANSWER,
            Topic::Unknown => FALLBACK_ANSWER,
        }
    }
}

/// Classifies a free-text query.
pub fn classify(query: &str) -> Topic {
    let lowered = query.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(topic, _)| *topic)
        .unwrap_or(Topic::Unknown)
}

pub fn answer_for(query: &str) -> &'static str {
    classify(query).answer()
}

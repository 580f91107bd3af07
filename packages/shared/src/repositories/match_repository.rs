use crate::models::match_session::{MatchSession, MatchStatus};
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use async_trait::async_trait;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, from_items, to_attribute_value, to_item};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[cfg(test)]
use mockall::automock;

const PLAYER1_INDEX: &str = "GSI_MatchesByPlayer1";
const PLAYER2_INDEX: &str = "GSI_MatchesByPlayer2";
const STATUS_INDEX: &str = "GSI_MatchesByStatus";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn create_match(&self, session: &MatchSession) -> Result<(), MatchRepositoryError>;

    async fn get_match(&self, match_id: &str) -> Result<MatchSession, MatchRepositoryError>;

    /// Stores `session` only if the stored copy is still at `expected_version`.
    async fn update_match(
        &self,
        session: &MatchSession,
        expected_version: u64,
    ) -> Result<(), MatchRepositoryError>;

    /// A PENDING, ACCEPTED or PLAYING match between the two players, in either seat.
    async fn find_active_between(
        &self,
        player_a: &str,
        player_b: &str,
    ) -> Result<Option<MatchSession>, MatchRepositoryError>;

    /// PENDING challenges addressed to `user_id`, newest first.
    async fn list_pending_for(&self, user_id: &str) -> Result<Vec<MatchSession>, MatchRepositoryError>;

    /// Matches involving `user_id` whose status is one of `statuses`, newest first.
    async fn list_for_player(
        &self,
        user_id: &str,
        statuses: &[MatchStatus],
    ) -> Result<Vec<MatchSession>, MatchRepositoryError>;

    async fn list_by_status(&self, status: MatchStatus) -> Result<Vec<MatchSession>, MatchRepositoryError>;
}

fn newest_first(mut sessions: Vec<MatchSession>) -> Vec<MatchSession> {
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sessions
}

pub struct DynamoDbMatchRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbMatchRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Runs a single-key query against an index, following pagination.
    async fn query_index(
        &self,
        index_name: &str,
        key_name: &str,
        key_value: &str,
    ) -> Result<Vec<MatchSession>, MatchRepositoryError> {
        let mut sessions = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(index_name)
                .key_condition_expression("#key = :value")
                .expression_attribute_names("#key", key_name)
                .expression_attribute_values(":value", AttributeValue::S(key_value.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| MatchRepositoryError::DynamoDb(e.to_string()))?;

            if let Some(items) = output.items {
                let mut page: Vec<MatchSession> = from_items(items)
                    .map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;
                sessions.append(&mut page);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(sessions)
    }

    async fn player_matches(&self, user_id: &str) -> Result<Vec<MatchSession>, MatchRepositoryError> {
        let mut sessions = self.query_index(PLAYER1_INDEX, "player1_id", user_id).await?;
        sessions.extend(self.query_index(PLAYER2_INDEX, "player2_id", user_id).await?);
        Ok(sessions)
    }
}

#[async_trait]
impl MatchRepository for DynamoDbMatchRepository {
    async fn create_match(&self, session: &MatchSession) -> Result<(), MatchRepositoryError> {
        let item = to_item(session).map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|e| MatchRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    async fn get_match(&self, match_id: &str) -> Result<MatchSession, MatchRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(match_id)
                    .map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?,
            )
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| MatchRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => from_item(item).map_err(|e| MatchRepositoryError::Serialization(e.to_string())),
            None => Err(MatchRepositoryError::NotFound),
        }
    }

    async fn update_match(
        &self,
        session: &MatchSession,
        expected_version: u64,
    ) -> Result<(), MatchRepositoryError> {
        let item = to_item(session).map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_exists(id) AND #version = :expected")
            .expression_attribute_names("#version", "version")
            .expression_attribute_values(":expected", AttributeValue::N(expected_version.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match e.into_service_error() {
                PutItemError::ConditionalCheckFailedException(_) => {
                    Err(MatchRepositoryError::VersionConflict)
                }
                other => Err(MatchRepositoryError::DynamoDb(other.to_string())),
            },
        }
    }

    async fn find_active_between(
        &self,
        player_a: &str,
        player_b: &str,
    ) -> Result<Option<MatchSession>, MatchRepositoryError> {
        Ok(self
            .query_index(PLAYER1_INDEX, "player1_id", player_a)
            .await?
            .into_iter()
            .chain(self.query_index(PLAYER1_INDEX, "player1_id", player_b).await?)
            .find(|s| s.status.is_active() && s.involves_pair(player_a, player_b)))
    }

    async fn list_pending_for(&self, user_id: &str) -> Result<Vec<MatchSession>, MatchRepositoryError> {
        let sessions = self
            .query_index(PLAYER2_INDEX, "player2_id", user_id)
            .await?
            .into_iter()
            .filter(|s| s.status == MatchStatus::Pending)
            .collect();
        Ok(newest_first(sessions))
    }

    async fn list_for_player(
        &self,
        user_id: &str,
        statuses: &[MatchStatus],
    ) -> Result<Vec<MatchSession>, MatchRepositoryError> {
        let sessions = self
            .player_matches(user_id)
            .await?
            .into_iter()
            .filter(|s| statuses.contains(&s.status))
            .collect();
        Ok(newest_first(sessions))
    }

    async fn list_by_status(&self, status: MatchStatus) -> Result<Vec<MatchSession>, MatchRepositoryError> {
        let sessions = self
            .query_index(STATUS_INDEX, "status", &status.to_string())
            .await?;
        Ok(newest_first(sessions))
    }
}

/// Process-local match store used when no DynamoDB table is configured.
#[derive(Default)]
pub struct InMemoryMatchRepository {
    matches: Mutex<HashMap<String, MatchSession>>,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered<F>(&self, predicate: F) -> Vec<MatchSession>
    where
        F: Fn(&MatchSession) -> bool,
    {
        let matches = self.matches.lock().await;
        newest_first(matches.values().filter(|s| predicate(s)).cloned().collect())
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn create_match(&self, session: &MatchSession) -> Result<(), MatchRepositoryError> {
        let mut matches = self.matches.lock().await;
        if matches.contains_key(&session.id) {
            return Err(MatchRepositoryError::VersionConflict);
        }
        matches.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_match(&self, match_id: &str) -> Result<MatchSession, MatchRepositoryError> {
        self.matches
            .lock()
            .await
            .get(match_id)
            .cloned()
            .ok_or(MatchRepositoryError::NotFound)
    }

    async fn update_match(
        &self,
        session: &MatchSession,
        expected_version: u64,
    ) -> Result<(), MatchRepositoryError> {
        let mut matches = self.matches.lock().await;
        let stored = matches
            .get_mut(&session.id)
            .ok_or(MatchRepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(MatchRepositoryError::VersionConflict);
        }
        *stored = session.clone();
        Ok(())
    }

    async fn find_active_between(
        &self,
        player_a: &str,
        player_b: &str,
    ) -> Result<Option<MatchSession>, MatchRepositoryError> {
        Ok(self
            .filtered(|s| s.status.is_active() && s.involves_pair(player_a, player_b))
            .await
            .into_iter()
            .next())
    }

    async fn list_pending_for(&self, user_id: &str) -> Result<Vec<MatchSession>, MatchRepositoryError> {
        Ok(self
            .filtered(|s| s.status == MatchStatus::Pending && s.player2_id == user_id)
            .await)
    }

    async fn list_for_player(
        &self,
        user_id: &str,
        statuses: &[MatchStatus],
    ) -> Result<Vec<MatchSession>, MatchRepositoryError> {
        Ok(self
            .filtered(|s| s.is_participant(user_id) && statuses.contains(&s.status))
            .await)
    }

    async fn list_by_status(&self, status: MatchStatus) -> Result<Vec<MatchSession>, MatchRepositoryError> {
        Ok(self.filtered(|s| s.status == status).await)
    }
}

use crate::models::profile::{Profile, ProfileDelta};
use crate::repositories::errors::profile_repository_errors::ProfileRepositoryError;
use async_trait::async_trait;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{AttributeValue, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde_dynamo::{from_item, to_attribute_value};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Profile, ProfileRepositoryError>;

    /// Profiles for the given ids. Unknown ids are skipped.
    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>, ProfileRepositoryError>;

    async fn touch_last_online(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ProfileRepositoryError>;

    /// Applies every delta or none of them. A negative coin delta fails the
    /// whole batch with `InsufficientFunds` when the balance cannot cover it.
    async fn apply_deltas(&self, deltas: &[ProfileDelta]) -> Result<(), ProfileRepositoryError>;
}

/// Collapses deltas aimed at the same player, keeping first-seen order.
pub fn merge_by_player(deltas: &[ProfileDelta]) -> Vec<ProfileDelta> {
    let mut merged: Vec<ProfileDelta> = Vec::with_capacity(deltas.len());
    for delta in deltas {
        match merged.iter_mut().find(|d| d.user_id == delta.user_id) {
            Some(existing) => *existing = existing.clone().merge(delta),
            None => merged.push(delta.clone()),
        }
    }
    merged.retain(|d| !d.is_empty());
    merged
}

pub struct DynamoDbProfileRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbProfileRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn delta_update(&self, delta: &ProfileDelta) -> Result<Update, ProfileRepositoryError> {
        let mut condition = "attribute_exists(user_id)".to_string();
        let mut builder = Update::builder()
            .table_name(&self.table_name)
            .key("user_id", AttributeValue::S(delta.user_id.clone()))
            .update_expression(
                "ADD #coins :coins, #rating :rating, #total :total, #wins :wins, #losses :losses, #draws :draws",
            )
            .expression_attribute_names("#coins", "coins")
            .expression_attribute_names("#rating", "rating")
            .expression_attribute_names("#total", "total_matches")
            .expression_attribute_names("#wins", "wins")
            .expression_attribute_names("#losses", "losses")
            .expression_attribute_names("#draws", "draws")
            .expression_attribute_values(":coins", AttributeValue::N(delta.coins.to_string()))
            .expression_attribute_values(":rating", AttributeValue::N(delta.rating.to_string()))
            .expression_attribute_values(
                ":total",
                AttributeValue::N(delta.total_matches.to_string()),
            )
            .expression_attribute_values(":wins", AttributeValue::N(delta.wins.to_string()))
            .expression_attribute_values(":losses", AttributeValue::N(delta.losses.to_string()))
            .expression_attribute_values(":draws", AttributeValue::N(delta.draws.to_string()));

        if delta.coins < 0 {
            condition.push_str(" AND #coins >= :need");
            builder = builder
                .expression_attribute_values(":need", AttributeValue::N((-delta.coins).to_string()));
        }

        builder
            .condition_expression(condition)
            .build()
            .map_err(|e| ProfileRepositoryError::DynamoDb(e.to_string()))
    }
}

#[async_trait]
impl ProfileRepository for DynamoDbProfileRepository {
    async fn get_profile(&self, user_id: &str) -> Result<Profile, ProfileRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "user_id",
                to_attribute_value(user_id)
                    .map_err(|e| ProfileRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| ProfileRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                from_item(item).map_err(|e| ProfileRepositoryError::Serialization(e.to_string()))
            }
            None => Err(ProfileRepositoryError::NotFound(user_id.to_string())),
        }
    }

    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>, ProfileRepositoryError> {
        let mut profiles = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            match self.get_profile(user_id).await {
                Ok(profile) => profiles.push(profile),
                Err(ProfileRepositoryError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(profiles)
    }

    async fn touch_last_online(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ProfileRepositoryError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .update_expression("SET last_online = :at")
            .condition_expression("attribute_exists(user_id)")
            .expression_attribute_values(
                ":at",
                to_attribute_value(at)
                    .map_err(|e| ProfileRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match e.into_service_error() {
                UpdateItemError::ConditionalCheckFailedException(_) => {
                    Err(ProfileRepositoryError::NotFound(user_id.to_string()))
                }
                other => Err(ProfileRepositoryError::DynamoDb(other.to_string())),
            },
        }
    }

    async fn apply_deltas(&self, deltas: &[ProfileDelta]) -> Result<(), ProfileRepositoryError> {
        let merged = merge_by_player(deltas);
        if merged.is_empty() {
            return Ok(());
        }

        let mut items = Vec::with_capacity(merged.len());
        for delta in &merged {
            items.push(TransactWriteItem::builder().update(self.delta_update(delta)?).build());
        }

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match e.into_service_error() {
                TransactWriteItemsError::TransactionCanceledException(cancelled) => {
                    let failed = cancelled
                        .cancellation_reasons()
                        .iter()
                        .position(|reason| reason.code() == Some("ConditionalCheckFailed"))
                        .and_then(|index| merged.get(index));
                    match failed {
                        Some(delta) if delta.coins < 0 => Err(
                            ProfileRepositoryError::InsufficientFunds(delta.user_id.clone()),
                        ),
                        Some(delta) => Err(ProfileRepositoryError::NotFound(delta.user_id.clone())),
                        None => Err(ProfileRepositoryError::DynamoDb(cancelled.to_string())),
                    }
                }
                other => Err(ProfileRepositoryError::DynamoDb(other.to_string())),
            },
        }
    }
}

/// Process-local profile store used when no DynamoDB table is configured.
#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: Mutex<HashMap<String, Profile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn get_profile(&self, user_id: &str) -> Result<Profile, ProfileRepositoryError> {
        self.profiles
            .lock()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProfileRepositoryError::NotFound(user_id.to_string()))
    }

    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>, ProfileRepositoryError> {
        let profiles = self.profiles.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| profiles.get(id).cloned())
            .collect())
    }

    async fn touch_last_online(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ProfileRepositoryError> {
        let mut profiles = self.profiles.lock().await;
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| ProfileRepositoryError::NotFound(user_id.to_string()))?;
        profile.last_online = Some(at);
        Ok(())
    }

    async fn apply_deltas(&self, deltas: &[ProfileDelta]) -> Result<(), ProfileRepositoryError> {
        let merged = merge_by_player(deltas);
        let mut profiles = self.profiles.lock().await;

        for delta in &merged {
            let profile = profiles
                .get(&delta.user_id)
                .ok_or_else(|| ProfileRepositoryError::NotFound(delta.user_id.clone()))?;
            if delta.coins < 0 && profile.coins < -delta.coins {
                return Err(ProfileRepositoryError::InsufficientFunds(delta.user_id.clone()));
            }
        }

        for delta in &merged {
            if let Some(profile) = profiles.get_mut(&delta.user_id) {
                profile.apply(delta);
            }
        }
        Ok(())
    }
}

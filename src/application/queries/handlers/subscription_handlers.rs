//! Subscription Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{SubscriberRepositoryPort, TitleRepositoryPort};
use crate::application::queries::ListSubscriptions;
use crate::domain::Title;

/// ListSubscriptions Handler
pub struct ListSubscriptionsHandler {
    title_repo: Arc<dyn TitleRepositoryPort>,
    subscriber_repo: Arc<dyn SubscriberRepositoryPort>,
}

impl ListSubscriptionsHandler {
    pub fn new(
        title_repo: Arc<dyn TitleRepositoryPort>,
        subscriber_repo: Arc<dyn SubscriberRepositoryPort>,
    ) -> Self {
        Self {
            title_repo,
            subscriber_repo,
        }
    }

    pub async fn handle(&self, query: ListSubscriptions) -> Result<Vec<Title>, ApplicationError> {
        let Some(subscriber) = self.subscriber_repo.find(query.chat_id).await? else {
            return Ok(Vec::new());
        };

        let titles = self
            .title_repo
            .find_many(subscriber.subscriptions())
            .await?;

        Ok(titles)
    }
}

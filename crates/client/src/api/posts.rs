//! Blog-specific operations.

use std::ops::RangeInclusive;

use chinchin_core::{EntityId, Post};
use serde_json::json;
use tracing::instrument;

use super::ResourceApi;
use crate::error::ApiError;
use crate::executor::ApiRequest;

/// Ratings the backend accepts.
pub const RATING_RANGE: RangeInclusive<u8> = 1..=5;

impl ResourceApi<'_, Post> {
    /// Rate a post from 1 to 5 stars.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a rating outside 1..=5 (no request
    /// is made), or the request's `ApiError`.
    #[instrument(skip(self), fields(%id))]
    pub async fn rate(&self, id: &EntityId, rating: u8) -> Result<(), ApiError> {
        if !RATING_RANGE.contains(&rating) {
            return Err(ApiError::InvalidInput(format!(
                "rating must be between {} and {}, got {rating}",
                RATING_RANGE.start(),
                RATING_RANGE.end()
            )));
        }

        let client = self.client();
        let url = client.endpoints().post_rating(id);
        client
            .executor()
            .execute(&ApiRequest::post(url, json!({ "rating": rating })))
            .await?;
        Ok(())
    }
}

//! Catalog and blog CRUD commands.

use chinchin_client::{ChinChinClient, Resource, ResourceApi};
use chinchin_core::{Category, EntityId, Post, PostCategory, Product};

use super::{parse_payload, print_json, print_line};
use crate::ResourceAction;

/// One-line rendering used by `list`.
pub trait Summary {
    fn summary(&self) -> String;
}

impl Summary for Product {
    fn summary(&self) -> String {
        let badge = self
            .badge
            .as_deref()
            .map(|b| format!(" [{b}]"))
            .unwrap_or_default();
        format!("{:>6}  {}  {}{badge}", self.id, self.name, self.price)
    }
}

impl Summary for Category {
    fn summary(&self) -> String {
        format!("{:>6}  {}", self.id, self.name)
    }
}

impl Summary for PostCategory {
    fn summary(&self) -> String {
        format!("{:>6}  {}", self.id, self.name)
    }
}

impl Summary for Post {
    fn summary(&self) -> String {
        let author = self.author_display().unwrap_or("-");
        let rating = self
            .rating_display()
            .map(|r| format!("  {r:.1}★"))
            .unwrap_or_default();
        format!("{:>6}  {}  by {author}{rating}", self.id, self.title)
    }
}

/// Run a CRUD action against `api`.
pub async fn run<R>(api: ResourceApi<'_, R>, action: ResourceAction) -> Result<(), Box<dyn std::error::Error>>
where
    R: Resource + Summary,
{
    match action {
        ResourceAction::List => {
            let listing = api.get_all_or_cached().await?;
            if listing.is_offline() {
                tracing::warn!("offline: showing cached records");
            }
            for record in &listing.items {
                print_line(&record.summary());
            }
        }
        ResourceAction::Show { id } => print_json(&api.get_one(&id).await?)?,
        ResourceAction::Create { json } => {
            let created = api.create(&parse_payload(&json)?).await?;
            report(created.as_ref())?;
        }
        ResourceAction::Update { id, json } => {
            let updated = api.update(&id, &parse_payload(&json)?).await?;
            report(updated.as_ref())?;
        }
        ResourceAction::Delete { id } => {
            api.delete(&id).await?;
            print_line(&format!("Deleted {id}"));
        }
    }
    Ok(())
}

/// `posts rate <id> <rating>`
pub async fn rate(client: &ChinChinClient, id: &EntityId, rating: u8) -> Result<(), Box<dyn std::error::Error>> {
    client.posts().rate(id, rating).await?;
    print_line(&format!("Rated post {id}: {rating}/5"));
    Ok(())
}

fn report<R: serde::Serialize>(record: Option<&R>) -> Result<(), serde_json::Error> {
    match record {
        Some(record) => print_json(record),
        None => {
            print_line("Done");
            Ok(())
        }
    }
}

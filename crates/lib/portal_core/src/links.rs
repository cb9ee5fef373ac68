//! Application link seeding.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::models::NewApplicationLink;
use crate::store::{LinkStore, StoreError};

#[derive(Debug, Error)]
pub enum LinksError {
    #[error("Links file error: {0}")]
    File(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Deserialize)]
struct LinksFile {
    links: Vec<NewApplicationLink>,
}

/// Parse `{"links": [{"name", "url", "icon", "description"?, "isActive"?, "order"?}]}`.
pub fn parse_links(json: &str) -> Result<Vec<NewApplicationLink>, LinksError> {
    let file: LinksFile =
        serde_json::from_str(json).map_err(|e| LinksError::File(e.to_string()))?;
    Ok(file.links)
}

pub fn load_links_file(path: &Path) -> Result<Vec<NewApplicationLink>, LinksError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| LinksError::File(format!("{}: {e}", path.display())))?;
    parse_links(&json)
}

/// Insert `links` only when no link exists yet. Returns how many were inserted.
pub async fn seed_links_if_empty(
    store: &dyn LinkStore,
    links: Vec<NewApplicationLink>,
) -> Result<usize, LinksError> {
    if store.link_count().await? > 0 {
        return Ok(0);
    }
    let count = links.len();
    for link in links {
        store.insert_link(link).await?;
    }
    info!(count, "seeded application links");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const LINKS: &str = r#"{"links": [
        {"name": "Mail", "url": "https://mail.example.com", "icon": "mail", "order": 2},
        {"name": "Wiki", "url": "https://wiki.example.com", "icon": "book", "order": 1},
        {"name": "Old CRM", "url": "https://crm.example.com", "icon": "archive", "isActive": false}
    ]}"#;

    #[tokio::test]
    async fn seeds_once_and_lists_active_in_order() {
        let store = MemoryStore::new();
        let links = parse_links(LINKS).unwrap();

        assert_eq!(seed_links_if_empty(&store, links.clone()).await.unwrap(), 3);
        assert_eq!(seed_links_if_empty(&store, links).await.unwrap(), 0);

        let active = store.active_links().await.unwrap();
        let names: Vec<&str> = active.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Wiki", "Mail"]);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        assert!(matches!(
            parse_links(r#"{"links": [{"name": "x"}]}"#),
            Err(LinksError::File(_))
        ));
    }
}

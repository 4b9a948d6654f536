//! Article categories
//!
//! Staff manage categories. Deleting one leaves its articles in place with no
//! category.

use crate::error::{Error, Result};
use crate::orm::categories;
use crate::slug::{slugify, SlugAllocator};
use crate::store::ContentStore;
use crate::viewer::Viewer;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Derived from `name` when absent or unusable
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn ContentStore>,
    slugs: SlugAllocator,
}

impl CategoryService {
    pub fn new(store: Arc<dyn ContentStore>, slugs: SlugAllocator) -> Self {
        Self { store, slugs }
    }

    pub async fn create(&self, viewer: &Viewer, form: NewCategory) -> Result<categories::Model> {
        viewer.require_staff()?;

        let name = form.name.trim().to_string();
        let form = NewCategory { name, ..form };
        form.validate()?;

        let base = match form.slug.as_deref().map(slugify) {
            Some(slug) if !slug.is_empty() => slug,
            _ => self.slugs.base_for_name(&form.name),
        };

        let store = self.store.as_ref();
        let category = self
            .slugs
            .claim(&base, |slug| {
                let now = Utc::now().naive_utc();
                let row = categories::Model {
                    id: 0,
                    name: form.name.clone(),
                    slug,
                    description: form.description.clone(),
                    created_at: now,
                    updated_at: now,
                };
                async move { store.insert_category(row).await }
            })
            .await?;

        log::info!("Created category {:?} ({})", category.name, category.slug);
        Ok(category)
    }

    /// Delete a category; its articles become uncategorized.
    pub async fn delete(&self, viewer: &Viewer, id: i32) -> Result<()> {
        viewer.require_staff()?;

        if !self.store.delete_category(id).await? {
            return Err(Error::not_found(format!("category {}", id)));
        }
        log::info!("Deleted category {}", id);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<categories::Model>> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn by_slug(&self, slug: &str) -> Result<categories::Model> {
        self.store
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| Error::not_found(format!("category {}", slug)))
    }
}

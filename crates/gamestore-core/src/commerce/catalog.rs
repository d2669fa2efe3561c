//! Catalog administration and catalog queries.

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;
use crate::snapshot::Snapshot;
use crate::types::CatalogItem;
use crate::validation::{normalize_optional_text, normalize_title, resolve_category, validate_price};

use super::{Mutation, MutationContext};

/// Category filter value that matches every item.
pub const ALL_CATEGORIES: &str = "all";

// =============================================================================
// Create
// =============================================================================

/// Adds a title to the catalog. Released "now", with no sales.
#[derive(Debug, Clone)]
pub struct CreateCatalogItem {
    pub title: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub cover_image: Option<String>,
}

impl Mutation for CreateCatalogItem {
    type Output = CatalogItem;

    fn apply(self, draft: &mut Snapshot, ctx: &MutationContext) -> LedgerResult<CatalogItem> {
        let title = normalize_title(&self.title)?;
        validate_price(self.price)?;
        let category = resolve_category(&self.category, &draft.categories)?;

        let item = CatalogItem {
            id: ctx.new_id("game"),
            title,
            description: self.description.trim().to_string(),
            price: self.price,
            category,
            release_date: ctx.now,
            cover_image: normalize_optional_text(self.cover_image),
            total_sales: 0,
        };
        draft.catalog_items.push(item.clone());

        Ok(item)
    }
}

// =============================================================================
// Update
// =============================================================================

/// Partial catalog edit; every supplied field is validated like on create.
#[derive(Debug, Clone, Default)]
pub struct UpdateCatalogItem {
    pub item_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    /// `Some(None)` removes the cover.
    pub cover_image: Option<Option<String>>,
}

impl Mutation for UpdateCatalogItem {
    type Output = CatalogItem;

    fn apply(self, draft: &mut Snapshot, _ctx: &MutationContext) -> LedgerResult<CatalogItem> {
        if draft.item(&self.item_id).is_none() {
            return Err(LedgerError::not_found("Catalog item", self.item_id));
        }

        let title = self.title.as_deref().map(normalize_title).transpose()?;
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        let category = self
            .category
            .as_deref()
            .map(|c| resolve_category(c, &draft.categories))
            .transpose()?;

        let item = draft
            .item_mut(&self.item_id)
            .ok_or_else(|| LedgerError::not_found("Catalog item", self.item_id.clone()))?;

        if let Some(title) = title {
            item.title = title;
        }
        if let Some(description) = self.description {
            item.description = description.trim().to_string();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(category) = category {
            item.category = category;
        }
        if let Some(cover_image) = self.cover_image {
            item.cover_image = normalize_optional_text(cover_image);
        }

        Ok(item.clone())
    }
}

// =============================================================================
// Delete
// =============================================================================

/// Removes a title and strips it from every library.
///
/// Past transactions keep the id in their details.
#[derive(Debug, Clone)]
pub struct DeleteCatalogItem {
    pub item_id: String,
}

impl Mutation for DeleteCatalogItem {
    type Output = ();

    fn apply(self, draft: &mut Snapshot, _ctx: &MutationContext) -> LedgerResult<()> {
        let before = draft.catalog_items.len();
        draft.catalog_items.retain(|item| item.id != self.item_id);
        if draft.catalog_items.len() == before {
            return Err(LedgerError::not_found("Catalog item", self.item_id));
        }

        for account in &mut draft.accounts {
            account.owned_item_ids.remove(&self.item_id);
        }
        Ok(())
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Case-insensitive title search, optionally narrowed to one category.
///
/// A blank term matches every title; `None` or `"all"` matches every
/// category. Results keep catalog order.
pub fn search_catalog(snapshot: &Snapshot, term: &str, category: Option<&str>) -> Vec<CatalogItem> {
    let term = term.trim().to_lowercase();
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(ALL_CATEGORIES));

    snapshot
        .catalog_items
        .iter()
        .filter(|item| term.is_empty() || item.title.to_lowercase().contains(&term))
        .filter(|item| category.map_or(true, |c| item.category.eq_ignore_ascii_case(c)))
        .cloned()
        .collect()
}

/// Best sellers first; ties keep catalog order.
pub fn top_sellers(snapshot: &Snapshot, limit: usize) -> Vec<CatalogItem> {
    let mut items = snapshot.catalog_items.clone();
    items.sort_by(|a, b| b.total_sales.cmp(&a.total_sales));
    items.truncate(limit);
    items
}

// =============================================================================
// Unit Tests
// =============================================================================

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use bms_common::notify::kinds;
use bms_common::store::{Filter, FindOptions, SortOrder, collections::ARTICLES, from_document, to_document};
use chrono::Utc;
use rand::Rng;
use serde_json::{Value, json};
use std::collections::HashSet;

use crate::inventory_logic::actor::Actor;
use crate::inventory_logic::error::AppError;
use crate::inventory_logic::model::{Article, ArticleInput, QuantityChange};
use crate::inventory_logic::state::AppState;

const SKU_PREFIX: &str = "BMS-";
const SKU_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SKU_LENGTH: usize = 8;

pub fn random_sku() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SKU_LENGTH)
        .map(|_| SKU_ALPHABET[rng.random_range(0..SKU_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", SKU_PREFIX, suffix)
}

/// Draws SKUs until one is not taken.
pub fn unique_sku(is_taken: impl Fn(&str) -> bool) -> String {
    loop {
        let sku = random_sku();
        if !is_taken(&sku) {
            return sku;
        }
    }
}

fn by_id(id: i64) -> Filter {
    Filter::eq("id", id)
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<Value>> {
    let docs = state
        .store
        .find(ARTICLES, &Filter::all(), &FindOptions::sorted("id", SortOrder::Descending))
        .await;
    Json(docs.into_iter().map(Value::Object).collect())
}

pub async fn list_public(State(state): State<AppState>) -> Json<Vec<Value>> {
    let docs = state
        .store
        .find(
            ARTICLES,
            &Filter::eq("public", true),
            &FindOptions::sorted("id", SortOrder::Descending),
        )
        .await;
    Json(docs.into_iter().map(Value::Object).collect())
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<ArticleInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(mut input) = payload?;
    input.validate()?;
    input.photos = state.normalize_images(input.photos).await;

    let name = input.name.clone();
    let posted_by = actor.username.clone();
    let doc = state
        .store
        .insert_with(ARTICLES, |docs| {
            let next_id = docs
                .iter()
                .filter_map(|d| d.get("id").and_then(Value::as_i64))
                .max()
                .unwrap_or(0)
                + 1;
            let taken: HashSet<&str> = docs
                .iter()
                .filter_map(|d| d.get("sku").and_then(Value::as_str))
                .collect();
            let sku = unique_sku(|candidate| taken.contains(candidate));
            to_document(&Article {
                id: next_id,
                sku,
                posted_by,
                date_post: Utc::now(),
                fields: input,
            })
        })
        .await?;

    let id = doc.get("id").cloned().unwrap_or(Value::Null);
    let sku = doc.get("sku").cloned().unwrap_or(Value::Null);
    log::info!("Article {} created by {}", id, actor.username);

    state.notify(
        kinds::ARTICLE_CREATED,
        json!({"id": id, "nom": name, "by": actor.username}),
    );
    Ok(Json(json!({"id": id, "sku": sku, "message": "Article created successfully"})))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    actor: Actor,
    payload: Result<Json<ArticleInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(mut input) = payload?;
    input.validate()?;

    let existing = state
        .store
        .find_one(ARTICLES, &by_id(id))
        .await
        .ok_or(AppError::NotFound("Article"))?;
    let existing: Article = from_document(existing)?;

    input.photos = state.normalize_images(input.photos).await;
    let name = input.name.clone();
    let replacement = to_document(&Article {
        fields: input,
        ..existing
    })?;

    state
        .store
        .update_with(ARTICLES, &by_id(id), |doc| *doc = replacement)
        .await
        .ok_or(AppError::NotFound("Article"))?;

    state.notify(
        kinds::ARTICLE_UPDATED,
        json!({"id": id, "nom": name, "by": actor.username}),
    );
    Ok(Json(json!({"message": "Article updated successfully"})))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Json<Value> {
    state.store.delete_one(ARTICLES, &by_id(id)).await;
    Json(json!({"message": "Article deleted successfully"}))
}

pub async fn generate_sku(State(state): State<AppState>) -> Json<Value> {
    let taken: HashSet<String> = state
        .store
        .find(ARTICLES, &Filter::all(), &FindOptions::default())
        .await
        .into_iter()
        .filter_map(|d| d.get("sku").and_then(Value::as_str).map(str::to_string))
        .collect();
    Json(json!({"sku": unique_sku(|candidate| taken.contains(candidate))}))
}

/// Adds `change` litres to a fluid article, never going below zero.
pub async fn adjust_quantity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<QuantityChange>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(QuantityChange { change }) = payload?;

    let updated = state
        .store
        .update_with(ARTICLES, &by_id(id), |doc| {
            let current = doc.get("litres").and_then(Value::as_f64).unwrap_or(0.0);
            doc.insert("litres".to_string(), json!((current + change).max(0.0)));
        })
        .await
        .ok_or(AppError::NotFound("Article"))?;

    let new_litres = updated.get("litres").cloned().unwrap_or(json!(0.0));
    Ok(Json(json!({"message": "Quantity updated", "new_litres": new_litres})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_shape() {
        let sku = random_sku();
        assert!(sku.starts_with("BMS-"));
        let suffix = &sku[4..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.bytes().all(|b| SKU_ALPHABET.contains(&b)));
    }

    #[test]
    fn unique_sku_skips_taken_values() {
        let first = random_sku();
        let sku = unique_sku(|candidate| candidate == first);
        assert_ne!(sku, first);
    }
}

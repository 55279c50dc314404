use axum::{
    Json,
    extract::{Path, State},
};
use bms_common::store::{
    Filter, FindOptions,
    collections::{ARTICLES, ARTICLE_STATS},
};
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;

use crate::inventory_logic::error::AppError;
use crate::inventory_logic::model::{ArticleStat, ArticleViews};
use crate::inventory_logic::state::AppState;

/// Counts one catalogue view of an article. Unknown ids are counted too;
/// they are filtered out when the statistics are read.
pub async fn track_view(State(state): State<AppState>, Path(id): Path<i64>) -> Json<Value> {
    let now = Utc::now();
    state
        .store
        .upsert_with(ARTICLE_STATS, &Filter::eq("article_id", id), |doc| {
            let views = doc.get("views").and_then(Value::as_i64).unwrap_or(0);
            doc.insert("views".to_string(), json!(views + 1));
            doc.insert("last_viewed".to_string(), json!(now));
        })
        .await;
    Json(json!({"message": "View tracked"}))
}

/// View counts joined with article name, reference and first photo, most
/// viewed first.
pub async fn article_stats(State(state): State<AppState>) -> Result<Json<Vec<ArticleStat>>, AppError> {
    let counters: Vec<ArticleViews> = state
        .store
        .find_as(ARTICLE_STATS, &Filter::all(), &FindOptions::default())
        .await?;

    let articles: HashMap<i64, _> = state
        .store
        .find(ARTICLES, &Filter::all(), &FindOptions::default())
        .await
        .into_iter()
        .filter_map(|doc| Some((doc.get("id")?.as_i64()?, doc)))
        .collect();

    let text = |doc: &bms_common::store::Document, field: &str| {
        doc.get(field).and_then(Value::as_str).map(str::to_string)
    };

    let mut stats: Vec<ArticleStat> = counters
        .into_iter()
        .filter_map(|counter| {
            let article = articles.get(&counter.article_id)?;
            Some(ArticleStat {
                article_id: counter.article_id,
                nom: text(article, "nom"),
                reference: text(article, "ref"),
                photo: article
                    .get("photos")
                    .and_then(|p| p.get(0))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                views: counter.views,
                last_viewed: counter.last_viewed,
            })
        })
        .collect();
    stats.sort_by(|a, b| b.views.cmp(&a.views));
    Ok(Json(stats))
}

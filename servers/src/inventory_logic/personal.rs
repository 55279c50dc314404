//! Per-user scratch space: one memo and one todo list per username.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use bms_common::store::{
    Filter,
    collections::{MEMOS, TODOS},
};
use serde_json::{Value, json};

use crate::inventory_logic::actor::Actor;
use crate::inventory_logic::error::AppError;
use crate::inventory_logic::model::{MemoUpdate, TodosUpdate};
use crate::inventory_logic::state::AppState;

fn owned_by(actor: &Actor) -> Filter {
    Filter::eq("username", actor.username.as_str())
}

pub async fn get_memo(State(state): State<AppState>, actor: Actor) -> Json<Value> {
    let content = state
        .store
        .find_one(MEMOS, &owned_by(&actor))
        .await
        .and_then(|doc| doc.get("content").cloned())
        .unwrap_or_else(|| json!(""));
    Json(json!({"content": content}))
}

pub async fn put_memo(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<MemoUpdate>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(MemoUpdate { content }) = payload?;
    state
        .store
        .upsert_with(MEMOS, &owned_by(&actor), |doc| {
            doc.insert("content".to_string(), Value::String(content));
        })
        .await;
    Ok(Json(json!({"message": "Memo updated"})))
}

pub async fn get_todos(State(state): State<AppState>, actor: Actor) -> Json<Value> {
    let items = state
        .store
        .find_one(TODOS, &owned_by(&actor))
        .await
        .and_then(|doc| doc.get("items").cloned())
        .unwrap_or_else(|| json!([]));
    Json(json!({"items": items}))
}

pub async fn put_todos(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<TodosUpdate>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(TodosUpdate { items }) = payload?;
    state
        .store
        .upsert_with(TODOS, &owned_by(&actor), |doc| {
            doc.insert("items".to_string(), Value::Array(items));
        })
        .await;
    Ok(Json(json!({"message": "Todos updated"})))
}

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use bms_common::notify::kinds;
use bms_common::store::{Filter, FindOptions, collections::POSTITS, from_document};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::inventory_logic::actor::Actor;
use crate::inventory_logic::error::AppError;
use crate::inventory_logic::model::{PostIt, PostItInput};
use crate::inventory_logic::state::AppState;

fn by_id(id: &str) -> Filter {
    Filter::eq("id", id)
}

/// Newest first.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PostIt>>, AppError> {
    let mut postits: Vec<PostIt> = state
        .store
        .find_as(POSTITS, &Filter::all(), &FindOptions::default())
        .await?;
    postits.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(postits))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<PostItInput>, JsonRejection>,
) -> Result<Json<PostIt>, AppError> {
    let Json(input) = payload?;
    if input.subject.trim().is_empty() {
        return Err(AppError::BadRequest("objet must not be empty".into()));
    }

    let photo = match input.photo {
        Some(photo) => Some(state.normalize_image(photo).await),
        None => None,
    };
    let postit = PostIt {
        id: Uuid::new_v4().to_string(),
        subject: input.subject,
        message: input.message,
        photo,
        posted_by: actor.username.clone(),
        date: Utc::now(),
        checks: Vec::new(),
    };
    state.store.insert(POSTITS, &postit).await?;

    state.notify(
        kinds::POSTIT_CREATED,
        json!({"objet": postit.subject, "by": actor.username}),
    );
    Ok(Json(postit))
}

/// Records that the acting user has seen the note. Checking twice is harmless.
pub async fn check(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<Value>, AppError> {
    let username = actor.username.clone();
    state
        .store
        .update_with(POSTITS, &by_id(&id), |doc| {
            let checks = doc
                .entry("checks")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(names) = checks {
                if !names.iter().any(|n| n.as_str() == Some(username.as_str())) {
                    names.push(Value::String(username));
                }
            }
        })
        .await
        .ok_or(AppError::NotFound("Post-it"))?;

    state.notify(kinds::POSTIT_CHECKED, json!({"id": id, "by": actor.username}));
    Ok(Json(json!({"message": "Check added"})))
}

/// Only the author or an admin may remove a note.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<Value>, AppError> {
    let doc = state
        .store
        .find_one(POSTITS, &by_id(&id))
        .await
        .ok_or(AppError::NotFound("Post-it"))?;
    let postit: PostIt = from_document(doc)?;

    if !actor.is_admin() && postit.posted_by != actor.username {
        return Err(AppError::Forbidden("Only the author or an admin can delete this post-it"));
    }

    state.store.delete_one(POSTITS, &by_id(&id)).await;
    state.notify(kinds::POSTIT_DELETED, json!({"id": id, "by": actor.username}));
    Ok(Json(json!({"message": "Post-it deleted"})))
}

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use bms_common::store::{Filter, FindOptions, collections::PUBS};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::inventory_logic::actor::Actor;
use crate::inventory_logic::error::AppError;
use crate::inventory_logic::model::{Pub, PubInput};
use crate::inventory_logic::state::AppState;

fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin only"))
    }
}

/// Pubs that have not expired yet.
pub async fn list_active(State(state): State<AppState>) -> Result<Json<Vec<Pub>>, AppError> {
    let now = Utc::now();
    let pubs: Vec<Pub> = state
        .store
        .find_as(PUBS, &Filter::all(), &FindOptions::default())
        .await?;
    Ok(Json(pubs.into_iter().filter(|p| p.ends_at >= now).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<PubInput>, JsonRejection>,
) -> Result<Json<Pub>, AppError> {
    require_admin(&actor)?;
    let Json(input) = payload?;
    if input.duration_days < 1 {
        return Err(AppError::BadRequest("duree_jours must be at least 1".into()));
    }
    let duration = Duration::try_days(input.duration_days)
        .ok_or_else(|| AppError::BadRequest("duree_jours is out of range".into()))?;

    let image = match input.image {
        Some(image) => Some(state.normalize_image(image).await),
        None => None,
    };
    let starts_at = Utc::now();
    let ends_at = starts_at
        .checked_add_signed(duration)
        .ok_or_else(|| AppError::BadRequest("duree_jours is out of range".into()))?;

    let banner = Pub {
        id: Uuid::new_v4().to_string(),
        kind: input.kind,
        name: input.name,
        description: input.description,
        image,
        starts_at,
        ends_at,
    };
    state.store.insert(PUBS, &banner).await?;
    log::info!("Pub '{}' published by {} until {}", banner.name, actor.username, banner.ends_at);
    Ok(Json(banner))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<Value>, AppError> {
    require_admin(&actor)?;
    state.store.delete_one(PUBS, &Filter::eq("id", id)).await;
    Ok(Json(json!({"message": "Pub deleted"})))
}

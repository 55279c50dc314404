use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use bms_common::notify::kinds;
use bms_common::store::{Filter, FindOptions, collections::AGENDA};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::inventory_logic::actor::Actor;
use crate::inventory_logic::error::AppError;
use crate::inventory_logic::model::{AgendaEvent, AgendaInput};
use crate::inventory_logic::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<AgendaEvent>>, AppError> {
    let events = state
        .store
        .find_as(AGENDA, &Filter::all(), &FindOptions::default())
        .await?;
    Ok(Json(events))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<AgendaInput>, JsonRejection>,
) -> Result<Json<AgendaEvent>, AppError> {
    let Json(input) = payload?;
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("titre must not be empty".into()));
    }

    let event = AgendaEvent {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        date: input.date,
        description: input.description,
        invites: input.invites,
        created_by: actor.username,
    };
    state.store.insert(AGENDA, &event).await?;

    state.notify(
        kinds::AGENDA_CREATED,
        json!({"titre": event.title, "date": event.date}),
    );
    Ok(Json(event))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    state.store.delete_one(AGENDA, &Filter::eq("id", id)).await;
    Json(json!({"message": "Event deleted"}))
}

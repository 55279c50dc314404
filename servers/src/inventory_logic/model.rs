use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inventory_logic::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleKind {
    /// A spare part.
    Piece,
    /// A fluid tracked in litres.
    Liquide,
}

fn one() -> i64 {
    1
}

/// Article fields supplied by the client on create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleInput {
    #[serde(rename = "type")]
    pub kind: ArticleKind,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "etat", default)]
    pub condition: Option<String>,
    #[serde(rename = "categorie", default)]
    pub category: Option<String>,
    #[serde(rename = "sous_categorie", default)]
    pub subcategory: Option<String>,
    #[serde(rename = "lieu", default)]
    pub location: Option<String>,
    #[serde(rename = "date_obtention", default)]
    pub acquired_on: Option<String>,
    #[serde(rename = "prix_neuf", default)]
    pub price_new: Option<f64>,
    #[serde(rename = "prix_achat", default)]
    pub purchase_price: Option<f64>,
    #[serde(rename = "prix_vente", default)]
    pub sale_price: Option<f64>,
    #[serde(rename = "quantite", default = "one")]
    pub quantity: i64,
    #[serde(default)]
    pub public: bool,
    // Fluids only.
    #[serde(rename = "marque", default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub litres: Option<f64>,
    #[serde(rename = "quantite_min", default)]
    pub min_litres: Option<f64>,
    #[serde(rename = "usage_hebdo", default)]
    pub weekly_usage: Option<f64>,
    #[serde(rename = "viscosite", default)]
    pub viscosity: Option<String>,
    #[serde(rename = "norme", default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
}

impl ArticleInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("nom must not be empty".into()));
        }
        if self.reference.trim().is_empty() {
            return Err(AppError::BadRequest("ref must not be empty".into()));
        }
        Ok(())
    }
}

/// A stored article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub sku: String,
    pub posted_by: String,
    pub date_post: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: ArticleInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuantityChange {
    #[serde(default)]
    pub change: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostItInput {
    #[serde(rename = "objet")]
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostIt {
    pub id: String,
    #[serde(rename = "objet")]
    pub subject: String,
    pub message: String,
    pub photo: Option<String>,
    pub posted_by: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub checks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgendaInput {
    #[serde(rename = "titre")]
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub invites: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaEvent {
    pub id: String,
    #[serde(rename = "titre")]
    pub title: String,
    pub date: String,
    pub description: Option<String>,
    #[serde(default)]
    pub invites: Vec<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PubKind {
    /// Promotional banner.
    Pub,
    /// Special offer.
    Offre,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PubInput {
    #[serde(rename = "type")]
    pub kind: PubKind,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "duree_jours")]
    pub duration_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pub {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PubKind,
    #[serde(rename = "nom")]
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "duree_debut")]
    pub starts_at: DateTime<Utc>,
    #[serde(rename = "duree_fin")]
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoUpdate {
    pub content: String,
}

/// Todo entries are opaque to the server and stored as sent.
#[derive(Debug, Clone, Deserialize)]
pub struct TodosUpdate {
    pub items: Vec<serde_json::Value>,
}

/// View counter of one article in the public catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleViews {
    pub article_id: i64,
    #[serde(default)]
    pub views: i64,
    pub last_viewed: Option<DateTime<Utc>>,
}

/// An [`ArticleViews`] row joined with the article it counts.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleStat {
    pub article_id: i64,
    pub nom: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub photo: Option<String>,
    pub views: i64,
    pub last_viewed: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn article_round_trips_wire_names() {
        let input: ArticleInput = serde_json::from_value(json!({
            "type": "liquide",
            "nom": "Huile 5W30",
            "ref": "H-530",
            "litres": 20.0
        }))
        .unwrap();
        assert_eq!(input.kind, ArticleKind::Liquide);
        assert_eq!(input.quantity, 1);
        assert!(input.photos.is_empty());

        let article = Article {
            id: 7,
            sku: "BMS-ABCDEFGH".into(),
            posted_by: "ludo".into(),
            date_post: Utc::now(),
            fields: input,
        };
        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["nom"], "Huile 5W30");
        assert_eq!(value["type"], "liquide");
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn blank_names_are_rejected() {
        let input: ArticleInput =
            serde_json::from_value(json!({"type": "piece", "nom": "  ", "ref": "R"})).unwrap();
        assert!(input.validate().is_err());
    }
}

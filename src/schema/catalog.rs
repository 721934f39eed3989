//! Built-in schemas for the catalog tables

use crate::error::SchemaError;
use crate::schema::column::{ColumnDefault, ColumnKind, ColumnSpec, Derive};
use crate::schema::table::TableSchema;
use serde_json::json;

pub const PRESETS: &[&str] = &["cocktails", "desserts"];

/// Look up a built-in schema by table name
pub fn preset(name: &str) -> Result<TableSchema, SchemaError> {
    match name {
        "cocktails" => cocktails(),
        "desserts" => desserts(),
        other => Err(SchemaError::UnknownPreset(other.to_string())),
    }
}

pub fn cocktails() -> Result<TableSchema, SchemaError> {
    TableSchema::new("cocktails", "slug")
        .column(ColumnSpec::scalar("id"))
        .column(ColumnSpec::scalar("slug"))
        .column(ColumnSpec::scalar("stable_key"))
        .column(ColumnSpec::text("name"))
        .column(ColumnSpec::scalar("status"))
        .column(ColumnSpec::scalar("iba_category"))
        .column(ColumnSpec::array("tags"))
        .column(ColumnSpec::text("description"))
        .column(ColumnSpec::jsonb("history"))
        .column(ColumnSpec::jsonb("taste"))
        .column(ColumnSpec::jsonb("recommendations"))
        .column(ColumnSpec::new("ingredients", ColumnKind::ObjectArray))
        .column(ColumnSpec::scalar("method"))
        .column(ColumnSpec::text("instructions"))
        .column(ColumnSpec::scalar("glass"))
        .column(ColumnSpec::new("garnish", ColumnKind::MultilingualJsonb))
        .column(ColumnSpec::scalar("ice"))
        .column(ColumnSpec::scalar("serving_style"))
        .column(ColumnSpec::array("base_spirits"))
        .column(ColumnSpec::array("flavor_profile"))
        .column(ColumnSpec::scalar("abv_estimate"))
        .column(ColumnSpec::scalar("calories_estimate"))
        .column(ColumnSpec::scalar("difficulty"))
        .column(ColumnSpec::scalar("prep_time_seconds"))
        .column(ColumnSpec::array("allergens").source("computed.allergens"))
        .column(ColumnSpec::array("intolerances").source("computed.intolerances"))
        .column(ColumnSpec::array("suitable_for_diets").source("computed.suitable_for_diets"))
        .column(
            ColumnSpec::scalar("spice_level")
                .source("computed.spice_level")
                .default_value(json!(0)),
        )
        .column(ColumnSpec::array("diet_tags"))
        .column(ColumnSpec::array("season_tags"))
        .column(ColumnSpec::array("occasion_tags"))
        .column(ColumnSpec::scalar("is_mocktail").default_value(json!(false)))
        .column(ColumnSpec::scalar("is_signature").default_value(json!(false)))
        .column(ColumnSpec::array("variants").derive(Derive::Pluck("name".to_string())))
        .column(ColumnSpec::scalar("notes_for_staff"))
        .column(ColumnSpec::scalar("price_tier").default_value(json!("mid")))
        .column(ColumnSpec::scalar("popularity"))
        .column(ColumnSpec::scalar("source_url").source("source.primary"))
        .column(
            ColumnSpec::scalar("source_note")
                .source("source.notes")
                .source("source.note"),
        )
        .column(ColumnSpec::scalar("version").default_value(json!(1)))
        .touch_updated_at()
        .group_by(&["status", "iba_category"])
        .validate()
}

pub fn desserts() -> Result<TableSchema, SchemaError> {
    TableSchema::new("desserts", "slug")
        .column(ColumnSpec::scalar("id"))
        .column(ColumnSpec::scalar("slug"))
        .column(ColumnSpec::text("name"))
        .column(ColumnSpec::text("description"))
        .column(ColumnSpec::scalar("style"))
        .column(ColumnSpec::scalar("status").default_value(json!("active")))
        .column(ColumnSpec::scalar("category"))
        .column(ColumnSpec::scalar("serving_temp"))
        .column(ColumnSpec::array("ingredient_ids"))
        .column(ColumnSpec::scalar("topping"))
        .column(ColumnSpec::scalar("is_chocolate").default_value(json!(false)))
        .column(ColumnSpec::scalar("is_fruit_based").default_value(json!(false)))
        .column(ColumnSpec::scalar("is_creamy").default_value(json!(false)))
        .column(ColumnSpec::scalar("sweetness_level"))
        .column(ColumnSpec::scalar("origin_country").source("origin.country"))
        .column(ColumnSpec::scalar("origin_country_code").source("origin.country_code"))
        .column(ColumnSpec::scalar("origin_region").source("origin.region"))
        .column(ColumnSpec::scalar("origin_city").source("origin.city"))
        .column(ColumnSpec::jsonb("history"))
        .column(ColumnSpec::jsonb("serving").default_to(ColumnDefault::EmptyObject))
        .column(ColumnSpec::jsonb("dietary").default_to(ColumnDefault::EmptyObject))
        .column(ColumnSpec::array("allergens").source("dietary.allergens"))
        .column(ColumnSpec::scalar("calories_estimate").source("dietary.calories_estimate"))
        .column(
            ColumnSpec::scalar("is_vegetarian")
                .source("dietary.is_vegetarian")
                .default_value(json!(false)),
        )
        .column(
            ColumnSpec::scalar("is_vegan")
                .source("dietary.is_vegan")
                .default_value(json!(false)),
        )
        .column(
            ColumnSpec::scalar("is_gluten_free")
                .source("dietary.is_gluten_free")
                .default_value(json!(false)),
        )
        .column(ColumnSpec::scalar("prep_time_min").source("preparation.prep_time_min"))
        .column(ColumnSpec::scalar("difficulty").source("preparation.difficulty"))
        .column(ColumnSpec::array("tags"))
        .column(ColumnSpec::scalar("popularity"))
        .touch_updated_at()
        .group_by(&["style", "category"])
        .validate()
}

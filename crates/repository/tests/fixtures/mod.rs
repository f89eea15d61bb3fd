//! Shared fixtures: an in-memory SQLite `users` table seeded with four rows.

#![allow(dead_code)]

use std::sync::Arc;

use ::common::DatabaseConfig;
use domain::{FieldDef, FieldKind, Record, Schema, SortingParams};
use repository::{Database, QueryPolicy, RelationalRepo, Repository};
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait};

pub mod user {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub username: String,
        pub email: String,
        #[sea_orm(default_value = "")]
        pub first_name: String,
        #[sea_orm(default_value = "")]
        pub last_name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub const BEATLES: [(i32, &str, &str, &str); 4] = [
    (1, "jlennon", "John", "Lennon"),
    (2, "pmccartney", "Paul", "McCartney"),
    (3, "gharrison", "George", "Harrison"),
    (4, "rstarkey", "Richard", "Starkey"),
];

pub fn user_schema() -> Arc<Schema> {
    Schema::builder("User")
        .field(FieldDef::required("id", FieldKind::Integer))
        .field(FieldDef::required("username", FieldKind::Text))
        .field(FieldDef::required("email", FieldKind::Text))
        .field(FieldDef::optional("first_name", FieldKind::Text, ""))
        .field(FieldDef::optional("last_name", FieldKind::Text, ""))
        .build()
        .unwrap()
}

/// Fresh in-memory database with the `users` table created and seeded.
///
/// The pool is pinned to one connection so every query sees the same
/// in-memory database.
pub async fn connect() -> Database {
    ::common::telemetry::init_for_tests();

    let mut config = DatabaseConfig::with_url("sqlite::memory:");
    config.max_connections = 1;
    config.min_connections = 1;
    let db = Database::connect(&config).await.unwrap();

    let conn = db.connection();
    let backend = conn.get_database_backend();
    let stmt = sea_orm::Schema::new(backend).create_table_from_entity(user::Entity);
    conn.execute(backend.build(&stmt)).await.unwrap();

    let rows = BEATLES.iter().map(|(id, username, first, last)| user::ActiveModel {
        id: Set(*id),
        username: Set(username.to_string()),
        email: Set(format!("{}.{}@beatles.com", first.to_lowercase(), last.to_lowercase())),
        first_name: Set(first.to_string()),
        last_name: Set(last.to_string()),
    });
    user::Entity::insert_many(rows).exec(conn).await.unwrap();

    db
}

pub async fn setup() -> RelationalRepo<user::Entity> {
    let db = connect().await;
    db.repository::<user::Entity>(user_schema()).unwrap()
}

pub async fn setup_with_policy<P: QueryPolicy>(policy: P) -> RelationalRepo<user::Entity, P> {
    let db = connect().await;
    RelationalRepo::with_policy(db.get_connection(), user_schema(), policy).unwrap()
}

/// Identity of every row in `repo`, ascending
pub async fn ids<R: Repository>(repo: &R) -> Vec<i64> {
    repo.get_list(None, None, Some(SortingParams::new(["id"])), None)
        .await
        .unwrap()
        .iter()
        .map(|item| item.id().as_value().and_then(|id| id.as_i64()).unwrap())
        .collect()
}

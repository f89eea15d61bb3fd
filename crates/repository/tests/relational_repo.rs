//! Relational repository tests against an in-memory SQLite database.

mod fixtures;

use domain::{
    DomainError, Entity, FieldDef, FieldKind, FilterParams, Item, ParaEntity, Record, Schema,
    ScopingParams, SlicingParams, SortingParams,
};
use repository::{AllowList, Repository};
use serde_json::json;

use fixtures::{ids, setup, setup_with_policy, user_schema};

fn filter(key: &str, value: serde_json::Value) -> FilterParams {
    FilterParams::new().with(key, value).unwrap()
}

fn by_id() -> Option<SortingParams> {
    Some(SortingParams::new(["id"]))
}

fn item_ids(items: &[Item]) -> Vec<i64> {
    items
        .iter()
        .map(|item| item.id().as_value().and_then(|id| id.as_i64()).unwrap())
        .collect()
}

async fn list_ids(
    repo: &impl Repository,
    filter: Option<FilterParams>,
    sort: Option<SortingParams>,
    slice: Option<SlicingParams>,
) -> Vec<i64> {
    let items = repo.get_list(filter, None, sort, slice).await.unwrap();
    item_ids(&items)
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_get_count() {
    let repo = setup().await;

    assert_eq!(repo.get_count(None).await.unwrap(), 4);
    assert_eq!(
        repo.get_count(Some(filter("username__startswith", json!("j"))))
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        repo.get_count(Some(filter("id", json!(42)))).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_get_list_by_id_in() {
    let repo = setup().await;

    let items = repo
        .get_list(Some(filter("id__in", json!([2, 4]))), None, by_id(), None)
        .await
        .unwrap();

    assert_eq!(item_ids(&items), vec![2, 4]);
    assert!(items.iter().all(|item| !item.is_partial()));
    assert_eq!(items[0].get("username").unwrap(), &json!("pmccartney"));
    assert_eq!(items[1].get("email").unwrap(), &json!("richard.starkey@beatles.com"));
}

#[tokio::test]
async fn test_get_list_without_match_is_empty() {
    let repo = setup().await;

    let items = repo
        .get_list(Some(filter("username", json!("bpreston"))), None, None, None)
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_scoped_read_returns_partial_entities() {
    let repo = setup().await;

    let items = repo
        .get_list(
            None,
            Some(ScopingParams::new(["username"])),
            by_id(),
            Some(SlicingParams::limit(2)),
        )
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    for item in &items {
        assert!(item.is_partial());
        assert!(item.get("email").unwrap().is_missing());
        assert!(item.id().is_missing());
    }
    assert_eq!(items[0].get("username").unwrap(), &json!("jlennon"));
    assert_eq!(items[1].get("username").unwrap(), &json!("pmccartney"));
}

#[tokio::test]
async fn test_unknown_scope_field_is_configuration_error() {
    let repo = setup().await;

    let err = repo
        .get_list(None, Some(ScopingParams::new(["id", "emial"])), None, None)
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::UnknownField { field, .. }) if field == "emial"
    ));
}

#[tokio::test]
async fn test_unknown_filter_and_sort_fields_are_rejected() {
    let repo = setup().await;

    let err = repo
        .get_count(Some(filter("age__min", json!(18))))
        .await
        .unwrap_err();
    assert!(err.is_configuration());

    let err = repo
        .get_list(None, None, Some(SortingParams::new(["-age"])), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::UnknownField { field, .. }) if field == "age"
    ));
}

#[tokio::test]
async fn test_unknown_lookup_is_rejected() {
    let repo = setup().await;

    let err = repo
        .get_count(Some(filter("id__between", json!([1, 2]))))
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::UnknownLookup { .. })));
}

#[tokio::test]
async fn test_sort_and_slice_compose() {
    let repo = setup().await;

    assert_eq!(
        list_ids(&repo, None, by_id(), Some(SlicingParams::offset(1))).await,
        vec![2, 3, 4]
    );
    assert_eq!(
        list_ids(&repo, None, by_id(), Some(SlicingParams::limit(2))).await,
        vec![1, 2]
    );
    assert_eq!(
        list_ids(&repo, None, by_id(), Some(SlicingParams::window(1, 2))).await,
        vec![2, 3]
    );
    assert_eq!(
        list_ids(
            &repo,
            None,
            Some(SortingParams::new(["-id"])),
            Some(SlicingParams::limit(1))
        )
        .await,
        vec![4]
    );
    assert!(list_ids(&repo, None, by_id(), Some(SlicingParams::limit(0)))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_multi_key_sort() {
    let repo = setup().await;
    repo.update_batch(
        ParaEntity::patch_from_json(&user_schema(), json!({"last_name": "Beatle"})).unwrap(),
        Some(filter("id__in", json!([2, 3]))),
        None,
        None,
    )
    .await
    .unwrap();

    let sorted = list_ids(
        &repo,
        None,
        Some(SortingParams::new(["last_name", "-id"])),
        None,
    )
    .await;
    assert_eq!(sorted, vec![3, 2, 1, 4]);
}

#[tokio::test]
async fn test_lookup_operators() {
    let repo = setup().await;

    assert_eq!(
        list_ids(&repo, Some(filter("id__ne", json!(1))), by_id(), None).await,
        vec![2, 3, 4]
    );
    let range = filter("id__min", json!(2)).with("id__max", json!(3)).unwrap();
    assert_eq!(list_ids(&repo, Some(range), by_id(), None).await, vec![2, 3]);
    let open = filter("id__gt", json!(1)).with("id__lt", json!(4)).unwrap();
    assert_eq!(list_ids(&repo, Some(open), by_id(), None).await, vec![2, 3]);
    assert_eq!(
        list_ids(&repo, Some(filter("username__contains", json!("arr"))), by_id(), None).await,
        vec![3]
    );
    assert_eq!(
        list_ids(&repo, Some(filter("first_name__startswith", json!("Ri"))), by_id(), None)
            .await,
        vec![4]
    );
    assert_eq!(
        repo.get_count(Some(filter("email__isnull", json!(false))))
            .await
            .unwrap(),
        4
    );
    assert_eq!(
        repo.get_count(Some(filter("email__isnull", json!(true))))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_like_lookups_match_wildcards_literally() {
    let repo = setup().await;

    for pattern in ["_", "%", r"\"] {
        assert_eq!(
            repo.get_count(Some(filter("username__contains", json!(pattern))))
                .await
                .unwrap(),
            0,
            "contains {pattern}"
        );
    }
    assert_eq!(
        repo.get_count(Some(filter("username__startswith", json!("_l"))))
            .await
            .unwrap(),
        0
    );

    repo.create_item(new_user("j_doe")).await.unwrap();
    assert_eq!(
        list_ids(&repo, Some(filter("username__contains", json!("_"))), by_id(), None).await,
        vec![5]
    );
    assert_eq!(
        list_ids(&repo, Some(filter("username__startswith", json!("j_"))), by_id(), None).await,
        vec![5]
    );
}

#[tokio::test]
async fn test_filter_is_reusable() {
    let repo = setup().await;
    let params = filter("id__in", json!([1, 3]));

    let first = repo.get_list(Some(params.clone()), None, by_id(), None).await.unwrap();
    let second = repo.get_list(Some(params), None, by_id(), None).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_scoped_read_carries_exactly_the_scope() {
    let repo = setup().await;

    let items = repo
        .get_list(
            Some(filter("id", json!(3))),
            Some(ScopingParams::new(["email", "id"])),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    let present: Vec<&str> = items[0].present().into_iter().map(|(name, _)| name).collect();
    assert_eq!(present, vec!["id", "email"]);
    assert_eq!(items[0].id(), &json!(3));
}

#[tokio::test]
async fn test_get_item() {
    let repo = setup().await;

    let item = repo
        .get_item(filter("username", json!("gharrison")), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.id(), &json!(3));
    assert!(!item.is_partial());

    let scoped = repo
        .get_item(filter("id", json!(3)), Some(ScopingParams::new(["email"])))
        .await
        .unwrap()
        .unwrap();
    assert!(scoped.is_partial());
    assert_eq!(scoped.get("email").unwrap(), &json!("george.harrison@beatles.com"));

    let absent = repo.get_item(filter("id", json!(42)), None).await.unwrap();
    assert!(absent.is_none());
}

// =============================================================================
// Create
// =============================================================================

fn new_user(username: &str) -> Entity {
    Entity::builder(&user_schema())
        .missing("id")
        .set("username", username)
        .set("email", format!("{}@beatles.com", username))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_create_item_assigns_identity() {
    let repo = setup().await;

    let created = repo.create_item(new_user("bpreston")).await.unwrap();
    assert_eq!(created.id(), &json!(5));
    assert_eq!(created.get("first_name").unwrap(), &json!(""));

    let stored = repo
        .get_item(filter("id", json!(5)), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, Item::from(created));
    assert_eq!(repo.get_count(None).await.unwrap(), 5);
}

#[tokio::test]
async fn test_create_list_keeps_input_order() {
    let repo = setup().await;

    let explicit = Entity::from_json(
        &user_schema(),
        json!({"id": 10, "username": "ssutcliffe", "email": "stuart@beatles.com"}),
    )
    .unwrap();
    let created = repo
        .create_list(vec![explicit, new_user("bpreston"), new_user("pbest")])
        .await
        .unwrap();

    let usernames: Vec<_> = created
        .iter()
        .map(|entity| entity.get("username").unwrap().clone())
        .collect();
    assert_eq!(usernames, vec![json!("ssutcliffe"), json!("bpreston"), json!("pbest")]);
    assert_eq!(created[0].id(), &json!(10));
    assert_eq!(ids(&repo).await, vec![1, 2, 3, 4, 10, 11, 12]);
}

#[tokio::test]
async fn test_create_list_is_atomic() {
    let repo = setup().await;

    let duplicate = Entity::from_json(
        &user_schema(),
        json!({"id": 1, "username": "impostor", "email": "impostor@beatles.com"}),
    )
    .unwrap();
    let err = repo
        .create_list(vec![new_user("bpreston"), duplicate])
        .await
        .unwrap_err();

    assert_eq!(err.code(), "DATABASE_ERROR");
    assert_eq!(repo.get_count(None).await.unwrap(), 4);
}

#[tokio::test]
async fn test_foreign_schema_is_rejected() {
    let repo = setup().await;
    let other = Schema::builder("Band")
        .field(FieldDef::required("id", FieldKind::Integer))
        .build()
        .unwrap();
    let band = Entity::builder(&other).missing("id").build().unwrap();

    let err = repo.create_item(band).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_update_item_merges_present_fields() {
    let repo = setup().await;
    let before = repo.get_item(filter("id", json!(2)), None).await.unwrap().unwrap();

    let mut patch = ParaEntity::new(&user_schema(), 2).unwrap();
    patch.set("email", "paul@wings.com").unwrap();
    repo.update_item(patch.into(), None).await.unwrap();

    let after = repo.get_item(filter("id", json!(2)), None).await.unwrap().unwrap();
    assert_eq!(after.get("email").unwrap(), &json!("paul@wings.com"));
    for name in ["id", "username", "first_name", "last_name"] {
        assert_eq!(after.get(name).unwrap(), before.get(name).unwrap());
    }

    let untouched = repo.get_item(filter("id", json!(1)), None).await.unwrap().unwrap();
    assert_eq!(untouched.get("email").unwrap(), &json!("john.lennon@beatles.com"));
}

#[tokio::test]
async fn test_update_list_last_item_wins() {
    let repo = setup().await;
    let schema = user_schema();

    let items = vec![
        ParaEntity::from_json(&schema, json!({"id": 1, "first_name": "Johnny"})).unwrap().into(),
        ParaEntity::from_json(&schema, json!({"id": 3, "last_name": "H."})).unwrap().into(),
        ParaEntity::from_json(&schema, json!({"id": 1, "first_name": "Winston"})).unwrap().into(),
    ];
    repo.update_list(items, None).await.unwrap();

    let john = repo.get_item(filter("id", json!(1)), None).await.unwrap().unwrap();
    assert_eq!(john.get("first_name").unwrap(), &json!("Winston"));
    let george = repo.get_item(filter("id", json!(3)), None).await.unwrap().unwrap();
    assert_eq!(george.get("last_name").unwrap(), &json!("H."));
    assert_eq!(george.get("first_name").unwrap(), &json!("George"));
}

#[tokio::test]
async fn test_update_list_later_item_restoring_stored_value_wins() {
    let repo = setup().await;
    let schema = user_schema();

    let items = vec![
        ParaEntity::from_json(&schema, json!({"id": 1, "first_name": "Johnny"})).unwrap().into(),
        ParaEntity::from_json(&schema, json!({"id": 1, "first_name": "John"})).unwrap().into(),
    ];
    repo.update_list(items, None).await.unwrap();

    let john = repo.get_item(filter("id", json!(1)), None).await.unwrap().unwrap();
    assert_eq!(john.get("first_name").unwrap(), &json!("John"));
}

#[tokio::test]
async fn test_update_list_skips_rows_excluded_by_filter() {
    let repo = setup().await;
    let schema = user_schema();
    let items: Vec<Item> = [2, 4]
        .into_iter()
        .map(|id| {
            ParaEntity::from_json(&schema, json!({"id": id, "email": "test@beatles.com"}))
                .unwrap()
                .into()
        })
        .collect();

    repo.update_list(items, Some(filter("username__in", json!(["jlennon", "gharrison"]))))
        .await
        .unwrap();

    assert_eq!(
        repo.get_count(Some(filter("email", json!("test@beatles.com"))))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_update_list_filter_guard_leaves_full_row_unchanged() {
    let repo = setup().await;
    let before = repo.get_item(filter("id", json!(2)), None).await.unwrap().unwrap();

    let replacement = Entity::from_json(
        &user_schema(),
        json!({
            "id": 2,
            "username": "macca",
            "email": "paul@wings.com",
            "first_name": "James",
            "last_name": "McCartney Jr",
        }),
    )
    .unwrap();
    repo.update_list(
        vec![replacement.into()],
        Some(filter("username__in", json!(["jlennon", "gharrison"]))),
    )
    .await
    .unwrap();

    let after = repo.get_item(filter("id", json!(2)), None).await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_update_list_applies_to_filtered_subset() {
    let repo = setup().await;
    let schema = user_schema();
    let items: Vec<Item> = [1, 2]
        .into_iter()
        .map(|id| {
            ParaEntity::from_json(&schema, json!({"id": id, "last_name": "Beatle"}))
                .unwrap()
                .into()
        })
        .collect();

    repo.update_list(items, Some(filter("username", json!("jlennon"))))
        .await
        .unwrap();

    assert_eq!(
        list_ids(&repo, Some(filter("last_name", json!("Beatle"))), by_id(), None).await,
        vec![1]
    );
}

#[tokio::test]
async fn test_update_list_requires_identity() {
    let repo = setup().await;
    let patch = ParaEntity::patch_from_json(&user_schema(), json!({"email": "x@y.z"})).unwrap();

    let err = repo.update_list(vec![patch.into()], None).await.unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::MissingField { .. })));
}

#[tokio::test]
async fn test_update_batch_sorted_and_limited() {
    let repo = setup().await;
    let update = ParaEntity::patch_from_json(&user_schema(), json!({"email": "test@beatles.com"}))
        .unwrap();

    let rows = repo
        .update_batch(update, None, by_id(), Some(SlicingParams::limit(2)))
        .await
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(
        list_ids(&repo, Some(filter("email", json!("test@beatles.com"))), by_id(), None).await,
        vec![1, 2]
    );
}

#[tokio::test]
async fn test_update_batch_by_filter() {
    let repo = setup().await;
    let update =
        ParaEntity::patch_from_json(&user_schema(), json!({"first_name": "Ringo"})).unwrap();

    let rows = repo
        .update_batch(update, Some(filter("username", json!("rstarkey"))), None, None)
        .await
        .unwrap();

    assert_eq!(rows, 1);
    let ringo = repo.get_item(filter("id", json!(4)), None).await.unwrap().unwrap();
    assert_eq!(ringo.get("first_name").unwrap(), &json!("Ringo"));
    assert_eq!(ringo.get("last_name").unwrap(), &json!("Starkey"));
}

#[tokio::test]
async fn test_update_batch_offset_only() {
    let repo = setup().await;
    let update =
        ParaEntity::patch_from_json(&user_schema(), json!({"last_name": "Beatle"})).unwrap();

    let rows = repo
        .update_batch(update, None, by_id(), Some(SlicingParams::offset(2)))
        .await
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(
        list_ids(&repo, Some(filter("last_name", json!("Beatle"))), by_id(), None).await,
        vec![3, 4]
    );
}

#[tokio::test]
async fn test_update_batch_keeps_identity() {
    let repo = setup().await;
    let update =
        ParaEntity::from_json(&user_schema(), json!({"id": 99, "email": "fab@beatles.com"}))
            .unwrap();

    let rows = repo
        .update_batch(update, Some(filter("id__in", json!([1, 2]))), None, None)
        .await
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(ids(&repo).await, vec![1, 2, 3, 4]);
    assert_eq!(
        list_ids(&repo, Some(filter("email", json!("fab@beatles.com"))), by_id(), None).await,
        vec![1, 2]
    );
}

#[tokio::test]
async fn test_update_batch_without_fields_is_noop() {
    let repo = setup().await;

    let rows = repo
        .update_batch(ParaEntity::patch(&user_schema()), None, None, None)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_batch_sorted_and_limited() {
    let repo = setup().await;

    let rows = repo
        .delete_batch(None, Some(SortingParams::new(["-id"])), Some(SlicingParams::limit(2)))
        .await
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(ids(&repo).await, vec![1, 2]);
}

#[tokio::test]
async fn test_delete_batch_window() {
    let repo = setup().await;

    let rows = repo
        .delete_batch(None, by_id(), Some(SlicingParams::window(1, 2)))
        .await
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(ids(&repo).await, vec![1, 4]);
}

#[tokio::test]
async fn test_delete_batch_by_filter() {
    let repo = setup().await;

    let rows = repo
        .delete_batch(Some(filter("id__min", json!(3))), None, None)
        .await
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(ids(&repo).await, vec![1, 2]);
}

#[tokio::test]
async fn test_delete_item() {
    let repo = setup().await;

    let rows = repo
        .delete_item(filter("username", json!("rstarkey")))
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(ids(&repo).await, vec![1, 2, 3]);

    let rows = repo.delete_item(filter("id", json!(42))).await.unwrap();
    assert_eq!(rows, 0);
}

// =============================================================================
// Policy
// =============================================================================

#[tokio::test]
async fn test_allow_list_guards_filters_and_sorts() {
    let repo = setup_with_policy(AllowList::new().filter_on(["id"]).sort_on(["id"])).await;

    assert_eq!(
        list_ids(&repo, Some(filter("id__in", json!([1, 2]))), by_id(), None).await,
        vec![1, 2]
    );

    let err = repo
        .get_count(Some(filter("email__startswith", json!("john"))))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::NotAllowed { field, .. }) if field == "email"
    ));

    let err = repo
        .delete_batch(None, Some(SortingParams::new(["-username"])), Some(SlicingParams::limit(1)))
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::NotAllowed { .. })));
    assert_eq!(repo.get_count(None).await.unwrap(), 4);
}

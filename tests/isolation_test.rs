mod helpers;

use memogenius::store::users;
use serde_json::json;

#[tokio::test]
async fn every_identifier_kind_reaches_the_same_owner() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, Some(555_000)).await;
    let key = user.access_key.clone();
    db.call(move |conn| Ok(users::link_web_token(conn, &key, "web-token-abc")?))
        .await
        .unwrap()
        .expect("access key should link");

    let reg = helpers::registry(&db);
    let internal = user.id.to_string();
    let mut list_ids = Vec::new();
    for identifier in ["555000", "web-token-abc", internal.as_str()] {
        let out = reg
            .execute("get_list", json!({"list_type": "todo"}), identifier)
            .await;
        assert_eq!(out.status(), "success", "identifier {identifier}");
        list_ids.push(out.result["list"]["id"].as_i64().unwrap());
    }
    assert!(list_ids.iter().all(|id| *id == list_ids[0]));
}

#[tokio::test]
async fn unknown_owner_gets_a_plain_error() {
    let db = helpers::test_db();
    let reg = helpers::registry(&db);

    let out = reg
        .execute("get_reminders", json!({}), "no-such-user")
        .await;
    assert_eq!(out.status(), "error");
    assert_eq!(out.result["message"], "User not found or invalid");
}

#[tokio::test]
async fn reminders_are_owner_scoped() {
    let db = helpers::test_db();
    let alice = helpers::new_user(&db, Some(9001)).await;
    let bob = helpers::new_user(&db, Some(9002)).await;
    let reg = helpers::registry(&db);

    let created = reg
        .execute(
            "create_reminder",
            json!({"text": "dentist", "due_date": "2030-01-05T10:00:00Z"}),
            &alice.id.to_string(),
        )
        .await;
    let reminder_id = created.result["reminder"]["id"].as_i64().unwrap();

    let bob_id = bob.id.to_string();
    let listed = reg.execute("get_reminders", json!({}), &bob_id).await;
    assert_eq!(listed.result["count"], 0);

    let update = reg
        .execute("update_reminder", json!({"reminder_id": reminder_id, "text": "hijacked"}), &bob_id)
        .await;
    assert_eq!(update.status(), "error");
    assert_eq!(update.result["message"], format!("Reminder with ID {reminder_id} not found"));

    let delete = reg
        .execute("delete_reminder", json!({"reminder_id": reminder_id}), &bob_id)
        .await;
    assert_eq!(delete.status(), "error");

    let still_there = reg
        .execute("get_reminders", json!({}), &alice.id.to_string())
        .await;
    assert_eq!(still_there.result["reminders"][0]["text"], "dentist");
}

#[tokio::test]
async fn list_items_are_owner_scoped() {
    let db = helpers::test_db();
    let alice = helpers::new_user(&db, None).await;
    let bob = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);

    let added = reg
        .execute("add_list_item", json!({"list_type": "shopping", "text": "milk"}), &alice.id.to_string())
        .await;
    let item_id = added.result["item"]["id"].as_i64().unwrap();

    let bob_id = bob.id.to_string();
    for (tool, params) in [
        ("update_list_item", json!({"item_id": item_id, "text": "beer"})),
        ("mark_list_item_completed", json!({"item_id": item_id})),
        ("delete_list_item", json!({"item_id": item_id})),
    ] {
        let out = reg.execute(tool, params, &bob_id).await;
        assert_eq!(out.status(), "error", "{tool}");
        assert_eq!(
            out.result["message"],
            format!("Item with ID {item_id} not found or doesn't belong to this user")
        );
    }

    let list = reg
        .execute("get_list", json!({"list_type": "shopping"}), &alice.id.to_string())
        .await;
    assert_eq!(list.result["list"]["items"][0]["text"], "milk");
    assert_eq!(list.result["list"]["items"][0]["completed"], false);
}

#[tokio::test]
async fn memories_are_owner_scoped() {
    let db = helpers::test_db();
    let alice = helpers::new_user(&db, None).await;
    let bob = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);

    reg.execute("store_memory", json!({"content": "safe combination is 7788"}), &alice.id.to_string())
        .await;

    let bob_id = bob.id.to_string();
    let found = reg
        .execute("retrieve_memory", json!({"query": "safe combination"}), &bob_id)
        .await;
    assert_eq!(found.status(), "not_found");

    let deleted = reg
        .execute("delete_memory", json!({"query": "safe combination", "force": true}), &bob_id)
        .await;
    assert_eq!(deleted.status(), "not_found");

    let engine = helpers::memory_engine(&db);
    let alice_view = engine.retrieve(alice.id, "safe combination", 3).await.unwrap();
    assert_eq!(alice_view.hits.len(), 1);
}

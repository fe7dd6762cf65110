mod helpers;

use memogenius::store::lists;
use serde_json::json;

#[tokio::test]
async fn ensure_lists_exist_is_idempotent() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let owner = user.id;

    let count: i64 = db
        .call(move |conn| {
            lists::ensure_lists_exist(conn, owner)?;
            lists::ensure_lists_exist(conn, owner)?;
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM lists WHERE owner_id = ?1",
                [owner],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn shopping_list_lifecycle() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);
    let owner = user.id.to_string();

    let empty = reg
        .execute("get_list", json!({"list_type": "shopping"}), &owner)
        .await;
    assert_eq!(empty.result["list"]["title"], "Shopping List");
    assert_eq!(empty.result["list"]["item_count"], 0);

    let mut ids = Vec::new();
    for text in ["eggs", "bread"] {
        let out = reg
            .execute("add_list_item", json!({"list_type": "shopping", "text": text}), &owner)
            .await;
        assert_eq!(out.result["message"], format!("Added '{text}' to the shopping list"));
        ids.push(out.result["item"]["id"].as_i64().unwrap());
    }

    // ids may arrive as strings from the model
    let marked = reg
        .execute("mark_list_item_completed", json!({"item_id": ids[0].to_string()}), &owner)
        .await;
    assert_eq!(marked.status(), "success");
    assert_eq!(marked.result["message"], "Marked 'eggs' as completed");

    let view = reg
        .execute("get_list", json!({"list_type": "shopping"}), &owner)
        .await;
    assert_eq!(view.result["list"]["item_count"], 2);
    assert_eq!(view.result["list"]["completed_count"], 1);

    let renamed = reg
        .execute("update_list_title", json!({"list_type": "shopping", "title": "Groceries"}), &owner)
        .await;
    assert_eq!(renamed.result["list"]["title"], "Groceries");

    let cleared = reg
        .execute("clear_list", json!({"list_type": "shopping"}), &owner)
        .await;
    assert_eq!(cleared.result["removed"], 2);

    // the todo list is untouched by shopping-list operations
    let todo = reg.execute("get_list", json!({"list_type": "todo"}), &owner).await;
    assert_eq!(todo.result["list"]["title"], "To-Do List");
}

#[tokio::test]
async fn unknown_list_type_is_an_invalid_parameter() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);

    let out = reg
        .execute("get_list", json!({"list_type": "wishlist"}), &user.id.to_string())
        .await;
    assert_eq!(out.status(), "error");
    assert!(out.result["message"].as_str().unwrap().contains("wishlist"));
}

#[tokio::test]
async fn unknown_tool_is_reported() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);

    let out = reg
        .execute("order_pizza", json!({}), &user.id.to_string())
        .await;
    assert_eq!(out.status(), "error");
    assert_eq!(out.result["message"], "Unknown tool: order_pizza");
    assert!(out.result["tool_description"].is_null());
}

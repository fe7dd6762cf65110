mod helpers;

use serde_json::json;

#[tokio::test]
async fn stored_memory_is_retrieved_with_zero_distance() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, Some(1001)).await;
    let reg = helpers::registry(&db);
    let owner = user.id.to_string();

    let stored = reg
        .execute("store_memory", json!({"content": "the wifi password is 12345"}), &owner)
        .await;
    assert_eq!(stored.status(), "success");
    assert_eq!(stored.result["message"], "I've stored: the wifi password is 12345");

    let found = reg
        .execute("retrieve_memory", json!({"query": "the wifi password is 12345"}), &owner)
        .await;
    assert_eq!(found.status(), "success");
    let top = &found.result["results"][0];
    assert_eq!(top["content"], "the wifi password is 12345");
    assert!(top["distance"].as_f64().unwrap() < 1e-4);
}

#[tokio::test]
async fn retrieve_on_empty_store_is_not_found() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);

    let out = reg
        .execute("retrieve_memory", json!({"query": "anything"}), &user.id.to_string())
        .await;
    assert_eq!(out.status(), "not_found");
    assert_eq!(
        out.result["message"],
        "I couldn't find any information related to your request."
    );
}

#[tokio::test]
async fn update_replaces_content_and_keeps_created_at() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);
    let owner = user.id.to_string();

    let stored = reg
        .execute("store_memory", json!({"content": "gym locker code is 4411", "category": "code"}), &owner)
        .await;
    let created_at = stored.result["memory"]["created_at"].as_str().unwrap().to_string();

    let updated = reg
        .execute(
            "update_memory",
            json!({"query": "gym locker code", "new_content": "gym locker code is 9900"}),
            &owner,
        )
        .await;
    assert_eq!(updated.status(), "success");
    assert_eq!(updated.result["previous_content"], "gym locker code is 4411");
    assert_eq!(updated.result["created_at"], created_at.as_str());
    assert!(updated.result["updated_at"].as_str().unwrap() > created_at.as_str());

    let found = reg
        .execute("retrieve_memory", json!({"query": "gym locker code"}), &owner)
        .await;
    let results = found.result["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["content"], "gym locker code is 9900");
    assert_eq!(results[0]["category"], "code");
    assert_eq!(results[0]["created_at"], created_at.as_str());
}

#[tokio::test]
async fn delete_then_retrieve_is_not_found() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);
    let owner = user.id.to_string();

    reg.execute("store_memory", json!({"content": "passport expires in march"}), &owner)
        .await;
    let deleted = reg
        .execute("delete_memory", json!({"query": "passport expires"}), &owner)
        .await;
    assert_eq!(deleted.status(), "success");
    assert_eq!(
        deleted.result["message"],
        "I've deleted the information: passport expires in march"
    );

    let found = reg
        .execute("retrieve_memory", json!({"query": "passport expires"}), &owner)
        .await;
    assert_eq!(found.status(), "not_found");
}

#[tokio::test]
async fn close_matches_are_ambiguous_until_forced() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);
    let owner = user.id.to_string();

    for content in [
        "wifi password is 1111",
        "wifi password 2222",
        "car password is 3333",
    ] {
        let out = reg.execute("store_memory", json!({"content": content}), &owner).await;
        assert_eq!(out.status(), "success");
    }

    let retrieved = reg
        .execute("retrieve_memory", json!({"query": "password"}), &owner)
        .await;
    assert_eq!(retrieved.result["ambiguous"], true);

    let attempt = reg
        .execute("delete_memory", json!({"query": "password"}), &owner)
        .await;
    assert_eq!(attempt.status(), "ambiguous");
    let candidates = attempt.result["candidates"].as_array().unwrap();
    assert!(candidates.len() >= 2 && candidates.len() <= 3);
    let message = attempt.result["message"].as_str().unwrap();
    assert!(message.starts_with("I found multiple possible matches for 'password':\n- "));
    assert!(message.ends_with("Could you be more specific about which information you want to delete?"));

    // nothing was removed by the ambiguous attempt
    let all = reg
        .execute("retrieve_memory", json!({"query": "password", "limit": 10}), &owner)
        .await;
    let before: Vec<String> = all.result["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(before.len(), 3);

    let forced = reg
        .execute("delete_memory", json!({"query": "password", "force": true}), &owner)
        .await;
    assert_eq!(forced.status(), "success");
    assert_eq!(
        forced.result["message"],
        format!("I've deleted the information: {}", before[0])
    );

    let remaining = reg
        .execute("retrieve_memory", json!({"query": "password", "limit": 10}), &owner)
        .await;
    let mut left: Vec<String> = remaining.result["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["content"].as_str().unwrap().to_string())
        .collect();
    left.sort();
    let mut expected = before[1..].to_vec();
    expected.sort();
    // exactly the closest match went away
    assert_eq!(left, expected);
}

#[tokio::test]
async fn blank_content_is_rejected() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);

    let out = reg
        .execute("store_memory", json!({"content": "   "}), &user.id.to_string())
        .await;
    assert_eq!(out.status(), "error");
    assert!(out.result["tool_description"].is_string());
}

#[tokio::test]
async fn retrieve_can_be_limited_to_a_category() {
    let db = helpers::test_db();
    let user = helpers::new_user(&db, None).await;
    let reg = helpers::registry(&db);
    let owner = user.id.to_string();

    for (content, category) in [
        ("gate code is 4321", "code"),
        ("wifi password is 1111", "password"),
        ("bank code word is heron", "code"),
    ] {
        let out = reg
            .execute("store_memory", json!({"content": content, "category": category}), &owner)
            .await;
        assert_eq!(out.status(), "success");
    }

    let found = reg
        .execute("retrieve_memory", json!({"query": "gate code", "category": "password"}), &owner)
        .await;
    assert_eq!(found.status(), "success");
    let results = found.result["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["content"], "wifi password is 1111");
    assert_eq!(results[0]["category"], "password");

    let codes = reg
        .execute("retrieve_memory", json!({"query": "gate code", "category": "code", "limit": 10}), &owner)
        .await;
    let codes = codes.result["results"].as_array().unwrap();
    assert_eq!(codes.len(), 2);
    assert!(codes.iter().all(|r| r["category"] == "code"));

    let none = reg
        .execute("retrieve_memory", json!({"query": "gate code", "category": "recipe"}), &owner)
        .await;
    assert_eq!(none.status(), "not_found");
}

mod support;

use serde_json::{Value, json};
use support::{ApiClient, node_ids, node_names};

async fn create_dish(client: &ApiClient, name: &str, description: &str) -> Value {
    client
        .mutate("createDish", json!({"name": name, "description": description}))
        .await
}

async fn seed_dishes(client: &ApiClient) -> Vec<Value> {
    let mut created = Vec::new();
    for (name, description) in [
        ("rice", "white rice"),
        ("Coconut rice", "rice cooked in coconut milk"),
        ("plantain", "fried plantain"),
    ] {
        created.push(create_dish(client, name, description).await);
    }
    created
}

#[tokio::test]
async fn create_dish_assigns_an_id() {
    let client = ApiClient::in_memory();

    let dish = create_dish(&client, "rice", "white rice").await;
    assert_eq!(dish["name"], json!("rice"));
    assert_eq!(dish["description"], json!("white rice"));
    assert_eq!(dish["originalId"], json!(1));
    assert!(dish["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn duplicate_dish_returns_null() {
    let client = ApiClient::in_memory();
    create_dish(&client, "rice", "white rice").await;

    let body = client
        .call(
            "createDish",
            json!({"input": {"name": "rice", "description": "white rice"}}),
        )
        .await;
    assert_eq!(body["data"]["dish"], Value::Null);
    assert_eq!(body["errors"][0]["violations"][0]["field"], json!("name"));
    assert_eq!(body["errors"][0]["violations"][0]["kind"], json!("unique"));

    let listed = client.data("dishes", json!({})).await;
    assert_eq!(listed["totalCount"], json!(1));
}

#[tokio::test]
async fn retrieve_by_id() {
    let client = ApiClient::in_memory();
    let rice = create_dish(&client, "rice", "white rice").await;

    let found = client.data("dish", json!({"id": rice["id"]})).await;
    assert_eq!(found, rice);

    let unknown = client.data("dish", json!({"id": "RGlzaDoy"})).await;
    assert_eq!(unknown, Value::Null);

    let malformed = client.call("dish", json!({"id": "wrong-id"})).await;
    assert_eq!(malformed["data"]["dish"], Value::Null);
    assert!(malformed.get("errors").is_none());
}

#[tokio::test]
async fn name_contains_filter_ignores_case() {
    let client = ApiClient::in_memory();
    seed_dishes(&client).await;

    let filtered = client
        .data("dishes", json!({"name_Icontains": "Rice"}))
        .await;
    assert_eq!(node_names(&filtered), ["rice", "Coconut rice"]);
    assert_eq!(filtered["totalCount"], json!(2));
}

#[tokio::test]
async fn exact_filter_and_unknown_filter() {
    let client = ApiClient::in_memory();
    seed_dishes(&client).await;

    let exact = client.data("dishes", json!({"name": "plantain"})).await;
    assert_eq!(node_names(&exact), ["plantain"]);

    let unknown = client.call("dishes", json!({"spiciness": "hot"})).await;
    assert_eq!(unknown["data"]["dishes"], Value::Null);
    assert_eq!(unknown["errors"][0]["code"], json!(-32003));
}

#[tokio::test]
async fn order_by_id_and_name() {
    let client = ApiClient::in_memory();
    seed_dishes(&client).await;

    let by_id = client.data("dishes", json!({"order_by": "id"})).await;
    assert_eq!(node_ids(&by_id), [1, 2, 3]);

    let by_id_desc = client.data("dishes", json!({"order_by": "-id"})).await;
    assert_eq!(node_ids(&by_id_desc), [3, 2, 1]);

    let by_name = client.data("dishes", json!({"order_by": "name"})).await;
    assert_eq!(node_names(&by_name), ["Coconut rice", "plantain", "rice"]);

    let by_name_desc = client.data("dishes", json!({"orderBy": "-name"})).await;
    assert_eq!(node_names(&by_name_desc), ["rice", "plantain", "Coconut rice"]);
}

#[tokio::test]
async fn first_and_after_walk_without_gaps() {
    let client = ApiClient::in_memory();
    seed_dishes(&client).await;

    let page_one = client.data("dishes", json!({"first": 2})).await;
    assert_eq!(node_ids(&page_one), [1, 2]);
    assert_eq!(page_one["pageInfo"]["hasNextPage"], json!(true));

    let after = page_one["pageInfo"]["endCursor"].clone();
    let page_two = client
        .data("dishes", json!({"first": 2, "after": after}))
        .await;
    assert_eq!(node_ids(&page_two), [3]);
    assert_eq!(page_two["pageInfo"]["hasNextPage"], json!(false));
    assert_eq!(page_two["pageInfo"]["hasPreviousPage"], json!(true));
}

#[tokio::test]
async fn update_dish() {
    let client = ApiClient::in_memory();
    let rice = create_dish(&client, "rice", "white rice").await;

    let updated = client
        .mutate("updateDish", json!({"id": rice["id"], "name": "rice edited"}))
        .await;
    assert_eq!(updated["name"], json!("rice edited"));
    assert_eq!(updated["description"], json!("white rice"));
    assert_eq!(updated["id"], rice["id"]);

    let wrong = client
        .call(
            "updateDish",
            json!({"input": {"id": "wrong-id", "name": "rice edited"}}),
        )
        .await;
    assert_eq!(wrong["data"]["dish"], Value::Null);
    assert_eq!(wrong["errors"][0]["code"], json!(-32001));
}

#[tokio::test]
async fn delete_dish_returns_previous_state() {
    let client = ApiClient::in_memory();
    let rice = create_dish(&client, "rice", "white rice").await;

    let deleted = client.mutate("deleteDish", json!({"id": rice["id"]})).await;
    assert_eq!(deleted, rice);

    let gone = client.data("dish", json!({"id": rice["id"]})).await;
    assert_eq!(gone, Value::Null);

    let again = client.mutate("deleteDish", json!({"id": rice["id"]})).await;
    assert_eq!(again, Value::Null);
}

#[tokio::test]
async fn errors_are_omitted_on_success() {
    let client = ApiClient::in_memory();
    let body = client.call("dishes", json!({})).await;
    assert!(body.get("errors").is_none());
    assert_eq!(body["data"]["dishes"]["totalCount"], json!(0));
    assert_eq!(body["data"]["dishes"]["edges"], json!([]));
}

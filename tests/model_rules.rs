mod support;

use serde_json::{Value, json};
use support::{ApiClient, seed_timetable};

fn violated_fields(body: &Value) -> Vec<String> {
    body["errors"][0]["violations"]
        .as_array()
        .map(|violations| {
            violations
                .iter()
                .filter_map(|violation| violation["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

struct MenuRefs {
    timetable: String,
    meal: String,
    course: String,
    dish: String,
}

async fn seed_menu_refs(client: &ApiClient) -> MenuRefs {
    let timetable = seed_timetable(client).await;
    let meal = client
        .mutate(
            "createMeal",
            json!({"name": "breakfast", "startTime": "07:00:00", "endTime": "09:00:00"}),
        )
        .await;
    let course = client
        .mutate("createCourse", json!({"name": "starter", "sequenceOrder": 1}))
        .await;
    let dish = client
        .mutate("createDish", json!({"name": "rice", "description": "white rice"}))
        .await;

    MenuRefs {
        timetable,
        meal: meal["id"].as_str().expect("meal id").to_string(),
        course: course["id"].as_str().expect("course id").to_string(),
        dish: dish["id"].as_str().expect("dish id").to_string(),
    }
}

#[tokio::test]
async fn weekday_and_course_names_are_unique() {
    let client = ApiClient::in_memory();
    client.mutate("createWeekday", json!({"name": "Monday"})).await;
    let duplicate = client
        .call("createWeekday", json!({"input": {"name": "Monday"}}))
        .await;
    assert_eq!(duplicate["data"]["weekday"], Value::Null);

    client
        .mutate("createCourse", json!({"name": "main", "sequenceOrder": 2}))
        .await;
    let duplicate = client
        .call(
            "createCourse",
            json!({"input": {"name": "main", "sequenceOrder": 3}}),
        )
        .await;
    assert_eq!(violated_fields(&duplicate), ["name"]);
}

#[tokio::test]
async fn dish_names_compare_without_case() {
    let client = ApiClient::in_memory();
    client.mutate("createDish", json!({"name": "rice"})).await;
    let duplicate = client
        .call("createDish", json!({"input": {"name": "RICE"}}))
        .await;
    assert_eq!(duplicate["data"]["dish"], Value::Null);
    assert_eq!(duplicate["errors"][0]["code"], json!(-32004));
}

#[tokio::test]
async fn meal_must_end_after_it_starts() {
    let client = ApiClient::in_memory();
    for (start, end) in [("09:00:00", "09:00:00"), ("10:00:00", "08:30:00")] {
        let body = client
            .call(
                "createMeal",
                json!({"input": {"name": "lunch", "startTime": start, "endTime": end}}),
            )
            .await;
        assert_eq!(body["data"]["meal"], Value::Null);
        assert_eq!(violated_fields(&body), ["end_time"]);
    }

    let lunch = client
        .mutate(
            "createMeal",
            json!({"name": "lunch", "startTime": "12:00:00", "endTime": "14:00:00"}),
        )
        .await;
    assert_eq!(lunch["startTime"], json!("12:00:00"));
}

#[tokio::test]
async fn vendor_dates_must_be_ordered() {
    let client = ApiClient::in_memory();
    let body = client
        .call(
            "createVendor",
            json!({"input": {
                "name": "mama's kitchen",
                "startDate": "2024-05-01T00:00:00Z",
                "endDate": "2024-04-01T00:00:00Z",
            }}),
        )
        .await;
    assert_eq!(body["data"]["vendor"], Value::Null);
    assert_eq!(violated_fields(&body), ["end_date"]);
}

#[tokio::test]
async fn timetable_cycle_bounds() {
    let client = ApiClient::in_memory();
    let cases = [
        (json!(0), json!(1), "cycle_length"),
        (json!(7), json!(0), "current_cycle_day"),
        (json!(7), json!(8), "current_cycle_day"),
    ];
    for (index, (cycle_length, current_cycle_day, field)) in cases.into_iter().enumerate() {
        let body = client
            .call(
                "createTimetable",
                json!({"input": {
                    "name": format!("timetable {index}"),
                    "code": format!("TT{index}"),
                    "cycleLength": cycle_length,
                    "currentCycleDay": current_cycle_day,
                }}),
            )
            .await;
        assert_eq!(body["data"]["timetable"], Value::Null);
        assert!(
            violated_fields(&body).iter().any(|name| name == field),
            "expected a {field} violation in {body}"
        );
    }
}

#[tokio::test]
async fn timetable_gets_a_generated_api_key() {
    let client = ApiClient::in_memory();
    let timetable = client
        .mutate(
            "createTimetable",
            json!({"name": "staff timetable", "code": "ST0001", "cycleLength": 7, "currentCycleDay": 1}),
        )
        .await;
    let api_key = timetable["apiKey"].as_str().expect("api key");
    assert!(!api_key.is_empty());
}

#[tokio::test]
async fn menu_item_rules() {
    let client = ApiClient::in_memory();
    let refs = seed_menu_refs(&client).await;
    let input = |cycle_day: i64| {
        json!({
            "timetable": refs.timetable,
            "cycleDay": cycle_day,
            "meal": refs.meal,
            "course": refs.course,
            "dish": refs.dish,
        })
    };

    let zero = client.call("createMenuItem", json!({"input": input(0)})).await;
    assert_eq!(zero["data"]["menuItem"], Value::Null);
    assert_eq!(violated_fields(&zero), ["cycle_day"]);

    let item = client.mutate("createMenuItem", input(3)).await;
    assert_eq!(item["cycleDay"], json!(3));
    assert_eq!(item["dish"], json!(refs.dish));

    let duplicate = client.call("createMenuItem", json!({"input": input(3)})).await;
    assert_eq!(duplicate["data"]["menuItem"], Value::Null);
    assert_eq!(duplicate["errors"][0]["violations"][0]["kind"], json!("unique"));
}

#[tokio::test]
async fn menu_item_references_must_exist() {
    let client = ApiClient::in_memory();
    let refs = seed_menu_refs(&client).await;

    // a dish id in the meal slot
    let body = client
        .call(
            "createMenuItem",
            json!({"input": {
                "timetable": refs.timetable,
                "cycleDay": 1,
                "meal": refs.dish,
                "course": refs.course,
                "dish": refs.dish,
            }}),
        )
        .await;
    assert_eq!(body["data"]["menuItem"], Value::Null);
    assert_eq!(body["errors"][0]["violations"][0]["kind"], json!("reference"));
}

#[tokio::test]
async fn duplicate_event_is_an_integrity_failure() {
    let client = ApiClient::in_memory();
    let timetable = seed_timetable(&client).await;
    let event = json!({
        "name": "cultural day",
        "timetable": timetable,
        "action": "no_meals",
        "startDate": "2024-06-01T08:00:00Z",
        "endDate": "2024-06-01T20:00:00Z",
    });

    let created = client.mutate("createEvent", event.clone()).await;
    assert_eq!(created["name"], json!("cultural day"));

    let duplicate = client.call("createEvent", json!({"input": event})).await;
    assert_eq!(duplicate["data"]["event"], Value::Null);
    assert_eq!(duplicate["errors"][0]["code"], json!(-32002));
    assert_eq!(duplicate["errors"][0]["category"], json!("integrity_error"));
}

#[tokio::test]
async fn referenced_records_cannot_be_deleted() {
    let client = ApiClient::in_memory();
    let refs = seed_menu_refs(&client).await;
    let item = client
        .mutate(
            "createMenuItem",
            json!({
                "timetable": refs.timetable,
                "cycleDay": 1,
                "meal": refs.meal,
                "course": refs.course,
                "dish": refs.dish,
            }),
        )
        .await;

    let blocked = client.call("deleteDish", json!({"input": {"id": refs.dish}})).await;
    assert_eq!(blocked["data"]["dish"], Value::Null);
    assert!(
        blocked["errors"][0]["message"]
            .as_str()
            .is_some_and(|message| message.contains("referenced_by_menuItem"))
    );

    client.mutate("deleteMenuItem", json!({"id": item["id"]})).await;
    let deleted = client.mutate("deleteDish", json!({"id": refs.dish})).await;
    assert_eq!(deleted["name"], json!("rice"));
}

#[tokio::test]
async fn menu_for_date_follows_the_cycle() {
    let client = ApiClient::in_memory();
    let refs = seed_menu_refs(&client).await;
    for cycle_day in [2, 3] {
        client
            .mutate(
                "createMenuItem",
                json!({
                    "timetable": refs.timetable,
                    "cycleDay": cycle_day,
                    "meal": refs.meal,
                    "course": refs.course,
                    "dish": refs.dish,
                }),
            )
            .await;
    }

    // cycle day 2 was set on 2024-03-04
    let day = client
        .data(
            "cycleDay",
            json!({"timetable": refs.timetable, "date": "2024-03-05"}),
        )
        .await;
    assert_eq!(day["cycleDay"], json!(3));
    assert_eq!(day["cycleLength"], json!(14));

    let menu = client
        .data(
            "menuForDate",
            json!({"timetable": refs.timetable, "date": "2024-03-05"}),
        )
        .await;
    assert_eq!(menu["totalCount"], json!(1));
    assert_eq!(menu["edges"][0]["node"]["cycleDay"], json!(3));

    let unknown = client
        .data("menuForDate", json!({"timetable": "wrong-id"}))
        .await;
    assert_eq!(unknown, Value::Null);
}

#[tokio::test]
async fn meal_and_vendor_names_are_unique() {
    let client = ApiClient::in_memory();
    let meal = json!({"name": "dinner", "startTime": "18:00:00", "endTime": "20:00:00"});
    client.mutate("createMeal", meal.clone()).await;
    let duplicate = client.call("createMeal", json!({"input": meal})).await;
    assert_eq!(duplicate["data"]["meal"], Value::Null);
    assert_eq!(violated_fields(&duplicate), ["name"]);

    let vendor = json!({
        "name": "mama's kitchen",
        "startDate": "2024-01-01T00:00:00Z",
        "endDate": "2024-12-31T00:00:00Z",
    });
    client.mutate("createVendor", vendor.clone()).await;
    let duplicate = client.call("createVendor", json!({"input": vendor})).await;
    assert_eq!(duplicate["data"]["vendor"], Value::Null);
    assert_eq!(violated_fields(&duplicate), ["name"]);
}

#[tokio::test]
async fn timetable_name_code_and_api_key_are_unique() {
    let client = ApiClient::in_memory();
    seed_timetable(&client).await;

    let cases = [
        (
            json!({"name": "fellows timetable", "code": "FT0002", "apiKey": "key-2"}),
            "name",
        ),
        (
            json!({"name": "staff timetable", "code": "FT7871", "apiKey": "key-3"}),
            "code",
        ),
        (
            json!({"name": "guest timetable", "code": "FT0004", "apiKey": "TF78993jTA"}),
            "api_key",
        ),
    ];
    for (mut input, field) in cases {
        input["cycleLength"] = json!(7);
        input["currentCycleDay"] = json!(1);
        let body = client.call("createTimetable", json!({"input": input})).await;
        assert_eq!(body["data"]["timetable"], Value::Null);
        assert_eq!(violated_fields(&body), [field]);
    }
}

#[tokio::test]
async fn event_must_end_after_it_starts() {
    let client = ApiClient::in_memory();
    let timetable = seed_timetable(&client).await;
    let body = client
        .call(
            "createEvent",
            json!({"input": {
                "name": "sports day",
                "timetable": timetable,
                "action": "no_meals",
                "startDate": "2024-06-01T08:00:00Z",
                "endDate": "2024-06-01T08:00:00Z",
            }}),
        )
        .await;
    assert_eq!(body["data"]["event"], Value::Null);
    assert_eq!(violated_fields(&body), ["end_date"]);
}

#[tokio::test]
async fn timetable_cycle_cannot_shrink_below_its_menu_items() {
    let client = ApiClient::in_memory();
    let refs = seed_menu_refs(&client).await;
    client
        .mutate(
            "createMenuItem",
            json!({
                "timetable": refs.timetable,
                "cycleDay": 10,
                "meal": refs.meal,
                "course": refs.course,
                "dish": refs.dish,
            }),
        )
        .await;

    let shrunk = client
        .call(
            "updateTimetable",
            json!({"input": {"id": refs.timetable, "cycleLength": 7}}),
        )
        .await;
    assert_eq!(shrunk["data"]["timetable"], Value::Null);
    assert_eq!(violated_fields(&shrunk), ["cycle_length"]);

    let timetable = client
        .data("timetable", json!({"id": refs.timetable}))
        .await;
    assert_eq!(timetable["cycleLength"], json!(14));

    let trimmed = client
        .mutate(
            "updateTimetable",
            json!({"id": refs.timetable, "cycleLength": 10}),
        )
        .await;
    assert_eq!(trimmed["cycleLength"], json!(10));
}

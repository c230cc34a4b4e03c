use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schedule_cell::models::{Branch, ScheduleError, Slot};
use schedule_cell::services::slots::SlotGeneratorService;
use shared_config::AppConfig;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const TOKEN: &str = "test-token";

fn test_config(mock_server: &MockServer) -> AppConfig {
    TestConfig::with_supabase_url(&mock_server.uri()).to_app_config()
}

/// 2026-03-02 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

async fn mount_template(mock_server: &MockServer, doctor_id: &Uuid, slot_duration: i32, windows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/weekly_templates"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::template_response(&doctor_id.to_string(), slot_duration, windows)
        ])))
        .mount(mock_server)
        .await;
}

async fn mount_empty(mock_server: &MockServer, table: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{}", table)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

fn hennur_morning() -> serde_json::Value {
    json!({
        "monday": [
            { "branch": "hennur", "from": "09:00", "to": "10:00" }
        ]
    })
}

#[tokio::test]
async fn monday_window_yields_two_half_hour_slots() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_template(&mock_server, &doctor_id, 30, hennur_morning()).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "blocked_ranges").await;
    mount_empty(&mock_server, "appointments").await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    assert_eq!(
        slots,
        vec![
            Slot { from: "09:00".into(), to: "09:30".into(), branch: Branch::Hennur, booked: false },
            Slot { from: "09:30".into(), to: "10:00".into(), branch: Branch::Hennur, booked: false },
        ]
    );
}

#[tokio::test]
async fn blocked_range_marks_overlapping_slot_booked() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_template(&mock_server, &doctor_id, 30, hennur_morning()).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "appointments").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/blocked_ranges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::blocked_range_response(
                &doctor_id.to_string(),
                "2026-03-02",
                "09:00",
                "09:30",
                Some("Ward rounds"),
            )
        ])))
        .mount(&mock_server)
        .await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    assert_eq!(slots.len(), 2);
    assert!(slots[0].booked);
    assert!(!slots[1].booked);
}

#[tokio::test]
async fn adjacent_blocked_range_does_not_mark_slot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_template(&mock_server, &doctor_id, 30, hennur_morning()).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "appointments").await;

    // Blocked [09:30,10:00) must not touch the half-open [09:00,09:30) slot
    Mock::given(method("GET"))
        .and(path("/rest/v1/blocked_ranges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::blocked_range_response(
                &doctor_id.to_string(),
                "2026-03-02",
                "09:30",
                "10:00",
                None,
            )
        ])))
        .mount(&mock_server)
        .await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    assert!(!slots[0].booked);
    assert!(slots[1].booked);
}

#[tokio::test]
async fn holiday_wins_over_template_content() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_template(&mock_server, &doctor_id, 30, hennur_morning()).await;
    mount_empty(&mock_server, "blocked_ranges").await;
    mount_empty(&mock_server, "appointments").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/holidays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::holiday_response(&doctor_id.to_string(), "2026-03-02", Some("Ugadi"))
        ])))
        .mount(&mock_server)
        .await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn booked_appointment_marks_matching_slot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_template(&mock_server, &doctor_id, 30, hennur_morning()).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "blocked_ranges").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "appointment_time": "09:30" }
        ])))
        .mount(&mock_server)
        .await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    assert!(!slots[0].booked);
    assert!(slots[1].booked);
}

#[tokio::test]
async fn trailing_partial_slot_is_dropped() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let windows = json!({
        "monday": [
            { "branch": "hennur", "from": "09:00", "to": "09:45" }
        ]
    });
    mount_template(&mock_server, &doctor_id, 30, windows).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "blocked_ranges").await;
    mount_empty(&mock_server, "appointments").await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    // [09:30,10:00) would overrun the window end; it is dropped, not truncated
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].to, "09:30");
}

#[tokio::test]
async fn windows_keep_stored_order_without_merging() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let windows = json!({
        "monday": [
            { "branch": "hennur", "from": "14:00", "to": "15:00" },
            { "branch": "hennur", "from": "09:00", "to": "10:00" }
        ]
    });
    mount_template(&mock_server, &doctor_id, 30, windows).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "blocked_ranges").await;
    mount_empty(&mock_server, "appointments").await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    let starts: Vec<&str> = slots.iter().map(|s| s.from.as_str()).collect();
    assert_eq!(starts, vec!["14:00", "14:30", "09:00", "09:30"]);
}

#[tokio::test]
async fn other_weekday_or_branch_yields_no_slots() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let windows = json!({
        "monday": [
            { "branch": "hennur", "from": "09:00", "to": "10:00" },
            { "branch": "koramangala", "from": "11:00", "to": "12:00" }
        ]
    });
    mount_template(&mock_server, &doctor_id, 30, windows).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "blocked_ranges").await;
    mount_empty(&mock_server, "appointments").await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));

    // Tuesday has no windows at all
    let tuesday = monday() + chrono::Duration::days(1);
    let slots = generator
        .generate_slots(doctor_id, tuesday, Branch::Hennur, TOKEN)
        .await
        .unwrap();
    assert!(slots.is_empty());

    // Koramangala has its own Monday window
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Koramangala, TOKEN)
        .await
        .unwrap();
    assert_eq!(slots.len(), 2);
}

#[tokio::test]
async fn missing_template_is_not_found() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_empty(&mock_server, "weekly_templates").await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let result = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await;

    assert_matches!(result, Err(ScheduleError::TemplateNotFound));
}

#[tokio::test]
async fn unserved_branch_is_not_found() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_template(&mock_server, &doctor_id, 30, hennur_morning()).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "blocked_ranges").await;
    mount_empty(&mock_server, "appointments").await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let result = generator
        .generate_slots(doctor_id, monday(), Branch::Jayanagar, TOKEN)
        .await;

    assert_matches!(result, Err(ScheduleError::BranchNotServed(Branch::Jayanagar)));
}

#[tokio::test]
async fn slot_query_is_idempotent() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_template(&mock_server, &doctor_id, 30, hennur_morning()).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "blocked_ranges").await;
    mount_empty(&mock_server, "appointments").await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));

    let first = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();
    let second = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn slots_never_overrun_their_window() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    // Odd window lengths against a 45-minute duration
    let windows = json!({
        "monday": [
            { "branch": "hennur", "from": "09:10", "to": "11:05" },
            { "branch": "hennur", "from": "13:00", "to": "13:40" }
        ]
    });
    mount_template(&mock_server, &doctor_id, 45, windows).await;
    mount_empty(&mock_server, "holidays").await;
    mount_empty(&mock_server, "blocked_ranges").await;
    mount_empty(&mock_server, "appointments").await;

    let generator = SlotGeneratorService::new(&test_config(&mock_server));
    let slots = generator
        .generate_slots(doctor_id, monday(), Branch::Hennur, TOKEN)
        .await
        .unwrap();

    assert_eq!(slots.len(), 2);
    for slot in &slots {
        assert!(schedule_cell::time::to_minutes(&slot.to).unwrap() <= schedule_cell::time::to_minutes("11:05").unwrap());
    }
}

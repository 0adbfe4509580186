// SPDX-License-Identifier: MIT

//! Coach relationship lifecycle against the Firestore emulator.
//!
//! Exercises the transactional guards end to end: duplicate requests,
//! premature selection, the select/end/block dual writes, and the rating
//! aggregate.

use bitewise_api::models::coaching::RequestStatus;
use bitewise_api::models::{Nutritionist, User};
use bitewise_api::time_utils::now_rfc3339;

mod common;
use common::{test_db, unique_id};

fn make_user(uid: &str) -> User {
    User {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        weight_kg: Some(80.0),
        height_cm: Some(180.0),
        age: Some(30),
        gender: Some("male".to_string()),
        goal: Some("Losing Weight".to_string()),
        activity_level: Some("Lightly Active".to_string()),
        dietary_preferences: vec![],
        nutrition_plan: None,
        active_coach_id: None,
        created_at: now_rfc3339(),
    }
}

fn make_nutritionist(uid: &str) -> Nutritionist {
    Nutritionist {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        first_name: "Coach".to_string(),
        last_name: "Example".to_string(),
        specialization: "Sports nutrition".to_string(),
        workplace: "Clinic".to_string(),
        years_of_experience: 5,
        short_bio: "Bio".to_string(),
        profile_image_url: None,
        average_rating: 0.0,
        rating_count: 0,
        created_at: now_rfc3339(),
    }
}

#[tokio::test]
async fn test_duplicate_request_conflicts() {
    require_emulator!();
    let db = test_db().await;

    let user = make_user(&unique_id("dup-user"));
    let coach = make_nutritionist(&unique_id("dup-coach"));
    db.upsert_user(&user).await.unwrap();
    db.upsert_nutritionist(&coach).await.unwrap();

    db.create_coach_request_atomic(&user.uid, &coach.uid, &now_rfc3339())
        .await
        .expect("first request should succeed");

    let err = db
        .create_coach_request_atomic(&user.uid, &coach.uid, &now_rfc3339())
        .await
        .expect_err("second request must conflict");
    assert!(matches!(err, bitewise_api::error::AppError::Conflict(_)));

    // Still exactly one slot for the pair
    let slot = db
        .get_coach_request(&user.uid, &coach.uid)
        .await
        .unwrap()
        .expect("slot exists");
    assert_eq!(slot.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_select_requires_accepted_status() {
    require_emulator!();
    let db = test_db().await;

    let user = make_user(&unique_id("select-user"));
    let coach = make_nutritionist(&unique_id("select-coach"));
    db.upsert_user(&user).await.unwrap();
    db.upsert_nutritionist(&coach).await.unwrap();

    db.create_coach_request_atomic(&user.uid, &coach.uid, &now_rfc3339())
        .await
        .unwrap();

    // Selecting while the request is still pending must fail and must not
    // touch active_coach_id.
    let err = db
        .select_coach_atomic(&user.uid, &coach.uid)
        .await
        .expect_err("select of pending request must conflict");
    assert!(matches!(err, bitewise_api::error::AppError::Conflict(_)));

    let stored = db.get_user(&user.uid).await.unwrap().unwrap();
    assert!(stored.active_coach_id.is_none());
}

#[tokio::test]
async fn test_accept_select_end_happy_path() {
    require_emulator!();
    let db = test_db().await;

    let user = make_user(&unique_id("happy-user"));
    let coach = make_nutritionist(&unique_id("happy-coach"));
    db.upsert_user(&user).await.unwrap();
    db.upsert_nutritionist(&coach).await.unwrap();

    db.create_coach_request_atomic(&user.uid, &coach.uid, &now_rfc3339())
        .await
        .unwrap();
    db.accept_coach_request_atomic(&user.uid, &coach.uid)
        .await
        .unwrap();
    db.select_coach_atomic(&user.uid, &coach.uid).await.unwrap();

    let stored = db.get_user(&user.uid).await.unwrap().unwrap();
    assert_eq!(stored.active_coach_id.as_deref(), Some(coach.uid.as_str()));
    let slot = db
        .get_coach_request(&user.uid, &coach.uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(slot.status, RequestStatus::Selected);

    // A request to another coach is blocked while a coach is active
    let other = make_nutritionist(&unique_id("happy-other-coach"));
    db.upsert_nutritionist(&other).await.unwrap();
    let err = db
        .create_coach_request_atomic(&user.uid, &other.uid, &now_rfc3339())
        .await
        .expect_err("request with active coach must conflict");
    assert!(matches!(err, bitewise_api::error::AppError::Conflict(_)));

    // End: both writes happen, second call is an idempotent no-op
    let ended = db
        .end_relationship_atomic(&user.uid, RequestStatus::EndedByUser, &now_rfc3339())
        .await
        .unwrap();
    assert_eq!(ended.as_deref(), Some(coach.uid.as_str()));

    let stored = db.get_user(&user.uid).await.unwrap().unwrap();
    assert!(stored.active_coach_id.is_none());
    let slot = db
        .get_coach_request(&user.uid, &coach.uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(slot.status, RequestStatus::EndedByUser);
    assert!(slot.ended_at.is_some());

    let ended_again = db
        .end_relationship_atomic(&user.uid, RequestStatus::EndedByUser, &now_rfc3339())
        .await
        .unwrap();
    assert!(ended_again.is_none());
}

#[tokio::test]
async fn test_block_active_coach_ends_relationship() {
    require_emulator!();
    let db = test_db().await;

    let user = make_user(&unique_id("block-user"));
    let coach = make_nutritionist(&unique_id("block-coach"));
    db.upsert_user(&user).await.unwrap();
    db.upsert_nutritionist(&coach).await.unwrap();

    db.create_coach_request_atomic(&user.uid, &coach.uid, &now_rfc3339())
        .await
        .unwrap();
    db.accept_coach_request_atomic(&user.uid, &coach.uid)
        .await
        .unwrap();
    db.select_coach_atomic(&user.uid, &coach.uid).await.unwrap();

    db.block_coach_atomic(&user.uid, &coach.uid, &now_rfc3339())
        .await
        .unwrap();

    let stored = db.get_user(&user.uid).await.unwrap().unwrap();
    assert!(stored.active_coach_id.is_none());

    let slot = db
        .get_coach_request(&user.uid, &coach.uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(slot.status, RequestStatus::BlockedByUser);

    let blocked = db.get_blocked_coaches(&user.uid).await.unwrap();
    assert!(blocked.iter().any(|b| b.nutritionist_id == coach.uid));

    // Unblock removes the marker without resurrecting the request
    db.unblock_coach(&user.uid, &coach.uid).await.unwrap();
    let blocked = db.get_blocked_coaches(&user.uid).await.unwrap();
    assert!(blocked.iter().all(|b| b.nutritionist_id != coach.uid));
    let slot = db
        .get_coach_request(&user.uid, &coach.uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(slot.status, RequestStatus::BlockedByUser);
}

#[tokio::test]
async fn test_rating_aggregate() {
    require_emulator!();
    let db = test_db().await;

    let rater1 = make_user(&unique_id("rate-user-1"));
    let rater2 = make_user(&unique_id("rate-user-2"));
    let coach = make_nutritionist(&unique_id("rate-coach"));
    db.upsert_user(&rater1).await.unwrap();
    db.upsert_user(&rater2).await.unwrap();
    db.upsert_nutritionist(&coach).await.unwrap();

    // rater1 had a full relationship, rater2 rates standalone
    db.create_coach_request_atomic(&rater1.uid, &coach.uid, &now_rfc3339())
        .await
        .unwrap();
    db.accept_coach_request_atomic(&rater1.uid, &coach.uid)
        .await
        .unwrap();
    db.select_coach_atomic(&rater1.uid, &coach.uid)
        .await
        .unwrap();

    let avg = db
        .rate_nutritionist_atomic(&rater1.uid, &coach.uid, 4, &now_rfc3339())
        .await
        .unwrap();
    assert_eq!(avg, 4.0);

    // The slot was flipped best-effort
    let slot = db
        .get_coach_request(&rater1.uid, &coach.uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(slot.status, RequestStatus::Rated);
    assert_eq!(slot.rating_given, Some(4));

    // Distinct rater increments the count
    let avg = db
        .rate_nutritionist_atomic(&rater2.uid, &coach.uid, 5, &now_rfc3339())
        .await
        .unwrap();
    assert_eq!(avg, 4.5);

    let stored = db.get_nutritionist(&coach.uid).await.unwrap().unwrap();
    assert_eq!(stored.rating_count, 2);

    // Re-rate replaces the prior score without changing the count
    let avg = db
        .rate_nutritionist_atomic(&rater1.uid, &coach.uid, 1, &now_rfc3339())
        .await
        .unwrap();
    assert_eq!(avg, 3.0); // (1 + 5) / 2

    let stored = db.get_nutritionist(&coach.uid).await.unwrap().unwrap();
    assert_eq!(stored.rating_count, 2);
}

#[tokio::test]
async fn test_concurrent_ratings_no_lost_counts() {
    // Two raters racing on the same aggregate: if the nutritionist read ran
    // outside the transaction's read set, both could read count 0 and the
    // second commit would overwrite the first. Both ratings must land.
    require_emulator!();
    let db = test_db().await;

    let rater1 = make_user(&unique_id("race-rater-1"));
    let rater2 = make_user(&unique_id("race-rater-2"));
    let coach = make_nutritionist(&unique_id("race-coach"));
    db.upsert_user(&rater1).await.unwrap();
    db.upsert_user(&rater2).await.unwrap();
    db.upsert_nutritionist(&coach).await.unwrap();

    let mut handles = vec![];
    for (uid, score) in [(rater1.uid.clone(), 4), (rater2.uid.clone(), 5)] {
        let db_clone = db.clone();
        let coach_uid = coach.uid.clone();
        handles.push(tokio::spawn(async move {
            db_clone
                .rate_nutritionist_atomic(&uid, &coach_uid, score, &now_rfc3339())
                .await
        }));
    }
    for handle in handles {
        handle
            .await
            .expect("Task join failed")
            .expect("Rating failed");
    }

    let stored = db.get_nutritionist(&coach.uid).await.unwrap().unwrap();
    assert_eq!(stored.rating_count, 2, "Rating lost under concurrency");
    assert_eq!(stored.average_rating, 4.5);
}

#[tokio::test]
async fn test_end_relationship_with_missing_slot() {
    // active_coach_id without a matching selected slot (legacy or partially
    // migrated data): ending must still clear the field and succeed.
    require_emulator!();
    let db = test_db().await;

    let mut user = make_user(&unique_id("dangling-user"));
    let coach = make_nutritionist(&unique_id("dangling-coach"));
    user.active_coach_id = Some(coach.uid.clone());
    db.upsert_user(&user).await.unwrap();
    db.upsert_nutritionist(&coach).await.unwrap();

    let ended = db
        .end_relationship_atomic(&user.uid, RequestStatus::EndedByUser, &now_rfc3339())
        .await
        .expect("end must tolerate a missing slot");
    assert_eq!(ended.as_deref(), Some(coach.uid.as_str()));

    let stored = db.get_user(&user.uid).await.unwrap().unwrap();
    assert!(stored.active_coach_id.is_none());
}

#[tokio::test]
async fn test_request_status_none_without_slot() {
    require_emulator!();
    let db = test_db().await;

    let slot = db
        .get_coach_request("no-such-user", "no-such-coach")
        .await
        .unwrap();
    assert!(slot.is_none());
}

// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Accounts (users and nutritionists)
//! - Coach request slots and the relationship lifecycle transactions
//! - Ratings and block markers
//! - Daily consumption (transactional meal logging)
//! - Weight history
//!
//! Every operation that writes more than one document, or read-modifies an
//! aggregate, runs inside a Firestore transaction. Reads inside a transaction
//! go through a client clone carrying the transaction's consistency selector,
//! so they register in the transaction's read set and a conflicting commit
//! aborts instead of silently losing an update. The aggregate increments
//! (meal logging, ratings) retry aborted commits a bounded number of times;
//! the lifecycle transitions surface an abort as a database error.

use crate::db::collections;
use crate::error::AppError;
use crate::models::coaching::{apply_rating, BlockedCoach, CoachRequest, Rating, RequestStatus};
use crate::models::consumption::{DailyConsumption, LoggedMeal, MealType};
use crate::models::{Nutritionist, User, WeightEntry};
use futures_util::{stream, StreamExt};

/// Cap on concurrent Firestore reads when hydrating profile lists.
const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Commit attempts for transactions that increment aggregates under
/// contention.
const MAX_TX_ATTEMPTS: u32 = 5;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Clone of the client bound to a transaction, so selects through it
    /// register in the transaction's read set for conflict detection.
    fn transaction_reader(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        )
    }

    // ─── Typed Reads ─────────────────────────────────────────────
    //
    // Associated functions taking the client explicitly, so the same read
    // works against the plain client and against a transaction reader.

    async fn read_user(db: &firestore::FirestoreDb, uid: &str) -> Result<Option<User>, AppError> {
        db.fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn read_nutritionist(
        db: &firestore::FirestoreDb,
        uid: &str,
    ) -> Result<Option<Nutritionist>, AppError> {
        db.fluent()
            .select()
            .by_id_in(collections::NUTRITIONISTS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn read_coach_request(
        db: &firestore::FirestoreDb,
        user_uid: &str,
        nutritionist_id: &str,
    ) -> Result<Option<CoachRequest>, AppError> {
        db.fluent()
            .select()
            .by_id_in(collections::COACH_REQUESTS)
            .obj()
            .one(&CoachRequest::doc_id(user_uid, nutritionist_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn read_rating(
        db: &firestore::FirestoreDb,
        nutritionist_id: &str,
        rater_uid: &str,
    ) -> Result<Option<Rating>, AppError> {
        db.fluent()
            .select()
            .by_id_in(collections::RATINGS)
            .obj()
            .one(&Rating::doc_id(nutritionist_id, rater_uid))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn read_daily_consumption(
        db: &firestore::FirestoreDb,
        uid: &str,
        date: &str,
    ) -> Result<Option<DailyConsumption>, AppError> {
        db.fluent()
            .select()
            .by_id_in(collections::DAILY_CONSUMPTION)
            .obj()
            .one(&format!("{}_{}", uid, date))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Account Operations ──────────────────────────────────────

    /// Get a user by UID.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        Self::read_user(self.get_client()?, uid).await
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a nutritionist by UID.
    pub async fn get_nutritionist(&self, uid: &str) -> Result<Option<Nutritionist>, AppError> {
        Self::read_nutritionist(self.get_client()?, uid).await
    }

    /// Create or update a nutritionist.
    pub async fn upsert_nutritionist(&self, n: &Nutritionist) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::NUTRITIONISTS)
            .document_id(&n.uid)
            .object(n)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List all nutritionists (browse screen).
    pub async fn list_nutritionists(&self) -> Result<Vec<Nutritionist>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NUTRITIONISTS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch several nutritionist profiles concurrently, preserving order.
    ///
    /// Individual lookup failures are logged and yield `None`; hydration
    /// callers drop those entries rather than failing the whole response.
    pub async fn get_nutritionists_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<Option<Nutritionist>>, AppError> {
        let client = self.get_client()?;

        Ok(stream::iter(ids.to_vec())
            .map(|id| async move {
                match Self::read_nutritionist(client, &id).await {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!(
                            nutritionist_id = %id,
                            error = %e,
                            "Nutritionist lookup failed during hydration"
                        );
                        None
                    }
                }
            })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Option<Nutritionist>>>()
            .await)
    }

    // ─── Coach Request Slot Operations ───────────────────────────

    /// Get the request slot for a (user, nutritionist) pair.
    pub async fn get_coach_request(
        &self,
        user_uid: &str,
        nutritionist_id: &str,
    ) -> Result<Option<CoachRequest>, AppError> {
        Self::read_coach_request(self.get_client()?, user_uid, nutritionist_id).await
    }

    /// Get all request slots for a user.
    ///
    /// Status filtering happens in memory; a user has at most a handful of
    /// slots so the query stays cheap.
    pub async fn get_coach_requests_for_user(
        &self,
        user_uid: &str,
    ) -> Result<Vec<CoachRequest>, AppError> {
        let uid = user_uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COACH_REQUESTS)
            .filter(move |q| q.for_all([q.field("user_uid").eq(uid.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically create a pending request for a (user, nutritionist) pair.
    ///
    /// The slot document is keyed by the pair, so the duplicate check is a
    /// transactional read of one document: a concurrent create for the same
    /// pair conflicts on commit and the loser surfaces an error against the
    /// fresh state rather than writing a duplicate.
    ///
    /// Guards (409): the user already has an active coach, or the slot holds
    /// a non-terminal request. A terminal slot (ended/blocked/rated) is
    /// overwritten by the new pending request.
    pub async fn create_coach_request_atomic(
        &self,
        user_uid: &str,
        nutritionist_id: &str,
        now: &str,
    ) -> Result<CoachRequest, AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = Self::transaction_reader(client, &transaction);

        let staged: Result<CoachRequest, AppError> = async {
            let user = Self::read_user(&reader, user_uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_uid)))?;

            if user.active_coach_id.is_some() {
                return Err(AppError::Conflict(
                    "You already have an active coach".to_string(),
                ));
            }

            if let Some(existing) =
                Self::read_coach_request(&reader, user_uid, nutritionist_id).await?
            {
                if existing.status.is_non_terminal() {
                    return Err(AppError::Conflict(format!(
                        "A {} request to this nutritionist already exists",
                        existing.status.as_str()
                    )));
                }
            }

            let request = CoachRequest::new(user_uid, nutritionist_id, now);

            client
                .fluent()
                .update()
                .in_col(collections::COACH_REQUESTS)
                .document_id(&CoachRequest::doc_id(user_uid, nutritionist_id))
                .object(&request)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add request to transaction: {}", e))
                })?;

            Ok(request)
        }
        .await;

        let request = match staged {
            Ok(request) => request,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(user_uid, nutritionist_id, "Coach request created");

        Ok(request)
    }

    /// Atomically accept a pending request (nutritionist side).
    pub async fn accept_coach_request_atomic(
        &self,
        user_uid: &str,
        nutritionist_id: &str,
    ) -> Result<CoachRequest, AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = Self::transaction_reader(client, &transaction);

        let staged: Result<CoachRequest, AppError> = async {
            let mut request = Self::read_coach_request(&reader, user_uid, nutritionist_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Request not found".to_string()))?;

            if let Err(e) = request.accept() {
                return Err(AppError::Conflict(e.to_string()));
            }

            client
                .fluent()
                .update()
                .in_col(collections::COACH_REQUESTS)
                .document_id(&CoachRequest::doc_id(user_uid, nutritionist_id))
                .object(&request)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add request to transaction: {}", e))
                })?;

            Ok(request)
        }
        .await;

        let request = match staged {
            Ok(request) => request,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(user_uid, nutritionist_id, "Coach request accepted");

        Ok(request)
    }

    /// Atomically select an accepted coach.
    ///
    /// Flips the slot to `selected` and sets `active_coach_id` on the user
    /// document in one transaction. A crash cannot leave one write without
    /// the other, and a concurrent select aborts on the user read.
    pub async fn select_coach_atomic(
        &self,
        user_uid: &str,
        nutritionist_id: &str,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = Self::transaction_reader(client, &transaction);

        let staged: Result<(), AppError> = async {
            let mut user = Self::read_user(&reader, user_uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_uid)))?;

            if user.active_coach_id.is_some() {
                return Err(AppError::Conflict(
                    "You already have an active coach".to_string(),
                ));
            }

            let mut request = Self::read_coach_request(&reader, user_uid, nutritionist_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Request not found".to_string()))?;

            if let Err(e) = request.select() {
                return Err(AppError::Conflict(e.to_string()));
            }

            user.active_coach_id = Some(nutritionist_id.to_string());

            client
                .fluent()
                .update()
                .in_col(collections::COACH_REQUESTS)
                .document_id(&CoachRequest::doc_id(user_uid, nutritionist_id))
                .object(&request)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add request to transaction: {}", e))
                })?;

            client
                .fluent()
                .update()
                .in_col(collections::USERS)
                .document_id(user_uid)
                .object(&user)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add user to transaction: {}", e))
                })?;

            Ok(())
        }
        .await;

        if let Err(e) = staged {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(user_uid, nutritionist_id, "Coach selected");

        Ok(())
    }

    /// Atomically end the user's active relationship.
    ///
    /// Clears `active_coach_id` and flips the matching `selected` slot to
    /// `terminal` (`ended_by_user` or `blocked_by_user`). If the slot is
    /// missing or not `selected`, the field is still cleared and a warning is
    /// logged; unblocking the user wins over strict slot consistency.
    ///
    /// Returns the UID of the ended coach, or `None` if the user had no
    /// active coach (idempotent success).
    pub async fn end_relationship_atomic(
        &self,
        user_uid: &str,
        terminal: RequestStatus,
        now: &str,
    ) -> Result<Option<String>, AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = Self::transaction_reader(client, &transaction);

        let staged: Result<Option<String>, AppError> = async {
            let mut user = Self::read_user(&reader, user_uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_uid)))?;

            let Some(coach_id) = user.active_coach_id.take() else {
                return Ok(None);
            };

            match Self::read_coach_request(&reader, user_uid, &coach_id).await? {
                Some(mut request) if request.status == RequestStatus::Selected => {
                    if request.end(terminal, now).is_ok() {
                        client
                            .fluent()
                            .update()
                            .in_col(collections::COACH_REQUESTS)
                            .document_id(&CoachRequest::doc_id(user_uid, &coach_id))
                            .object(&request)
                            .add_to_transaction(&mut transaction)
                            .map_err(|e| {
                                AppError::Database(format!(
                                    "Failed to add request to transaction: {}",
                                    e
                                ))
                            })?;
                    }
                }
                other => {
                    tracing::warn!(
                        user_uid,
                        coach_id = %coach_id,
                        slot_found = other.is_some(),
                        "No selected request slot for active coach; clearing active_coach_id anyway"
                    );
                }
            }

            client
                .fluent()
                .update()
                .in_col(collections::USERS)
                .document_id(user_uid)
                .object(&user)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add user to transaction: {}", e))
                })?;

            Ok(Some(coach_id))
        }
        .await;

        match staged {
            Ok(Some(coach_id)) => {
                transaction
                    .commit()
                    .await
                    .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

                tracing::info!(
                    user_uid,
                    coach_id = %coach_id,
                    status = terminal.as_str(),
                    "Relationship ended"
                );

                Ok(Some(coach_id))
            }
            Ok(None) => {
                let _ = transaction.rollback().await;
                Ok(None)
            }
            Err(e) => {
                let _ = transaction.rollback().await;
                Err(e)
            }
        }
    }

    /// Atomically block a coach.
    ///
    /// Always writes the block marker (idempotent). If the blocked coach is
    /// the user's active coach, the same transaction performs the end
    /// writes with status `blocked_by_user`.
    pub async fn block_coach_atomic(
        &self,
        user_uid: &str,
        nutritionist_id: &str,
        now: &str,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = Self::transaction_reader(client, &transaction);

        let staged: Result<(), AppError> = async {
            let mut user = Self::read_user(&reader, user_uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_uid)))?;

            if user.active_coach_id.as_deref() == Some(nutritionist_id) {
                user.active_coach_id = None;

                match Self::read_coach_request(&reader, user_uid, nutritionist_id).await? {
                    Some(mut request) if request.status == RequestStatus::Selected => {
                        if request.end(RequestStatus::BlockedByUser, now).is_ok() {
                            client
                                .fluent()
                                .update()
                                .in_col(collections::COACH_REQUESTS)
                                .document_id(&CoachRequest::doc_id(user_uid, nutritionist_id))
                                .object(&request)
                                .add_to_transaction(&mut transaction)
                                .map_err(|e| {
                                    AppError::Database(format!(
                                        "Failed to add request to transaction: {}",
                                        e
                                    ))
                                })?;
                        }
                    }
                    other => {
                        tracing::warn!(
                            user_uid,
                            nutritionist_id,
                            slot_found = other.is_some(),
                            "No selected request slot for blocked active coach"
                        );
                    }
                }

                client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(user_uid)
                    .object(&user)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add user to transaction: {}", e))
                    })?;
            }

            let marker = BlockedCoach {
                user_uid: user_uid.to_string(),
                nutritionist_id: nutritionist_id.to_string(),
                blocked_at: now.to_string(),
            };

            client
                .fluent()
                .update()
                .in_col(collections::BLOCKED_COACHES)
                .document_id(&BlockedCoach::doc_id(user_uid, nutritionist_id))
                .object(&marker)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add marker to transaction: {}", e))
                })?;

            Ok(())
        }
        .await;

        if let Err(e) = staged {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(user_uid, nutritionist_id, "Coach blocked");

        Ok(())
    }

    /// Remove a block marker. Never resurrects a prior request.
    pub async fn unblock_coach(
        &self,
        user_uid: &str,
        nutritionist_id: &str,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::BLOCKED_COACHES)
            .document_id(&BlockedCoach::doc_id(user_uid, nutritionist_id))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_uid, nutritionist_id, "Coach unblocked");
        Ok(())
    }

    /// Get a user's block markers.
    pub async fn get_blocked_coaches(&self, user_uid: &str) -> Result<Vec<BlockedCoach>, AppError> {
        let uid = user_uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::BLOCKED_COACHES)
            .filter(move |q| q.for_all([q.field("user_uid").eq(uid.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically rate a nutritionist.
    ///
    /// Recomputes the running average in one transaction: a re-rate replaces
    /// the rater's prior score without changing the count. Best-effort, the
    /// pair's request slot is flipped to `rated` when it is in a ratable
    /// state; a missing or non-ratable slot is tolerated. Aborted commits
    /// (concurrent raters) are retried.
    pub async fn rate_nutritionist_atomic(
        &self,
        rater_uid: &str,
        nutritionist_id: &str,
        rating: u32,
        now: &str,
    ) -> Result<f64, AppError> {
        let client = self.get_client()?;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
            let reader = Self::transaction_reader(client, &transaction);

            let staged: Result<f64, AppError> = async {
                let mut nutritionist = Self::read_nutritionist(&reader, nutritionist_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Nutritionist {} not found", nutritionist_id))
                    })?;

                let prior = Self::read_rating(&reader, nutritionist_id, rater_uid).await?;

                let (average, count) = apply_rating(
                    nutritionist.average_rating,
                    nutritionist.rating_count,
                    prior.map(|r| r.rating),
                    rating,
                );
                nutritionist.average_rating = average;
                nutritionist.rating_count = count;

                let record = Rating {
                    nutritionist_id: nutritionist_id.to_string(),
                    rater_uid: rater_uid.to_string(),
                    rating,
                    rated_at: now.to_string(),
                };

                client
                    .fluent()
                    .update()
                    .in_col(collections::RATINGS)
                    .document_id(&Rating::doc_id(nutritionist_id, rater_uid))
                    .object(&record)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add rating to transaction: {}", e))
                    })?;

                client
                    .fluent()
                    .update()
                    .in_col(collections::NUTRITIONISTS)
                    .document_id(nutritionist_id)
                    .object(&nutritionist)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add nutritionist to transaction: {}",
                            e
                        ))
                    })?;

                match Self::read_coach_request(&reader, rater_uid, nutritionist_id).await? {
                    Some(mut request) if request.status.is_ratable() => {
                        if request.mark_rated(rating).is_ok() {
                            client
                                .fluent()
                                .update()
                                .in_col(collections::COACH_REQUESTS)
                                .document_id(&CoachRequest::doc_id(rater_uid, nutritionist_id))
                                .object(&request)
                                .add_to_transaction(&mut transaction)
                                .map_err(|e| {
                                    AppError::Database(format!(
                                        "Failed to add request to transaction: {}",
                                        e
                                    ))
                                })?;
                        }
                    }
                    _ => {
                        // Rating can stand alone without a request slot.
                        tracing::debug!(
                            rater_uid,
                            nutritionist_id,
                            "No ratable request slot; rating recorded without a slot flip"
                        );
                    }
                }

                Ok(average)
            }
            .await;

            let average = match staged {
                Ok(average) => average,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            match transaction.commit().await {
                Ok(_) => {
                    tracing::info!(
                        rater_uid,
                        nutritionist_id,
                        rating,
                        average,
                        "Nutritionist rated"
                    );
                    return Ok(average);
                }
                Err(e) if attempts < MAX_TX_ATTEMPTS => {
                    tracing::warn!(
                        attempts,
                        error = %e,
                        "Rating transaction aborted; retrying"
                    );
                }
                Err(e) => {
                    return Err(AppError::Database(format!(
                        "Transaction commit failed after {} attempts: {}",
                        attempts, e
                    )));
                }
            }
        }
    }

    // ─── Daily Consumption Operations ────────────────────────────

    /// Get a daily consumption document.
    pub async fn get_daily_consumption(
        &self,
        uid: &str,
        date: &str,
    ) -> Result<Option<DailyConsumption>, AppError> {
        Self::read_daily_consumption(self.get_client()?, uid, date).await
    }

    /// Atomically log a meal: increment the day's totals and append the meal
    /// to its slot.
    ///
    /// The read is attached to the transaction, so two concurrent logs for
    /// the same user and date cannot both read the same totals and commit;
    /// the loser's commit aborts and is retried against the fresh document.
    pub async fn log_meal_atomic(
        &self,
        uid: &str,
        date: &str,
        meal_type: MealType,
        meal: LoggedMeal,
    ) -> Result<DailyConsumption, AppError> {
        let client = self.get_client()?;
        let doc_id = format!("{}_{}", uid, date);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
            let reader = Self::transaction_reader(client, &transaction);

            let staged: Result<DailyConsumption, AppError> = async {
                let mut day = Self::read_daily_consumption(&reader, uid, date)
                    .await?
                    .unwrap_or_else(|| DailyConsumption::empty(uid, date));

                day.log_meal(meal_type, meal.clone());

                client
                    .fluent()
                    .update()
                    .in_col(collections::DAILY_CONSUMPTION)
                    .document_id(&doc_id)
                    .object(&day)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add day to transaction: {}", e))
                    })?;

                Ok(day)
            }
            .await;

            let day = match staged {
                Ok(day) => day,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            match transaction.commit().await {
                Ok(_) => {
                    tracing::info!(uid, date, "Meal logged");
                    return Ok(day);
                }
                Err(e) if attempts < MAX_TX_ATTEMPTS => {
                    tracing::warn!(
                        attempts,
                        error = %e,
                        "Meal log transaction aborted; retrying"
                    );
                }
                Err(e) => {
                    return Err(AppError::Database(format!(
                        "Transaction commit failed after {} attempts: {}",
                        attempts, e
                    )));
                }
            }
        }
    }

    // ─── Weight History Operations ───────────────────────────────

    /// Atomically record a weight entry and update the profile weight.
    ///
    /// The user read is part of the transaction, so a missing user fails the
    /// whole operation with no orphaned entry, and a concurrent profile
    /// write (e.g. a plan recompute) aborts the commit instead of being
    /// clobbered.
    pub async fn log_weight_atomic(&self, entry: &WeightEntry) -> Result<(), AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = Self::transaction_reader(client, &transaction);

        let staged: Result<(), AppError> = async {
            let mut user = Self::read_user(&reader, &entry.uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", entry.uid)))?;

            user.weight_kg = Some(entry.weight_kg);

            client
                .fluent()
                .update()
                .in_col(collections::WEIGHT_HISTORY)
                .document_id(&WeightEntry::doc_id(&entry.uid, &entry.date))
                .object(entry)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add entry to transaction: {}", e))
                })?;

            client
                .fluent()
                .update()
                .in_col(collections::USERS)
                .document_id(&entry.uid)
                .object(&user)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add user to transaction: {}", e))
                })?;

            Ok(())
        }
        .await;

        if let Err(e) = staged {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(uid = %entry.uid, date = %entry.date, "Weight logged");

        Ok(())
    }

    /// Get a user's weight history, most recent first.
    pub async fn get_weight_history(&self, uid: &str) -> Result<Vec<WeightEntry>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::WEIGHT_HISTORY)
            .filter(move |q| q.for_all([q.field("uid").eq(uid.clone())]))
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

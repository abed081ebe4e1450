// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile, role and current risk level)
//! - Smartwatch data (one document per reading)
//! - Google Fit tokens
//! - Per-user predictions, prediction errors, reports and nutrition plans

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    DoctorReport, FitToken, NutritionRecord, PredictionErrorRecord, PredictionRecord, ProfilePatch,
    RiskLevel, SmartwatchRecord, StoredRecord, UserProfile,
};

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

    /// Path of `users/{uid}`, the parent of all per-user subcollections.
    fn user_path(&self, uid: &str) -> Result<firestore::ParentPathBuilder, AppError> {
        self.get_client()?
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user's profile document.
    pub async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a user's profile document.
    pub async fn upsert_user(&self, uid: &str, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Write only the fields set in `patch`. Creates the document if needed.
    pub async fn update_user_fields(&self, uid: &str, patch: &ProfilePatch) -> Result<(), AppError> {
        let fields = patch.field_paths();
        if fields.is_empty() {
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::USERS)
            .document_id(uid)
            .object(patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All user documents with their IDs.
    pub async fn list_users(&self) -> Result<Vec<(String, UserProfile)>, AppError> {
        let docs = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        docs.iter().map(document_with_id).collect()
    }

    /// Record a new risk level on the user document, leaving other fields alone.
    pub async fn set_user_risk_level(
        &self,
        uid: &str,
        risk_level: RiskLevel,
        now: &str,
    ) -> Result<(), AppError> {
        #[derive(Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RiskUpdate {
            risk_level: RiskLevel,
            last_updated: String,
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["riskLevel", "lastUpdated"])
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&RiskUpdate {
                risk_level,
                last_updated: now.to_string(),
            })
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Google Fit Token Operations ─────────────────────────────

    pub async fn get_fit_token(&self, uid: &str) -> Result<Option<FitToken>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FIT_TOKENS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set_fit_token(&self, uid: &str, token: &FitToken) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FIT_TOKENS)
            .document_id(uid)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a stored token (disconnect, or after Google rejected it).
    pub async fn delete_fit_token(&self, uid: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FIT_TOKENS)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Smartwatch Data Operations ──────────────────────────────

    /// Store a reading. Returns the new document ID.
    pub async fn add_smartwatch_record(
        &self,
        record: &SmartwatchRecord,
        unix_millis: i64,
    ) -> Result<String, AppError> {
        let doc_id = record.document_id(unix_millis);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SMARTWATCH_DATA)
            .document_id(&doc_id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(doc_id)
    }

    /// Most recent readings for a user, newest first.
    pub async fn recent_smartwatch_records(
        &self,
        uid: &str,
        limit: u32,
    ) -> Result<Vec<StoredRecord>, AppError> {
        let docs = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SMARTWATCH_DATA)
            .filter(|q| q.for_all([q.field("userId").eq(uid)]))
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        docs.iter()
            .map(|doc| document_with_id(doc).map(|(id, record)| StoredRecord { id, record }))
            .collect()
    }

    pub async fn latest_smartwatch_record(
        &self,
        uid: &str,
    ) -> Result<Option<StoredRecord>, AppError> {
        Ok(self
            .recent_smartwatch_records(uid, 1)
            .await?
            .into_iter()
            .next())
    }

    pub async fn has_smartwatch_data(&self, uid: &str) -> Result<bool, AppError> {
        let docs = self
            .get_client()?
            .fluent()
            .select()
            .fields(["userId"])
            .from(collections::SMARTWATCH_DATA)
            .filter(|q| q.for_all([q.field("userId").eq(uid)]))
            .limit(1)
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(!docs.is_empty())
    }

    /// Flag a reading as consumed by a prediction.
    pub async fn mark_processed(&self, doc_id: &str) -> Result<(), AppError> {
        #[derive(Serialize, Deserialize)]
        struct Processed {
            processed: bool,
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["processed"])
            .in_col(collections::SMARTWATCH_DATA)
            .document_id(doc_id)
            .object(&Processed { processed: true })
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Per-user Subcollections ─────────────────────────────────

    pub async fn add_prediction(
        &self,
        uid: &str,
        doc_id: &str,
        record: &PredictionRecord,
    ) -> Result<(), AppError> {
        self.add_child(uid, collections::PREDICTIONS, doc_id, record)
            .await
    }

    pub async fn latest_prediction(&self, uid: &str) -> Result<Option<PredictionRecord>, AppError> {
        self.latest_child(uid, collections::PREDICTIONS, "timestamp")
            .await
    }

    pub async fn add_prediction_error(
        &self,
        uid: &str,
        doc_id: &str,
        record: &PredictionErrorRecord,
    ) -> Result<(), AppError> {
        self.add_child(uid, collections::PREDICTION_ERRORS, doc_id, record)
            .await
    }

    pub async fn latest_prediction_error(
        &self,
        uid: &str,
    ) -> Result<Option<PredictionErrorRecord>, AppError> {
        self.latest_child(uid, collections::PREDICTION_ERRORS, "timestamp")
            .await
    }

    pub async fn add_report(
        &self,
        uid: &str,
        doc_id: &str,
        report: &DoctorReport,
    ) -> Result<(), AppError> {
        self.add_child(uid, collections::REPORTS, doc_id, report)
            .await
    }

    pub async fn latest_report(&self, uid: &str) -> Result<Option<DoctorReport>, AppError> {
        self.latest_child(uid, collections::REPORTS, "uploadedAt")
            .await
    }

    pub async fn add_nutrition_plan(
        &self,
        uid: &str,
        doc_id: &str,
        record: &NutritionRecord,
    ) -> Result<(), AppError> {
        self.add_child(uid, collections::NUTRITION_PLANS, doc_id, record)
            .await
    }

    pub async fn latest_nutrition_plan(
        &self,
        uid: &str,
    ) -> Result<Option<NutritionRecord>, AppError> {
        self.latest_child(uid, collections::NUTRITION_PLANS, "timestamp")
            .await
    }

    async fn add_child<T>(
        &self,
        uid: &str,
        collection: &str,
        doc_id: &str,
        object: &T,
    ) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        let parent = self.user_path(uid)?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .parent(&parent)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Newest document of a subcollection by an RFC3339 field.
    async fn latest_child<T>(
        &self,
        uid: &str,
        collection: &str,
        order_field: &str,
    ) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        let parent = self.user_path(uid)?;

        let mut docs: Vec<T> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .parent(&parent)
            .order_by([(order_field, firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(docs.pop())
    }
}

/// Deserialize a raw document, pairing it with the last segment of its name.
fn document_with_id<T: DeserializeOwned>(
    doc: &firestore::FirestoreDocument,
) -> Result<(String, T), AppError> {
    let id = doc
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let object = firestore::FirestoreDb::deserialize_doc_to::<T>(doc)
        .map_err(|e| AppError::Database(format!("Malformed document {}: {}", id, e)))?;
    Ok((id, object))
}

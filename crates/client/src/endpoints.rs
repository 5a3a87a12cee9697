//! Typed calls for every REST endpoint.

use crate::error::ClientResult;
use crate::session::Session;
use api_shared::{
    AppointmentRes, CreateAppointmentReq, CreateTreatmentReq, DoctorCreateAppointmentReq,
    FinanceReviewRes, HealthRes, ReviewReq, SearchQuery, SearchRes, SignupReq, TreatmentAddedRes,
    TreatmentRemovedRes, UserRes, UserSummaryRes,
};
use chrono::{DateTime, Utc};
use reqwest::Method;
use rust_decimal::Decimal;
use uuid::Uuid;

impl Session {
    pub async fn health(&self) -> ClientResult<HealthRes> {
        self.call(Method::GET, "/health", |b| b).await
    }

    pub async fn signup(&self, req: &SignupReq) -> ClientResult<UserRes> {
        self.call(Method::POST, "/auth/signup", |b| b.json(req)).await
    }

    pub async fn profile(&self) -> ClientResult<UserRes> {
        self.call(Method::GET, "/profile", |b| b).await
    }

    pub async fn doctors(&self) -> ClientResult<Vec<UserSummaryRes>> {
        self.call(Method::GET, "/doctors", |b| b).await
    }

    // ========================================================================
    // Appointments
    // ========================================================================

    /// Books a visit for the signed-in patient.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        scheduled_time: DateTime<Utc>,
    ) -> ClientResult<AppointmentRes> {
        let req = CreateAppointmentReq {
            doctor_id: Some(doctor_id.to_string()),
            scheduled_time: Some(scheduled_time.to_rfc3339()),
        };
        let path = format!("/patients/{patient_id}/appointments");
        self.call(Method::POST, &path, |b| b.json(&req)).await
    }

    /// Books a visit with the signed-in doctor for `patient_id`.
    pub async fn schedule_for_patient(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        scheduled_time: DateTime<Utc>,
    ) -> ClientResult<AppointmentRes> {
        let req = DoctorCreateAppointmentReq {
            patient_id: Some(patient_id.to_string()),
            scheduled_time: Some(scheduled_time.to_rfc3339()),
        };
        let path = format!("/doctors/{doctor_id}/appointments");
        self.call(Method::POST, &path, |b| b.json(&req)).await
    }

    pub async fn patient_appointments(&self, patient_id: Uuid) -> ClientResult<Vec<AppointmentRes>> {
        let path = format!("/patients/{patient_id}/appointments");
        self.call(Method::GET, &path, |b| b).await
    }

    pub async fn doctor_appointments(&self, doctor_id: Uuid) -> ClientResult<Vec<AppointmentRes>> {
        let path = format!("/doctors/{doctor_id}/appointments");
        self.call(Method::GET, &path, |b| b).await
    }

    pub async fn start_appointment(&self, appointment_id: Uuid) -> ClientResult<AppointmentRes> {
        let path = format!("/appointments/{appointment_id}/start");
        self.call(Method::POST, &path, |b| b).await
    }

    pub async fn finish_appointment(&self, appointment_id: Uuid) -> ClientResult<AppointmentRes> {
        let path = format!("/appointments/{appointment_id}/finish");
        self.call(Method::POST, &path, |b| b).await
    }

    // ========================================================================
    // Treatments
    // ========================================================================

    pub async fn add_treatment(
        &self,
        appointment_id: Uuid,
        name: &str,
        cost: Decimal,
    ) -> ClientResult<TreatmentAddedRes> {
        let req = CreateTreatmentReq {
            name: Some(name.to_owned()),
            cost: Some(serde_json::Value::String(cost.to_string())),
        };
        let path = format!("/appointments/{appointment_id}/treatments");
        self.call(Method::POST, &path, |b| b.json(&req)).await
    }

    pub async fn remove_treatment(
        &self,
        appointment_id: Uuid,
        treatment_id: Uuid,
    ) -> ClientResult<TreatmentRemovedRes> {
        let path = format!("/appointments/{appointment_id}/treatments/{treatment_id}");
        self.call(Method::DELETE, &path, |b| b).await
    }

    // ========================================================================
    // Finance
    // ========================================================================

    pub async fn search_appointments(&self, query: &SearchQuery) -> ClientResult<SearchRes> {
        self.call(Method::GET, "/finance/appointments", |b| b.query(query))
            .await
    }

    pub async fn review_appointment(
        &self,
        appointment_id: Uuid,
        approved: bool,
        notes: Option<&str>,
    ) -> ClientResult<FinanceReviewRes> {
        let req = ReviewReq {
            approved: Some(approved),
            notes: notes.map(str::to_owned),
        };
        let path = format!("/finance/appointments/{appointment_id}/review");
        self.call(Method::POST, &path, |b| b.json(&req)).await
    }
}

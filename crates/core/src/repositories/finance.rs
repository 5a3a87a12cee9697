//! Finance search and review.

use crate::db::{lock_appointment, Db};
use crate::error::{CoreError, CoreResult};
use crate::models::{AppointmentDetails, AppointmentStatus, FinanceReview};
use crate::repositories::appointments::{details_query, fetch_details};
use crate::validation::validate_pagination;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// Filters for [`FinanceService::search`]. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default)]
pub struct AppointmentSearch {
    /// Case-insensitive substring of the doctor's full name.
    pub doctor: Option<String>,
    /// Case-insensitive substring of the patient's full name.
    pub patient: Option<String>,
    pub appointment_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Inclusive lower bound on `scheduled_time`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `scheduled_time`.
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub appointments: Vec<AppointmentDetails>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Clone, Debug)]
pub struct FinanceService {
    db: Db,
}

impl FinanceService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Searches appointments, latest `scheduled_time` first.
    pub async fn search(&self, filters: &AppointmentSearch) -> CoreResult<SearchPage> {
        let (page, limit) = validate_pagination(filters.page, filters.limit)?;
        let mut conn = self.db.pool().acquire().await?;

        let mut count = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM appointments a \
             JOIN users p ON p.id = a.patient_id \
             JOIN users d ON d.id = a.doctor_id ",
        );
        push_filters(&mut count, filters);
        let (total,): (i64,) = count.build_query_as().fetch_one(&mut *conn).await?;
        let total = u64::try_from(total).unwrap_or_default();

        let mut query = details_query();
        push_filters(&mut query, filters);
        query
            .push(" ORDER BY a.scheduled_time DESC, a.id ASC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page - 1) * i64::from(limit));
        let appointments = fetch_details(&mut conn, query).await?;

        Ok(SearchPage {
            appointments,
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
        })
    }

    /// Records `finance_user_id`'s verdict on an appointment, replacing any earlier review.
    pub async fn review(
        &self,
        appointment_id: Uuid,
        finance_user_id: Uuid,
        approved: bool,
        notes: Option<&str>,
    ) -> CoreResult<FinanceReview> {
        let notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned);

        let mut tx = self.db.begin().await?;
        if !lock_appointment(&mut tx, appointment_id).await? {
            return Err(CoreError::AppointmentNotFound);
        }

        let now = Utc::now();
        let review = sqlx::query_as::<_, FinanceReview>(
            "INSERT INTO finance_reviews
                (id, appointment_id, finance_user_id, approved, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (appointment_id) DO UPDATE SET
                finance_user_id = excluded.finance_user_id,
                approved = excluded.approved,
                notes = excluded.notes,
                updated_at = excluded.updated_at
             RETURNING id, appointment_id, finance_user_id, approved, notes, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(appointment_id)
        .bind(finance_user_id)
        .bind(approved)
        .bind(notes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(%appointment_id, %finance_user_id, approved, "finance review recorded");
        Ok(review)
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filters: &AppointmentSearch) {
    query.push("WHERE 1 = 1");

    if let Some(doctor) = filters.doctor.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query
            .push(" AND d.full_name LIKE ")
            .push_bind(format!("%{}%", escape_like(doctor)))
            .push(" ESCAPE '\\'");
    }
    if let Some(patient) = filters.patient.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query
            .push(" AND p.full_name LIKE ")
            .push_bind(format!("%{}%", escape_like(patient)))
            .push(" ESCAPE '\\'");
    }
    if let Some(id) = filters.appointment_id {
        query.push(" AND a.id = ").push_bind(id);
    }
    if let Some(status) = filters.status {
        query.push(" AND a.status = ").push_bind(status);
    }
    if let Some(from) = filters.from {
        query.push(" AND a.scheduled_time >= ").push_bind(from);
    }
    if let Some(to) = filters.to {
        query.push(" AND a.scheduled_time <= ").push_bind(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::repositories::appointments::AppointmentService;
    use crate::test_support::{seed_user, test_db};
    use chrono::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        finance: FinanceService,
        appointments: AppointmentService,
        reviewer: User,
        alice: User,
        bob: User,
        house: User,
    }

    async fn fixture() -> Fixture {
        let (dir, db) = test_db().await;
        let alice = seed_user(&db, "Alice Smith", "alice@example.com", Role::Patient).await;
        let bob = seed_user(&db, "Bob Jones", "bob@example.com", Role::Patient).await;
        let house = seed_user(&db, "Gregory House", "house@example.com", Role::Doctor).await;
        let reviewer = seed_user(&db, "Fin Ance", "fin@example.com", Role::Finance).await;
        Fixture {
            _dir: dir,
            finance: FinanceService::new(db.clone()),
            appointments: AppointmentService::new(db),
            reviewer,
            alice,
            bob,
            house,
        }
    }

    #[tokio::test]
    async fn test_search_filters_and_paginates() {
        let f = fixture().await;
        for hour in 1..=3 {
            f.appointments
                .create(f.alice.id, f.house.id, Utc::now() + Duration::hours(hour))
                .await
                .unwrap();
        }
        let bobs = f
            .appointments
            .create(f.bob.id, f.house.id, Utc::now() + Duration::hours(10))
            .await
            .unwrap();

        let all = f.finance.search(&AppointmentSearch::default()).await.unwrap();
        assert_eq!(all.total, 4);
        assert_eq!(all.appointments[0].appointment.id, bobs.appointment.id);

        let by_patient = f
            .finance
            .search(&AppointmentSearch {
                patient: Some("aLiCe".into()),
                limit: Some(2),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_patient.total, 3);
        assert_eq!(by_patient.total_pages, 2);
        assert_eq!(by_patient.appointments.len(), 1);

        let by_doctor = f
            .finance
            .search(&AppointmentSearch {
                doctor: Some("house".into()),
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_doctor.total, 0);

        let by_id = f
            .finance
            .search(&AppointmentSearch {
                appointment_id: Some(bobs.appointment.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_id.appointments.len(), 1);

        let wildcard = f
            .finance
            .search(&AppointmentSearch {
                patient: Some("%".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(wildcard.total, 0);

        let window = f
            .finance
            .search(&AppointmentSearch {
                from: Some(Utc::now() + Duration::hours(5)),
                to: Some(Utc::now() + Duration::hours(20)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(window.total, 1);

        assert!(matches!(
            f.finance
                .search(&AppointmentSearch {
                    limit: Some(0),
                    ..Default::default()
                })
                .await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_review_upserts_one_per_appointment() {
        let f = fixture().await;
        let id = f
            .appointments
            .create(f.alice.id, f.house.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap()
            .appointment
            .id;

        let first = f
            .finance
            .review(id, f.reviewer.id, false, Some("  missing codes "))
            .await
            .unwrap();
        assert!(!first.approved);
        assert_eq!(first.notes.as_deref(), Some("missing codes"));

        let second = f.finance.review(id, f.reviewer.id, true, Some("")).await.unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.approved);
        assert_eq!(second.notes, None);

        let details = f.appointments.get(id).await.unwrap();
        let review = details.finance_review.expect("review attached");
        assert!(review.review.approved);
        assert_eq!(review.finance_user.full_name, "Fin Ance");

        assert!(matches!(
            f.finance.review(Uuid::new_v4(), f.reviewer.id, true, None).await,
            Err(CoreError::AppointmentNotFound)
        ));
    }
}

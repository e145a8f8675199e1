use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::{PgStore, corrupt};
use crate::db::{RepositoryError, TestimonialStore};
use crate::models::Testimonial;

#[derive(FromRow)]
struct TestimonialRow {
    id: String,
    name: String,
    role: String,
    content: String,
    rating: i16,
    avatar: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<TestimonialRow> for Testimonial {
    type Error = RepositoryError;

    fn try_from(row: TestimonialRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            role: row.role,
            content: row.content,
            rating: u8::try_from(row.rating).map_err(|e| corrupt("rating", e))?,
            avatar: row.avatar,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl TestimonialStore for PgStore {
    async fn list_active_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError> {
        let rows: Vec<TestimonialRow> = sqlx::query_as(
            r#"
            SELECT id, name, role, content, rating, avatar, is_active, created_at
            FROM bazaar.testimonial
            WHERE is_active
            ORDER BY created_at DESC, id COLLATE "C"
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Testimonial::try_from).collect()
    }

    async fn insert_testimonial_if_absent(
        &self,
        testimonial: &Testimonial,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO bazaar.testimonial
                (id, name, role, content, rating, avatar, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(&testimonial.id)
        .bind(&testimonial.name)
        .bind(&testimonial.role)
        .bind(&testimonial.content)
        .bind(i16::from(testimonial.rating))
        .bind(&testimonial.avatar)
        .bind(testimonial.is_active)
        .bind(testimonial.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

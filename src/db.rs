use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AdvisorError, Result};
use crate::fit::FitScoreResult;
use crate::models::{
    ActionType, Athlete, AthleteTaskStatus, Division, EligibilityStatus, GradeLevel, Interaction,
    InteractionDirection, InterestLevel, PriorityTier, RecruitingEvent, RuleType, Suggestion,
    TargetSchool, TaskDefinition, TaskStatus, Urgency, Video,
};
use crate::store::Store;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn athlete_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT id FROM recruiting.athletes WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("id")?),
            None => None,
        })
    }

    pub async fn school_id_by_name(&self, athlete_id: Uuid, name: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query(
            "SELECT id FROM recruiting.target_schools WHERE athlete_id = $1 AND lower(name) = lower($2)",
        )
        .bind(athlete_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("id")?),
            None => None,
        })
    }

    pub async fn save_task_definition(&self, task: &TaskDefinition) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recruiting.task_definitions
            (id, title, category, required, divisions, grade_levels, dependency_task_ids)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title, category = EXCLUDED.category, required = EXCLUDED.required,
                divisions = EXCLUDED.divisions, grade_levels = EXCLUDED.grade_levels,
                dependency_task_ids = EXCLUDED.dependency_task_ids
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.category)
        .bind(task.required)
        .bind(text_list(&task.divisions, Division::as_str))
        .bind(text_list(&task.grade_levels, GradeLevel::as_str))
        .bind(&task.dependency_task_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn save_video(&self, video: &Video) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recruiting.videos (id, athlete_id, title, url, uploaded_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(video.id)
        .bind(video.athlete_id)
        .bind(&video.title)
        .bind(&video.url)
        .bind(video.uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn save_event(&self, event: &RecruitingEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recruiting.recruiting_events (id, athlete_id, name, location, event_date, registered)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET registered = EXCLUDED.registered
            "#,
        )
        .bind(event.id)
        .bind(event.athlete_id)
        .bind(&event.name)
        .bind(&event.location)
        .bind(event.event_date)
        .bind(event.registered)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn unknown_value(column: &'static str, value: &str) -> AdvisorError {
    AdvisorError::Validation(format!("unknown {column} value '{value}'"))
}

fn required_text<T>(row: &PgRow, column: &'static str, parse: fn(&str) -> Option<T>) -> Result<T> {
    let value: String = row.try_get(column)?;
    parse(&value).ok_or_else(|| unknown_value(column, &value))
}

fn optional_text<T>(
    row: &PgRow,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    let value: Option<String> = row.try_get(column)?;
    value
        .map(|value| parse(&value).ok_or_else(|| unknown_value(column, &value)))
        .transpose()
}

fn text_array<T>(row: &PgRow, column: &'static str, parse: fn(&str) -> Option<T>) -> Result<Vec<T>> {
    let values: Vec<String> = row.try_get(column)?;
    values
        .iter()
        .map(|value| parse(value).ok_or_else(|| unknown_value(column, value)))
        .collect()
}

fn text_list<T>(values: &[T], as_str: fn(&T) -> &'static str) -> Vec<String> {
    values.iter().map(|value| as_str(value).to_string()).collect()
}

fn athlete_from_row(row: &PgRow) -> Result<Athlete> {
    Ok(Athlete {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        grade_level: optional_text(row, "grade_level", GradeLevel::parse)?,
        graduation_year: row.try_get("graduation_year")?,
        gpa: row.try_get("gpa")?,
        sat_score: row.try_get("sat_score")?,
        act_score: row.try_get("act_score")?,
        sport: row.try_get("sport")?,
        position: row.try_get("position")?,
        athletic_rating: row.try_get("athletic_rating")?,
        eligibility_status: optional_text(row, "eligibility_status", EligibilityStatus::parse)?,
        preferred_region: row.try_get("preferred_region")?,
        committed: row.try_get("committed")?,
    })
}

fn school_from_row(row: &PgRow) -> Result<TargetSchool> {
    let fit_result: Option<String> = row.try_get("fit_result")?;
    let fit = fit_result
        .map(|raw| serde_json::from_str::<FitScoreResult>(&raw))
        .transpose()?;

    Ok(TargetSchool {
        id: row.try_get("id")?,
        athlete_id: row.try_get("athlete_id")?,
        name: row.try_get("name")?,
        priority_tier: optional_text(row, "priority_tier", PriorityTier::parse)?,
        division: optional_text(row, "division", Division::parse)?,
        conference: row.try_get("conference")?,
        interest_level: optional_text(row, "interest_level", InterestLevel::parse)?,
        average_gpa: row.try_get("average_gpa")?,
        roster_needs: row.try_get("roster_needs")?,
        region: row.try_get("region")?,
        fit,
    })
}

fn interaction_from_row(row: &PgRow) -> Result<Interaction> {
    Ok(Interaction {
        id: row.try_get("id")?,
        athlete_id: row.try_get("athlete_id")?,
        school_id: row.try_get("school_id")?,
        coach_name: row.try_get("coach_name")?,
        interaction_type: row.try_get("interaction_type")?,
        direction: required_text(row, "direction", InteractionDirection::parse)?,
        occurred_at: row.try_get("occurred_at")?,
        notes: row.try_get("notes")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<TaskDefinition> {
    Ok(TaskDefinition {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        category: row.try_get("category")?,
        required: row.try_get("required")?,
        divisions: text_array(row, "divisions", Division::parse)?,
        grade_levels: text_array(row, "grade_levels", GradeLevel::parse)?,
        dependency_task_ids: row.try_get("dependency_task_ids")?,
    })
}

fn task_status_from_row(row: &PgRow) -> Result<AthleteTaskStatus> {
    Ok(AthleteTaskStatus {
        athlete_id: row.try_get("athlete_id")?,
        task_id: row.try_get("task_id")?,
        status: required_text(row, "status", TaskStatus::parse)?,
        completed_at: row.try_get("completed_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn suggestion_from_row(row: &PgRow) -> Result<Suggestion> {
    Ok(Suggestion {
        id: row.try_get("id")?,
        athlete_id: row.try_get("athlete_id")?,
        rule_type: required_text(row, "rule_type", RuleType::parse)?,
        urgency: required_text(row, "urgency", Urgency::parse)?,
        message: row.try_get("message")?,
        action_type: required_text(row, "action_type", ActionType::parse)?,
        related_school_id: row.try_get("related_school_id")?,
        related_task_id: row.try_get("related_task_id")?,
        dismissed: row.try_get("dismissed")?,
        dismissed_at: row.try_get("dismissed_at")?,
        completed: row.try_get("completed")?,
        completed_at: row.try_get("completed_at")?,
        pending_surface: row.try_get("pending_surface")?,
        surfaced_at: row.try_get("surfaced_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn athlete(&self, athlete_id: Uuid) -> Result<Option<Athlete>> {
        let row = sqlx::query("SELECT * FROM recruiting.athletes WHERE id = $1")
            .bind(athlete_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(athlete_from_row).transpose()
    }

    async fn athlete_ids(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM recruiting.athletes ORDER BY full_name")
            .fetch_all(&self.pool)
            .await?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get("id")?);
        }
        Ok(ids)
    }

    async fn save_athlete(&self, athlete: &Athlete) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recruiting.athletes
            (id, full_name, email, grade_level, graduation_year, gpa, sat_score, act_score,
             sport, position, athletic_rating, eligibility_status, preferred_region, committed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, email = EXCLUDED.email,
                grade_level = EXCLUDED.grade_level, graduation_year = EXCLUDED.graduation_year,
                gpa = EXCLUDED.gpa, sat_score = EXCLUDED.sat_score, act_score = EXCLUDED.act_score,
                sport = EXCLUDED.sport, position = EXCLUDED.position,
                athletic_rating = EXCLUDED.athletic_rating,
                eligibility_status = EXCLUDED.eligibility_status,
                preferred_region = EXCLUDED.preferred_region, committed = EXCLUDED.committed
            "#,
        )
        .bind(athlete.id)
        .bind(&athlete.full_name)
        .bind(&athlete.email)
        .bind(athlete.grade_level.map(|grade| grade.as_str()))
        .bind(athlete.graduation_year)
        .bind(athlete.gpa)
        .bind(athlete.sat_score)
        .bind(athlete.act_score)
        .bind(&athlete.sport)
        .bind(&athlete.position)
        .bind(athlete.athletic_rating)
        .bind(athlete.eligibility_status.map(|status| status.as_str()))
        .bind(&athlete.preferred_region)
        .bind(athlete.committed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn schools(&self, athlete_id: Uuid) -> Result<Vec<TargetSchool>> {
        let rows = sqlx::query(
            "SELECT * FROM recruiting.target_schools WHERE athlete_id = $1 ORDER BY name",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(school_from_row).collect()
    }

    async fn save_school(&self, school: &TargetSchool) -> Result<()> {
        let fit_result = school.fit.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO recruiting.target_schools
            (id, athlete_id, name, priority_tier, division, conference, interest_level,
             average_gpa, roster_needs, region, fit_score, fit_tier, fit_result)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, priority_tier = EXCLUDED.priority_tier,
                division = EXCLUDED.division, conference = EXCLUDED.conference,
                interest_level = EXCLUDED.interest_level, average_gpa = EXCLUDED.average_gpa,
                roster_needs = EXCLUDED.roster_needs, region = EXCLUDED.region,
                fit_score = EXCLUDED.fit_score, fit_tier = EXCLUDED.fit_tier,
                fit_result = EXCLUDED.fit_result
            "#,
        )
        .bind(school.id)
        .bind(school.athlete_id)
        .bind(&school.name)
        .bind(school.priority_tier.map(|tier| tier.as_str()))
        .bind(school.division.map(|division| division.as_str()))
        .bind(&school.conference)
        .bind(school.interest_level.map(|level| level.as_str()))
        .bind(school.average_gpa)
        .bind(&school.roster_needs)
        .bind(&school.region)
        .bind(school.fit.as_ref().map(|fit| i16::from(fit.score)))
        .bind(school.fit.as_ref().map(|fit| fit.tier.as_str()))
        .bind(fit_result)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_fit_score(&self, school_id: Uuid, fit: &FitScoreResult) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE recruiting.target_schools
            SET fit_score = $2, fit_tier = $3, fit_result = $4
            WHERE id = $1
            "#,
        )
        .bind(school_id)
        .bind(i16::from(fit.score))
        .bind(fit.tier.as_str())
        .bind(serde_json::to_string(fit)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AdvisorError::not_found("school", school_id));
        }
        Ok(())
    }

    async fn interactions(&self, athlete_id: Uuid) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            "SELECT * FROM recruiting.interactions WHERE athlete_id = $1 ORDER BY occurred_at",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(interaction_from_row).collect()
    }

    async fn insert_interaction(&self, interaction: &Interaction) -> Result<()> {
        insert_interaction_keyed(&self.pool, interaction, &format!("manual-{}", interaction.id))
            .await?;
        Ok(())
    }

    async fn task_definitions(&self) -> Result<Vec<TaskDefinition>> {
        let rows = sqlx::query("SELECT * FROM recruiting.task_definitions ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn athlete_tasks(&self, athlete_id: Uuid) -> Result<Vec<AthleteTaskStatus>> {
        let rows = sqlx::query("SELECT * FROM recruiting.athlete_task_statuses WHERE athlete_id = $1")
            .bind(athlete_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(task_status_from_row).collect()
    }

    async fn upsert_task_status(&self, status: &AthleteTaskStatus) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recruiting.athlete_task_statuses
            (athlete_id, task_id, status, completed_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (athlete_id, task_id) DO UPDATE
            SET status = EXCLUDED.status, completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(status.athlete_id)
        .bind(status.task_id)
        .bind(status.status.as_str())
        .bind(status.completed_at)
        .bind(status.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn videos(&self, athlete_id: Uuid) -> Result<Vec<Video>> {
        let rows = sqlx::query("SELECT * FROM recruiting.videos WHERE athlete_id = $1")
            .bind(athlete_id)
            .fetch_all(&self.pool)
            .await?;
        let mut videos = Vec::with_capacity(rows.len());
        for row in rows {
            videos.push(Video {
                id: row.try_get("id")?,
                athlete_id: row.try_get("athlete_id")?,
                title: row.try_get("title")?,
                url: row.try_get("url")?,
                uploaded_at: row.try_get("uploaded_at")?,
            });
        }
        Ok(videos)
    }

    async fn events(&self, athlete_id: Uuid) -> Result<Vec<RecruitingEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM recruiting.recruiting_events WHERE athlete_id = $1 ORDER BY event_date",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await?;
        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(RecruitingEvent {
                id: row.try_get("id")?,
                athlete_id: row.try_get("athlete_id")?,
                name: row.try_get("name")?,
                location: row.try_get("location")?,
                event_date: row.try_get("event_date")?,
                registered: row.try_get("registered")?,
            });
        }
        Ok(events)
    }

    async fn suggestions(&self, athlete_id: Uuid) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query(
            "SELECT * FROM recruiting.suggestions WHERE athlete_id = $1 ORDER BY created_at",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(suggestion_from_row).collect()
    }

    async fn upsert_suggestions(&self, suggestions: &[Suggestion]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for suggestion in suggestions {
            sqlx::query(
                r#"
                INSERT INTO recruiting.suggestions
                (id, athlete_id, rule_type, urgency, message, action_type, related_school_id,
                 related_task_id, dismissed, dismissed_at, completed, completed_at,
                 pending_surface, surfaced_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                ON CONFLICT (id) DO UPDATE
                SET urgency = EXCLUDED.urgency, message = EXCLUDED.message,
                    action_type = EXCLUDED.action_type,
                    related_school_id = EXCLUDED.related_school_id,
                    related_task_id = EXCLUDED.related_task_id,
                    dismissed = EXCLUDED.dismissed, dismissed_at = EXCLUDED.dismissed_at,
                    completed = EXCLUDED.completed, completed_at = EXCLUDED.completed_at,
                    pending_surface = EXCLUDED.pending_surface, surfaced_at = EXCLUDED.surfaced_at,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(suggestion.id)
            .bind(suggestion.athlete_id)
            .bind(suggestion.rule_type.as_str())
            .bind(suggestion.urgency.as_str())
            .bind(&suggestion.message)
            .bind(suggestion.action_type.as_str())
            .bind(suggestion.related_school_id)
            .bind(suggestion.related_task_id)
            .bind(suggestion.dismissed)
            .bind(suggestion.dismissed_at)
            .bind(suggestion.completed)
            .bind(suggestion.completed_at)
            .bind(suggestion.pending_surface)
            .bind(suggestion.surfaced_at)
            .bind(suggestion.created_at)
            .bind(suggestion.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn insert_interaction_keyed(
    pool: &PgPool,
    interaction: &Interaction,
    source_key: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO recruiting.interactions
        (id, athlete_id, school_id, coach_name, interaction_type, direction, occurred_at, notes, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(interaction.id)
    .bind(interaction.athlete_id)
    .bind(interaction.school_id)
    .bind(&interaction.coach_name)
    .bind(&interaction.interaction_type)
    .bind(interaction.direction.as_str())
    .bind(interaction.occurred_at)
    .bind(&interaction.notes)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn seed_time(year: i32, month: u32, day: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 15, 0, 0)
        .single()
        .context("invalid date")
}

pub async fn seed(store: &PgStore) -> anyhow::Result<()> {
    let avery = Athlete {
        id: Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
        full_name: "Avery Lee".to_string(),
        email: "avery.lee@example.com".to_string(),
        grade_level: Some(GradeLevel::Junior),
        graduation_year: Some(2028),
        gpa: Some(3.6),
        sat_score: Some(1280),
        act_score: None,
        sport: Some("soccer".to_string()),
        position: Some("midfielder".to_string()),
        athletic_rating: Some(4),
        eligibility_status: Some(EligibilityStatus::Pending),
        preferred_region: Some("southeast".to_string()),
        committed: false,
    };
    let jules = Athlete {
        id: Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
        full_name: "Jules Moreno".to_string(),
        email: "jules.moreno@example.com".to_string(),
        grade_level: Some(GradeLevel::Senior),
        graduation_year: Some(2027),
        gpa: Some(2.9),
        sat_score: None,
        act_score: None,
        sport: Some("baseball".to_string()),
        position: Some("pitcher".to_string()),
        athletic_rating: Some(3),
        eligibility_status: None,
        preferred_region: Some("midwest".to_string()),
        committed: false,
    };
    for athlete in [&avery, &jules] {
        store.save_athlete(athlete).await?;
    }

    let schools = vec![
        (
            "9a1c7f0e-3b57-4a8b-9d52-5d1f2e8c6a01",
            &avery,
            "Florida State University",
            PriorityTier::A,
            Division::D1,
            "ACC",
            InterestLevel::High,
            3.7,
            "southeast",
        ),
        (
            "9a1c7f0e-3b57-4a8b-9d52-5d1f2e8c6a02",
            &avery,
            "Emory University",
            PriorityTier::B,
            Division::D3,
            "UAA",
            InterestLevel::Medium,
            3.8,
            "southeast",
        ),
        (
            "9a1c7f0e-3b57-4a8b-9d52-5d1f2e8c6a03",
            &jules,
            "Grand Valley State",
            PriorityTier::A,
            Division::D2,
            "GLIAC",
            InterestLevel::Low,
            3.2,
            "midwest",
        ),
    ];

    for (id, athlete, name, tier, division, conference, interest, average_gpa, region) in schools {
        store
            .save_school(&TargetSchool {
                id: Uuid::parse_str(id)?,
                athlete_id: athlete.id,
                name: name.to_string(),
                priority_tier: Some(tier),
                division: Some(division),
                conference: Some(conference.to_string()),
                interest_level: Some(interest),
                average_gpa: Some(average_gpa),
                roster_needs: athlete.position.iter().cloned().collect(),
                region: Some(region.to_string()),
                fit: None,
            })
            .await?;
    }

    let register = Uuid::parse_str("5b0e2f64-1d7c-4c83-a3b9-0f6e7d2c1a11")?;
    let transcripts = Uuid::parse_str("5b0e2f64-1d7c-4c83-a3b9-0f6e7d2c1a12")?;
    let amateurism = Uuid::parse_str("5b0e2f64-1d7c-4c83-a3b9-0f6e7d2c1a13")?;
    let tasks = vec![
        (register, "Register with the eligibility center", "eligibility", vec![]),
        (transcripts, "Send official transcripts", "eligibility", vec![register]),
        (
            amateurism,
            "Complete amateurism certification",
            "eligibility",
            vec![register, transcripts],
        ),
    ];
    for (id, title, category, dependencies) in tasks {
        store
            .save_task_definition(&TaskDefinition {
                id,
                title: title.to_string(),
                category: category.to_string(),
                required: true,
                divisions: vec![Division::D1, Division::D2],
                grade_levels: vec![GradeLevel::Junior, GradeLevel::Senior],
                dependency_task_ids: dependencies,
            })
            .await?;
    }

    let interactions = vec![
        (
            "seed-001",
            &avery,
            "9a1c7f0e-3b57-4a8b-9d52-5d1f2e8c6a01",
            "Coach Harper",
            "email",
            InteractionDirection::Outbound,
            seed_time(2026, 9, 20)?,
            "Sent fall schedule",
        ),
        (
            "seed-002",
            &avery,
            "9a1c7f0e-3b57-4a8b-9d52-5d1f2e8c6a01",
            "Coach Harper",
            "unofficial visit",
            InteractionDirection::Inbound,
            seed_time(2026, 10, 3)?,
            "Campus tour after home match",
        ),
        (
            "seed-003",
            &jules,
            "9a1c7f0e-3b57-4a8b-9d52-5d1f2e8c6a03",
            "Coach Lindqvist",
            "phone",
            InteractionDirection::Inbound,
            seed_time(2026, 8, 14)?,
            "Asked for updated velocity numbers",
        ),
    ];
    for (source_key, athlete, school_id, coach, kind, direction, occurred_at, note) in interactions {
        let interaction = Interaction {
            id: Uuid::new_v4(),
            athlete_id: athlete.id,
            school_id: Some(Uuid::parse_str(school_id)?),
            coach_name: Some(coach.to_string()),
            interaction_type: Some(kind.to_string()),
            direction,
            occurred_at,
            notes: Some(note.to_string()),
        };
        insert_interaction_keyed(store.pool(), &interaction, source_key).await?;
    }

    store
        .save_video(&Video {
            id: Uuid::parse_str("c4e8a1d2-7f36-4b19-8e0a-2d5c9b7f3e21")?,
            athlete_id: avery.id,
            title: "Junior season highlights".to_string(),
            url: "https://video.example.com/avery-lee-junior".to_string(),
            uploaded_at: seed_time(2026, 6, 1)?,
        })
        .await?;
    store
        .save_event(&RecruitingEvent {
            id: Uuid::parse_str("e7b3c9a0-4d21-4f8e-9a6c-1b2d3e4f5a61")?,
            athlete_id: jules.id,
            name: "Midwest Prospect Showcase".to_string(),
            location: Some("Grand Rapids, MI".to_string()),
            event_date: seed_time(2026, 10, 25)?,
            registered: false,
        })
        .await?;

    Ok(())
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    /// Newly inserted rows, in file order. Duplicates are not included.
    pub inserted: Vec<Interaction>,
    pub skipped: usize,
}

/// Import interactions keyed by athlete email and school name. Rows with a
/// `source_key` that was already imported are skipped.
pub async fn import_csv(store: &PgStore, csv_path: &std::path::Path) -> anyhow::Result<ImportOutcome> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        athlete_email: String,
        school_name: Option<String>,
        coach_name: Option<String>,
        interaction_type: Option<String>,
        direction: String,
        occurred_at: DateTime<Utc>,
        notes: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut outcome = ImportOutcome::default();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let athlete_id = store
            .athlete_id_by_email(&row.athlete_email)
            .await?
            .with_context(|| format!("no athlete with email {}", row.athlete_email))?;
        let school_id = match row.school_name.as_deref() {
            Some(name) => Some(
                store
                    .school_id_by_name(athlete_id, name)
                    .await?
                    .with_context(|| format!("{} has no target school named {name}", row.athlete_email))?,
            ),
            None => None,
        };
        let direction = InteractionDirection::parse(&row.direction)
            .with_context(|| format!("unknown interaction direction {}", row.direction))?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let interaction = Interaction {
            id: Uuid::new_v4(),
            athlete_id,
            school_id,
            coach_name: row.coach_name,
            interaction_type: row.interaction_type,
            direction,
            occurred_at: row.occurred_at,
            notes: row.notes,
        };

        if insert_interaction_keyed(store.pool(), &interaction, &source_key).await? {
            outcome.inserted.push(interaction);
        } else {
            outcome.skipped += 1;
        }
    }

    Ok(outcome)
}

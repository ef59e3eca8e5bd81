mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

/// SQLite-backed store for users, student profiles and advisor feedback.
///
/// All access goes through one connection behind a mutex, so writes are
/// serialized; in particular two upserts for the same student can never
/// interleave. Cloning shares the connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "course-advisor")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("advisor.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    /// Register a user. Returns `None` if the username is already taken.
    pub fn create_user(&self, input: CreateUserInput) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = now_micros();
        let role = input.role.unwrap_or(Role::Student);
        let username = input.username.trim().to_string();

        let taken = conn
            .query_row("SELECT 1 FROM users WHERE username = ?", [&username], |_| Ok(()))
            .optional()?
            .is_some();
        if taken {
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO users (id, username, role, created_at) VALUES (?, ?, ?, ?)",
            (id.to_string(), &username, role.as_str(), format_datetime(now)),
        )?;

        Ok(Some(User {
            id,
            username,
            role,
            created_at: now,
        }))
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT id, username, role, created_at FROM users WHERE id = ?",
                [id.to_string()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT id, username, role, created_at FROM users WHERE username = ?",
                [username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    // ============================================================
    // Profile operations
    // ============================================================

    /// Insert or replace the profile of a student.
    ///
    /// Returns `None` if `student_id` is not a registered student. On update,
    /// every academic field and the recommendation are replaced, `created_at`
    /// is kept, and `updated_at` moves strictly forward.
    pub fn upsert_profile(
        &self,
        student_id: Uuid,
        profile: &AcademicProfile,
        recommendation: Option<&str>,
    ) -> Result<Option<StoredProfile>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        if !is_student(&tx, student_id)? {
            return Ok(None);
        }

        let existing: Option<(String, String)> = tx
            .query_row(
                "SELECT created_at, updated_at FROM student_profiles WHERE student_id = ?",
                [student_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (created_at, updated_at) = match existing {
            Some((created, updated)) => {
                let now = next_timestamp(Some(parse_datetime(1, updated)?));
                (parse_datetime(0, created)?, now)
            }
            None => {
                let now = next_timestamp(None);
                (now, now)
            }
        };

        let [subject1, subject2, subject3] = &profile.subjects;
        let [result1, result2, result3] = &profile.results;

        tx.execute(
            "INSERT INTO student_profiles
                (student_id, stream, subject1, subject2, subject3, result1, result2, result3,
                 gpa, interest, recommendation, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(student_id) DO UPDATE SET
                stream = excluded.stream,
                subject1 = excluded.subject1,
                subject2 = excluded.subject2,
                subject3 = excluded.subject3,
                result1 = excluded.result1,
                result2 = excluded.result2,
                result3 = excluded.result3,
                gpa = excluded.gpa,
                interest = excluded.interest,
                recommendation = excluded.recommendation,
                updated_at = excluded.updated_at",
            rusqlite::params![
                student_id.to_string(),
                profile.stream.as_str(),
                subject1,
                subject2,
                subject3,
                result1,
                result2,
                result3,
                profile.gpa,
                profile.interest.as_str(),
                recommendation,
                format_datetime(created_at),
                format_datetime(updated_at),
            ],
        )?;

        tx.commit()?;

        Ok(Some(StoredProfile {
            student_id,
            profile: profile.clone(),
            recommendation: recommendation.map(str::to_string),
            created_at,
            updated_at,
        }))
    }

    pub fn get_profile(&self, student_id: Uuid) -> Result<Option<StoredProfile>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let profile = conn
            .query_row(
                "SELECT student_id, stream, subject1, subject2, subject3, result1, result2, result3,
                        gpa, interest, recommendation, created_at, updated_at
                 FROM student_profiles WHERE student_id = ?",
                [student_id.to_string()],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    /// All stored profiles in insertion order, optionally restricted to
    /// owners with the given role.
    pub fn list_profiles(&self, role: Option<Role>) -> Result<Vec<StoredProfile>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT p.student_id, p.stream, p.subject1, p.subject2, p.subject3,
                    p.result1, p.result2, p.result3, p.gpa, p.interest, p.recommendation,
                    p.created_at, p.updated_at
             FROM student_profiles p
             JOIN users u ON u.id = p.student_id
             WHERE ?1 IS NULL OR u.role = ?1
             ORDER BY p.rowid",
        )?;

        let profiles = stmt
            .query_map([role.map(|r| r.as_str())], profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(profiles)
    }

    /// Roster of users with their profile summary, in registration order.
    ///
    /// Users without a profile are included with empty academic fields.
    pub fn list_students(&self, role: Option<Role>) -> Result<Vec<StudentSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, p.stream, p.interest, p.recommendation, p.gpa
             FROM users u
             LEFT JOIN student_profiles p ON p.student_id = u.id
             WHERE ?1 IS NULL OR u.role = ?1
             ORDER BY u.rowid",
        )?;

        let students = stmt
            .query_map([role.map(|r| r.as_str())], |row| {
                Ok(StudentSummary {
                    student_id: parse_uuid(row.get::<_, String>(0)?),
                    username: row.get(1)?,
                    stream: row
                        .get::<_, Option<String>>(2)?
                        .map(|s| parse_vocabulary(2, &s))
                        .transpose()?,
                    interest: row
                        .get::<_, Option<String>>(3)?
                        .map(|s| parse_vocabulary(3, &s))
                        .transpose()?,
                    recommendation: row.get(4)?,
                    gpa: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(students)
    }

    // ============================================================
    // Feedback operations
    // ============================================================

    /// Append advisor feedback. Returns `None` if `student_id` is not a
    /// registered student.
    pub fn append_feedback(
        &self,
        student_id: Uuid,
        input: CreateFeedbackInput,
    ) -> Result<Option<FeedbackEntry>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        if !is_student(&tx, student_id)? {
            return Ok(None);
        }

        let previous: Option<String> = tx.query_row(
            "SELECT MAX(created_at) FROM advisor_feedback WHERE student_id = ?",
            [student_id.to_string()],
            |row| row.get(0),
        )?;
        let timestamp = next_timestamp(previous.map(|s| parse_datetime(0, s)).transpose()?);
        let id = Uuid::new_v4();

        tx.execute(
            "INSERT INTO advisor_feedback (id, student_id, advisor_id, feedback, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                student_id.to_string(),
                &input.advisor_id,
                &input.text,
                format_datetime(timestamp),
            ),
        )?;

        tx.commit()?;

        Ok(Some(FeedbackEntry {
            id,
            student_id,
            advisor_id: input.advisor_id,
            text: input.text,
            timestamp,
        }))
    }

    /// The entry with the greatest timestamp for a student.
    pub fn latest_feedback(&self, student_id: Uuid) -> Result<Option<FeedbackEntry>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let entry = conn
            .query_row(
                "SELECT id, student_id, advisor_id, feedback, created_at
                 FROM advisor_feedback WHERE student_id = ?
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [student_id.to_string()],
                feedback_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// All feedback for a student, newest first.
    pub fn feedback_history(&self, student_id: Uuid) -> Result<Vec<FeedbackEntry>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, student_id, advisor_id, feedback, created_at
             FROM advisor_feedback WHERE student_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let entries = stmt
            .query_map([student_id.to_string()], feedback_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        username: row.get(1)?,
        role: parse_vocabulary(2, &row.get::<_, String>(2)?)?,
        created_at: parse_datetime(3, row.get::<_, String>(3)?)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<StoredProfile> {
    Ok(StoredProfile {
        student_id: parse_uuid(row.get::<_, String>(0)?),
        profile: AcademicProfile {
            stream: parse_vocabulary(1, &row.get::<_, String>(1)?)?,
            subjects: [row.get(2)?, row.get(3)?, row.get(4)?],
            results: [row.get(5)?, row.get(6)?, row.get(7)?],
            gpa: row.get(8)?,
            interest: parse_vocabulary(9, &row.get::<_, String>(9)?)?,
        },
        recommendation: row.get(10)?,
        created_at: parse_datetime(11, row.get::<_, String>(11)?)?,
        updated_at: parse_datetime(12, row.get::<_, String>(12)?)?,
    })
}

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<FeedbackEntry> {
    Ok(FeedbackEntry {
        id: parse_uuid(row.get::<_, String>(0)?),
        student_id: parse_uuid(row.get::<_, String>(1)?),
        advisor_id: row.get(2)?,
        text: row.get(3)?,
        timestamp: parse_datetime(4, row.get::<_, String>(4)?)?,
    })
}

/// Whether `id` belongs to a registered user with the student role.
fn is_student(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    let role: Option<String> = conn
        .query_row("SELECT role FROM users WHERE id = ?", [id.to_string()], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(role.is_some_and(|role| role == Role::Student.as_str()))
}

fn parse_vocabulary<V: Vocabulary>(column: usize, s: &str) -> rusqlite::Result<V> {
    V::from_str(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            format!("unknown {} '{}'", V::KIND, s).into(),
        )
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(column: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Fixed-width RFC 3339 so that timestamps sort correctly as text.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Current time, bumped past `previous` when the clock has not advanced.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = now_micros();
    match previous {
        Some(prev) if now <= prev => prev + TimeDelta::microseconds(1),
        _ => now,
    }
}

// Users repository for aula-quiz

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{User, UserRole};
use super::DatabaseManager;

impl DatabaseManager {
    /// Create a user with the given role
    pub fn create_user(&self, name: &str, role: UserRole) -> Result<User> {
        self.with_connection(|conn| create_user_impl(conn, name, role))
    }

    /// All users with the student role, ordered by id
    pub fn get_students(&self) -> Result<Vec<User>> {
        self.with_connection(get_students_impl)
    }
}

fn create_user_impl(conn: &Connection, name: &str, role: UserRole) -> Result<User> {
    conn.execute(
        "INSERT INTO users (name, role) VALUES (?1, ?2)",
        params![name, role.as_str()],
    )
    .context("Failed to create user")?;

    Ok(User {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        role,
    })
}

pub(crate) fn get_students_impl(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare("SELECT id, name, role FROM users WHERE role = 'student' ORDER BY id ASC")
        .context("Failed to prepare get_students query")?;

    let users = stmt
        .query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                role: UserRole::from_str(&row.get::<_, String>(2)?),
            })
        })
        .context("Failed to query students")?;

    users
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect students")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_db() -> DatabaseManager {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let manager = DatabaseManager::new(db_path).unwrap();
        // Keep the temp dir alive for the test's duration; otherwise it is
        // dropped here and the db file is deleted out from under the open
        // connection (SQLite error 1032 on the next write).
        std::mem::forget(dir);
        manager
    }

    #[test]
    fn test_get_students_filters_teachers() {
        let db = create_test_db();

        db.create_user("Ana", UserRole::Student).unwrap();
        db.create_user("Benito", UserRole::Teacher).unwrap();
        db.create_user("Carla", UserRole::Student).unwrap();

        let students = db.get_students().unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].name, "Ana");
        assert_eq!(students[1].name, "Carla");
        assert!(students.iter().all(|u| u.role == UserRole::Student));
    }
}

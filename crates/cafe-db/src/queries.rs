use crate::models::{CafeRow, NewCafe, UserRow};
use crate::Database;
use anyhow::Result;
use cafe_types::models::Role;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use rusqlite::{Connection, Row};

const CAFE_COLUMNS: &str = "id, author_id, name, map_url, img_url, location, seats, \
     has_toilet, has_wifi, has_sockets, can_take_calls, coffee_price";

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, role) VALUES (?1, ?2, ?3)",
                (username, password_hash, role.as_str()),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn set_user_role(&self, id: i64, role: Role) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?1 WHERE id = ?2",
                rusqlite::params![role.as_str(), id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Removes the user. Their cafés keep existing with `author_id` cleared and
    /// their sessions go with them (both enforced by the schema).
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
    }

    // -- Cafes --

    pub fn insert_cafe(&self, cafe: &NewCafe) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO cafes (author_id, name, map_url, img_url, location, seats,
                                    has_toilet, has_wifi, has_sockets, can_take_calls, coffee_price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    cafe.author_id,
                    cafe.name,
                    cafe.map_url,
                    cafe.img_url,
                    cafe.location,
                    cafe.seats,
                    cafe.has_toilet,
                    cafe.has_wifi,
                    cafe.has_sockets,
                    cafe.can_take_calls,
                    cafe.coffee_price,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_cafe(&self, id: i64) -> Result<Option<CafeRow>> {
        self.with_conn(|conn| query_cafe(conn, "id = ?1", id))
    }

    pub fn get_cafe_by_name(&self, name: &str) -> Result<Option<CafeRow>> {
        self.with_conn(|conn| query_cafe(conn, "name = ?1", name))
    }

    pub fn list_cafes(&self) -> Result<Vec<CafeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {CAFE_COLUMNS} FROM cafes ORDER BY id"))?;
            let rows = stmt
                .query_map([], cafe_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Exact, case-sensitive match on `location`.
    pub fn get_cafes_by_location(&self, location: &str) -> Result<Vec<CafeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAFE_COLUMNS} FROM cafes WHERE location = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([location], cafe_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Uniform pick over the cafés stored right now.
    pub fn random_cafe(&self) -> Result<Option<CafeRow>> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cafes", [], |r| r.get(0))?;
            if count == 0 {
                return Ok(None);
            }

            let offset = rand::rng().random_range(0..count);
            let row = conn
                .query_row(
                    &format!("SELECT {CAFE_COLUMNS} FROM cafes ORDER BY id LIMIT 1 OFFSET ?1"),
                    [offset],
                    cafe_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn update_coffee_price(&self, id: i64, price: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE cafes SET coffee_price = ?1 WHERE id = ?2",
                rusqlite::params![price, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_cafe(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM cafes WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    pub fn count_cafes(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM cafes", [], |r| r.get(0))?))
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, user_id, timestamp(expires_at)],
            )?;
            Ok(())
        })
    }

    /// Resolves a session id to its user. An expired session is deleted and
    /// treated as absent.
    pub fn get_session_user(&self, id: &str, now: DateTime<Utc>) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            let found = conn
                .query_row(
                    "SELECT s.expires_at, u.id, u.username, u.password, u.role
                     FROM sessions s
                     JOIN users u ON s.user_id = u.id
                     WHERE s.id = ?1",
                    [id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            UserRow {
                                id: row.get(1)?,
                                username: row.get(2)?,
                                password: row.get(3)?,
                                role: row.get(4)?,
                            },
                        ))
                    },
                )
                .optional()?;

            match found {
                Some((expires_at, user)) if expires_at > timestamp(now) => Ok(Some(user)),
                Some(_) => {
                    conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
                    Ok(None)
                }
                None => Ok(None),
            }
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    pub fn prune_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let pruned = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [timestamp(now)])?;
            Ok(pruned)
        })
    }
}

/// Fixed-width UTC form so that string comparison in SQL orders correctly.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, filter: &str, value: P) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT id, username, password, role FROM users WHERE {filter}"))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                role: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_cafe<P: rusqlite::ToSql>(conn: &Connection, filter: &str, value: P) -> Result<Option<CafeRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {CAFE_COLUMNS} FROM cafes WHERE {filter}"))?;
    let row = stmt.query_row([value], cafe_from_row).optional()?;
    Ok(row)
}

fn cafe_from_row(row: &Row<'_>) -> rusqlite::Result<CafeRow> {
    Ok(CafeRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        name: row.get(2)?,
        map_url: row.get(3)?,
        img_url: row.get(4)?,
        location: row.get(5)?,
        seats: row.get(6)?,
        has_toilet: row.get(7)?,
        has_wifi: row.get(8)?,
        has_sockets: row.get(9)?,
        can_take_calls: row.get(10)?,
        coffee_price: row.get(11)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use chrono::Duration;

    fn cafe(name: &str, location: &str) -> NewCafe {
        NewCafe {
            author_id: None,
            name: name.to_string(),
            map_url: "https://maps.example/1".into(),
            img_url: "https://img.example/1.jpg".into(),
            location: location.to_string(),
            seats: "20-30".into(),
            has_toilet: true,
            has_wifi: false,
            has_sockets: true,
            can_take_calls: false,
            coffee_price: Some("£2.40".into()),
        }
    }

    #[test]
    fn test_cafe_crud() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_cafe(&cafe("Science Gallery", "London Bridge")).unwrap();

        let row = db.get_cafe(id).unwrap().unwrap();
        assert_eq!(row.name, "Science Gallery");
        assert!(row.has_toilet);
        assert!(!row.has_wifi);
        assert_eq!(row.coffee_price.as_deref(), Some("£2.40"));

        assert!(db.update_coffee_price(id, "£3.00").unwrap());
        assert_eq!(db.get_cafe(id).unwrap().unwrap().coffee_price.as_deref(), Some("£3.00"));

        assert!(db.delete_cafe(id).unwrap());
        assert!(db.get_cafe(id).unwrap().is_none());
        assert!(!db.delete_cafe(id).unwrap());
        assert!(!db.update_coffee_price(id, "£1").unwrap());
    }

    #[test]
    fn test_duplicate_cafe_name_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.insert_cafe(&cafe("Bar", "Peckham")).unwrap();

        let err = db.insert_cafe(&cafe("Bar", "Hackney")).unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(db.count_cafes().unwrap(), 1);
    }

    #[test]
    fn test_missing_author_is_not_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        let mut orphan = cafe("Orphan", "Bow");
        orphan.author_id = Some(999);

        let err = db.insert_cafe(&orphan).unwrap_err();
        assert!(!is_unique_violation(&err));
        assert_eq!(db.count_cafes().unwrap(), 0);
    }

    #[test]
    fn test_location_match_is_exact() {
        let db = Database::open_in_memory().unwrap();
        db.insert_cafe(&cafe("A", "Peckham")).unwrap();
        db.insert_cafe(&cafe("B", "Peckham")).unwrap();
        db.insert_cafe(&cafe("C", "Peckham Rye")).unwrap();

        let names: Vec<String> = db
            .get_cafes_by_location("Peckham")
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(db.get_cafes_by_location("peckham").unwrap().is_empty());
    }

    #[test]
    fn test_random_cafe_sees_new_rows() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.random_cafe().unwrap().is_none());

        db.insert_cafe(&cafe("Only", "Shoreditch")).unwrap();
        assert_eq!(db.random_cafe().unwrap().unwrap().name, "Only");
    }

    #[test]
    fn test_deleting_user_keeps_cafes_and_drops_sessions() {
        let db = Database::open_in_memory().unwrap();
        let uid = db.create_user("alice", "hash", Role::Admin).unwrap();
        let mut new = cafe("Owned", "Soho");
        new.author_id = Some(uid);
        let cid = db.insert_cafe(&new).unwrap();
        db.create_session("s1", uid, Utc::now() + Duration::hours(1)).unwrap();

        assert!(db.delete_user(uid).unwrap());
        assert!(db.get_user_by_id(uid).unwrap().is_none());
        assert_eq!(db.get_cafe(cid).unwrap().unwrap().author_id, None);
        assert_eq!(db.prune_expired_sessions(Utc::now() + Duration::days(1)).unwrap(), 0);
        assert!(!db.delete_user(uid).unwrap());
    }

    #[test]
    fn test_duplicate_username_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("bob", "hash", Role::User).unwrap();

        let err = db.create_user("bob", "other", Role::User).unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn test_user_role_defaults_and_promotion() {
        let db = Database::open_in_memory().unwrap();
        let uid = db.create_user("carol", "hash", Role::User).unwrap();
        assert_eq!(db.get_user_by_username("carol").unwrap().unwrap().role, "user");

        assert!(db.set_user_role(uid, Role::Admin).unwrap());
        assert_eq!(db.get_user_by_id(uid).unwrap().unwrap().role, "admin");
    }

    #[test]
    fn test_session_expiry() {
        let db = Database::open_in_memory().unwrap();
        let uid = db.create_user("dave", "hash", Role::User).unwrap();
        let now = Utc::now();

        db.create_session("live", uid, now + Duration::hours(2)).unwrap();
        db.create_session("stale", uid, now - Duration::hours(2)).unwrap();

        assert_eq!(db.get_session_user("live", now).unwrap().unwrap().username, "dave");
        assert!(db.get_session_user("stale", now).unwrap().is_none());
        assert!(db.get_session_user("missing", now).unwrap().is_none());

        assert_eq!(db.prune_expired_sessions(now + Duration::hours(3)).unwrap(), 1);
        assert!(db.get_session_user("live", now).unwrap().is_none());
        assert!(!db.delete_session("live").unwrap());
    }
}

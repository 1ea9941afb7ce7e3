use anyhow::Result;
use tracing::info;

use cafe_api::auth::hash_password;
use cafe_db::Database;
use cafe_types::models::Role;

use crate::config::AdminAccount;

/// Makes sure the configured admin account exists and holds the admin role.
/// An existing account is promoted; its password is left alone.
pub fn ensure_admin(db: &Database, account: &AdminAccount) -> Result<()> {
    match db.get_user_by_username(&account.username)? {
        Some(user) if user.role == Role::Admin.as_str() => {
            info!("Admin account {} already present", account.username);
        }
        Some(user) => {
            db.set_user_role(user.id, Role::Admin)?;
            info!("Promoted {} to admin", account.username);
        }
        None => {
            let hash = hash_password(&account.password)?;
            let id = db.create_user(&account.username, &hash, Role::Admin)?;
            info!("Created admin account {} (id {})", account.username, id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AdminAccount {
        AdminAccount {
            username: "root".into(),
            password: "hunter2".into(),
        }
    }

    #[test]
    fn test_creates_missing_admin() {
        let db = Database::open_in_memory().unwrap();
        ensure_admin(&db, &account()).unwrap();
        ensure_admin(&db, &account()).unwrap();

        let row = db.get_user_by_username("root").unwrap().unwrap();
        assert_eq!(row.role, "admin");
        assert!(cafe_api::auth::verify_password("hunter2", &row.password));
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn test_promotes_existing_user_without_touching_password() {
        let db = Database::open_in_memory().unwrap();
        let hash = hash_password("first-password").unwrap();
        db.create_user("root", &hash, Role::User).unwrap();

        ensure_admin(&db, &account()).unwrap();

        let row = db.get_user_by_username("root").unwrap().unwrap();
        assert_eq!(row.role, "admin");
        assert_eq!(row.password, hash);
    }
}

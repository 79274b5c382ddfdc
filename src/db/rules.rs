use chrono::Utc;

use super::Database;
use crate::error::{AppError, Result};
use crate::models::{Rule, RuleInput};

fn map_row_to_rule(row: &rusqlite::Row) -> rusqlite::Result<Rule> {
    Ok(Rule {
        id: row.get(0)?,
        user_id: row.get(1)?,
        nombre: row.get(2)?,
        descripcion: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Rule {} not found", id))
}

impl Database {
    /// Newest first
    pub fn list_rules(&self, user_id: &str) -> Result<Vec<Rule>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, nombre, descripcion, created_at FROM rules
             WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )?;

        let rules = stmt
            .query_map([user_id], map_row_to_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    pub fn get_rule(&self, user_id: &str, id: &str) -> Result<Rule> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, user_id, nombre, descripcion, created_at FROM rules WHERE id = ? AND user_id = ?",
            [id, user_id],
            map_row_to_rule,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => not_found(id),
            other => other.into(),
        })
    }

    pub fn create_rule(&self, user_id: &str, input: RuleInput) -> Result<Rule> {
        let input = input.validated()?;
        let id = uuid::Uuid::new_v4().to_string();

        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO rules (id, user_id, nombre, descripcion, created_at) VALUES (?, ?, ?, ?, ?)",
                rusqlite::params![id, user_id, input.nombre, input.descripcion, Utc::now().timestamp()],
            )?;
        }

        log::info!("Created rule {} for {}", id, user_id);
        self.get_rule(user_id, &id)
    }

    /// Only the rule text is editable
    pub fn rename_rule(&self, user_id: &str, id: &str, nombre: &str) -> Result<Rule> {
        let input = RuleInput {
            nombre: nombre.to_string(),
            descripcion: None,
        }
        .validated()?;

        {
            let conn = self.lock()?;
            let affected = conn.execute(
                "UPDATE rules SET nombre = ? WHERE id = ? AND user_id = ?",
                [input.nombre.as_str(), id, user_id],
            )?;
            if affected == 0 {
                return Err(not_found(id));
            }
        }

        self.get_rule(user_id, id)
    }

    pub fn delete_rule(&self, user_id: &str, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM rules WHERE id = ? AND user_id = ?", [id, user_id])?;
        if affected == 0 {
            return Err(not_found(id));
        }

        log::info!("Deleted rule {} for {}", id, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> RuleInput {
        RuleInput {
            nombre: text.into(),
            descripcion: None,
        }
    }

    #[test]
    fn test_rule_lifecycle() {
        let db = Database::open_in_memory().unwrap();

        let first = db.create_rule("alice", input("Max 2 trades per day")).unwrap();
        let second = db.create_rule("alice", input("No trading on news")).unwrap();

        let listed = db.list_rules("alice").unwrap();
        assert_eq!(listed.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec![
            second.id.as_str(),
            first.id.as_str()
        ]);

        let renamed = db.rename_rule("alice", &first.id, "Max 3 trades per day").unwrap();
        assert_eq!(renamed.nombre, "Max 3 trades per day");
        assert_eq!(renamed.created_at, first.created_at);

        db.delete_rule("alice", &second.id).unwrap();
        assert_eq!(db.list_rules("alice").unwrap(), vec![renamed]);
    }

    #[test]
    fn test_blank_rules_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.create_rule("alice", input(" ")), Err(AppError::Validation(_))));

        let rule = db.create_rule("alice", input("Respect the stop")).unwrap();
        assert!(matches!(db.rename_rule("alice", &rule.id, ""), Err(AppError::Validation(_))));
        assert_eq!(db.get_rule("alice", &rule.id).unwrap().nombre, "Respect the stop");
    }

    #[test]
    fn test_rules_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let rule = db.create_rule("alice", input("Journal every trade")).unwrap();

        assert!(db.list_rules("bob").unwrap().is_empty());
        assert!(matches!(db.rename_rule("bob", &rule.id, "hijacked"), Err(AppError::NotFound(_))));
        assert!(matches!(db.delete_rule("bob", &rule.id), Err(AppError::NotFound(_))));
    }
}

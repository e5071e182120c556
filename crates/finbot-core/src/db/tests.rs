//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use rusqlite::params;

    fn category_id(db: &Database, user_id: i64, key: &str, direction: FlowDirection) -> i64 {
        db.find_category(user_id, key, direction)
            .unwrap()
            .expect("default category")
            .id
    }

    #[test]
    fn test_in_memory_db_has_default_categories() {
        let db = Database::in_memory().unwrap();
        let categories = db.list_categories(1, None).unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert!(categories.iter().all(|c| c.is_global()));
        assert_eq!(categories[0].key, "salary");
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.seed_default_categories().unwrap(), 0);

        // Reopening runs migrations and seeding again
        let reopened = Database::new(db.path()).unwrap();
        assert_eq!(
            reopened.list_categories(1, None).unwrap().len(),
            DEFAULT_CATEGORIES.len()
        );
    }

    #[test]
    fn test_schema_exists() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let result: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('transactions') WHERE name IN ('id', 'user_id', 'category_id', 'direction', 'amount', 'note', 'occurred_at', 'created_at')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(result, 8, "transactions table should have 8 expected columns");
    }

    #[test]
    fn test_ensure_user() {
        let db = Database::in_memory().unwrap();

        assert!(db.ensure_user(42, Some("alice"), Some("Alice")).unwrap());
        assert!(!db.ensure_user(42, None, Some("Alicia")).unwrap());

        let user = db.get_user(42).unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.first_name.as_deref(), Some("Alicia"));

        assert!(db.get_user(43).unwrap().is_none());
    }

    #[test]
    fn test_list_categories_by_direction() {
        let db = Database::in_memory().unwrap();

        let income = db.list_categories(1, Some(FlowDirection::Income)).unwrap();
        let expense = db.list_categories(1, Some(FlowDirection::Expense)).unwrap();

        assert_eq!(income.len(), 5);
        assert_eq!(expense.len(), 8);
        assert!(income.iter().all(|c| c.direction == FlowDirection::Income));
        assert!(expense.iter().any(|c| c.key == "food"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(categories::slugify("Pet Food"), "pet_food");
        assert_eq!(categories::slugify("  Coffee & Tea!  "), "coffee_tea");
        assert_eq!(categories::slugify("Кафе"), "кафе");
        assert_eq!(categories::slugify("!!!"), "");
    }

    #[test]
    fn test_create_category_is_private_to_owner() {
        let db = Database::in_memory().unwrap();

        let created = db
            .create_category(&NewCategory {
                user_id: 1,
                name: "Pet Food".to_string(),
                direction: FlowDirection::Expense,
                icon: Some("🐶".to_string()),
            })
            .unwrap();
        assert_eq!(created.key, "pet_food");
        assert_eq!(created.user_id, Some(1));
        assert_eq!(created.label(), "🐶 Pet Food");

        let mine = db.list_categories(1, Some(FlowDirection::Expense)).unwrap();
        let theirs = db.list_categories(2, Some(FlowDirection::Expense)).unwrap();
        assert_eq!(mine.len(), 9);
        assert_eq!(mine.last().unwrap().id, created.id);
        assert_eq!(theirs.len(), 8);

        assert!(db.get_category(2, created.id).unwrap().is_none());
    }

    #[test]
    fn test_create_category_rejects_bad_names() {
        let db = Database::in_memory().unwrap();
        let new = |name: &str| NewCategory {
            user_id: 1,
            name: name.to_string(),
            direction: FlowDirection::Expense,
            icon: None,
        };

        assert!(matches!(db.create_category(&new("   ")), Err(Error::Validation(_))));
        assert!(matches!(db.create_category(&new("???")), Err(Error::Validation(_))));
        assert!(matches!(
            db.create_category(&new(&"x".repeat(65))),
            Err(Error::Validation(_))
        ));
        // Collides with the global "Food"
        assert!(matches!(db.create_category(&new("food")), Err(Error::Validation(_))));

        // Same name for the other direction is fine
        let income_food = db
            .create_category(&NewCategory {
                direction: FlowDirection::Income,
                ..new("Food")
            })
            .unwrap();
        assert_eq!(income_food.direction, FlowDirection::Income);
    }

    #[test]
    fn test_remove_category_deletes_or_hides() {
        let db = Database::in_memory().unwrap();
        let new = |name: &str| NewCategory {
            user_id: 1,
            name: name.to_string(),
            direction: FlowDirection::Expense,
            icon: None,
        };

        let unused = db.create_category(&new("Books")).unwrap();
        assert_eq!(
            db.remove_category(1, unused.id).unwrap(),
            CategoryRemoval::Deleted
        );
        assert!(db.get_category(1, unused.id).unwrap().is_none());

        let used = db.create_category(&new("Coffee")).unwrap();
        db.insert_transaction(&NewTransaction::new(
            1,
            used.id,
            FlowDirection::Expense,
            Decimal::from(3),
        ))
        .unwrap();
        assert_eq!(db.remove_category(1, used.id).unwrap(), CategoryRemoval::Hidden);

        let hidden = db.get_category(1, used.id).unwrap().unwrap();
        assert!(hidden.hidden);
        assert!(db
            .list_categories(1, None)
            .unwrap()
            .iter()
            .all(|c| c.id != used.id));

        // Recreating a hidden category shows it again
        let again = db.create_category(&new("Coffee")).unwrap();
        assert_eq!(again.id, used.id);
        assert!(!again.hidden);
    }

    #[test]
    fn test_remove_category_rejects_global_and_foreign() {
        let db = Database::in_memory().unwrap();
        let food = category_id(&db, 1, "food", FlowDirection::Expense);

        assert!(matches!(db.remove_category(1, food), Err(Error::Validation(_))));
        assert!(matches!(db.remove_category(1, 9999), Err(Error::NotFound(_))));

        let own = db
            .create_category(&NewCategory {
                user_id: 1,
                name: "Books".to_string(),
                direction: FlowDirection::Expense,
                icon: None,
            })
            .unwrap();
        assert!(matches!(db.remove_category(2, own.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_insert_and_get_transaction() {
        let db = Database::in_memory().unwrap();
        let salary = category_id(&db, 1, "salary", FlowDirection::Income);

        let tx = db
            .insert_transaction(
                &NewTransaction::new(1, salary, FlowDirection::Income, "1000.456".parse().unwrap())
                    .with_note("  March  "),
            )
            .unwrap();

        assert_eq!(tx.amount, "1000.46".parse::<Decimal>().unwrap());
        assert_eq!(tx.note.as_deref(), Some("March"));
        assert_eq!(tx.category_name, "Salary");
        assert_eq!(tx.category_icon, "💼");
        assert_eq!(tx.signed_amount(), "1000.46".parse::<Decimal>().unwrap());

        // Inserting for an unknown user registers them
        assert!(db.get_user(1).unwrap().is_some());

        let fetched = db.get_transaction(1, tx.id).unwrap().unwrap();
        assert_eq!(fetched, tx);
        assert!(db.get_transaction(2, tx.id).unwrap().is_none());
    }

    #[test]
    fn test_insert_transaction_truncates_long_note() {
        let db = Database::in_memory().unwrap();
        let food = category_id(&db, 1, "food", FlowDirection::Expense);

        let tx = db
            .insert_transaction(
                &NewTransaction::new(1, food, FlowDirection::Expense, Decimal::from(5))
                    .with_note("a".repeat(MAX_NOTE_LEN + 50)),
            )
            .unwrap();
        assert_eq!(tx.note.unwrap().chars().count(), MAX_NOTE_LEN);

        let blank = db
            .insert_transaction(
                &NewTransaction::new(1, food, FlowDirection::Expense, Decimal::from(5))
                    .with_note("   "),
            )
            .unwrap();
        assert!(blank.note.is_none());
    }

    #[test]
    fn test_insert_transaction_rejects_non_positive_amount() {
        let db = Database::in_memory().unwrap();
        let food = category_id(&db, 1, "food", FlowDirection::Expense);

        for amount in ["0", "-5", "0.001"] {
            let result = db.insert_transaction(&NewTransaction::new(
                1,
                food,
                FlowDirection::Expense,
                amount.parse().unwrap(),
            ));
            assert!(matches!(result, Err(Error::Validation(_))), "amount {}", amount);
        }
        assert!(db.list_transactions(1, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_insert_transaction_caps_amount() {
        let db = Database::in_memory().unwrap();
        let food = category_id(&db, 1, "food", FlowDirection::Expense);

        let at_cap = db
            .insert_transaction(&NewTransaction::new(1, food, FlowDirection::Expense, MAX_AMOUNT))
            .unwrap();
        assert_eq!(at_cap.amount, MAX_AMOUNT);

        for amount in [MAX_AMOUNT + Decimal::ONE, Decimal::MAX] {
            let result =
                db.insert_transaction(&NewTransaction::new(1, food, FlowDirection::Expense, amount));
            assert!(matches!(result, Err(Error::Validation(_))), "amount {}", amount);
        }
        assert_eq!(db.list_transactions(1, None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_total_balance_reports_overflow() {
        let db = Database::in_memory().unwrap();
        let food = category_id(&db, 1, "food", FlowDirection::Expense);
        db.ensure_user(1, None, None).unwrap();

        // Rows written before the amount cap existed
        let conn = db.conn().unwrap();
        for _ in 0..2 {
            conn.execute(
                "INSERT INTO transactions (user_id, category_id, direction, amount, occurred_at)
                 VALUES (?, ?, 'expense', ?, '2024-03-15 12:00:00')",
                params![1, food, Decimal::MAX.to_string()],
            )
            .unwrap();
        }
        drop(conn);

        assert!(matches!(db.total_balance(1), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_insert_transaction_rejects_invalid_category() {
        let db = Database::in_memory().unwrap();
        let food = category_id(&db, 1, "food", FlowDirection::Expense);

        // Unknown id
        let result = db.insert_transaction(&NewTransaction::new(
            1,
            9999,
            FlowDirection::Expense,
            Decimal::from(5),
        ));
        assert!(matches!(result, Err(Error::InvalidCategory(_))));

        // Direction mismatch
        let result = db.insert_transaction(&NewTransaction::new(
            1,
            food,
            FlowDirection::Income,
            Decimal::from(5),
        ));
        assert!(matches!(result, Err(Error::InvalidCategory(_))));

        // Someone else's category
        let own = db
            .create_category(&NewCategory {
                user_id: 2,
                name: "Books".to_string(),
                direction: FlowDirection::Expense,
                icon: None,
            })
            .unwrap();
        let result = db.insert_transaction(&NewTransaction::new(
            1,
            own.id,
            FlowDirection::Expense,
            Decimal::from(5),
        ));
        assert!(matches!(result, Err(Error::InvalidCategory(_))));

        // No partial write
        let conn = db.conn().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
                params![1],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_list_transactions_window_and_limit() {
        let db = Database::in_memory().unwrap();
        let food = category_id(&db, 1, "food", FlowDirection::Expense);
        let window =
            StatsWindow::trailing_days(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(), 30);

        let times = [
            window.start - Duration::seconds(1),
            window.start,
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap(),
            window.end - Duration::seconds(1),
            window.end,
        ];
        for (i, at) in times.iter().enumerate() {
            db.insert_transaction(
                &NewTransaction::new(1, food, FlowDirection::Expense, Decimal::from(i as i64 + 1))
                    .at(*at),
            )
            .unwrap();
        }

        let inside = db.transactions_in_window(1, &window).unwrap();
        assert_eq!(inside.len(), 3);
        // Newest first
        assert_eq!(inside[0].occurred_at, window.end - Duration::seconds(1));
        assert_eq!(inside[2].occurred_at, window.start);

        let all = db.list_transactions(1, None, None).unwrap();
        assert_eq!(all.len(), 5);

        let latest = db.list_transactions(1, None, Some(2)).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].occurred_at, window.end);
    }

    #[test]
    fn test_delete_transaction_is_scoped_to_user() {
        let db = Database::in_memory().unwrap();
        let food = category_id(&db, 1, "food", FlowDirection::Expense);
        let tx = db
            .insert_transaction(&NewTransaction::new(
                1,
                food,
                FlowDirection::Expense,
                Decimal::from(10),
            ))
            .unwrap();

        assert!(!db.delete_transaction(2, tx.id).unwrap());
        assert!(db.delete_transaction(1, tx.id).unwrap());
        assert!(!db.delete_transaction(1, tx.id).unwrap());
    }

    #[test]
    fn test_total_balance() {
        let db = Database::in_memory().unwrap();
        let salary = category_id(&db, 1, "salary", FlowDirection::Income);
        let food = category_id(&db, 1, "food", FlowDirection::Expense);

        assert_eq!(db.total_balance(1).unwrap(), Decimal::ZERO);

        db.insert_transaction(&NewTransaction::new(
            1,
            salary,
            FlowDirection::Income,
            "1500.50".parse().unwrap(),
        ))
        .unwrap();
        db.insert_transaction(&NewTransaction::new(
            1,
            food,
            FlowDirection::Expense,
            "200.25".parse().unwrap(),
        ))
        .unwrap();

        assert_eq!(db.total_balance(1).unwrap(), "1300.25".parse::<Decimal>().unwrap());
        assert_eq!(db.total_balance(2).unwrap(), Decimal::ZERO);
    }
}

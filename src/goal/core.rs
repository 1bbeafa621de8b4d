//! Savings goals and the database functions for managing them.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, UserID,
    database_id::GoalId,
    db::get_parsed,
    pagination::PageRequest,
    validate::{add_amount, non_empty, positive_amount},
};

/// An amount the user is saving towards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// The id of the goal.
    pub id: GoalId,
    /// The user that owns the goal.
    pub user_id: UserID,
    /// The display name.
    pub name: String,
    /// The amount to save.
    pub target_amount: Decimal,
    /// The amount saved so far.
    pub current_amount: Decimal,
    /// The category contributions are recorded under, if any.
    pub category: Option<String>,
    /// The day the user wants to reach the target by.
    pub target_date: Option<Date>,
    /// False once the goal has been deleted.
    pub is_active: bool,
}

/// The request body for creating a goal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    /// The display name.
    pub name: String,
    /// The amount to save.
    pub target_amount: Decimal,
    /// The amount already saved, zero if omitted.
    pub current_amount: Option<Decimal>,
    /// The category contributions are recorded under.
    pub category: Option<String>,
    /// The day the user wants to reach the target by.
    pub target_date: Option<Date>,
}

/// The request body for editing a goal. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    /// The new name.
    pub name: Option<String>,
    /// The new target.
    pub target_amount: Option<Decimal>,
    /// The new saved amount.
    pub current_amount: Option<Decimal>,
    /// The new category.
    pub category: Option<String>,
    /// The new target date.
    pub target_date: Option<Date>,
    /// Reactivate or deactivate the goal.
    pub is_active: Option<bool>,
}

/// The request body for contributing to a goal.
#[derive(Debug, Clone, Deserialize)]
pub struct Contribution {
    /// The amount to add.
    pub amount: Decimal,
}

fn non_negative(amount: Decimal) -> Result<Decimal, Error> {
    if amount < Decimal::ZERO {
        return Err(Error::Validation(
            "currentAmount must not be negative".to_owned(),
        ));
    }

    Ok(amount)
}

fn optional_category(category: Option<String>) -> Option<String> {
    category
        .map(|category| category.trim().to_owned())
        .filter(|category| !category.is_empty())
}

/// Create the goal table.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            target_amount TEXT NOT NULL,
            current_amount TEXT NOT NULL,
            category TEXT,
            target_date TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const SELECT_GOAL: &str = "SELECT id, user_id, name, target_amount, current_amount, category, \
    target_date, is_active FROM goal";

fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        target_amount: get_parsed(row, 3)?,
        current_amount: get_parsed(row, 4)?,
        category: row.get(5)?,
        target_date: row.get(6)?,
        is_active: row.get(7)?,
    })
}

/// Create a goal.
///
/// # Errors
/// Returns [Error::Validation] if a field is invalid.
pub fn create_goal(user_id: UserID, new_goal: NewGoal, connection: &Connection) -> Result<Goal, Error> {
    let name = non_empty("name", &new_goal.name)?;
    let target_amount = positive_amount("targetAmount", new_goal.target_amount)?;
    let current_amount = non_negative(new_goal.current_amount.unwrap_or_default())?;
    let category = optional_category(new_goal.category);

    connection.execute(
        "INSERT INTO goal (user_id, name, target_amount, current_amount, category, target_date, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        (
            user_id.as_i64(),
            &name,
            target_amount.to_string(),
            current_amount.to_string(),
            &category,
            new_goal.target_date,
        ),
    )?;

    Ok(Goal {
        id: connection.last_insert_rowid(),
        user_id,
        name,
        target_amount,
        current_amount,
        category,
        target_date: new_goal.target_date,
        is_active: true,
    })
}

/// Get a goal owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to another user.
pub fn get_goal(id: GoalId, user_id: UserID, connection: &Connection) -> Result<Goal, Error> {
    connection
        .prepare(&format!("{SELECT_GOAL} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((id, user_id.as_i64()), map_goal_row)
        .map_err(|error| error.into())
}

/// Get one page of the user's active goals and the number of active goals.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_goals(
    user_id: UserID,
    page: PageRequest,
    connection: &Connection,
) -> Result<(Vec<Goal>, u64), Error> {
    let total: i64 = connection.query_row(
        "SELECT COUNT(*) FROM goal WHERE user_id = ?1 AND is_active = 1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let goals = connection
        .prepare(&format!(
            "{SELECT_GOAL} WHERE user_id = ?1 AND is_active = 1 ORDER BY id LIMIT ?2 OFFSET ?3"
        ))?
        .query_map(
            (user_id.as_i64(), page.limit as i64, page.offset() as i64),
            map_goal_row,
        )?
        .map(|goal_result| goal_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((goals, total as u64))
}

fn save_goal(goal: &Goal, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "UPDATE goal
         SET name = ?1, target_amount = ?2, current_amount = ?3, category = ?4,
             target_date = ?5, is_active = ?6
         WHERE id = ?7 AND user_id = ?8",
        (
            &goal.name,
            goal.target_amount.to_string(),
            goal.current_amount.to_string(),
            &goal.category,
            goal.target_date,
            goal.is_active,
            goal.id,
            goal.user_id.as_i64(),
        ),
    )?;

    Ok(())
}

/// Apply `patch` to a goal.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to another user, or
/// [Error::Validation] if a field is invalid.
pub fn update_goal(
    id: GoalId,
    user_id: UserID,
    patch: GoalPatch,
    connection: &Connection,
) -> Result<Goal, Error> {
    let mut goal = get_goal(id, user_id, connection)?;

    if let Some(name) = patch.name {
        goal.name = non_empty("name", &name)?;
    }
    if let Some(target_amount) = patch.target_amount {
        goal.target_amount = positive_amount("targetAmount", target_amount)?;
    }
    if let Some(current_amount) = patch.current_amount {
        goal.current_amount = non_negative(current_amount)?;
    }
    if patch.category.is_some() {
        goal.category = optional_category(patch.category);
    }
    if patch.target_date.is_some() {
        goal.target_date = patch.target_date;
    }
    if let Some(is_active) = patch.is_active {
        goal.is_active = is_active;
    }

    save_goal(&goal, connection)?;

    Ok(goal)
}

/// Soft delete a goal.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to another user.
pub fn deactivate_goal(id: GoalId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE goal SET is_active = 0 WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Add `amount` to a goal's saved amount.
///
/// # Errors
/// Returns [Error::Validation] if `amount` is not positive, or [Error::NotFound] if the goal does
/// not exist, is inactive or belongs to another user.
pub fn contribute(
    id: GoalId,
    user_id: UserID,
    amount: Decimal,
    connection: &Connection,
) -> Result<Goal, Error> {
    let amount = positive_amount("amount", amount)?;
    let mut goal = get_goal(id, user_id, connection)?;

    if !goal.is_active {
        return Err(Error::NotFound);
    }

    goal.current_amount = add_amount("currentAmount", goal.current_amount, amount)?;
    save_goal(&goal, connection)?;

    Ok(goal)
}

/// Add `amount` to every active goal of `category`. Returns the number of goals updated.
///
/// Not called when transactions are created; callers decide when contributions are recorded.
///
/// # Errors
/// Returns [Error::SqlError] if the goals could not be read or written, or [Error::Validation]
/// if a goal's amount would be out of range, in which case no goal is changed.
pub fn record_contribution_for_category(
    user_id: UserID,
    category: &str,
    amount: Decimal,
    connection: &Connection,
) -> Result<usize, Error> {
    let goals = connection
        .prepare(&format!(
            "{SELECT_GOAL} WHERE user_id = ?1 AND is_active = 1 AND category = ?2 COLLATE NOCASE"
        ))?
        .query_map((user_id.as_i64(), category), map_goal_row)?
        .map(|goal_result| goal_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    let goals = goals
        .into_iter()
        .map(|mut goal| {
            goal.current_amount = add_amount("currentAmount", goal.current_amount, amount)?;
            Ok(goal)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    for goal in &goals {
        save_goal(goal, connection)?;
    }

    Ok(goals.len())
}

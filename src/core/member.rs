//! Member business logic - Handles all member-related operations.
//!
//! Provides functions for creating, retrieving, updating and deleting
//! members, the bar-side name/nickname search, and the atomic balance
//! update used by the booking core. Balance changes never go through plain
//! read-modify-write: they use a single SQL `UPDATE ... SET guthaben =
//! guthaben + ?` so concurrent transactions cannot lose updates.

use crate::{
    entities::{Booking, Member, booking, member},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};

/// Retrieves all members, ordered alphabetically by name.
pub async fn get_all_members(db: &DatabaseConnection) -> Result<Vec<member::Model>> {
    Member::find()
        .order_by_asc(member::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a member by its unique ID.
pub async fn get_member_by_id(
    db: &DatabaseConnection,
    mitglied_id: i64,
) -> Result<Option<member::Model>> {
    Member::find_by_id(mitglied_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Free-text search over member name and nickname.
///
/// Matches case-insensitive substrings and returns the hits ordered by name.
/// The empty-query hotlist lives in [`crate::core::booking::purchase_hotlist`].
pub async fn search_members(db: &DatabaseConnection, term: &str) -> Result<Vec<member::Model>> {
    Member::find()
        .filter(
            Condition::any()
                .add(member::Column::Name.contains(term))
                .add(member::Column::Nickname.contains(term)),
        )
        .order_by_asc(member::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a new member with zero balance and a cleared blacklist flag.
///
/// # Errors
/// Returns [`Error::Validation`] if the trimmed name is empty.
pub async fn create_member(
    db: &DatabaseConnection,
    name: String,
    nickname: Option<String>,
    email: Option<String>,
) -> Result<member::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Name darf nicht leer sein."));
    }

    let model = member::ActiveModel {
        name: Set(name.trim().to_string()),
        nickname: Set(normalize_optional(nickname)),
        email: Set(normalize_optional(email)),
        guthaben: Set(0.0),
        blacklist: Set(false),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Updates a member's name, nickname and email.
pub async fn update_member(
    db: &DatabaseConnection,
    mitglied_id: i64,
    name: String,
    nickname: Option<String>,
    email: Option<String>,
) -> Result<member::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Name darf nicht leer sein."));
    }

    let mut model: member::ActiveModel = Member::find_by_id(mitglied_id)
        .one(db)
        .await?
        .ok_or(Error::MemberNotFound { id: mitglied_id })?
        .into();

    model.name = Set(name.trim().to_string());
    model.nickname = Set(normalize_optional(nickname));
    model.email = Set(normalize_optional(email));

    model.update(db).await.map_err(Into::into)
}

/// Deletes a member together with all of its bookings.
///
/// The cascade runs inside one transaction so the ledger never holds
/// bookings that reference a missing member.
pub async fn delete_member(db: &DatabaseConnection, mitglied_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    Member::find_by_id(mitglied_id)
        .one(&txn)
        .await?
        .ok_or(Error::MemberNotFound { id: mitglied_id })?;

    Booking::delete_many()
        .filter(booking::Column::MitgliedId.eq(mitglied_id))
        .exec(&txn)
        .await?;
    Member::delete_by_id(mitglied_id).exec(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Administrative blacklist override.
///
/// The flag holds only until the next balance-changing operation, which
/// recomputes it against the minimum-balance threshold.
pub async fn set_blacklist(
    db: &DatabaseConnection,
    mitglied_id: i64,
    blacklist: bool,
) -> Result<member::Model> {
    let mut model: member::ActiveModel = Member::find_by_id(mitglied_id)
        .one(db)
        .await?
        .ok_or(Error::MemberNotFound { id: mitglied_id })?
        .into();

    model.blacklist = Set(blacklist);
    model.update(db).await.map_err(Into::into)
}

/// Atomically adds a delta to a member's balance.
///
/// Single SQL statement (`UPDATE mitglied SET guthaben = guthaben + ?`),
/// callable inside a transaction; returns the updated member.
pub(crate) async fn update_member_balance_atomic<C>(
    db: &C,
    mitglied_id: i64,
    delta: f64,
) -> Result<member::Model>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let _member = Member::find_by_id(mitglied_id)
        .one(db)
        .await?
        .ok_or(Error::MemberNotFound { id: mitglied_id })?;

    Member::update_many()
        .col_expr(
            member::Column::Guthaben,
            Expr::col(member::Column::Guthaben).add(delta),
        )
        .filter(member::Column::Id.eq(mitglied_id))
        .exec(db)
        .await?;

    Member::find_by_id(mitglied_id)
        .one(db)
        .await?
        .ok_or(Error::MemberNotFound { id: mitglied_id })
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_create_member_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_member(&db, String::new(), None, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { message: _ }
        ));

        let result = create_member(&db, "   ".to_string(), None, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { message: _ }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_member_defaults() -> Result<()> {
        let db = setup_test_db().await?;

        let member = create_member(
            &db,
            "  Alice  ".to_string(),
            Some("Al".to_string()),
            Some(String::new()),
        )
        .await?;

        assert_eq!(member.name, "Alice");
        assert_eq!(member.nickname, Some("Al".to_string()));
        assert_eq!(member.email, None);
        assert_eq!(member.guthaben, 0.0);
        assert!(!member.blacklist);

        Ok(())
    }

    #[tokio::test]
    async fn test_search_members_by_name_and_nickname() -> Result<()> {
        let db = setup_test_db().await?;

        create_member(&db, "Alice Schmidt".to_string(), None, None).await?;
        create_member(
            &db,
            "Bob Meier".to_string(),
            Some("Schmiddi".to_string()),
            None,
        )
        .await?;
        create_member(&db, "Carol Weber".to_string(), None, None).await?;

        // Name match and nickname match, ordered by name
        let hits = search_members(&db, "schmid").await?;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "Alice Schmidt");
        assert_eq!(hits[1].name, "Bob Meier");

        let none = search_members(&db, "zzz").await?;
        assert!(none.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_member() -> Result<()> {
        let db = setup_test_db().await?;
        let member = create_test_member(&db, "Alice").await?;

        let updated = update_member(
            &db,
            member.id,
            "Alice B.".to_string(),
            Some("Ali".to_string()),
            Some("alice@example.org".to_string()),
        )
        .await?;
        assert_eq!(updated.name, "Alice B.");
        assert_eq!(updated.nickname, Some("Ali".to_string()));
        assert_eq!(updated.email, Some("alice@example.org".to_string()));

        let result = update_member(&db, 999, "X".to_string(), None, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::MemberNotFound { id: 999 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_member_cascades_bookings() -> Result<()> {
        let db = setup_test_db().await?;
        let policy = test_policy();

        let member = create_member_with_balance(&db, "Alice", 10.0).await?;
        let article = create_test_article(&db, "Cola", 1.5, 5).await?;
        crate::core::booking::create_booking(&db, member.id, article.id, 2, &policy).await?;
        assert_eq!(Booking::find().count(&db).await?, 1);

        delete_member(&db, member.id).await?;

        assert!(get_member_by_id(&db, member.id).await?.is_none());
        assert_eq!(Booking::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_set_blacklist_override() -> Result<()> {
        let db = setup_test_db().await?;
        let member = create_test_member(&db, "Alice").await?;

        let blocked = set_blacklist(&db, member.id, true).await?;
        assert!(blocked.blacklist);

        let cleared = set_blacklist(&db, member.id, false).await?;
        assert!(!cleared.blacklist);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_member_balance_atomic() -> Result<()> {
        let db = setup_test_db().await?;
        let member = create_test_member(&db, "Alice").await?;

        let updated = update_member_balance_atomic(&db, member.id, 12.5).await?;
        assert_eq!(updated.guthaben, 12.5);
        let updated = update_member_balance_atomic(&db, member.id, -20.0).await?;
        assert_eq!(updated.guthaben, -7.5);

        let missing = update_member_balance_atomic(&db, 999, 1.0).await;
        assert!(matches!(
            missing.unwrap_err(),
            Error::MemberNotFound { id: 999 }
        ));

        Ok(())
    }
}

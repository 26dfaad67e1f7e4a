use std::collections::BTreeMap;
use std::fmt::Display;

use warden_core::{AppError, AppResult};

/// Collects rows keyed by their pair, rejecting rows for another owner and
/// repeated pairs before anything is written.
pub(crate) fn keyed_rows<O, T, R>(
    owner: O,
    rows: &[R],
    row_owner: impl Fn(&R) -> O,
    row_target: impl Fn(&R) -> T,
    relation: &str,
) -> AppResult<BTreeMap<(O, T), R>>
where
    O: Ord + Copy + Display,
    T: Ord + Copy + Display,
    R: Clone,
{
    let mut keyed = BTreeMap::new();
    for row in rows {
        if row_owner(row) != owner {
            return Err(AppError::Validation(format!(
                "{relation} row belongs to '{}' instead of '{owner}'",
                row_owner(row)
            )));
        }

        let target = row_target(row);
        if keyed.insert((owner, target), row.clone()).is_some() {
            return Err(AppError::Validation(format!(
                "duplicate {relation} pair ('{owner}', '{target}')"
            )));
        }
    }

    Ok(keyed)
}

#[cfg(test)]
mod tests {
    use warden_core::AppError;

    use super::keyed_rows;

    #[derive(Clone)]
    struct Row(u8, u8);

    #[test]
    fn keys_rows_by_owner_and_target() {
        let keyed = keyed_rows(1, &[Row(1, 2), Row(1, 3)], |row| row.0, |row| row.1, "pair");
        let keys: Vec<(u8, u8)> = keyed.unwrap_or_default().into_keys().collect();
        assert_eq!(keys, vec![(1, 2), (1, 3)]);
    }

    #[test]
    fn rejects_foreign_owner_and_repeated_target() {
        let foreign = keyed_rows(1, &[Row(2, 2)], |row| row.0, |row| row.1, "pair");
        assert!(matches!(foreign, Err(AppError::Validation(_))));

        let repeated = keyed_rows(1, &[Row(1, 2), Row(1, 2)], |row| row.0, |row| row.1, "pair");
        assert!(matches!(repeated, Err(AppError::Validation(_))));
    }
}

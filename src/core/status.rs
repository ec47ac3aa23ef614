use crate::domain::model::{ResultTable, Status, TierTable};
use crate::utils::error::{AccError, Result};

/// Tolerance when matching a radius against a tier bound.
const RADIUS_EPSILON: f64 = 1e-9;

impl TierTable {
    /// Label of the first tier whose bound covers `radius_m`.
    ///
    /// Radii beyond the last bound fall in the last tier. `None` only when the
    /// table has no tier at all.
    pub fn label_for(&self, radius_m: f64) -> Option<&str> {
        self.tiers
            .iter()
            .find(|tier| radius_m <= tier.up_to_m + RADIUS_EPSILON)
            .or_else(|| self.tiers.last())
            .map(|tier| tier.label.as_str())
    }
}

/// Classifies a result table: the closest intersecting perimeter decides.
pub fn evaluate_acc_status(table: &ResultTable, tiers: &TierTable) -> Result<Status> {
    if table.is_empty() {
        return Err(AccError::EmptyResultError);
    }

    let closest = table
        .iter()
        .filter(|row| row.intersects)
        .min_by(|a, b| a.radius_m.total_cmp(&b.radius_m));

    let status = match closest {
        None => Status {
            label: tiers.compliant_label.clone(),
            compliant: true,
            triggering_buffer: None,
            triggering_radius_m: None,
        },
        Some(row) => {
            let label = tiers
                .label_for(row.radius_m)
                .map(str::to_string)
                .unwrap_or_else(|| format!("within {}", row.buffer));
            Status {
                label,
                compliant: false,
                triggering_buffer: Some(row.buffer.clone()),
                triggering_radius_m: Some(row.radius_m),
            }
        }
    };

    tracing::debug!("Status evaluated as '{}'", status);
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Crs, ResultRow, Tier};

    fn table(flags: &[(f64, bool)]) -> ResultTable {
        let rows = flags
            .iter()
            .map(|&(radius, hit)| {
                let mut row = ResultRow::empty(format!("{}m", radius), radius);
                if hit {
                    row.intersects = true;
                    row.count = 1;
                    row.feature_ids.push("f".to_string());
                }
                row
            })
            .collect();
        ResultTable::new(Crs::Lambert93, rows)
    }

    #[test]
    fn test_no_intersection_is_compliant() {
        let status = evaluate_acc_status(
            &table(&[(100.0, false), (500.0, false), (1000.0, false)]),
            &TierTable::default(),
        )
        .unwrap();
        assert_eq!(status.label, "compliant");
        assert!(status.compliant);
        assert!(status.triggering_radius_m.is_none());
    }

    #[test]
    fn test_smallest_intersecting_radius_wins() {
        let status = evaluate_acc_status(
            &table(&[(100.0, false), (500.0, true), (1000.0, true)]),
            &TierTable::default(),
        )
        .unwrap();
        assert_eq!(status.label, "restricted");
        assert_eq!(status.triggering_buffer.as_deref(), Some("500m"));
        assert_eq!(status.triggering_radius_m, Some(500.0));
        assert!(!status.compliant);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let t = table(&[(100.0, true), (500.0, true), (1000.0, true)]);
        let tiers = TierTable::default();
        let first = evaluate_acc_status(&t, &tiers).unwrap();
        let second = evaluate_acc_status(&t, &tiers).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.label, "prohibited");
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let result = evaluate_acc_status(&table(&[]), &TierTable::default());
        assert!(matches!(result, Err(AccError::EmptyResultError)));
    }

    #[test]
    fn test_radius_beyond_last_tier_uses_last_tier() {
        let tiers = TierTable::default();
        assert_eq!(tiers.label_for(2000.0), Some("monitored"));
        assert_eq!(tiers.label_for(250.0), Some("restricted"));
        assert_eq!(tiers.label_for(100.0), Some("prohibited"));
    }

    #[test]
    fn test_missing_tiers_fall_back_to_buffer_name() {
        let tiers = TierTable {
            compliant_label: "ok".to_string(),
            tiers: Vec::<Tier>::new(),
        };
        let status = evaluate_acc_status(&table(&[(100.0, true)]), &tiers).unwrap();
        assert_eq!(status.label, "within 100m");
    }
}

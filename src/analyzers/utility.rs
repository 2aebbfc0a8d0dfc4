use crate::error::ConfigError;
use crate::table::DemographicsTable;

/// Divides each value by `total`. A zero total yields NaN shares, so the
/// emptiness stays visible in anything weighted by them.
pub fn shares(values: &[f64], total: f64) -> Vec<f64> {
    if total == 0.0 {
        return vec![f64::NAN; values.len()];
    }
    values.iter().map(|v| v / total).collect()
}

/// Resolves demographic category names to column indices.
///
/// An empty `requested` list selects every column of the table.
pub fn resolve_categories(
    demographics: &DemographicsTable,
    requested: &[String],
) -> Result<(Vec<String>, Vec<usize>), ConfigError> {
    if requested.is_empty() {
        let names = demographics.columns().to_vec();
        let idx = (0..names.len()).collect();
        return Ok((names, idx));
    }

    let mut idx = Vec::with_capacity(requested.len());
    for category in requested {
        let i = demographics
            .column_index(category)
            .ok_or_else(|| ConfigError::MissingDemographic {
                category: category.clone(),
            })?;
        idx.push(i);
    }
    Ok((requested.to_vec(), idx))
}

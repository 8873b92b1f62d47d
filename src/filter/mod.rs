//! Group Filter: the multi-stage predicate pipeline that decides which
//! group attributions survive into the final dataset.
//!
//! Stages run in a fixed order and each one only removes rows:
//! 1. drop unaffiliated-individual attributions (and the indicator column)
//! 2. keep verified attributions only (`GroupVerified == 1` exactly)
//! 3. optional minimum-year cutoff
//! 4. denylist exclusion by exact group name
//! 5. top-N selection by incident count, globally or per region
//!
//! An empty table after any stage is a valid outcome and propagates.

use arrow::array::{Array, BooleanArray};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use log::info;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{EtlError, Result};
use crate::utils::arrow::{drop_column, filter_batch, numeric_column, string_column};

const STAGE: &str = "group filter";

/// Knobs for the filter pipeline, fixed per run.
#[derive(Debug, Clone)]
pub struct GroupFilterOptions {
    /// Groups to keep, globally or per region
    pub top_n: usize,
    /// Drop rows before this year when set
    pub min_year: Option<i64>,
    /// Rank per (Region, Group) instead of globally
    pub regional: bool,
}

/// Run all five stages in order.
pub fn filter_to_applicable_groups(
    batch: &RecordBatch,
    denylist: &[String],
    options: &GroupFilterOptions,
) -> Result<RecordBatch> {
    if options.top_n == 0 {
        return Err(EtlError::Configuration(
            "top-n must be positive".to_string(),
        ));
    }

    let mut current = drop_unaffiliated(batch)?;
    info!("after unaffiliated drop: {} rows", current.num_rows());
    current = verified_only(&current)?;
    info!("after verified-only: {} rows", current.num_rows());
    current = min_year(&current, options.min_year)?;
    info!("after year cutoff: {} rows", current.num_rows());
    current = apply_denylist(&current, denylist)?;
    info!("after denylist: {} rows", current.num_rows());
    current = keep_top_groups(&current, options.top_n, options.regional)?;
    info!(
        "after top-{} selection: {} rows",
        options.top_n,
        current.num_rows()
    );
    Ok(current)
}

/// Stage 1: remove rows flagged as unaffiliated individuals, then drop the
/// indicator column, which carries no further meaning downstream.
pub fn drop_unaffiliated(batch: &RecordBatch) -> Result<RecordBatch> {
    let flags = numeric_column(batch, "IsUnaffiliatedIndividual", STAGE)?;
    let mask = BooleanArray::from_iter(
        (0..batch.num_rows()).map(|row| Some(flags.is_null(row) || flags.value(row) != 1.0)),
    );
    let kept = filter_batch(batch, &mask)?;
    drop_column(&kept, "IsUnaffiliatedIndividual", STAGE)
}

/// Stage 2: keep rows where the attribution is verified. Unverified (0) and
/// unknown (null) are treated identically: excluded.
pub fn verified_only(batch: &RecordBatch) -> Result<RecordBatch> {
    let verified = numeric_column(batch, "GroupVerified", STAGE)?;
    let mask = BooleanArray::from_iter(
        (0..batch.num_rows()).map(|row| Some(!verified.is_null(row) && verified.value(row) == 1.0)),
    );
    filter_batch(batch, &mask)
}

/// Stage 3: optional minimum-year cutoff. A `None` threshold is a no-op.
pub fn min_year(batch: &RecordBatch, threshold: Option<i64>) -> Result<RecordBatch> {
    let Some(threshold) = threshold else {
        return Ok(batch.clone());
    };
    let years = numeric_column(batch, "Year", STAGE)?;
    let mask = BooleanArray::from_iter(
        (0..batch.num_rows())
            .map(|row| Some(!years.is_null(row) && years.value(row) >= threshold as f64)),
    );
    filter_batch(batch, &mask)
}

/// Stage 4: drop rows whose group name appears in the denylist.
pub fn apply_denylist(batch: &RecordBatch, denylist: &[String]) -> Result<RecordBatch> {
    if denylist.is_empty() {
        return Ok(batch.clone());
    }
    let excluded: FxHashSet<&str> = denylist.iter().map(String::as_str).collect();
    let groups = string_column(batch, "Group", STAGE)?;
    let mask = BooleanArray::from_iter(
        groups
            .iter()
            .map(|group| Some(group.is_none_or(|g| !excluded.contains(g)))),
    );
    filter_batch(batch, &mask)
}

/// Stage 5: keep only rows whose group ranks in the top `n` by incident
/// count. The regional variant ranks per (Region, Group) independently, so
/// a group can survive in one region and be cut in another.
///
/// Ties at the boundary break lexicographically on group name, so the
/// selection is deterministic regardless of input order.
pub fn keep_top_groups(batch: &RecordBatch, n: usize, regional: bool) -> Result<RecordBatch> {
    if n == 0 {
        return Err(EtlError::Configuration(
            "top-n must be positive".to_string(),
        ));
    }
    if regional {
        keep_top_groups_per_region(batch, n)
    } else {
        keep_top_groups_global(batch, n)
    }
}

fn keep_top_groups_global(batch: &RecordBatch, n: usize) -> Result<RecordBatch> {
    let groups = string_column(batch, "Group", STAGE)?;

    let mut counts: FxHashMap<&str, u64> = FxHashMap::default();
    for group in groups.iter().flatten() {
        *counts.entry(group).or_insert(0) += 1;
    }

    let keep: FxHashSet<&str> = top_n_names(counts, n).into_iter().collect();
    let mask = BooleanArray::from_iter(
        groups
            .iter()
            .map(|group| Some(group.is_some_and(|g| keep.contains(g)))),
    );
    filter_batch(batch, &mask)
}

fn keep_top_groups_per_region(batch: &RecordBatch, n: usize) -> Result<RecordBatch> {
    let groups = string_column(batch, "Group", STAGE)?;
    let regions = string_column(batch, "Region", STAGE)?;

    let mut counts: FxHashMap<&str, FxHashMap<&str, u64>> = FxHashMap::default();
    for row in 0..batch.num_rows() {
        if groups.is_null(row) || regions.is_null(row) {
            continue;
        }
        *counts
            .entry(regions.value(row))
            .or_default()
            .entry(groups.value(row))
            .or_insert(0) += 1;
    }

    let keep: FxHashSet<(&str, &str)> = counts
        .into_iter()
        .flat_map(|(region, by_group)| {
            top_n_names(by_group, n)
                .into_iter()
                .map(move |group| (region, group))
        })
        .collect();

    let mask = BooleanArray::from_iter((0..batch.num_rows()).map(|row| {
        Some(
            !groups.is_null(row)
                && !regions.is_null(row)
                && keep.contains(&(regions.value(row), groups.value(row))),
        )
    }));
    filter_batch(batch, &mask)
}

/// Rank names by count descending, tie-broken lexicographically ascending,
/// and take the first `n`. `n` beyond the distinct count keeps everything.
fn top_n_names(counts: FxHashMap<&str, u64>, n: usize) -> Vec<&str> {
    counts
        .into_iter()
        .sorted_by(|(name_a, count_a), (name_b, count_b)| {
            count_b.cmp(count_a).then_with(|| name_a.cmp(name_b))
        })
        .take(n)
        .map(|(name, _)| name)
        .collect()
}

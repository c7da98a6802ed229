use std::path::Path;

use docsim_core::rows::RowTable;
use docsim_core::types::QueryResultEntry;

/// Turns a row-aligned score vector into ranked neighbours.
///
/// Highest score first, ties in row order. `exclude` (the query's own path)
/// and non-positive scores never appear. Ranks are 1-based and contiguous.
pub fn rank(scores: &[f32], rows: &RowTable, exclude: Option<&Path>, top_k: usize) -> Vec<QueryResultEntry> {
    let mut order: Vec<usize> = (0..scores.len().min(rows.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order
        .into_iter()
        .filter(|&row| scores[row] > 0.0)
        .filter_map(|row| rows.entry(row).map(|e| (row, e)))
        .filter(|(_, e)| exclude != Some(e.path.as_path()))
        .take(top_k)
        .enumerate()
        .map(|(i, (row, e))| QueryResultEntry { path: e.path.clone(), similarity: scores[row], rank: i + 1 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsim_core::rows::RowEntry;
    use std::path::PathBuf;

    fn table(names: &[&str]) -> RowTable {
        RowTable::new(names.iter().map(|n| RowEntry { path: PathBuf::from(n), content_hash: String::new() }).collect()).unwrap()
    }

    #[test]
    fn orders_excludes_and_truncates() {
        let rows = table(&["/q", "/a", "/b", "/c", "/d"]);
        let scores = [1.0, 0.2, 0.9, 0.0, 0.9];
        let out = rank(&scores, &rows, Some(Path::new("/q")), 2);
        let paths: Vec<_> = out.iter().map(|e| e.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/b", "/d"], "ties keep row order");
        assert_eq!(out.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn non_positive_and_nan_scores_are_dropped() {
        let rows = table(&["/a", "/b", "/c"]);
        let out = rank(&[-0.3, f32::NAN, 0.0], &rows, None, 10);
        assert!(out.is_empty());
    }

    #[test]
    fn zero_top_k_is_empty() {
        let rows = table(&["/a"]);
        assert!(rank(&[0.5], &rows, None, 0).is_empty());
    }
}

//! Client side multi field text search.
//!
//! A row is kept when the lowercased query is a substring of any search
//! field. Each field is checked against its raw value and, when a column
//! renders that field, against the rendered cell text as well, so a date
//! can be found both as `2024-01-12` and as `12 Jan 2024`.

use rayon::prelude::*;

use super::column::Column;
use crate::records::Record;

/// Lowercases only. Whitespace is part of the query.
pub fn normalize_query(query: &str) -> String {
    query.to_lowercase()
}

/// `needle` must already be normalized.
pub fn matches<R: Record>(row: &R, fields: &[String], columns: &[Column<R>], needle: &str) -> bool {
    if fields.is_empty() || needle.is_empty() {
        return true;
    }
    fields.iter().any(|field| {
        let raw_hit = row
            .value(field)
            .is_some_and(|cell| cell.raw().to_lowercase().contains(needle));
        raw_hit
            || columns
                .iter()
                .filter(|c| c.key.as_deref() == Some(field.as_str()))
                .filter_map(|c| c.resolve(row))
                .any(|text| text.to_lowercase().contains(needle))
    })
}

/// Indices of the rows that pass, in their original order. Always computed
/// from the full row sequence.
pub fn search<R: Record>(
    rows: &[R],
    fields: &[String],
    columns: &[Column<R>],
    query: &str,
) -> Vec<usize> {
    let needle = normalize_query(query);
    if needle.is_empty() || fields.is_empty() {
        return (0..rows.len()).collect();
    }
    (0..rows.len())
        .into_par_iter()
        .filter(|&idx| matches(&rows[idx], fields, columns, &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RepairTask;
    use chrono::NaiveDate;

    fn task(no: &str, machine: &str) -> RepairTask {
        RepairTask {
            task_no: Some(no.into()),
            machine_name: Some(machine.into()),
            ..RepairTask::default()
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn basic_search_scenario() {
        let rows = vec![task("T1", "Lathe"), task("T2", "Press")];
        let hits = search(&rows, &fields(&["task_no", "machine_name"]), &[], "lathe");
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn empty_query_is_identity() {
        let rows = vec![task("T1", "Lathe"), task("T2", "Press"), task("T3", "Drill")];
        let all = search(&rows, &fields(&["task_no"]), &[], "");
        assert_eq!(all, vec![0, 1, 2]);
    }

    #[test]
    fn whitespace_is_matched_literally() {
        let rows = vec![task("T1", "Lathe"), task("T2", "Press brake")];
        let f = fields(&["machine_name"]);
        assert_eq!(search(&rows, &f, &[], " "), vec![1]);
        assert_eq!(search(&rows, &f, &[], "press "), vec![1]);
        assert!(search(&rows, &f, &[], "lathe ").is_empty());
    }

    #[test]
    fn no_fields_is_pass_through() {
        let rows = vec![task("T1", "Lathe")];
        assert_eq!(search(&rows, &[], &[], "zzz"), vec![0]);
    }

    #[test]
    fn substring_of_any_field_is_found() {
        let rows: Vec<RepairTask> = (0..200)
            .map(|i| task(&format!("TR-{i:03}"), if i % 2 == 0 { "Lathe" } else { "Press" }))
            .collect();
        let f = fields(&["task_no", "machine_name"]);
        for (idx, row) in rows.iter().enumerate() {
            let no = row.task_no.clone().unwrap();
            let query = no[1..4].to_uppercase();
            assert!(search(&rows, &f, &[], &query).contains(&idx));
        }
        let presses = search(&rows, &f, &[], "RESS");
        assert_eq!(presses.len(), 100);
        assert!(presses.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn dates_match_raw_and_rendered_text() {
        let mut row = task("T1", "Lathe");
        row.indent_date = NaiveDate::from_ymd_opt(2024, 1, 12);
        let rows = vec![row, task("T2", "Press")];
        let columns = vec![Column::new("indent_date", "Indent date")];
        let f = fields(&["indent_date"]);
        assert_eq!(search(&rows, &f, &columns, "2024-01"), vec![0]);
        assert_eq!(search(&rows, &f, &columns, "12 jan 2024"), vec![0]);
        // Without a column rendering the field only the raw value counts.
        assert!(search(&rows, &f, &[], "12 jan").is_empty());
    }
}
